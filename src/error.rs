//! Error types for the miband-rust-ble crate.

use thiserror::Error;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Bluetooth-related error from the underlying BLE library.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Operation requires a ready session but the band is not connected.
    ///
    /// Returned for any characteristic read/write/subscribe or RSSI read
    /// attempted before service discovery has completed.
    #[error("Band not connected")]
    NotConnected,

    /// Failed to establish a session with the band.
    #[error("Connection failed: {reason}")]
    ConnectionFailed {
        /// Description of why the connection failed.
        reason: String,
    },

    /// Characteristic not found on the device.
    #[error("Characteristic not found: {uuid}")]
    CharacteristicNotFound {
        /// The UUID of the characteristic that was not found.
        uuid: String,
    },

    /// Service not found on the device.
    #[error("Service not found: {uuid}")]
    ServiceNotFound {
        /// The UUID of the service that was not found.
        uuid: String,
    },

    /// The transport reported an operation failure with a status code.
    ///
    /// A transport failure during a ready-state operation does not by
    /// itself drop the session; only a link-drop event does.
    #[error("Transport operation failed with status {code}")]
    TransportFailure {
        /// The transport status code, or -1 when the platform reports none.
        code: i32,
    },

    /// A sensor notification payload had an invalid length.
    ///
    /// Valid sensor frames are a 2-byte counter followed by a whole
    /// number of 6-byte sample slots.
    #[error("Malformed sensor frame: payload length {length} is not 2 + 6n")]
    MalformedFrame {
        /// The offending payload length.
        length: usize,
    },

    /// A payload on the step-count characteristic had an unexpected shape.
    ///
    /// Non-fatal: the band shares this characteristic with other
    /// notification shapes, so unrecognized payloads are dropped.
    #[error("Unrecognized payload of {length} bytes")]
    UnrecognizedPayload {
        /// The offending payload length.
        length: usize,
    },
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
