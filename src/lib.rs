// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # miband-rust-ble
//!
//! A cross-platform Rust library for communicating with Mi Band fitness
//! trackers via Bluetooth Low Energy.
//!
//! This library is the protocol layer above a generic BLE transport: it
//! sequences the connection lifecycle (connect, service discovery,
//! ready), multiplexes characteristic notifications to per-stream
//! listeners, arms and disarms the band's notification streams through
//! its control point, and decodes the raw accelerometer and step-count
//! payloads into calibrated values.
//!
//! ## Features
//!
//! - **Session lifecycle**: explicit state machine gating every
//!   characteristic operation on completed service discovery
//! - **Realtime accelerometer**: raw sensor packets decoded into
//!   tri-axial samples in m/s²
//! - **Realtime steps**: running step total notifications
//! - **Serialized GATT access**: one in-flight operation per link,
//!   queued automatically
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use miband_rust_ble::{DeviceHandle, MiBand, Result};
//! # async fn example(peripheral: btleplug::platform::Peripheral) -> Result<()> {
//! let band = MiBand::from_peripheral(peripheral);
//! band.connect(DeviceHandle::new("AA:BB:CC:DD:EE:FF")).await?;
//!
//! // Both steps are required: register the listener, then arm the stream.
//! band.set_sensor_data_notify_listener(|frame| match frame {
//!     Ok(frame) => {
//!         for sample in &frame.samples {
//!             println!("{:.3} {:.3} {:.3}", sample.x, sample.y, sample.z);
//!         }
//!     }
//!     Err(e) => eprintln!("skipping frame: {e}"),
//! })
//! .await?;
//! band.enable_sensor_data_notify().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Platform Notes
//!
//! ### macOS
//! Requires Bluetooth permission. Add `NSBluetoothAlwaysUsageDescription`
//! to your Info.plist for bundled apps.
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ### Windows
//! Requires Windows 10 or later with Bluetooth LE support.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for data types

// Public modules
pub mod band;
pub mod ble;
pub mod data;
pub mod error;
pub mod protocol;

// Re-exports for convenience
pub use band::MiBand;
pub use error::{Error, Result};

// Re-export commonly used types from submodules
pub use ble::session::{DeviceHandle, Session, SessionState};
pub use ble::transport::{BtleplugTransport, Transport, TransportEvent};
pub use ble::uuids::CharacteristicId;
pub use data::{parse_step_count, AccelerationSample, SensorFrame};
pub use protocol::ControlCommand;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that key types are exported
        let _ = std::any::TypeId::of::<MiBand>();
        let _ = std::any::TypeId::of::<Error>();
        let _ = std::any::TypeId::of::<SessionState>();
        let _ = std::any::TypeId::of::<DeviceHandle>();
        let _ = std::any::TypeId::of::<CharacteristicId>();
        let _ = std::any::TypeId::of::<SensorFrame>();
        let _ = std::any::TypeId::of::<AccelerationSample>();
        let _ = std::any::TypeId::of::<ControlCommand>();
    }
}
