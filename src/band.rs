//! MiBand struct and methods.
//!
//! The application-facing surface: one `MiBand` per physical band,
//! wrapping a [`Session`] with the fixed Mi Band GATT addresses and the
//! payload decoders.

use btleplug::platform::Peripheral;
use std::sync::Arc;
use tracing::{debug, info, trace};

use crate::ble::session::{DeviceHandle, Session, SessionState};
use crate::ble::transport::{BtleplugTransport, Transport};
use crate::ble::uuids::CharacteristicId;
use crate::data::sensor::SensorFrame;
use crate::data::steps::parse_step_count;
use crate::error::Result;
use crate::protocol::commands::ControlCommand;

/// Represents a single Mi Band fitness tracker.
///
/// Receiving a decoded stream takes two independent steps: register a
/// listener (`set_*_notify_listener`) and arm the stream on the band
/// (`enable_*_notify`). A registered listener with an unarmed stream
/// simply receives nothing.
pub struct MiBand {
    /// Session owning the connection lifecycle.
    session: Session,
}

impl MiBand {
    /// Create a band client over a transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            session: Session::new(transport),
        }
    }

    /// Create a band client for a btleplug peripheral.
    pub fn from_peripheral(peripheral: Peripheral) -> Self {
        Self::new(Arc::new(BtleplugTransport::new(peripheral)))
    }

    // === Connection ===

    /// Connect to the band and discover its services.
    pub async fn connect(&self, device: DeviceHandle) -> Result<()> {
        info!(%device, "connecting to band");
        self.session.connect(device).await
    }

    /// Disconnect from the band.
    pub async fn disconnect(&self) -> Result<()> {
        info!("disconnecting from band");
        self.session.disconnect().await
    }

    /// Get the current session state.
    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// Get the connected band's handle, if any.
    pub fn device(&self) -> Option<DeviceHandle> {
        self.session.device()
    }

    /// Set the listener invoked once per disconnect.
    pub fn set_disconnected_listener(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.session.set_disconnected_listener(listener);
    }

    /// Read the link signal strength (RSSI) in dBm.
    pub async fn read_signal_strength(&self) -> Result<i16> {
        self.session.read_signal_strength().await
    }

    /// List the characteristics discovered on the band.
    ///
    /// Debug aid for inspecting the GATT profile of unfamiliar
    /// firmware revisions.
    pub fn discovered_characteristics(&self) -> Result<Vec<CharacteristicId>> {
        self.session.discovered_characteristics()
    }

    // === Generic characteristic access ===

    /// Read the current value of a characteristic.
    pub async fn read_characteristic(&self, id: &CharacteristicId) -> Result<Vec<u8>> {
        self.session.read_characteristic(id).await
    }

    /// Write bytes to a characteristic.
    pub async fn write_characteristic(&self, id: &CharacteristicId, data: &[u8]) -> Result<()> {
        self.session.write_characteristic(id, data).await
    }

    // === Sensor data stream ===

    /// Register the accelerometer listener and subscribe to the sensor
    /// data characteristic.
    ///
    /// The listener receives each notification decoded: `Ok(frame)` for
    /// well-formed payloads, `Err(MalformedFrame)` otherwise, so callers
    /// can skip bad frames and continue. Registration is guarded; if a
    /// listener is already present it is kept and `Ok(false)` is
    /// returned.
    ///
    /// The stream stays silent until [`enable_sensor_data_notify`]
    /// arms it.
    ///
    /// [`enable_sensor_data_notify`]: Self::enable_sensor_data_notify
    pub async fn set_sensor_data_notify_listener<F>(&self, listener: F) -> Result<bool>
    where
        F: Fn(Result<SensorFrame>) + Send + Sync + 'static,
    {
        self.session
            .subscribe_notify(
                CharacteristicId::sensor_data(),
                Box::new(move |data| {
                    listener(SensorFrame::parse(data));
                }),
            )
            .await
    }

    /// Arm the accelerometer notification stream.
    pub async fn enable_sensor_data_notify(&self) -> Result<()> {
        self.write_control(ControlCommand::EnableSensorDataNotify)
            .await
    }

    /// Disarm the accelerometer notification stream.
    pub async fn disable_sensor_data_notify(&self) -> Result<()> {
        self.write_control(ControlCommand::DisableSensorDataNotify)
            .await
    }

    // === Realtime steps stream ===

    /// Register the step count listener and subscribe to the realtime
    /// steps characteristic.
    ///
    /// Payloads that are not a 4-byte step count are other notification
    /// shapes on the same characteristic and are dropped without
    /// invoking the listener. Registration is guarded, as for the
    /// sensor stream.
    ///
    /// The stream stays silent until [`enable_realtime_steps_notify`]
    /// arms it.
    ///
    /// [`enable_realtime_steps_notify`]: Self::enable_realtime_steps_notify
    pub async fn set_realtime_steps_notify_listener<F>(&self, listener: F) -> Result<bool>
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        self.session
            .subscribe_notify(
                CharacteristicId::realtime_steps(),
                Box::new(move |data| match parse_step_count(data) {
                    Ok(steps) => listener(steps),
                    Err(_) => {
                        trace!(
                            len = data.len(),
                            "ignoring unrecognized payload on steps characteristic"
                        );
                    }
                }),
            )
            .await
    }

    /// Arm the realtime steps notification stream.
    pub async fn enable_realtime_steps_notify(&self) -> Result<()> {
        self.write_control(ControlCommand::EnableRealtimeStepsNotify)
            .await
    }

    /// Disarm the realtime steps notification stream.
    pub async fn disable_realtime_steps_notify(&self) -> Result<()> {
        self.write_control(ControlCommand::DisableRealtimeStepsNotify)
            .await
    }

    // === Internal ===

    /// Write a command constant to the control point.
    async fn write_control(&self, command: ControlCommand) -> Result<()> {
        debug!(?command, "writing control point command");
        self.session
            .write_characteristic(&CharacteristicId::control_point(), command.as_bytes())
            .await
    }
}

impl std::fmt::Debug for MiBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiBand")
            .field("session_state", &self.session_state())
            .field("device", &self.device())
            .finish()
    }
}
