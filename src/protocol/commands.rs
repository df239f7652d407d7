//! Control point command table.
//!
//! The band arms and disarms its notification streams in response to
//! fixed byte sequences written to the control point characteristic.
//! The values are a closed, firmware-versioned lookup table taken from
//! device documentation; they are never computed.
//!
//! Writing a command does not register a listener. Arming a stream and
//! registering a listener for it are independent steps and both are
//! required to receive decoded events.

/// Arm the raw accelerometer sensor data notification stream.
pub const ENABLE_SENSOR_DATA_NOTIFY: &[u8] = &[0x12, 0x01];
/// Disarm the raw accelerometer sensor data notification stream.
pub const DISABLE_SENSOR_DATA_NOTIFY: &[u8] = &[0x12, 0x00];
/// Arm the realtime step count notification stream.
pub const ENABLE_REALTIME_STEPS_NOTIFY: &[u8] = &[0x03, 0x01];
/// Disarm the realtime step count notification stream.
pub const DISABLE_REALTIME_STEPS_NOTIFY: &[u8] = &[0x03, 0x00];

/// A named control point command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlCommand {
    /// Arm the sensor data stream.
    EnableSensorDataNotify,
    /// Disarm the sensor data stream.
    DisableSensorDataNotify,
    /// Arm the realtime steps stream.
    EnableRealtimeStepsNotify,
    /// Disarm the realtime steps stream.
    DisableRealtimeStepsNotify,
}

impl ControlCommand {
    /// The byte sequence written, unmodified, to the control point.
    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::EnableSensorDataNotify => ENABLE_SENSOR_DATA_NOTIFY,
            Self::DisableSensorDataNotify => DISABLE_SENSOR_DATA_NOTIFY,
            Self::EnableRealtimeStepsNotify => ENABLE_REALTIME_STEPS_NOTIFY,
            Self::DisableRealtimeStepsNotify => DISABLE_REALTIME_STEPS_NOTIFY,
        }
    }
}
