//! BLE Service and Characteristic UUIDs.
//!
//! Contains all UUID constants used for Mi Band communication, plus the
//! [`CharacteristicId`] addressing type used throughout the crate.

use uuid::Uuid;

// MiLi Service (Mi Band primary service)
/// Mi Band primary ("MiLi") service UUID.
pub const MILI_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_fee0_0000_1000_8000_00805f9b34fb);
/// Control point characteristic UUID (write-only command sink).
pub const CONTROL_POINT_UUID: Uuid = Uuid::from_u128(0x0000_ff05_0000_1000_8000_00805f9b34fb);
/// Realtime step count characteristic UUID (Notify).
pub const REALTIME_STEPS_UUID: Uuid = Uuid::from_u128(0x0000_ff06_0000_1000_8000_00805f9b34fb);
/// Raw accelerometer sensor data characteristic UUID (Notify).
pub const SENSOR_DATA_UUID: Uuid = Uuid::from_u128(0x0000_ff0e_0000_1000_8000_00805f9b34fb);

/// Client Characteristic Configuration descriptor UUID (standard BLE).
///
/// Written with the notification-enable value when subscribing. The
/// platform BLE stack performs this write as part of
/// [`Transport::enable_notifications`](crate::ble::transport::Transport::enable_notifications).
pub const UPDATE_NOTIFICATION_DESCRIPTOR_UUID: Uuid =
    Uuid::from_u128(0x0000_2902_0000_1000_8000_00805f9b34fb);

/// Address of a single GATT characteristic on the band.
///
/// BLE characteristics are only unique within their containing service,
/// so both identifiers are carried. Used as the key for notification
/// dispatch and for read/write addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CharacteristicId {
    /// UUID of the containing service.
    pub service: Uuid,
    /// UUID of the characteristic itself.
    pub characteristic: Uuid,
}

impl CharacteristicId {
    /// Create a characteristic address from a service/characteristic pair.
    pub const fn new(service: Uuid, characteristic: Uuid) -> Self {
        Self {
            service,
            characteristic,
        }
    }

    /// Address a characteristic within the MiLi primary service.
    pub const fn in_mili_service(characteristic: Uuid) -> Self {
        Self::new(MILI_SERVICE_UUID, characteristic)
    }

    /// The control point characteristic.
    pub const fn control_point() -> Self {
        Self::in_mili_service(CONTROL_POINT_UUID)
    }

    /// The realtime step count characteristic.
    pub const fn realtime_steps() -> Self {
        Self::in_mili_service(REALTIME_STEPS_UUID)
    }

    /// The raw accelerometer sensor data characteristic.
    pub const fn sensor_data() -> Self {
        Self::in_mili_service(SENSOR_DATA_UUID)
    }
}

impl std::fmt::Display for CharacteristicId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.service, self.characteristic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_format() {
        // Verify UUIDs are properly formatted
        let service = MILI_SERVICE_UUID.to_string();
        assert!(service.contains("fee0"));

        let control = CONTROL_POINT_UUID.to_string();
        assert!(control.contains("ff05"));

        let descriptor = UPDATE_NOTIFICATION_DESCRIPTOR_UUID.to_string();
        assert!(descriptor.contains("2902"));
    }

    #[test]
    fn test_well_known_characteristics_live_in_mili_service() {
        assert_eq!(CharacteristicId::control_point().service, MILI_SERVICE_UUID);
        assert_eq!(CharacteristicId::sensor_data().service, MILI_SERVICE_UUID);
        assert_eq!(
            CharacteristicId::realtime_steps().service,
            MILI_SERVICE_UUID
        );
    }

    #[test]
    fn test_characteristic_id_identity() {
        assert_eq!(
            CharacteristicId::sensor_data(),
            CharacteristicId::in_mili_service(SENSOR_DATA_UUID)
        );
        assert_ne!(
            CharacteristicId::sensor_data(),
            CharacteristicId::realtime_steps()
        );
        // Same characteristic UUID under a different service is a different address
        assert_ne!(
            CharacteristicId::sensor_data(),
            CharacteristicId::new(UPDATE_NOTIFICATION_DESCRIPTOR_UUID, SENSOR_DATA_UUID)
        );
    }

    #[test]
    fn test_characteristic_id_display() {
        let id = CharacteristicId::control_point();
        let rendered = id.to_string();
        assert!(rendered.contains("fee0"));
        assert!(rendered.contains("ff05"));
    }
}
