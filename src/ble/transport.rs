//! Transport seam over the platform BLE stack.
//!
//! The session never touches BLE primitives directly; it talks to the
//! [`Transport`] trait. Command issuing (the async methods, whose
//! returned futures resolve when the platform reports completion) and
//! event listening (the [`TransportEvent`] stream for unsolicited
//! link drops and value-changed notifications) are deliberately
//! separate capabilities wired together by the session.

use async_trait::async_trait;
use btleplug::api::{Characteristic, Peripheral as _, WriteType};
use btleplug::platform::Peripheral;
use futures::stream::StreamExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

use crate::ble::uuids::CharacteristicId;
use crate::error::{Error, Result};

/// Unsolicited event pushed by the transport.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// The link to the band dropped.
    LinkDropped,
    /// The band pushed a new value for a subscribed characteristic.
    CharacteristicChanged {
        /// Address of the characteristic that changed.
        id: CharacteristicId,
        /// The notification payload.
        data: Vec<u8>,
    },
}

/// Capability the session consumes to reach the band.
///
/// Every method is asynchronous; the future resolving is the completion
/// event of the underlying GATT procedure. Implementations must assume
/// callers issue at most one characteristic procedure at a time — the
/// session enforces this with its operation queue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the physical link to the band.
    async fn establish_link(&self) -> Result<()>;

    /// Tear down the physical link.
    async fn teardown_link(&self) -> Result<()>;

    /// Discover the band's services and characteristics.
    ///
    /// Must complete successfully before any characteristic operation.
    async fn discover_services(&self) -> Result<()>;

    /// Read the current value of a characteristic.
    async fn read_characteristic(&self, id: &CharacteristicId) -> Result<Vec<u8>>;

    /// Write bytes to a characteristic.
    async fn write_characteristic(&self, id: &CharacteristicId, data: &[u8]) -> Result<()>;

    /// Subscribe to notifications for a characteristic.
    ///
    /// Writes the standard notification-enable descriptor on the way.
    async fn enable_notifications(&self, id: &CharacteristicId) -> Result<()>;

    /// Read the link signal strength (RSSI) in dBm.
    async fn read_signal_strength(&self) -> Result<i16>;

    /// Addresses of all characteristics found during discovery.
    fn discovered_characteristics(&self) -> Vec<CharacteristicId>;

    /// Subscribe to the unsolicited event stream.
    fn events(&self) -> broadcast::Receiver<TransportEvent>;
}

/// Production [`Transport`] backed by a btleplug peripheral.
pub struct BtleplugTransport {
    /// The peripheral to communicate with.
    peripheral: Peripheral,
    /// Cached characteristics by UUID, filled during discovery.
    characteristics: Arc<RwLock<HashMap<Uuid, Characteristic>>>,
    /// Channel for unsolicited events.
    event_tx: broadcast::Sender<TransportEvent>,
    /// Handle to the notification pump task.
    pump_handle: RwLock<Option<tokio::task::JoinHandle<()>>>,
}

impl BtleplugTransport {
    /// Create a transport for a peripheral.
    pub fn new(peripheral: Peripheral) -> Self {
        let (event_tx, _) = broadcast::channel(256);

        Self {
            peripheral,
            characteristics: Arc::new(RwLock::new(HashMap::new())),
            event_tx,
            pump_handle: RwLock::new(None),
        }
    }

    /// Look up a cached characteristic, checking the service it lives in.
    fn characteristic(&self, id: &CharacteristicId) -> Result<Characteristic> {
        let chars = self.characteristics.read();
        match chars.get(&id.characteristic) {
            Some(c) if c.service_uuid == id.service => Ok(c.clone()),
            Some(_) => Err(Error::ServiceNotFound {
                uuid: id.service.to_string(),
            }),
            None => Err(Error::CharacteristicNotFound {
                uuid: id.characteristic.to_string(),
            }),
        }
    }

    /// Start the task that pumps btleplug notifications into the event
    /// stream. The stream ending while the link was up is reported as a
    /// link drop.
    async fn start_pump(&self) -> Result<()> {
        let mut notifications = self.peripheral.notifications().await?;
        let characteristics = self.characteristics.clone();
        let event_tx = self.event_tx.clone();

        let handle = tokio::spawn(async move {
            debug!("notification pump started");

            while let Some(notification) = notifications.next().await {
                let service = characteristics
                    .read()
                    .get(&notification.uuid)
                    .map(|c| c.service_uuid);

                match service {
                    Some(service) => {
                        let event = TransportEvent::CharacteristicChanged {
                            id: CharacteristicId::new(service, notification.uuid),
                            data: notification.value,
                        };
                        let _ = event_tx.send(event);
                    }
                    None => {
                        trace!(
                            uuid = %notification.uuid,
                            "notification for undiscovered characteristic, dropping"
                        );
                    }
                }
            }

            debug!("notification stream ended, reporting link drop");
            let _ = event_tx.send(TransportEvent::LinkDropped);
        });

        if let Some(old) = self.pump_handle.write().replace(handle) {
            old.abort();
        }

        Ok(())
    }
}

#[async_trait]
impl Transport for BtleplugTransport {
    async fn establish_link(&self) -> Result<()> {
        if self.peripheral.is_connected().await.unwrap_or(false) {
            debug!("peripheral already connected at BLE level");
            return Ok(());
        }

        self.peripheral.connect().await.map_err(|e| {
            warn!("failed to establish link: {}", e);
            Error::Bluetooth(e)
        })
    }

    async fn teardown_link(&self) -> Result<()> {
        if let Some(handle) = self.pump_handle.write().take() {
            handle.abort();
        }
        self.characteristics.write().clear();

        match self.peripheral.disconnect().await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("failed to tear down link: {}", e);
                Err(Error::Bluetooth(e))
            }
        }
    }

    async fn discover_services(&self) -> Result<()> {
        self.peripheral.discover_services().await?;

        {
            let mut chars = self.characteristics.write();
            chars.clear();
            for service in self.peripheral.services() {
                for characteristic in service.characteristics {
                    trace!(
                        "found characteristic {} in service {}",
                        characteristic.uuid,
                        service.uuid
                    );
                    chars.insert(characteristic.uuid, characteristic);
                }
            }
            debug!("discovered {} characteristics", chars.len());
        }

        self.start_pump().await
    }

    async fn read_characteristic(&self, id: &CharacteristicId) -> Result<Vec<u8>> {
        let characteristic = self.characteristic(id)?;
        let data = self.peripheral.read(&characteristic).await?;
        trace!(%id, len = data.len(), "read characteristic");
        Ok(data)
    }

    async fn write_characteristic(&self, id: &CharacteristicId, data: &[u8]) -> Result<()> {
        let characteristic = self.characteristic(id)?;
        self.peripheral
            .write(&characteristic, data, WriteType::WithResponse)
            .await?;
        trace!(%id, len = data.len(), "wrote characteristic");
        Ok(())
    }

    async fn enable_notifications(&self, id: &CharacteristicId) -> Result<()> {
        let characteristic = self.characteristic(id)?;
        self.peripheral.subscribe(&characteristic).await?;
        debug!(%id, "enabled notifications");
        Ok(())
    }

    async fn read_signal_strength(&self) -> Result<i16> {
        // btleplug reports RSSI through peripheral properties rather
        // than a dedicated remote read.
        self.peripheral
            .properties()
            .await?
            .and_then(|p| p.rssi)
            .ok_or(Error::TransportFailure { code: -1 })
    }

    fn discovered_characteristics(&self) -> Vec<CharacteristicId> {
        self.characteristics
            .read()
            .values()
            .map(|c| CharacteristicId::new(c.service_uuid, c.uuid))
            .collect()
    }

    fn events(&self) -> broadcast::Receiver<TransportEvent> {
        self.event_tx.subscribe()
    }
}

impl Drop for BtleplugTransport {
    fn drop(&mut self) {
        if let Some(handle) = self.pump_handle.write().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for BtleplugTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BtleplugTransport")
            .field("peripheral", &self.peripheral.id())
            .field("characteristics", &self.characteristics.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_event_clone() {
        let event = TransportEvent::CharacteristicChanged {
            id: CharacteristicId::sensor_data(),
            data: vec![1, 2, 3],
        };
        match event.clone() {
            TransportEvent::CharacteristicChanged { id, data } => {
                assert_eq!(id, CharacteristicId::sensor_data());
                assert_eq!(data, vec![1, 2, 3]);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
