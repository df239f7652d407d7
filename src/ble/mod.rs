//! BLE session, transport seam, and notification plumbing.

pub mod registry;
pub mod session;
pub mod transport;
pub mod uuids;

pub use registry::{NotificationRegistry, NotifyListener};
pub use session::{DeviceHandle, Session, SessionState};
pub use transport::{BtleplugTransport, Transport, TransportEvent};
pub use uuids::CharacteristicId;
