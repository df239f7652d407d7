//! Notification dispatch registry.
//!
//! Maps a characteristic address to the single listener interested in
//! its value-changed notifications. Owned by one session; cleared on
//! every disconnect.

use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, trace};

use crate::ble::uuids::CharacteristicId;

/// Callback invoked with the raw bytes of a notification.
///
/// Invoked synchronously on the session's event task; listeners must not
/// call back into the registry from inside the callback.
pub type NotifyListener = Box<dyn Fn(&[u8]) + Send + Sync>;

/// Registry of per-characteristic notification listeners.
///
/// At most one listener per characteristic. Registration is guarded:
/// a second registration for an occupied slot is a no-op that keeps the
/// existing listener, and replacement requires an explicit
/// [`unregister`](Self::unregister) first. The policy is uniform across
/// all streams.
#[derive(Default)]
pub struct NotificationRegistry {
    listeners: RwLock<HashMap<CharacteristicId, NotifyListener>>,
}

impl NotificationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for a characteristic.
    ///
    /// Returns `true` if the listener was stored, `false` if a listener
    /// was already present (in which case the existing one is kept and
    /// `listener` is dropped).
    pub fn register(&self, id: CharacteristicId, listener: NotifyListener) -> bool {
        let mut listeners = self.listeners.write();
        if listeners.contains_key(&id) {
            debug!(%id, "listener already registered, keeping existing");
            return false;
        }
        listeners.insert(id, listener);
        true
    }

    /// Remove the listener for a characteristic.
    ///
    /// Returns `true` if a listener was present.
    pub fn unregister(&self, id: &CharacteristicId) -> bool {
        self.listeners.write().remove(id).is_some()
    }

    /// Check whether a listener is registered for a characteristic.
    pub fn contains(&self, id: &CharacteristicId) -> bool {
        self.listeners.read().contains_key(id)
    }

    /// Dispatch a notification to the registered listener, if any.
    ///
    /// Unregistered characteristics are expected background noise from
    /// other GATT clients; their events are dropped without error.
    /// Returns `true` if a listener was invoked.
    pub fn dispatch(&self, id: &CharacteristicId, data: &[u8]) -> bool {
        let listeners = self.listeners.read();
        match listeners.get(id) {
            Some(listener) => {
                trace!(%id, len = data.len(), "dispatching notification");
                listener(data);
                true
            }
            None => {
                trace!(%id, "no listener for notification, dropping");
                false
            }
        }
    }

    /// Drop all listeners. Called on disconnect.
    pub fn clear(&self) {
        self.listeners.write().clear();
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Whether no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }
}

impl std::fmt::Debug for NotificationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_listener(counter: Arc<AtomicUsize>) -> NotifyListener {
        Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_register_and_dispatch() {
        let registry = NotificationRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));

        assert!(registry.register(
            CharacteristicId::sensor_data(),
            counting_listener(hits.clone())
        ));
        assert!(registry.dispatch(&CharacteristicId::sensor_data(), &[1, 2, 3]));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_second_registration_is_noop() {
        let registry = NotificationRegistry::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let id = CharacteristicId::sensor_data();

        assert!(registry.register(id, counting_listener(first.clone())));
        assert!(!registry.register(id, counting_listener(second.clone())));

        registry.dispatch(&id, &[0, 0]);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unregister_allows_replacement() {
        let registry = NotificationRegistry::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let id = CharacteristicId::realtime_steps();

        registry.register(id, counting_listener(first.clone()));
        assert!(registry.unregister(&id));
        assert!(registry.register(id, counting_listener(second.clone())));

        registry.dispatch(&id, &[0; 4]);
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unknown_id_dropped_silently() {
        let registry = NotificationRegistry::new();
        assert!(!registry.dispatch(&CharacteristicId::control_point(), &[0xFF]));
    }

    #[test]
    fn test_clear() {
        let registry = NotificationRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let id = CharacteristicId::sensor_data();

        registry.register(id, counting_listener(hits.clone()));
        registry.clear();

        assert!(registry.is_empty());
        assert!(!registry.dispatch(&id, &[1]));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
