//! Session lifecycle and operation gating.
//!
//! One [`Session`] owns the connection to one band: the lifecycle state
//! machine, the notification registry, and the single-slot operation
//! queue that serializes GATT procedures against the link. All state
//! mutations happen either on the caller's future or on the session's
//! event task, each under the session's locks.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, trace, warn};

use crate::ble::registry::{NotificationRegistry, NotifyListener};
use crate::ble::transport::{Transport, TransportEvent};
use crate::ble::uuids::CharacteristicId;
use crate::error::{Error, Result};

/// Opaque identifier for one physical band, owned by the application.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceHandle(String);

impl DeviceHandle {
    /// Create a handle from a platform peripheral identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The underlying identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a session.
///
/// Characteristic operations are legal only in `Ready`; everything else
/// fails with [`Error::NotConnected`]. Readiness is never inferred from
/// the presence of a transport handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No link to the band.
    #[default]
    Disconnected,
    /// Establishing the link.
    Connecting,
    /// Link up, discovering services and characteristics.
    Discovering,
    /// Discovery complete; characteristic operations are legal.
    Ready,
}

impl SessionState {
    /// Check whether characteristic operations are legal.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Check if in a transitional state.
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Connecting | Self::Discovering)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Discovering => write!(f, "Discovering"),
            Self::Ready => write!(f, "Ready"),
        }
    }
}

/// Callback invoked once per disconnect.
pub type DisconnectListener = Box<dyn Fn() + Send + Sync>;

/// A session with one band over a [`Transport`].
///
/// The session is the sole caller into the transport and the sole
/// consumer of its event stream. It lives for one connection; on
/// disconnect the registry is cleared and the state resets, but the
/// session itself can be connected again.
pub struct Session {
    /// The transport capability.
    transport: Arc<dyn Transport>,
    /// Current lifecycle state.
    state: Arc<RwLock<SessionState>>,
    /// Handle of the connected band, while a session exists.
    device: Arc<RwLock<Option<DeviceHandle>>>,
    /// Notification listeners for this connection.
    registry: Arc<NotificationRegistry>,
    /// Listener invoked once per disconnect.
    disconnected_listener: Arc<RwLock<Option<DisconnectListener>>>,
    /// Single-slot operation queue: at most one in-flight GATT
    /// procedure per link. The target hardware class does not tolerate
    /// concurrent procedures.
    op_slot: Mutex<()>,
    /// Handle to the transport event task.
    event_task: RwLock<Option<tokio::task::JoinHandle<()>>>,
}

impl Session {
    /// Create a session over a transport. The session starts
    /// disconnected.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            state: Arc::new(RwLock::new(SessionState::Disconnected)),
            device: Arc::new(RwLock::new(None)),
            registry: Arc::new(NotificationRegistry::new()),
            disconnected_listener: Arc::new(RwLock::new(None)),
            op_slot: Mutex::new(()),
            event_task: RwLock::new(None),
        }
    }

    /// Get the current session state.
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Get the connected band's handle, if any.
    pub fn device(&self) -> Option<DeviceHandle> {
        self.device.read().clone()
    }

    /// Set the listener invoked once per disconnect.
    ///
    /// The listener persists across connections. It must not call back
    /// into the session.
    pub fn set_disconnected_listener(&self, listener: impl Fn() + Send + Sync + 'static) {
        *self.disconnected_listener.write() = Some(Box::new(listener));
    }

    /// Connect to a band and discover its services.
    ///
    /// Valid only from `Disconnected`: a connect while `Ready` is a
    /// no-op, a connect while a connection is in progress is rejected.
    /// Any failure resets the session to `Disconnected`.
    pub async fn connect(&self, device: DeviceHandle) -> Result<()> {
        {
            let mut state = self.state.write();
            match *state {
                SessionState::Ready => {
                    debug!("already connected");
                    return Ok(());
                }
                SessionState::Connecting | SessionState::Discovering => {
                    return Err(Error::ConnectionFailed {
                        reason: "connection already in progress".to_string(),
                    });
                }
                SessionState::Disconnected => *state = SessionState::Connecting,
            }
        }

        info!(%device, "connecting");
        *self.device.write() = Some(device);
        self.spawn_event_task();

        if let Err(e) = self.transport.establish_link().await {
            warn!("failed to establish link: {}", e);
            self.abort_connect();
            return Err(e);
        }

        if !self.advance_state(SessionState::Connecting, SessionState::Discovering) {
            return Err(Error::ConnectionFailed {
                reason: "link dropped while connecting".to_string(),
            });
        }

        if let Err(e) = self.transport.discover_services().await {
            warn!("service discovery failed: {}", e);
            let _ = self.transport.teardown_link().await;
            self.abort_connect();
            return Err(Error::ConnectionFailed {
                reason: format!("service discovery failed: {e}"),
            });
        }

        if !self.advance_state(SessionState::Discovering, SessionState::Ready) {
            return Err(Error::ConnectionFailed {
                reason: "link dropped during service discovery".to_string(),
            });
        }
        info!("session ready");

        Ok(())
    }

    /// Disconnect from the band.
    ///
    /// Clears the registry and invokes the disconnected listener. A
    /// later link-drop event from the transport for the same teardown
    /// is absorbed by the idempotent drop handling.
    pub async fn disconnect(&self) -> Result<()> {
        if self.state() == SessionState::Disconnected {
            return Ok(());
        }

        let result = self.transport.teardown_link().await;
        Self::handle_link_drop(
            &self.state,
            &self.device,
            &self.registry,
            &self.disconnected_listener,
        );
        result
    }

    /// Read the current value of a characteristic. Requires `Ready`.
    pub async fn read_characteristic(&self, id: &CharacteristicId) -> Result<Vec<u8>> {
        self.ensure_ready()?;
        let _slot = self.op_slot.lock().await;
        // the link may have dropped while queued behind another operation
        self.ensure_ready()?;
        self.transport.read_characteristic(id).await
    }

    /// Write bytes to a characteristic. Requires `Ready`.
    pub async fn write_characteristic(&self, id: &CharacteristicId, data: &[u8]) -> Result<()> {
        self.ensure_ready()?;
        let _slot = self.op_slot.lock().await;
        self.ensure_ready()?;
        self.transport.write_characteristic(id, data).await
    }

    /// Read the link signal strength. Requires `Ready`.
    pub async fn read_signal_strength(&self) -> Result<i16> {
        self.ensure_ready()?;
        let _slot = self.op_slot.lock().await;
        self.ensure_ready()?;
        self.transport.read_signal_strength().await
    }

    /// List the characteristics discovered on the band. Requires `Ready`.
    pub fn discovered_characteristics(&self) -> Result<Vec<CharacteristicId>> {
        self.ensure_ready()?;
        Ok(self.transport.discovered_characteristics())
    }

    /// Register a notification listener and enable notifications for
    /// the characteristic. Requires `Ready`.
    ///
    /// Registration is guarded: if a listener already exists for the
    /// id, the existing listener is kept, no descriptor write happens,
    /// and `Ok(false)` is returned. Returns `Ok(true)` when the
    /// listener was stored and the stream subscribed.
    ///
    /// This only wires up dispatch; streams gated by the control point
    /// additionally need their arm command written.
    pub async fn subscribe_notify(
        &self,
        id: CharacteristicId,
        listener: NotifyListener,
    ) -> Result<bool> {
        self.ensure_ready()?;

        if !self.registry.register(id, listener) {
            return Ok(false);
        }

        let _slot = self.op_slot.lock().await;
        if let Err(e) = self.ensure_ready() {
            self.registry.unregister(&id);
            return Err(e);
        }
        if let Err(e) = self.transport.enable_notifications(&id).await {
            // roll back so the caller can retry with a fresh listener
            self.registry.unregister(&id);
            return Err(e);
        }

        Ok(true)
    }

    /// Remove the notification listener for a characteristic.
    ///
    /// Dispatch stops immediately; the stream itself stays armed until
    /// the matching disarm command is written.
    pub fn unregister_notify(&self, id: &CharacteristicId) -> bool {
        self.registry.unregister(id)
    }

    /// Check whether a notification listener is registered.
    pub fn has_notify_listener(&self, id: &CharacteristicId) -> bool {
        self.registry.contains(id)
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.state().is_ready() {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }

    /// Update the session state, logging the transition.
    fn set_state(&self, new_state: SessionState) {
        let mut state = self.state.write();
        if *state != new_state {
            debug!("session state changed: {} -> {}", *state, new_state);
            *state = new_state;
        }
    }

    /// Transition to `to` only if the session is still in `from`.
    ///
    /// The event task may process a link drop while a connect step is
    /// in flight; the drop wins and the pending transition is
    /// abandoned rather than resurrecting a dead session.
    fn advance_state(&self, from: SessionState, to: SessionState) -> bool {
        let mut state = self.state.write();
        if *state != from {
            debug!(
                "not advancing to {}: session is {} instead of {}",
                to, *state, from
            );
            return false;
        }
        debug!("session state changed: {} -> {}", from, to);
        *state = to;
        true
    }

    /// Reset after a failed connect attempt. No disconnect notification
    /// is delivered: no established session was lost.
    fn abort_connect(&self) {
        self.set_state(SessionState::Disconnected);
        self.device.write().take();
        self.registry.clear();
    }

    /// Handle a link drop. Idempotent: only the transition out of a
    /// live state clears the registry and notifies the listener, so
    /// repeated drop events collapse into one disconnect.
    fn handle_link_drop(
        state: &RwLock<SessionState>,
        device: &RwLock<Option<DeviceHandle>>,
        registry: &NotificationRegistry,
        disconnected_listener: &RwLock<Option<DisconnectListener>>,
    ) {
        {
            let mut state = state.write();
            if *state == SessionState::Disconnected {
                trace!("link drop for already-disconnected session, ignoring");
                return;
            }
            info!("link dropped, session now disconnected");
            *state = SessionState::Disconnected;
        }

        device.write().take();
        registry.clear();

        if let Some(listener) = disconnected_listener.read().as_ref() {
            listener();
        }
    }

    /// Start the task consuming the transport event stream.
    fn spawn_event_task(&self) {
        let mut rx = self.transport.events();
        let state = self.state.clone();
        let device = self.device.clone();
        let registry = self.registry.clone();
        let disconnected_listener = self.disconnected_listener.clone();

        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(TransportEvent::CharacteristicChanged { id, data }) => {
                        registry.dispatch(&id, &data);
                    }
                    Ok(TransportEvent::LinkDropped) => {
                        Self::handle_link_drop(&state, &device, &registry, &disconnected_listener);
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "transport event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("transport event task stopped");
        });

        if let Some(old) = self.event_task.write().replace(handle) {
            old.abort();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(handle) = self.event_task.write().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("device", &self.device())
            .field("registry", &self.registry)
            .finish()
    }
}
