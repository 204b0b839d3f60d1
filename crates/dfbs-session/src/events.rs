//! ---
//! dfbs_section: "06-security-access-control"
//! dfbs_subsection: "module"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Session state, identity context and session events."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

use crate::identity::{UserId, Vision};

const DEFAULT_CAPACITY: usize = 64;

/// Why a session was torn down by a lower layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationReason {
    /// A backend call answered `401 Unauthorized`.
    Unauthorized,
}

/// Changes to the session that invalidate cached permission data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A user authenticated.
    LoggedIn {
        /// The authenticated user.
        user_id: UserId,
    },
    /// The user logged out.
    LoggedOut,
    /// The viewpoint override changed.
    VisionChanged {
        /// New override state.
        vision: Vision,
    },
    /// The session was rejected by the backend.
    Invalidated {
        /// Rejection cause.
        reason: InvalidationReason,
    },
}

/// Synchronous subscriber invoked before the event is broadcast.
pub trait SessionListener: Send + Sync + 'static {
    /// React to a session event. Must not block.
    fn on_event(&self, event: &SessionEvent);
}

/// Registration handle returned by [`SessionEvents::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct EventsInner {
    listeners: RwLock<Vec<(ListenerId, Arc<dyn SessionListener>)>>,
    next_id: AtomicU64,
    sender: broadcast::Sender<SessionEvent>,
}

/// Session event bus.
///
/// Registered listeners run inline, in registration order, so teardown has completed by
/// the time [`SessionEvents::emit`] returns. Async subscribers receive the event afterwards.
#[derive(Clone)]
pub struct SessionEvents {
    inner: Arc<EventsInner>,
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for SessionEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEvents")
            .field("listeners", &self.inner.listeners.read().len())
            .field("subscribers", &self.inner.sender.receiver_count())
            .finish()
    }
}

impl SessionEvents {
    /// Create a bus whose broadcast channel buffers `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(EventsInner {
                listeners: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(0),
                sender,
            }),
        }
    }

    /// Register a synchronous listener.
    pub fn register(&self, listener: Arc<dyn SessionListener>) -> ListenerId {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.write().push((id, listener));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unregister(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.write();
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        listeners.len() != before
    }

    /// Subscribe to broadcast delivery.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.sender.subscribe()
    }

    /// Publish an event to listeners, then to subscribers.
    pub fn emit(&self, event: SessionEvent) {
        let listeners = self.inner.listeners.read().clone();
        for (_, listener) in &listeners {
            listener.on_event(&event);
        }
        debug!(?event, listeners = listeners.len(), "session event emitted");
        // No subscribers is not an error.
        let _ = self.inner.sender.send(event);
    }
}
