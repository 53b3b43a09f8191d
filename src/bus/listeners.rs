//! Open and close listeners.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::identifiers::ListenerId;
use crate::transport::CloseInfo;

use super::core::EventBus;

// ============================================================================
// Types
// ============================================================================

/// Lifecycle callback.
///
/// Runs on the event loop with a handle to the bus, so an open listener can
/// send right away.
pub type Listener = Box<dyn FnMut(&EventBus, &LifecycleEvent) + Send>;

// ============================================================================
// LifecycleKind
// ============================================================================

/// Lifecycle event names accepted by
/// [`EventBus::add_event_listener`](super::EventBus::add_event_listener).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleKind {
    /// `"open"`: the handshake completed.
    Open,
    /// `"close"`: the transport closed.
    Close,
}

impl LifecycleKind {
    /// Parses an event name. Names are case-sensitive.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "open" => Some(Self::Open),
            "close" => Some(Self::Close),
            _ => None,
        }
    }

    /// Returns the event name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
        }
    }
}

impl fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// LifecycleEvent
// ============================================================================

/// What a listener is told.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The bus is open.
    Open,
    /// The transport closed.
    Close(CloseInfo),
}

impl LifecycleEvent {
    /// Returns the matching listener kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> LifecycleKind {
        match self {
            Self::Open => LifecycleKind::Open,
            Self::Close(_) => LifecycleKind::Close,
        }
    }
}

// ============================================================================
// Listeners
// ============================================================================

/// Registered listeners per kind, in registration order.
#[derive(Default)]
pub(crate) struct Listeners {
    open: Vec<(ListenerId, Listener)>,
    close: Vec<(ListenerId, Listener)>,
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("open", &self.open.len())
            .field("close", &self.close.len())
            .finish()
    }
}

impl Listeners {
    fn of_kind(&mut self, kind: LifecycleKind) -> &mut Vec<(ListenerId, Listener)> {
        match kind {
            LifecycleKind::Open => &mut self.open,
            LifecycleKind::Close => &mut self.close,
        }
    }

    pub(crate) fn add(&mut self, kind: LifecycleKind, id: ListenerId, listener: Listener) {
        self.of_kind(kind).push((id, listener));
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub(crate) fn remove(&mut self, kind: LifecycleKind, id: ListenerId) -> bool {
        let listeners = self.of_kind(kind);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Invokes every listener of the event's kind.
    pub(crate) fn notify(&mut self, bus: &EventBus, event: &LifecycleEvent) {
        for (_, listener) in self.of_kind(event.kind()).iter_mut() {
            listener(bus, event);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.open.len() + self.close.len()
    }

    pub(crate) fn clear(&mut self) {
        self.open.clear();
        self.close.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================
