//! Event bus client.
//!
//! This module turns a text-frame transport into an addressable message bus
//! with publish/subscribe, point-to-point send and request/reply.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`EventBus`] | Clonable handle, the public API |
//! | [`EventBusBuilder`] | Fluent configuration builder |
//! | [`Consumer`] | Registered consumer, unregisters on request |
//! | [`PendingConsumer`] | Consumer registration awaiting acknowledgement |
//! | [`PendingReply`] | Reply to a request |
//! | [`ReadyState`] | Connection lifecycle state |
//!
//! # Event Loop
//!
//! Each bus spawns one task that owns the consumer registry, the reply and
//! track tables, the pre-handshake queue and the lifecycle listeners.
//! Handles talk to it over a command channel; the transport talks to it
//! over an event channel.

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder and reconnection policy.
pub mod builder;

/// Consumer handles.
pub mod consumer;

/// Public bus handle.
pub mod core;

/// Open and close listeners.
pub mod listeners;

/// Awaitable replies.
pub mod reply;

/// Connection state.
pub mod state;

pub(crate) mod broker;
pub(crate) mod command;
pub(crate) mod event_loop;
pub(crate) mod registry;
pub(crate) mod router;

// ============================================================================
// Re-exports
// ============================================================================

pub use broker::ReplyOutcome;
pub use builder::{
    DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_RECONNECT_DELAY, EventBusBuilder, ResubscribePolicy,
};
pub use consumer::{Consumer, MessageHandler, PendingConsumer};
pub use core::EventBus;
pub use listeners::{LifecycleEvent, LifecycleKind, Listener};
pub use reply::PendingReply;
pub use state::{BusStats, ReadyState};
