//! Builder pattern for bus configuration.
//!
//! Provides a fluent API for configuring and creating [`EventBus`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use ws_eventbus::{EventBus, ResubscribePolicy};
//!
//! # async fn example() -> ws_eventbus::Result<()> {
//! let bus = EventBus::builder("/eventbus")
//!     .origin("https://app.example.com")
//!     .heartbeat_interval(Duration::from_secs(10))
//!     .resubscribe(ResubscribePolicy::ReplayAll)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::debug;

use crate::diagnostics::{DEFAULT_DIAGNOSTICS_CAPACITY, Diagnostics};
use crate::error::{Error, Result};
use crate::identifiers::{IdGenerator, UuidGenerator};
use crate::transport::address::{parse_origin, resolve_ws_url};
use crate::transport::{Connector, WsConnector};

use super::core::{EventBus, Shared};
use super::event_loop::{EventLoop, LoopSettings};
use super::state::StateCell;

// ============================================================================
// Constants
// ============================================================================

/// Default interval between `ping` envelopes.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Default delay before reconnecting after an unexpected close.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

// ============================================================================
// ResubscribePolicy
// ============================================================================

/// What happens to consumer registrations when the transport closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResubscribePolicy {
    /// Forget every registration; consumers must register again.
    #[default]
    DropAll,
    /// Keep registrations and re-register their addresses after the next
    /// handshake.
    ReplayAll,
}

// ============================================================================
// EventBusBuilder
// ============================================================================

/// Builder for configuring an [`EventBus`].
///
/// Use [`EventBus::builder()`] to create a new builder.
#[derive(Clone)]
pub struct EventBusBuilder {
    /// Absolute URL or path.
    target: String,
    /// Origin for relative targets.
    origin: Option<String>,
    heartbeat_interval: Duration,
    reconnect_delay: Duration,
    resubscribe: ResubscribePolicy,
    connector: Arc<dyn Connector>,
    id_generator: Arc<dyn IdGenerator>,
    diagnostics_capacity: usize,
}

impl fmt::Debug for EventBusBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBusBuilder")
            .field("target", &self.target)
            .field("origin", &self.origin)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("reconnect_delay", &self.reconnect_delay)
            .field("resubscribe", &self.resubscribe)
            .field("diagnostics_capacity", &self.diagnostics_capacity)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// EventBusBuilder Implementation
// ============================================================================

impl EventBusBuilder {
    /// Creates a builder for `target` with the default configuration.
    ///
    /// # Arguments
    ///
    /// * `target` - `ws(s)://` or `http(s)://` URL, or a path joined onto
    ///   the [`origin`](Self::origin)
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            origin: None,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            resubscribe: ResubscribePolicy::default(),
            connector: Arc::new(WsConnector),
            id_generator: Arc::new(UuidGenerator),
            diagnostics_capacity: DEFAULT_DIAGNOSTICS_CAPACITY,
        }
    }

    /// Sets the origin relative targets are resolved against.
    ///
    /// # Arguments
    ///
    /// * `origin` - e.g. `https://app.example.com`
    #[inline]
    #[must_use]
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Sets the interval between heartbeats while open.
    #[inline]
    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the delay before reconnecting after an unexpected close.
    #[inline]
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets what happens to registrations across reconnects.
    #[inline]
    #[must_use]
    pub fn resubscribe(mut self, policy: ResubscribePolicy) -> Self {
        self.resubscribe = policy;
        self
    }

    /// Replaces the transport.
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    /// Replaces the identifier source.
    #[inline]
    #[must_use]
    pub fn id_generator(mut self, ids: impl IdGenerator) -> Self {
        self.id_generator = Arc::new(ids);
        self
    }

    /// Sets how many diagnostics each receiver buffers.
    #[inline]
    #[must_use]
    pub fn diagnostics_capacity(mut self, capacity: usize) -> Self {
        self.diagnostics_capacity = capacity;
        self
    }

    /// Validates the configuration and starts the bus.
    ///
    /// The event loop is spawned on the current tokio runtime and starts
    /// connecting right away.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if a duration is zero, a relative target has no
    ///   origin, a scheme is unsupported, or no tokio runtime is running
    /// - [`Error::InvalidUrl`] if the target or origin does not parse
    pub fn build(self) -> Result<EventBus> {
        self.validate()?;

        let origin = self.origin.as_deref().map(parse_origin).transpose()?;
        let url = resolve_ws_url(&self.target, origin.as_ref())?;

        let runtime = Handle::try_current()
            .map_err(|_| Error::config("EventBus must be built inside a tokio runtime"))?;

        let shared = Arc::new(Shared {
            url,
            state: StateCell::default(),
            diagnostics: Diagnostics::new(self.diagnostics_capacity),
            ids: self.id_generator,
        });

        let (commands, commands_rx) = mpsc::unbounded_channel();
        let settings = LoopSettings {
            heartbeat_interval: self.heartbeat_interval,
            reconnect_delay: self.reconnect_delay,
            resubscribe: self.resubscribe,
            connector: self.connector,
        };
        let event_loop = EventLoop::new(
            settings,
            Arc::clone(&shared),
            commands_rx,
            commands.downgrade(),
        );

        debug!(url = %shared.url, resubscribe = ?self.resubscribe, "Starting event bus");
        runtime.spawn(event_loop.run());

        Ok(EventBus::from_parts(commands, shared))
    }

    fn validate(&self) -> Result<()> {
        if self.heartbeat_interval.is_zero() {
            return Err(Error::config("heartbeat interval must be non-zero"));
        }
        if self.reconnect_delay.is_zero() {
            return Err(Error::config("reconnect delay must be non-zero"));
        }
        if self.diagnostics_capacity == 0 {
            return Err(Error::config("diagnostics capacity must be non-zero"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
