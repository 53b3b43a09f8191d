//! The public bus handle.
//!
//! [`EventBus`] is a cheap clonable handle to one event loop. State checks
//! on the send path are synchronous; everything else is forwarded to the
//! loop as a command.
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use ws_eventbus::EventBus;
//!
//! # async fn example() -> ws_eventbus::Result<()> {
//! let bus = EventBus::connect("ws://localhost:8080/eventbus")?;
//!
//! bus.on_open(|bus| {
//!     let _ = bus.publish("presence", json!({"online": true}), None);
//! });
//!
//! let consumer = bus
//!     .consumer("svc.echo", |message| Some(message.body.clone()))?
//!     .await?;
//!
//! let reply = bus.request("svc.time", json!({}), None)?.await?;
//! println!("time: {reply}");
//! consumer.unregister();
//! bus.close();
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, warn};
use url::Url;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{Error, ReplyFailure, Result};
use crate::identifiers::{ConsumerId, IdGenerator, ListenerId, ReplyAddress};
use crate::protocol::{Headers, Message, OutboundEnvelope};
use crate::transport::CloseInfo;

use super::broker::ReplyWaiter;
use super::builder::EventBusBuilder;
use super::command::BusCommand;
use super::consumer::PendingConsumer;
use super::listeners::{LifecycleEvent, LifecycleKind, Listener};
use super::reply::PendingReply;
use super::state::{BusStats, ReadyState, StateCell};

// ============================================================================
// Shared
// ============================================================================

/// State readable from every handle without going through the loop.
pub(crate) struct Shared {
    /// Resolved `ws://`/`wss://` endpoint, reused by every reconnect.
    pub(crate) url: Url,
    pub(crate) state: StateCell,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) ids: Arc<dyn IdGenerator>,
}

impl fmt::Debug for Shared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("url", &self.url.as_str())
            .field("state", &self.state.get())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// EventBus
// ============================================================================

/// Handle to a client-side event bus.
///
/// Clones share the same connection. The connection is torn down when
/// [`close`](Self::close) is called or the last handle is dropped.
#[derive(Clone)]
pub struct EventBus {
    commands: mpsc::UnboundedSender<BusCommand>,
    shared: Arc<Shared>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("url", &self.shared.url.as_str())
            .field("state", &self.ready_state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// EventBus - Construction
// ============================================================================

impl EventBus {
    /// Connects to `target` with the default configuration.
    ///
    /// `target` must be an absolute `ws(s)://` or `http(s)://` URL; use
    /// [`builder`](Self::builder) with an origin for relative paths.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] or [`Error::InvalidUrl`] if the target
    /// cannot be resolved, or if called outside a tokio runtime.
    pub fn connect(target: impl Into<String>) -> Result<Self> {
        Self::builder(target).build()
    }

    /// Creates a builder for `target`.
    #[inline]
    #[must_use]
    pub fn builder(target: impl Into<String>) -> EventBusBuilder {
        EventBusBuilder::new(target)
    }

    pub(crate) fn from_parts(
        commands: mpsc::UnboundedSender<BusCommand>,
        shared: Arc<Shared>,
    ) -> Self {
        Self { commands, shared }
    }
}

// ============================================================================
// EventBus - State
// ============================================================================

impl EventBus {
    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        self.shared.state.get()
    }

    /// Returns `true` once the handshake completed.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.ready_state().is_open()
    }

    /// Returns the resolved endpoint.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.shared.url
    }

    /// Returns a new globally-unique identifier.
    #[inline]
    #[must_use]
    pub fn uuid(&self) -> String {
        self.shared.ids.generate()
    }

    /// Subscribes to dispatch diagnostics.
    ///
    /// Only diagnostics emitted after this call are received.
    #[must_use]
    pub fn diagnostics(&self) -> broadcast::Receiver<Diagnostic> {
        self.shared.diagnostics.subscribe()
    }

    /// Returns a snapshot of the event loop tables.
    ///
    /// Commands are handled in order, so the snapshot reflects every call
    /// made on this handle before it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the event loop has stopped.
    pub async fn stats(&self) -> Result<BusStats> {
        let (tx, rx) = oneshot::channel();
        self.command(BusCommand::Stats(tx))?;
        rx.await.map_err(|_| Error::ConnectionClosed)
    }

    fn ensure_open(&self) -> Result<()> {
        let state = self.ready_state();
        if state.is_open() {
            Ok(())
        } else {
            Err(Error::invalid_state(state))
        }
    }

    fn command(&self, command: BusCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| Error::ConnectionClosed)
    }
}

// ============================================================================
// EventBus - Lifecycle Listeners
// ============================================================================

impl EventBus {
    /// Adds a listener for `"open"` or `"close"`.
    ///
    /// Returns `None` and emits [`Diagnostic::UnknownListenerEvent`] for any
    /// other name.
    pub fn add_event_listener<F>(&self, name: &str, listener: F) -> Option<ListenerId>
    where
        F: FnMut(&EventBus, &LifecycleEvent) + Send + 'static,
    {
        let Some(kind) = LifecycleKind::parse(name) else {
            self.shared.diagnostics.emit(Diagnostic::UnknownListenerEvent {
                name: name.to_string(),
            });
            return None;
        };
        Some(self.add_listener(kind, Box::new(listener)))
    }

    /// Removes a listener added with
    /// [`add_event_listener`](Self::add_event_listener).
    ///
    /// Unknown names and ids are ignored.
    pub fn remove_event_listener(&self, name: &str, id: ListenerId) {
        if let Some(kind) = LifecycleKind::parse(name) {
            let _ = self.command(BusCommand::RemoveListener { kind, id });
        }
    }

    /// Runs `listener` every time the handshake completes.
    pub fn on_open<F>(&self, mut listener: F) -> ListenerId
    where
        F: FnMut(&EventBus) + Send + 'static,
    {
        self.add_listener(LifecycleKind::Open, Box::new(move |bus, _| listener(bus)))
    }

    /// Runs `listener` every time the transport closes.
    pub fn on_close<F>(&self, mut listener: F) -> ListenerId
    where
        F: FnMut(&EventBus, &CloseInfo) + Send + 'static,
    {
        self.add_listener(
            LifecycleKind::Close,
            Box::new(move |bus, event| {
                if let LifecycleEvent::Close(info) = event {
                    listener(bus, info);
                }
            }),
        )
    }

    fn add_listener(&self, kind: LifecycleKind, listener: Listener) -> ListenerId {
        let id = ListenerId::next();
        if self
            .command(BusCommand::AddListener { kind, id, listener })
            .is_err()
        {
            debug!(%kind, %id, "Listener dropped, event loop stopped");
        }
        id
    }
}

// ============================================================================
// EventBus - Messaging
// ============================================================================

impl EventBus {
    /// Sends a point-to-point message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless the bus is open.
    pub fn send(&self, address: &str, body: Value, headers: Option<Headers>) -> Result<()> {
        self.ensure_open()?;
        self.command(BusCommand::Transmit(OutboundEnvelope::send(
            address, body, headers,
        )))
    }

    /// Publishes a message to every subscriber of `address`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless the bus is open.
    pub fn publish(&self, address: &str, body: Value, headers: Option<Headers>) -> Result<()> {
        self.ensure_open()?;
        self.command(BusCommand::Transmit(OutboundEnvelope::publish(
            address, body, headers,
        )))
    }

    /// Sends a message expecting a reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless the bus is open. The returned
    /// [`PendingReply`] reports reply failures and abandonment.
    pub fn request(
        &self,
        address: &str,
        body: Value,
        headers: Option<Headers>,
    ) -> Result<PendingReply> {
        let (tx, rx) = oneshot::channel();
        let reply_address =
            self.submit_request(address, body, headers, ReplyWaiter::Settlable(tx))?;
        Ok(PendingReply::new(reply_address, rx))
    }

    /// Sends a message expecting a reply, delivered to `callback`.
    ///
    /// The callback runs on the event loop, at most once. It is never called
    /// if the connection drops first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless the bus is open.
    pub fn request_with_callback<F>(
        &self,
        address: &str,
        body: Value,
        headers: Option<Headers>,
        callback: F,
    ) -> Result<ReplyAddress>
    where
        F: FnOnce(std::result::Result<Value, ReplyFailure>) + Send + 'static,
    {
        self.submit_request(
            address,
            body,
            headers,
            ReplyWaiter::Callback(Box::new(callback)),
        )
    }

    /// Sends a message and waits at most `limit` for the reply.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] unless the bus is open
    /// - [`Error::RequestTimeout`] if no reply arrived in time; a late reply
    ///   is then reported as [`Diagnostic::UnknownReply`]
    /// - [`Error::Reply`] or [`Error::ConnectionClosed`] as for
    ///   [`request`](Self::request)
    pub async fn request_timeout(
        &self,
        address: &str,
        body: Value,
        headers: Option<Headers>,
        limit: Duration,
    ) -> Result<Value> {
        let pending = self.request(address, body, headers)?;
        let reply_address = pending.reply_address().clone();

        match timeout(limit, pending).await {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                warn!(%reply_address, address, timeout_ms, "Request timed out");
                let _ = self.command(BusCommand::ForgetReply(reply_address.clone()));
                Err(Error::request_timeout(reply_address, timeout_ms))
            }
        }
    }

    fn submit_request(
        &self,
        address: &str,
        body: Value,
        headers: Option<Headers>,
        waiter: ReplyWaiter,
    ) -> Result<ReplyAddress> {
        self.ensure_open()?;

        let reply_address = ReplyAddress::generate(self.shared.ids.as_ref());
        let envelope = OutboundEnvelope::request(address, body, headers, reply_address.clone());
        self.command(BusCommand::Request {
            envelope,
            reply_address: reply_address.clone(),
            waiter,
        })?;

        Ok(reply_address)
    }
}

// ============================================================================
// EventBus - Consumers
// ============================================================================

impl EventBus {
    /// Registers `handler` for messages on `address`.
    ///
    /// Works in every state: before the handshake the registration is
    /// queued and performed once the bus opens. When a message expects a
    /// reply, the first handler returning `Some` answers it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the event loop has stopped.
    pub fn consumer<F>(&self, address: impl Into<String>, handler: F) -> Result<PendingConsumer>
    where
        F: FnMut(&Message) -> Option<Value> + Send + 'static,
    {
        let address = address.into();
        let (settle, rx) = oneshot::channel();
        self.command(BusCommand::Subscribe {
            address: address.clone(),
            handler: Box::new(handler),
            settle,
        })?;
        Ok(PendingConsumer::new(address, rx))
    }

    /// Removes the consumer `id` from `address`.
    ///
    /// Same as [`Consumer::unregister`](super::Consumer::unregister).
    pub fn unregister_handler(&self, address: &str, id: ConsumerId) {
        let _ = self.command(BusCommand::Unregister {
            address: address.to_string(),
            id,
        });
    }

    /// Closes the bus for good.
    ///
    /// Send-path calls fail from now on; reconnection stops. Redundant calls
    /// are no-ops.
    pub fn close(&self) {
        if self.shared.state.begin_closing() {
            debug!(url = %self.shared.url, "Close requested");
        }
        let _ = self.command(BusCommand::Close);
    }
}

// ============================================================================
// Tests
// ============================================================================
