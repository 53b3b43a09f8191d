//! The bus event loop.
//!
//! One tokio task owns every mutable table of a bus and processes its
//! inputs one at a time:
//!
//! | Input | Source |
//! |-------|--------|
//! | [`BusCommand`] | `EventBus` handles and `Consumer::unregister` |
//! | [`TransportEvent`] | the current transport, tagged with its session |
//! | heartbeat tick | armed while open |
//! | reconnect timer | armed after an unexpected close |
//!
//! Handlers and listeners run on this task and must not block.
//!
//! # State Machine
//!
//! ```text
//!            done                 close()
//! CONNECTING ────► OPEN ─────────────────► CLOSING
//!     ▲             │                         │
//!     │ delay       │ transport closed        │ transport closed
//!     │             ▼                         ▼
//!     └──────── CLOSED ◄──────────────────────┘ (terminal)
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep, interval_at, sleep};
use tracing::{debug, error, info, trace};

use crate::diagnostics::Diagnostic;
use crate::identifiers::{ConsumerId, SessionId, TrackId};
use crate::protocol::{Message, OutboundEnvelope, Route, codec};
use crate::transport::connector::TaggedEvent;
use crate::transport::{CloseInfo, Connector, EventSink, TransportEvent, TransportHandle};

use super::broker::{ReplyTable, TrackTable, TrackWaiter};
use super::builder::ResubscribePolicy;
use super::command::BusCommand;
use super::consumer::{Consumer, MessageHandler};
use super::core::{EventBus, Shared};
use super::listeners::{LifecycleEvent, Listeners};
use super::registry::{LazyQueue, LazyRequest, Registration, Removal, SubscriptionRegistry};
use super::router;
use super::state::{BusStats, ReadyState};

// ============================================================================
// LoopSettings
// ============================================================================

/// Validated configuration handed over by the builder.
pub(crate) struct LoopSettings {
    pub(crate) heartbeat_interval: Duration,
    pub(crate) reconnect_delay: Duration,
    pub(crate) resubscribe: ResubscribePolicy,
    pub(crate) connector: Arc<dyn Connector>,
}

// ============================================================================
// EventLoop
// ============================================================================

/// What woke the loop up.
enum Wake {
    Command(Option<BusCommand>),
    Transport(SessionId, TransportEvent),
    Heartbeat,
    Reconnect,
}

/// State owned by the event loop task.
pub(crate) struct EventLoop {
    settings: LoopSettings,
    shared: Arc<Shared>,

    commands: mpsc::UnboundedReceiver<BusCommand>,
    handle: mpsc::WeakUnboundedSender<BusCommand>,
    events_tx: mpsc::UnboundedSender<TaggedEvent>,
    events_rx: mpsc::UnboundedReceiver<TaggedEvent>,

    session: SessionId,
    transport: Option<TransportHandle>,
    explicit_close: bool,
    heartbeat: Option<Interval>,
    reconnect: Option<Pin<Box<Sleep>>>,

    registry: SubscriptionRegistry,
    replies: ReplyTable,
    tracks: TrackTable,
    lazy: LazyQueue,
    listeners: Listeners,
}

impl EventLoop {
    pub(crate) fn new(
        settings: LoopSettings,
        shared: Arc<Shared>,
        commands: mpsc::UnboundedReceiver<BusCommand>,
        handle: mpsc::WeakUnboundedSender<BusCommand>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            settings,
            shared,
            commands,
            handle,
            events_tx,
            events_rx,
            session: SessionId::default(),
            transport: None,
            explicit_close: false,
            heartbeat: None,
            reconnect: None,
            registry: SubscriptionRegistry::default(),
            replies: ReplyTable::default(),
            tracks: TrackTable::default(),
            lazy: LazyQueue::default(),
            listeners: Listeners::default(),
        }
    }

    /// Runs until the bus is closed for good or every handle is dropped.
    pub(crate) async fn run(mut self) {
        self.start_session();

        loop {
            let wake = tokio::select! {
                // Transport events first so state changes are seen before
                // commands queued behind them.
                biased;

                Some((session, event)) = self.events_rx.recv() => Wake::Transport(session, event),
                command = self.commands.recv() => Wake::Command(command),
                _ = heartbeat_tick(&mut self.heartbeat) => Wake::Heartbeat,
                _ = reconnect_due(&mut self.reconnect) => Wake::Reconnect,
            };

            match wake {
                Wake::Transport(session, event) => self.on_transport_event(session, event),
                Wake::Command(Some(command)) => self.on_command(command),
                Wake::Command(None) => {
                    self.release();
                    break;
                }
                Wake::Heartbeat => self.on_heartbeat(),
                Wake::Reconnect => {
                    self.reconnect = None;
                    info!(url = %self.shared.url, "Reconnecting");
                    self.start_session();
                }
            }

            if self.is_finished() {
                break;
            }
        }

        debug!(session = %self.session, "Event loop terminated");
    }

    #[inline]
    fn is_finished(&self) -> bool {
        self.explicit_close && self.state() == ReadyState::Closed
    }

    #[inline]
    fn state(&self) -> ReadyState {
        self.shared.state.get()
    }

    #[inline]
    fn emit(&self, diagnostic: Diagnostic) {
        self.shared.diagnostics.emit(diagnostic);
    }

    /// Opens a new transport for the next session.
    fn start_session(&mut self) {
        self.session = self.session.next();

        // A pending close() keeps its Closing state.
        if self.state() != ReadyState::Closing {
            self.shared.state.set(ReadyState::Connecting);
        }

        debug!(session = %self.session, url = %self.shared.url, "Connecting");
        let sink = EventSink::new(self.session, self.events_tx.clone());
        self.transport = Some(self.settings.connector.connect(&self.shared.url, sink));
    }

    /// All handles are gone; nobody can observe the bus any more.
    fn release(&mut self) {
        debug!(session = %self.session, "All bus handles dropped");

        if let Some(transport) = self.transport.take() {
            transport.close();
        }
        self.heartbeat = None;
        self.reconnect = None;
        self.shared.state.set(ReadyState::Closed);
    }

    fn bus_handle(&self) -> Option<EventBus> {
        self.handle
            .upgrade()
            .map(|commands| EventBus::from_parts(commands, Arc::clone(&self.shared)))
    }

    fn notify(&mut self, event: LifecycleEvent) {
        if let Some(bus) = self.bus_handle() {
            self.listeners.notify(&bus, &event);
        }
    }

    // ========================================================================
    // Transport
    // ========================================================================

    fn on_transport_event(&mut self, session: SessionId, event: TransportEvent) {
        if session != self.session {
            trace!(%session, current = %self.session, "Event from stale session dropped");
            return;
        }

        match event {
            TransportEvent::Opened => {
                debug!(%session, "Transport open, awaiting handshake");
            }
            TransportEvent::Message(text) => self.on_frame(text),
            TransportEvent::Closed(info) => self.on_closed(info),
        }
    }

    fn on_closed(&mut self, info: CloseInfo) {
        match self.state() {
            ReadyState::Closed => return,
            ReadyState::Closing => self.explicit_close = true,
            ReadyState::Connecting | ReadyState::Open => {}
        }

        self.shared.state.set(ReadyState::Closed);
        self.heartbeat = None;
        self.transport = None;

        info!(
            session = %self.session,
            code = ?info.code,
            reason = %info.reason,
            "Transport closed"
        );

        self.notify(LifecycleEvent::Close(info));

        let replay =
            !self.explicit_close && self.settings.resubscribe == ResubscribePolicy::ReplayAll;

        let replies = self.replies.clear();
        let tracks = if replay {
            // Kept registrations are replayed, so their handles are released.
            let waiters = self.tracks.take_all();
            let count = waiters.len();
            waiters.into_iter().for_each(TrackWaiter::keep);
            debug!(count, "Released unacknowledged registrations");
            0
        } else {
            self.tracks.clear()
        };
        if replies > 0 || tracks > 0 {
            debug!(replies, tracks, "Abandoned pending waiters");
        }

        if !replay {
            self.registry.clear();
        }

        if self.explicit_close {
            self.lazy.clear();
            self.listeners.clear();
        } else {
            debug!(delay = ?self.settings.reconnect_delay, "Reconnect scheduled");
            self.reconnect = Some(Box::pin(sleep(self.settings.reconnect_delay)));
        }
    }

    fn on_frame(&mut self, text: String) {
        let envelope = match codec::decode(&text) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.emit(Diagnostic::MalformedFrame {
                    frame: text,
                    error: e.to_string(),
                });
                return;
            }
        };

        match envelope.route() {
            Route::Pong => trace!(session = %self.session, "Pong"),

            Route::Done => self.on_handshake(),

            Route::Deliver(message) => self.deliver(message),

            Route::Reply {
                reply_address,
                outcome,
            } => match self.replies.take(&reply_address) {
                Some(waiter) => {
                    trace!(%reply_address, ok = outcome.is_ok(), "Reply received");
                    waiter.settle(outcome);
                }
                None => self.emit(Diagnostic::UnknownReply { reply_address }),
            },

            Route::TrackAck { track_id } => match self.tracks.take(&track_id) {
                Some(waiter) => waiter.settle(),
                None => self.emit(Diagnostic::UnknownTrack { track_id }),
            },

            Route::Unroutable => self.emit(Diagnostic::Unroutable { frame: text }),
        }
    }

    fn on_handshake(&mut self) {
        match self.state() {
            ReadyState::Connecting => {}
            ReadyState::Open => {
                self.emit(Diagnostic::DuplicateHandshake);
                return;
            }
            ReadyState::Closing | ReadyState::Closed => {
                debug!(session = %self.session, "Handshake ignored while closing");
                return;
            }
        }

        self.shared.state.set(ReadyState::Open);
        info!(session = %self.session, url = %self.shared.url, "Event bus open");

        self.heartbeat = Some(heartbeat(self.settings.heartbeat_interval));
        self.notify(LifecycleEvent::Open);

        // Empty unless the policy kept registrations across the close.
        for address in self.registry.addresses() {
            let track_id = TrackId::generate(self.shared.ids.as_ref());
            debug!(%address, %track_id, "Re-registering");
            self.tracks.insert(
                track_id.clone(),
                TrackWaiter::Replay {
                    address: address.clone(),
                },
            );
            self.transmit(&OutboundEnvelope::register(address, track_id));
        }

        let queued = self.lazy.take_all();
        if !queued.is_empty() {
            debug!(count = queued.len(), "Registering queued consumers");
        }
        for request in queued {
            self.subscribe(request.address, request.handler, request.settle);
        }
    }

    fn deliver(&mut self, message: Message) {
        let delivery = match self.registry.consumers_mut(&message.address) {
            Some(registrations) => router::dispatch(registrations, &message),
            None => {
                self.emit(Diagnostic::NoConsumers {
                    address: message.address,
                });
                return;
            }
        };
        trace!(
            address = %message.address,
            consumers = delivery.consumers,
            "Message delivered"
        );

        for _ in 0..delivery.suppressed {
            self.emit(Diagnostic::DuplicateReply {
                address: message.address.clone(),
            });
        }

        let Some(reply_address) = message.reply_address else {
            return;
        };
        match delivery.reply {
            Some(body) => {
                if self.require_open("send") {
                    self.transmit(&OutboundEnvelope::reply(&reply_address, body));
                }
            }
            None => self.emit(Diagnostic::MissingReply {
                address: message.address,
            }),
        }
    }

    fn on_heartbeat(&mut self) {
        if self.state().is_open() {
            self.transmit(&OutboundEnvelope::Ping);
        }
    }

    /// Encodes and writes one envelope to the current transport.
    fn transmit(&self, envelope: &OutboundEnvelope) {
        let kind = envelope.kind();
        let Some(transport) = self.transport.as_ref() else {
            self.emit(Diagnostic::TransportSendFailed { kind });
            return;
        };

        let text = match codec::encode(envelope) {
            Ok(text) => text,
            Err(e) => {
                error!(kind, error = %e, "Failed to encode envelope");
                return;
            }
        };

        trace!(kind, address = envelope.address(), "Transmitting");
        if transport.send_text(text).is_err() {
            self.emit(Diagnostic::TransportSendFailed { kind });
        }
    }

    /// Returns `true` if the bus is open, reporting the drop otherwise.
    fn require_open(&self, kind: &'static str) -> bool {
        let state = self.state();
        if state.is_open() {
            return true;
        }
        self.emit(Diagnostic::DroppedOutbound { kind, state });
        false
    }

    // ========================================================================
    // Commands
    // ========================================================================

    fn on_command(&mut self, command: BusCommand) {
        match command {
            BusCommand::Transmit(envelope) => {
                if self.require_open(envelope.kind()) {
                    self.transmit(&envelope);
                }
            }

            BusCommand::Request {
                envelope,
                reply_address,
                waiter,
            } => {
                // Dropping the waiter abandons the request.
                if self.require_open(envelope.kind()) {
                    self.replies.insert(reply_address, waiter);
                    self.transmit(&envelope);
                }
            }

            BusCommand::Subscribe {
                address,
                handler,
                settle,
            } => self.subscribe(address, handler, settle),

            BusCommand::Unregister { address, id } => self.unregister(&address, id),

            BusCommand::ForgetReply(reply_address) => {
                if self.replies.take(&reply_address).is_some() {
                    debug!(%reply_address, "Removed timed-out reply waiter");
                }
            }

            BusCommand::AddListener { kind, id, listener } => {
                if !self.explicit_close {
                    self.listeners.add(kind, id, listener);
                }
            }

            BusCommand::RemoveListener { kind, id } => {
                self.listeners.remove(kind, id);
            }

            BusCommand::Close => self.on_close_command(),

            BusCommand::Stats(tx) => {
                let _ = tx.send(self.stats());
            }
        }
    }

    fn subscribe(
        &mut self,
        address: String,
        handler: MessageHandler,
        settle: oneshot::Sender<Consumer>,
    ) {
        if self.explicit_close {
            debug!(%address, "Consumer dropped, bus closed");
            return;
        }

        if !self.state().is_open() {
            debug!(%address, "Consumer queued until handshake");
            self.lazy.push(LazyRequest {
                address,
                handler,
                settle,
            });
            return;
        }

        let id = ConsumerId::next();
        let consumer = Consumer::new(address.clone(), id, self.handle.clone());

        if self.registry.add(&address, Registration::new(id, handler)) {
            let track_id = TrackId::generate(self.shared.ids.as_ref());
            debug!(%address, %track_id, "Registering address");
            self.tracks
                .insert(track_id.clone(), TrackWaiter::Consumer { consumer, settle });
            self.transmit(&OutboundEnvelope::register(address, track_id));
        } else {
            debug!(%address, %id, "Consumer added");
            let _ = settle.send(consumer);
        }
    }

    fn unregister(&mut self, address: &str, id: ConsumerId) {
        match self.registry.remove(address, id) {
            Removal::LastRemoved => {
                debug!(%address, %id, "Last consumer removed");
                if self.state().is_open() {
                    self.transmit(&OutboundEnvelope::unregister(address));
                }
            }
            Removal::Removed => debug!(%address, %id, "Consumer removed"),
            Removal::Absent => trace!(%address, %id, "Consumer already removed"),
        }
    }

    fn on_close_command(&mut self) {
        if self.explicit_close {
            return;
        }
        self.explicit_close = true;
        self.lazy.clear();

        match self.transport.as_ref() {
            Some(transport) => {
                info!(session = %self.session, "Closing event bus");
                self.shared.state.set(ReadyState::Closing);
                self.heartbeat = None;
                transport.close();
            }
            None => {
                info!("Closing event bus, reconnect cancelled");
                self.reconnect = None;
                self.shared.state.set(ReadyState::Closed);
                self.registry.clear();
                self.replies.clear();
                self.tracks.clear();
                self.listeners.clear();
            }
        }
    }

    fn stats(&self) -> BusStats {
        BusStats {
            state: self.state(),
            session: self.session,
            addresses: self.registry.address_count(),
            consumers: self.registry.consumer_count(),
            pending_replies: self.replies.len(),
            pending_tracks: self.tracks.len(),
            lazy_consumers: self.lazy.len(),
            listeners: self.listeners.len(),
            reconnect_pending: self.reconnect.is_some(),
        }
    }
}

// ============================================================================
// Timers
// ============================================================================

/// Heartbeat firing one period after the handshake, then every period.
fn heartbeat(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn heartbeat_tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending().await,
    }
}

async fn reconnect_due(reconnect: &mut Option<Pin<Box<Sleep>>>) {
    match reconnect {
        Some(sleep) => sleep.as_mut().await,
        None => pending().await,
    }
}
