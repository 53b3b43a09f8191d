//! Transport abstraction consumed by the event loop.
//!
//! A [`Connector`] turns a URL into a live text-frame transport. It reports
//! what happens on the transport through an [`EventSink`] (open, message,
//! close) and accepts outbound frames through the returned
//! [`TransportHandle`]. Connecting must not block: the connector starts the
//! work and reports the outcome later, exactly like a browser `WebSocket`.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::SessionId;

// ============================================================================
// Types
// ============================================================================

/// Transport event tagged with the session that produced it.
pub(crate) type TaggedEvent = (SessionId, TransportEvent);

// ============================================================================
// TransportEvent
// ============================================================================

/// Something that happened on a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The transport is connected. The bus still waits for `done`.
    Opened,
    /// A text frame arrived.
    Message(String),
    /// The transport is gone, or never connected.
    Closed(CloseInfo),
}

// ============================================================================
// CloseInfo
// ============================================================================

/// Why a transport closed.
///
/// Handed to close listeners.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseInfo {
    /// Close code, when the peer sent one.
    pub code: Option<u16>,
    /// Close reason or local error description.
    pub reason: String,
}

impl CloseInfo {
    /// Creates close info.
    #[inline]
    #[must_use]
    pub fn new(code: Option<u16>, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Creates close info for a transport that failed without a close frame.
    #[inline]
    #[must_use]
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self::new(None, reason)
    }
}

// ============================================================================
// EventSink
// ============================================================================

/// Reports transport events to the bus that requested the connection.
///
/// Every method returns `false` once the bus no longer listens; the
/// transport should then shut down.
#[derive(Debug, Clone)]
pub struct EventSink {
    session: SessionId,
    tx: mpsc::UnboundedSender<TaggedEvent>,
}

impl EventSink {
    pub(crate) fn new(session: SessionId, tx: mpsc::UnboundedSender<TaggedEvent>) -> Self {
        Self { session, tx }
    }

    /// Returns the session this sink reports for.
    #[inline]
    #[must_use]
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Reports that the transport connected.
    pub fn opened(&self) -> bool {
        self.emit(TransportEvent::Opened)
    }

    /// Reports an inbound text frame.
    pub fn message(&self, text: impl Into<String>) -> bool {
        self.emit(TransportEvent::Message(text.into()))
    }

    /// Reports that the transport closed.
    pub fn closed(&self, info: CloseInfo) -> bool {
        self.emit(TransportEvent::Closed(info))
    }

    fn emit(&self, event: TransportEvent) -> bool {
        self.tx.send((self.session, event)).is_ok()
    }
}

// ============================================================================
// TransportCommand
// ============================================================================

/// Instruction from the bus to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    /// Send a text frame.
    Text(String),
    /// Close the transport. The transport answers with
    /// [`EventSink::closed`].
    Close,
}

// ============================================================================
// TransportHandle
// ============================================================================

/// The bus side of a transport.
///
/// Dropping the handle tells the transport to shut down silently; the bus
/// does this when it abandons a session.
#[derive(Debug, Clone)]
pub struct TransportHandle {
    tx: mpsc::UnboundedSender<TransportCommand>,
}

impl TransportHandle {
    /// Creates a handle and the receiver the transport reads commands from.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TransportCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queues a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the transport is gone.
    pub(crate) fn send_text(&self, text: String) -> Result<()> {
        self.tx
            .send(TransportCommand::Text(text))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Requests the transport to close.
    pub(crate) fn close(&self) {
        let _ = self.tx.send(TransportCommand::Close);
    }
}

// ============================================================================
// Connector
// ============================================================================

/// Opens transports for the bus.
///
/// Called once per connection attempt, from within the tokio runtime.
pub trait Connector: Send + Sync + 'static {
    /// Starts connecting to `url`, reporting progress through `sink`.
    fn connect(&self, url: &Url, sink: EventSink) -> TransportHandle;
}

// ============================================================================
// Tests
// ============================================================================
