//! Structured dispatch diagnostics.
//!
//! Anomalies that must not interrupt dispatch (a second handler trying to
//! reply, an envelope nobody can route, ...) are reported as [`Diagnostic`]
//! events instead of errors. Each one is logged through `tracing` at its
//! [`Severity`] and broadcast to every receiver obtained from
//! [`crate::EventBus::diagnostics`].
//!
//! ```no_run
//! # fn example(bus: &ws_eventbus::EventBus) {
//! let mut diagnostics = bus.diagnostics();
//! tokio::spawn(async move {
//!     while let Ok(diagnostic) = diagnostics.recv().await {
//!         eprintln!("[{}] {diagnostic}", diagnostic.code());
//!     }
//! });
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tokio::sync::broadcast;
use tracing::{error, warn};

use crate::bus::ReadyState;
use crate::identifiers::{ReplyAddress, TrackId};

// ============================================================================
// Constants
// ============================================================================

/// Default number of diagnostics buffered per receiver.
pub const DEFAULT_DIAGNOSTICS_CAPACITY: usize = 64;

// ============================================================================
// Severity
// ============================================================================

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Suspicious but expected in some deployments.
    Warning,
    /// Protocol inconsistency.
    Error,
}

// ============================================================================
// Diagnostic
// ============================================================================

/// A non-fatal anomaly observed by the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// More than one consumer returned a reply for the same message.
    /// Only the first reply was sent.
    DuplicateReply {
        /// Address of the message.
        address: String,
    },

    /// A message expected a reply and no consumer returned one.
    MissingReply {
        /// Address of the message.
        address: String,
    },

    /// A message arrived for an address without local consumers.
    NoConsumers {
        /// Address of the message.
        address: String,
    },

    /// A reply arrived for a request that is not pending.
    UnknownReply {
        /// Reply address carried by the envelope.
        reply_address: ReplyAddress,
    },

    /// An acknowledgement arrived for a registration that is not pending.
    UnknownTrack {
        /// Track id carried by the envelope.
        track_id: TrackId,
    },

    /// An envelope carried none of the routing fields.
    Unroutable {
        /// Raw frame.
        frame: String,
    },

    /// A frame could not be decoded.
    MalformedFrame {
        /// Raw frame.
        frame: String,
        /// Decoder error.
        error: String,
    },

    /// A `done` arrived while the bus was already open.
    DuplicateHandshake,

    /// An outbound envelope was dropped because the bus left the open state
    /// after the call was accepted.
    DroppedOutbound {
        /// Envelope type tag.
        kind: &'static str,
        /// State when the envelope reached the event loop.
        state: ReadyState,
    },

    /// The transport refused an outbound frame.
    TransportSendFailed {
        /// Envelope type tag.
        kind: &'static str,
    },

    /// A lifecycle listener was registered for an unknown event name.
    UnknownListenerEvent {
        /// The rejected name.
        name: String,
    },
}

impl Diagnostic {
    /// Returns the severity of this diagnostic.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::UnknownReply { .. }
            | Self::UnknownTrack { .. }
            | Self::Unroutable { .. }
            | Self::MalformedFrame { .. } => Severity::Error,
            Self::DuplicateReply { .. }
            | Self::MissingReply { .. }
            | Self::NoConsumers { .. }
            | Self::DuplicateHandshake
            | Self::DroppedOutbound { .. }
            | Self::TransportSendFailed { .. }
            | Self::UnknownListenerEvent { .. } => Severity::Warning,
        }
    }

    /// Returns a stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateReply { .. } => "duplicate_reply",
            Self::MissingReply { .. } => "missing_reply",
            Self::NoConsumers { .. } => "no_consumers",
            Self::UnknownReply { .. } => "unknown_reply",
            Self::UnknownTrack { .. } => "unknown_track",
            Self::Unroutable { .. } => "unroutable",
            Self::MalformedFrame { .. } => "malformed_frame",
            Self::DuplicateHandshake => "duplicate_handshake",
            Self::DroppedOutbound { .. } => "dropped_outbound",
            Self::TransportSendFailed { .. } => "transport_send_failed",
            Self::UnknownListenerEvent { .. } => "unknown_listener_event",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateReply { address } => {
                write!(f, "message already replied, multiple consumers on '{address}'")
            }
            Self::MissingReply { address } => {
                write!(f, "no consumer replied to message on '{address}'")
            }
            Self::NoConsumers { address } => write!(f, "no consumers for '{address}'"),
            Self::UnknownReply { reply_address } => {
                write!(f, "reply for unknown request '{reply_address}'")
            }
            Self::UnknownTrack { track_id } => {
                write!(f, "ack for unknown registration '{track_id}'")
            }
            Self::Unroutable { frame } => write!(f, "unroutable envelope: {frame}"),
            Self::MalformedFrame { frame, error } => {
                write!(f, "malformed frame ({error}): {frame}")
            }
            Self::DuplicateHandshake => f.write_str("handshake completed twice"),
            Self::DroppedOutbound { kind, state } => {
                write!(f, "dropped '{kind}' envelope, bus is {state}")
            }
            Self::TransportSendFailed { kind } => {
                write!(f, "transport refused '{kind}' envelope")
            }
            Self::UnknownListenerEvent { name } => write!(f, "invalid listener type '{name}'"),
        }
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Fan-out point for diagnostics.
#[derive(Debug, Clone)]
pub(crate) struct Diagnostics {
    tx: broadcast::Sender<Diagnostic>,
}

impl Diagnostics {
    /// Creates a diagnostics channel buffering `capacity` events per receiver.
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns a new receiver.
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<Diagnostic> {
        self.tx.subscribe()
    }

    /// Logs and broadcasts a diagnostic.
    pub(crate) fn emit(&self, diagnostic: Diagnostic) {
        match diagnostic.severity() {
            Severity::Warning => warn!(code = diagnostic.code(), "{diagnostic}"),
            Severity::Error => error!(code = diagnostic.code(), "{diagnostic}"),
        }

        // No receivers is fine.
        let _ = self.tx.send(diagnostic);
    }
}

// ============================================================================
// Tests
// ============================================================================
