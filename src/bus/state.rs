//! Connection state shared between the event loop and bus handles.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::identifiers::SessionId;

// ============================================================================
// ReadyState
// ============================================================================

/// Lifecycle state of the bus connection.
///
/// `Open` is reached only after the bridge sends `done`; an open transport
/// alone leaves the bus in `Connecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ReadyState {
    /// Transport connecting, or connected and awaiting the handshake.
    #[default]
    Connecting = 0,
    /// Handshake complete; sends are accepted.
    Open = 1,
    /// Explicit close in progress.
    Closing = 2,
    /// Transport gone. Reconnects unless closed explicitly.
    Closed = 3,
}

impl ReadyState {
    /// Returns `true` if the bus accepts `send`, `request` and `publish`.
    #[inline]
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "CONNECTING",
            Self::Open => "OPEN",
            Self::Closing => "CLOSING",
            Self::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

// ============================================================================
// StateCell
// ============================================================================

/// Atomic [`ReadyState`] readable from any handle.
///
/// Only the event loop moves the state forward, except for the
/// `Connecting`/`Open` to `Closing` step taken by `close()` so that later
/// sends fail synchronously.
#[derive(Debug, Default)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    #[inline]
    pub(crate) fn get(&self) -> ReadyState {
        ReadyState::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn set(&self, state: ReadyState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Moves `Connecting` or `Open` to `Closing`. Returns `false` otherwise.
    pub(crate) fn begin_closing(&self) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                match ReadyState::from_u8(current) {
                    ReadyState::Connecting | ReadyState::Open => {
                        Some(ReadyState::Closing as u8)
                    }
                    ReadyState::Closing | ReadyState::Closed => None,
                }
            })
            .is_ok()
    }
}

// ============================================================================
// BusStats
// ============================================================================

/// Snapshot of the event loop tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Current state.
    pub state: ReadyState,
    /// Current transport session.
    pub session: SessionId,
    /// Addresses with at least one consumer.
    pub addresses: usize,
    /// Consumer registrations across all addresses.
    pub consumers: usize,
    /// Requests awaiting a reply.
    pub pending_replies: usize,
    /// Registrations awaiting acknowledgement.
    pub pending_tracks: usize,
    /// Consumers queued until the handshake completes.
    pub lazy_consumers: usize,
    /// Open and close listeners.
    pub listeners: usize,
    /// A reconnect is scheduled.
    pub reconnect_pending: bool,
}

// ============================================================================
// Tests
// ============================================================================
