//! Reply and registration-ack correlation tables.
//!
//! Both tables are per transport session: the event loop clears them when
//! the transport closes, which abandons every waiter still in them.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::result::Result as StdResult;

use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::error::ReplyFailure;
use crate::identifiers::{ReplyAddress, TrackId};

use super::consumer::Consumer;

// ============================================================================
// Types
// ============================================================================

/// Outcome delivered to a reply waiter.
pub type ReplyOutcome = StdResult<Value, ReplyFailure>;

/// Callback form of a reply waiter.
pub(crate) type ReplyCallback = Box<dyn FnOnce(ReplyOutcome) + Send>;

// ============================================================================
// ReplyWaiter
// ============================================================================

/// One-shot recipient of a reply.
pub(crate) enum ReplyWaiter {
    /// Invoked on the event loop with the outcome.
    Callback(ReplyCallback),
    /// Completes a [`super::PendingReply`].
    Settlable(oneshot::Sender<ReplyOutcome>),
}

impl ReplyWaiter {
    /// Delivers the outcome, consuming the waiter.
    pub(crate) fn settle(self, outcome: ReplyOutcome) {
        match self {
            Self::Callback(callback) => callback(outcome),
            Self::Settlable(tx) => {
                // The caller may have stopped waiting.
                let _ = tx.send(outcome);
            }
        }
    }
}

impl fmt::Debug for ReplyWaiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callback(_) => f.write_str("ReplyWaiter::Callback"),
            Self::Settlable(_) => f.write_str("ReplyWaiter::Settlable"),
        }
    }
}

// ============================================================================
// ReplyTable
// ============================================================================

/// Outstanding requests keyed by reply address.
#[derive(Debug, Default)]
pub(crate) struct ReplyTable {
    waiters: FxHashMap<ReplyAddress, ReplyWaiter>,
}

impl ReplyTable {
    pub(crate) fn insert(&mut self, reply_address: ReplyAddress, waiter: ReplyWaiter) {
        self.waiters.insert(reply_address, waiter);
    }

    /// Removes and returns the waiter for `reply_address`.
    pub(crate) fn take(&mut self, reply_address: &ReplyAddress) -> Option<ReplyWaiter> {
        self.waiters.remove(reply_address)
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.waiters.len()
    }

    /// Abandons every waiter. Returns how many there were.
    pub(crate) fn clear(&mut self) -> usize {
        let count = self.waiters.len();
        self.waiters.clear();
        count
    }
}

// ============================================================================
// TrackWaiter
// ============================================================================

/// Recipient of a registration acknowledgement.
#[derive(Debug)]
pub(crate) enum TrackWaiter {
    /// First consumer on an address; its handle is released on ack.
    Consumer {
        consumer: Consumer,
        settle: oneshot::Sender<Consumer>,
    },
    /// Address re-registered after a reconnect; nobody waits.
    Replay { address: String },
}

impl TrackWaiter {
    pub(crate) fn settle(self) {
        match self {
            Self::Consumer { consumer, settle } => {
                debug!(address = consumer.address(), "Registration acknowledged");
                let _ = settle.send(consumer);
            }
            Self::Replay { address } => {
                debug!(%address, "Re-registration acknowledged");
            }
        }
    }

    /// Releases the waiter without an ack; the registration is kept for
    /// replay on the next handshake.
    pub(crate) fn keep(self) {
        match self {
            Self::Consumer { consumer, settle } => {
                debug!(address = consumer.address(), "Unacknowledged registration kept");
                let _ = settle.send(consumer);
            }
            Self::Replay { address } => {
                trace!(%address, "Unacknowledged re-registration kept");
            }
        }
    }
}

// ============================================================================
// TrackTable
// ============================================================================

/// Registrations awaiting acknowledgement keyed by track id.
#[derive(Debug, Default)]
pub(crate) struct TrackTable {
    waiters: FxHashMap<TrackId, TrackWaiter>,
}

impl TrackTable {
    pub(crate) fn insert(&mut self, track_id: TrackId, waiter: TrackWaiter) {
        self.waiters.insert(track_id, waiter);
    }

    /// Removes and returns the waiter for `track_id`.
    pub(crate) fn take(&mut self, track_id: &TrackId) -> Option<TrackWaiter> {
        self.waiters.remove(track_id)
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.waiters.len()
    }

    /// Abandons every waiter. Returns how many there were.
    pub(crate) fn clear(&mut self) -> usize {
        let count = self.waiters.len();
        self.waiters.clear();
        count
    }

    /// Empties the table, returning every waiter.
    pub(crate) fn take_all(&mut self) -> Vec<TrackWaiter> {
        self.waiters.drain().map(|(_, waiter)| waiter).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
