//! Consumer registrations and the pre-handshake queue.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::mem;

use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::identifiers::ConsumerId;
use crate::protocol::Message;

use super::consumer::{Consumer, MessageHandler};

// ============================================================================
// Registration
// ============================================================================

/// One consumer on one address.
pub(crate) struct Registration {
    pub(crate) id: ConsumerId,
    handler: MessageHandler,
}

impl Registration {
    pub(crate) fn new(id: ConsumerId, handler: MessageHandler) -> Self {
        Self { id, handler }
    }

    /// Runs the handler.
    #[inline]
    pub(crate) fn invoke(&mut self, message: &Message) -> Option<Value> {
        (self.handler)(message)
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Removal
// ============================================================================

/// Outcome of [`SubscriptionRegistry::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Removal {
    /// No such registration.
    Absent,
    /// Removed; the address still has consumers.
    Removed,
    /// Removed the last consumer; the address is gone.
    LastRemoved,
}

// ============================================================================
// SubscriptionRegistry
// ============================================================================

/// Consumers per address, in registration order.
#[derive(Debug, Default)]
pub(crate) struct SubscriptionRegistry {
    addresses: FxHashMap<String, Vec<Registration>>,
}

impl SubscriptionRegistry {
    /// Appends a registration. Returns `true` if it is the first on the
    /// address.
    pub(crate) fn add(&mut self, address: &str, registration: Registration) -> bool {
        match self.addresses.get_mut(address) {
            Some(registrations) => {
                registrations.push(registration);
                false
            }
            None => {
                self.addresses
                    .insert(address.to_string(), vec![registration]);
                true
            }
        }
    }

    /// Removes the registration `id` from `address`.
    pub(crate) fn remove(&mut self, address: &str, id: ConsumerId) -> Removal {
        let Some(registrations) = self.addresses.get_mut(address) else {
            return Removal::Absent;
        };
        let Some(index) = registrations.iter().position(|r| r.id == id) else {
            return Removal::Absent;
        };

        registrations.remove(index);
        if registrations.is_empty() {
            self.addresses.remove(address);
            Removal::LastRemoved
        } else {
            Removal::Removed
        }
    }

    /// Returns the registrations on `address`.
    pub(crate) fn consumers_mut(&mut self, address: &str) -> Option<&mut [Registration]> {
        self.addresses.get_mut(address).map(Vec::as_mut_slice)
    }

    /// Returns every address, sorted.
    pub(crate) fn addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self.addresses.keys().cloned().collect();
        addresses.sort_unstable();
        addresses
    }

    #[inline]
    pub(crate) fn address_count(&self) -> usize {
        self.addresses.len()
    }

    pub(crate) fn consumer_count(&self) -> usize {
        self.addresses.values().map(Vec::len).sum()
    }

    pub(crate) fn clear(&mut self) {
        self.addresses.clear();
    }
}

// ============================================================================
// LazyQueue
// ============================================================================

/// A consumer requested before the handshake.
pub(crate) struct LazyRequest {
    pub(crate) address: String,
    pub(crate) handler: MessageHandler,
    pub(crate) settle: oneshot::Sender<Consumer>,
}

impl fmt::Debug for LazyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyRequest")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// FIFO of [`LazyRequest`]s drained on the next handshake.
#[derive(Debug, Default)]
pub(crate) struct LazyQueue {
    requests: VecDeque<LazyRequest>,
}

impl LazyQueue {
    pub(crate) fn push(&mut self, request: LazyRequest) {
        self.requests.push_back(request);
    }

    /// Empties the queue, returning its entries oldest first.
    pub(crate) fn take_all(&mut self) -> VecDeque<LazyRequest> {
        mem::take(&mut self.requests)
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.requests.len()
    }

    pub(crate) fn clear(&mut self) {
        self.requests.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================
