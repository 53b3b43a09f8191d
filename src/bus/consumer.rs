//! Consumer handles.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};
use crate::identifiers::ConsumerId;
use crate::protocol::Message;

use super::command::BusCommand;

// ============================================================================
// Types
// ============================================================================

/// Consumer callback.
///
/// Invoked on the event loop for each message on the address. When the
/// message expects a reply, the first consumer returning `Some` answers it.
pub type MessageHandler = Box<dyn FnMut(&Message) -> Option<Value> + Send>;

// ============================================================================
// Consumer
// ============================================================================

/// A registered consumer.
///
/// Holding the handle does not keep the bus alive.
#[derive(Clone)]
pub struct Consumer {
    address: String,
    id: ConsumerId,
    commands: mpsc::WeakUnboundedSender<BusCommand>,
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("address", &self.address)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl Consumer {
    pub(crate) fn new(
        address: String,
        id: ConsumerId,
        commands: mpsc::WeakUnboundedSender<BusCommand>,
    ) -> Self {
        Self {
            address,
            id,
            commands,
        }
    }

    /// Returns the consumed address.
    #[inline]
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the registration id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConsumerId {
        self.id
    }

    /// Removes this registration.
    ///
    /// Idempotent. Sends `unRegister` when the address has no consumers
    /// left and the bus is open.
    pub fn unregister(&self) {
        if let Some(commands) = self.commands.upgrade() {
            let _ = commands.send(BusCommand::Unregister {
                address: self.address.clone(),
                id: self.id,
            });
        }
    }
}

// ============================================================================
// PendingConsumer
// ============================================================================

/// A consumer registration that has not settled yet.
///
/// Resolves once the bridge acknowledged the registration (first consumer
/// on an address), immediately (further consumers) or after the handshake
/// (consumers requested before the bus was open).
///
/// # Errors
///
/// Resolves to [`Error::ConnectionClosed`] if the connection dropped or the
/// bus closed before the registration settled.
#[derive(Debug)]
#[must_use = "the consumer is registered even if this is dropped, but its handle is lost"]
pub struct PendingConsumer {
    address: String,
    rx: oneshot::Receiver<Consumer>,
}

impl PendingConsumer {
    pub(crate) fn new(address: String, rx: oneshot::Receiver<Consumer>) -> Self {
        Self { address, rx }
    }

    /// Returns the requested address.
    #[inline]
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Future for PendingConsumer {
    type Output = Result<Consumer>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|settled| settled.map_err(|_| Error::ConnectionClosed))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio_test::{assert_pending, assert_ready_err, assert_ready_ok, task};

    #[test]
    fn test_pending_until_settled() {
        let (tx, rx) = oneshot::channel();
        let (commands, _rx) = mpsc::unbounded_channel::<BusCommand>();
        let mut pending = task::spawn(PendingConsumer::new("a.b".into(), rx));

        assert_pending!(pending.poll());

        let consumer = Consumer::new("a.b".into(), ConsumerId::next(), commands.downgrade());
        tx.send(consumer).expect("settle");

        assert!(pending.is_woken());
        let consumer = assert_ready_ok!(pending.poll());
        assert_eq!(consumer.address(), "a.b");
    }

    #[test]
    fn test_abandoned_registration() {
        let (tx, rx) = oneshot::channel::<Consumer>();
        let mut pending = task::spawn(PendingConsumer::new("a.b".into(), rx));

        drop(tx);

        let err = assert_ready_err!(pending.poll());
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_unregister_sends_command() {
        let (commands, mut rx) = mpsc::unbounded_channel::<BusCommand>();
        let id = ConsumerId::next();
        let consumer = Consumer::new("a.b".into(), id, commands.downgrade());

        consumer.unregister();

        match rx.recv().await {
            Some(BusCommand::Unregister { address, id: sent }) => {
                assert_eq!(address, "a.b");
                assert_eq!(sent, id);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_unregister_after_bus_dropped_is_noop() {
        let (commands, rx) = mpsc::unbounded_channel::<BusCommand>();
        let consumer = Consumer::new("a.b".into(), ConsumerId::next(), commands.downgrade());
        drop(commands);
        drop(rx);

        consumer.unregister();
    }
}
