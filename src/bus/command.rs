//! Commands from bus handles to the event loop.

use std::fmt;

use tokio::sync::oneshot;

use crate::identifiers::{ConsumerId, ListenerId, ReplyAddress};
use crate::protocol::OutboundEnvelope;

use super::broker::ReplyWaiter;
use super::consumer::{Consumer, MessageHandler};
use super::listeners::{LifecycleKind, Listener};
use super::state::BusStats;

/// Internal commands for the event loop.
pub(crate) enum BusCommand {
    /// Transmit a `send` or `publish` if still open.
    Transmit(OutboundEnvelope),
    /// Store a reply waiter and transmit the request if still open.
    Request {
        envelope: OutboundEnvelope,
        reply_address: ReplyAddress,
        waiter: ReplyWaiter,
    },
    /// Register a consumer, or queue it until the handshake.
    Subscribe {
        address: String,
        handler: MessageHandler,
        settle: oneshot::Sender<Consumer>,
    },
    /// Remove a consumer registration.
    Unregister { address: String, id: ConsumerId },
    /// Drop a reply waiter whose caller stopped waiting.
    ForgetReply(ReplyAddress),
    /// Add a lifecycle listener.
    AddListener {
        kind: LifecycleKind,
        id: ListenerId,
        listener: Listener,
    },
    /// Remove a lifecycle listener.
    RemoveListener { kind: LifecycleKind, id: ListenerId },
    /// Close for good.
    Close,
    /// Report table sizes.
    Stats(oneshot::Sender<BusStats>),
}

impl fmt::Debug for BusCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transmit(envelope) => f.debug_tuple("Transmit").field(envelope).finish(),
            Self::Request { reply_address, .. } => f
                .debug_struct("Request")
                .field("reply_address", reply_address)
                .finish_non_exhaustive(),
            Self::Subscribe { address, .. } => f
                .debug_struct("Subscribe")
                .field("address", address)
                .finish_non_exhaustive(),
            Self::Unregister { address, id } => f
                .debug_struct("Unregister")
                .field("address", address)
                .field("id", id)
                .finish(),
            Self::ForgetReply(reply_address) => {
                f.debug_tuple("ForgetReply").field(reply_address).finish()
            }
            Self::AddListener { kind, id, .. } => f
                .debug_struct("AddListener")
                .field("kind", kind)
                .field("id", id)
                .finish_non_exhaustive(),
            Self::RemoveListener { kind, id } => f
                .debug_struct("RemoveListener")
                .field("kind", kind)
                .field("id", id)
                .finish(),
            Self::Close => f.write_str("Close"),
            Self::Stats(_) => f.write_str("Stats"),
        }
    }
}
