//! Awaitable request replies.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::identifiers::ReplyAddress;

use super::broker::ReplyOutcome;

// ============================================================================
// PendingReply
// ============================================================================

/// The reply to a request, once it arrives.
///
/// Dropping it does not cancel the request; a late reply is then discarded.
///
/// # Errors
///
/// - [`Error::Reply`] if the bridge answered with `err: true`
/// - [`Error::ConnectionClosed`] if the connection dropped or the bus closed
///   before the reply arrived
#[derive(Debug)]
#[must_use = "the reply is lost unless awaited"]
pub struct PendingReply {
    reply_address: ReplyAddress,
    rx: oneshot::Receiver<ReplyOutcome>,
}

impl PendingReply {
    pub(crate) fn new(reply_address: ReplyAddress, rx: oneshot::Receiver<ReplyOutcome>) -> Self {
        Self { reply_address, rx }
    }

    /// Returns the reply address of the request.
    #[inline]
    #[must_use]
    pub fn reply_address(&self) -> &ReplyAddress {
        &self.reply_address
    }
}

impl Future for PendingReply {
    type Output = Result<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|settled| match settled {
            Ok(Ok(body)) => Ok(body),
            Ok(Err(failure)) => Err(Error::Reply(failure)),
            Err(_) => Err(Error::ConnectionClosed),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
