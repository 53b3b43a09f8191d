//! Envelopes sent from the client to the bus bridge.
//!
//! # Format
//!
//! ```json
//! {"type": "send", "address": "svc.echo", "headers": {...}, "body": {...}, "replyAddress": "reply-..."}
//! {"type": "publish", "address": "news", "body": {...}}
//! {"type": "register", "address": "news", "trackId": "t-..."}
//! {"type": "unRegister", "address": "news"}
//! {"type": "ping"}
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifiers::{ReplyAddress, TrackId};

use super::Headers;

// ============================================================================
// OutboundEnvelope
// ============================================================================

/// An envelope produced by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundEnvelope {
    /// Point-to-point message, optionally expecting a reply.
    #[serde(rename = "send")]
    Send {
        /// Target address.
        address: String,
        /// Optional message headers.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        headers: Option<Headers>,
        /// Message body.
        #[serde(default)]
        body: Value,
        /// Where the reply should be delivered.
        #[serde(
            rename = "replyAddress",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        reply_address: Option<ReplyAddress>,
    },

    /// Message for every subscriber of an address.
    #[serde(rename = "publish")]
    Publish {
        /// Target address.
        address: String,
        /// Optional message headers.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        headers: Option<Headers>,
        /// Message body.
        #[serde(default)]
        body: Value,
    },

    /// Asks the bridge to start forwarding an address.
    #[serde(rename = "register")]
    Register {
        /// Address to register.
        address: String,
        /// Token echoed back in the acknowledgement.
        #[serde(rename = "trackId")]
        track_id: TrackId,
    },

    /// Asks the bridge to stop forwarding an address.
    #[serde(rename = "unRegister")]
    UnRegister {
        /// Address to unregister.
        address: String,
    },

    /// Heartbeat.
    #[serde(rename = "ping")]
    Ping,
}

impl OutboundEnvelope {
    /// Creates a fire-and-forget `send`.
    #[inline]
    #[must_use]
    pub fn send(address: impl Into<String>, body: Value, headers: Option<Headers>) -> Self {
        Self::Send {
            address: address.into(),
            headers,
            body,
            reply_address: None,
        }
    }

    /// Creates a `send` expecting a reply at `reply_address`.
    #[inline]
    #[must_use]
    pub fn request(
        address: impl Into<String>,
        body: Value,
        headers: Option<Headers>,
        reply_address: ReplyAddress,
    ) -> Self {
        Self::Send {
            address: address.into(),
            headers,
            body,
            reply_address: Some(reply_address),
        }
    }

    /// Creates a `send` answering a message that carried `reply_address`.
    #[inline]
    #[must_use]
    pub fn reply(reply_address: &ReplyAddress, body: Value) -> Self {
        Self::send(reply_address.as_str(), body, None)
    }

    /// Creates a `publish`.
    #[inline]
    #[must_use]
    pub fn publish(address: impl Into<String>, body: Value, headers: Option<Headers>) -> Self {
        Self::Publish {
            address: address.into(),
            headers,
            body,
        }
    }

    /// Creates a `register`.
    #[inline]
    #[must_use]
    pub fn register(address: impl Into<String>, track_id: TrackId) -> Self {
        Self::Register {
            address: address.into(),
            track_id,
        }
    }

    /// Creates an `unRegister`.
    #[inline]
    #[must_use]
    pub fn unregister(address: impl Into<String>) -> Self {
        Self::UnRegister {
            address: address.into(),
        }
    }

    /// Returns the wire `type` tag.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Send { .. } => "send",
            Self::Publish { .. } => "publish",
            Self::Register { .. } => "register",
            Self::UnRegister { .. } => "unRegister",
            Self::Ping => "ping",
        }
    }

    /// Returns the target address, if the envelope has one.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        match self {
            Self::Send { address, .. }
            | Self::Publish { address, .. }
            | Self::Register { address, .. }
            | Self::UnRegister { address } => Some(address),
            Self::Ping => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
