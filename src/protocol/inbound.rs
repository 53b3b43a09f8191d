//! Envelopes received from the bus bridge and their routing.
//!
//! Inbound envelopes are not uniformly tagged: only `pong` and `done` carry
//! a `type`. Everything else is routed by which correlation field is present,
//! in a fixed priority order (see [`InboundEnvelope::route`]).

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{ReplyFailure, Result};
use crate::identifiers::{ReplyAddress, TrackId};

use super::Headers;

// ============================================================================
// InboundEnvelope
// ============================================================================

/// An envelope as received on the wire, before routing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InboundEnvelope {
    /// Type tag (`pong`, `done`); absent on routed envelopes.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    /// Address of a pushed message.
    #[serde(default)]
    pub address: Option<String>,

    /// Reply address; on its own it marks a reply to one of our requests.
    #[serde(rename = "replyAddress", default)]
    pub reply_address: Option<ReplyAddress>,

    /// Message headers. Entries whose value is not a string are skipped.
    #[serde(default, deserialize_with = "lenient_headers")]
    pub headers: Option<Headers>,

    /// Message body.
    #[serde(default)]
    pub body: Value,

    /// Registration acknowledgement token.
    #[serde(rename = "trackId", default)]
    pub track_id: Option<TrackId>,

    /// Error flag on reply envelopes.
    #[serde(default, deserialize_with = "lenient_flag")]
    pub err: bool,

    /// Failure message on error replies.
    #[serde(default)]
    pub message: Option<String>,

    /// Failure code on error replies.
    #[serde(rename = "failureCode", default, deserialize_with = "lenient_code")]
    pub failure_code: Option<i32>,

    /// Failure type on error replies.
    #[serde(rename = "failureType", default)]
    pub failure_type: Option<String>,
}

// ============================================================================
// Lenient Fields
// ============================================================================

// A bridge may send loosely typed optional fields; none of them should make
// the whole envelope undecodable.

fn lenient_headers<'de, D>(deserializer: D) -> StdResult<Option<Headers>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Object(entries) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };
    let headers = entries
        .into_iter()
        .filter_map(|(name, value)| match value {
            Value::String(value) => Some((name, value)),
            _ => None,
        })
        .collect();
    Ok(Some(headers))
}

/// Only a literal `true` sets the flag.
fn lenient_flag<'de, D>(deserializer: D) -> StdResult<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
}

fn lenient_code<'de, D>(deserializer: D) -> StdResult<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?
        .as_i64()
        .and_then(|code| i32::try_from(code).ok()))
}

// ============================================================================
// Route
// ============================================================================

/// Where an inbound envelope goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Heartbeat acknowledgement; dropped.
    Pong,
    /// Handshake completion.
    Done,
    /// Message for the consumers of an address.
    Deliver(Message),
    /// Reply to one of our requests.
    Reply {
        /// Reply address of the request.
        reply_address: ReplyAddress,
        /// Body on success, normalized failure on `err: true`.
        outcome: std::result::Result<Value, ReplyFailure>,
    },
    /// Registration acknowledgement.
    TrackAck {
        /// Track id of the `register` being acknowledged.
        track_id: TrackId,
    },
    /// None of the routing fields is present.
    Unroutable,
}

impl InboundEnvelope {
    /// Classifies the envelope.
    ///
    /// Priority: `pong`, `done`, `address`, `replyAddress`, `trackId`.
    /// An envelope carrying both `address` and `replyAddress` is a pushed
    /// message expecting an answer, never a reply.
    #[must_use]
    pub fn route(self) -> Route {
        match self.kind.as_deref() {
            Some("pong") => return Route::Pong,
            Some("done") => return Route::Done,
            _ => {}
        }

        let reply_address = self.reply_address.filter(|r| !r.as_str().is_empty());

        if let Some(address) = self.address.filter(|a| !a.is_empty()) {
            return Route::Deliver(Message {
                address,
                reply_address,
                headers: self.headers.unwrap_or_default(),
                body: self.body,
            });
        }

        if let Some(reply_address) = reply_address {
            let outcome = if self.err {
                Err(ReplyFailure {
                    message: self.message.unwrap_or_default(),
                    failure_code: self.failure_code,
                    failure_type: self.failure_type,
                })
            } else {
                Ok(self.body)
            };
            return Route::Reply {
                reply_address,
                outcome,
            };
        }

        if let Some(track_id) = self.track_id.filter(|t| !t.as_str().is_empty()) {
            return Route::TrackAck { track_id };
        }

        Route::Unroutable
    }
}

// ============================================================================
// Message
// ============================================================================

/// A message delivered to a consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Address the message was sent to.
    pub address: String,
    /// Set when the sender expects a reply.
    pub reply_address: Option<ReplyAddress>,
    /// Message headers.
    pub headers: Headers,
    /// Message body.
    pub body: Value,
}

impl Message {
    /// Returns `true` if the sender expects a reply.
    #[inline]
    #[must_use]
    pub fn needs_reply(&self) -> bool {
        self.reply_address.is_some()
    }

    /// Deserializes the body into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if the body does not match `T`.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }

    /// Gets a header value.
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

// ============================================================================
// Tests
// ============================================================================
