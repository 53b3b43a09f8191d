//! Error types for the event bus client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```no_run
//! use serde_json::json;
//! use ws_eventbus::{EventBus, Result};
//!
//! async fn example(bus: &EventBus) -> Result<()> {
//!     let reply = bus.request("svc.echo", json!({"x": 1}), None)?.await?;
//!     println!("{reply}");
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidUrl`] |
//! | State | [`Error::InvalidState`] |
//! | Connection | [`Error::ConnectionClosed`], [`Error::WebSocket`] |
//! | Reply | [`Error::Reply`], [`Error::RequestTimeout`] |
//! | Codec | [`Error::Json`] |
//!
//! Dispatch anomalies (duplicate replies, unroutable frames, ...) are not
//! errors; see [`crate::diagnostics`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::result::Result as StdResult;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::bus::ReadyState;
use crate::identifiers::ReplyAddress;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// ReplyFailure
// ============================================================================

/// Normalized failure carried by an error reply envelope.
///
/// Produced when the server answers a request with `err: true`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyFailure {
    /// Server-supplied failure message.
    pub message: String,

    /// Server-supplied failure code.
    #[serde(rename = "failureCode")]
    pub failure_code: Option<i32>,

    /// Server-supplied failure type (e.g. `RECIPIENT_FAILURE`).
    #[serde(rename = "failureType")]
    pub failure_type: Option<String>,
}

impl ReplyFailure {
    /// Creates a reply failure.
    #[inline]
    #[must_use]
    pub fn new(
        message: impl Into<String>,
        failure_code: Option<i32>,
        failure_type: Option<String>,
    ) -> Self {
        Self {
            message: message.into(),
            failure_code,
            failure_type,
        }
    }
}

impl fmt::Display for ReplyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(code) = self.failure_code {
            write!(f, " (code {code})")?;
        }
        if let Some(ref failure_type) = self.failure_type {
            write!(f, " [{failure_type}]")?;
        }
        Ok(())
    }
}

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned by [`crate::EventBusBuilder::build`] when a setting is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Target URL could not be parsed or resolved.
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        /// The offending URL or path.
        url: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },

    // ========================================================================
    // State Errors
    // ========================================================================
    /// Operation requires an open bus.
    ///
    /// `send`, `request` and `publish` fail with this error synchronously
    /// when the handshake has not completed or the bus is closing.
    #[error("INVALID_STATE_ERR: bus is {state}")]
    InvalidState {
        /// State observed when the call was made.
        state: ReadyState,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// The connection went away before the operation settled.
    ///
    /// Also returned when the event loop has terminated.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Reply Errors
    // ========================================================================
    /// The server answered a request with an error reply.
    #[error("Reply failure: {0}")]
    Reply(ReplyFailure),

    /// Caller-side request timeout.
    #[error("Request {reply_address} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// Reply address of the abandoned request.
        reply_address: ReplyAddress,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid URL error.
    #[inline]
    pub fn invalid_url(url: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            source,
        }
    }

    /// Creates an invalid state error.
    #[inline]
    pub fn invalid_state(state: ReadyState) -> Self {
        Self::InvalidState { state }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(reply_address: ReplyAddress, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            reply_address,
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RequestTimeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::ConnectionClosed | Self::WebSocket(_))
    }

    /// Returns `true` if the server answered with an error reply.
    #[inline]
    #[must_use]
    pub fn is_reply_failure(&self) -> bool {
        matches!(self, Self::Reply(_))
    }

    /// Returns the reply failure, if this is one.
    #[inline]
    #[must_use]
    pub fn reply_failure(&self) -> Option<&ReplyFailure> {
        match self {
            Self::Reply(failure) => Some(failure),
            _ => None,
        }
    }

    /// Returns `true` if the error may go away once the bus is open again.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidState { .. } | Self::ConnectionClosed | Self::RequestTimeout { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
