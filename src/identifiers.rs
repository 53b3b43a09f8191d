//! Type-safe identifiers for bus entities.
//!
//! Newtype wrappers prevent mixing a reply address with a track id, or a
//! consumer id with a listener id, at compile time.
//!
//! | Type | Wire form | Source |
//! |------|-----------|--------|
//! | [`ReplyAddress`] | `reply-<uuid>` | [`IdGenerator`] |
//! | [`TrackId`] | `t-<uuid>` | [`IdGenerator`] |
//! | [`ConsumerId`] | not on the wire | process-wide counter |
//! | [`ListenerId`] | not on the wire | process-wide counter |
//! | [`SessionId`] | not on the wire | per-bus counter |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Counters
// ============================================================================

static NEXT_CONSUMER_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// IdGenerator
// ============================================================================

/// Source of globally-unique opaque identifiers.
///
/// The bus uses it to mint reply addresses, track tokens and the value
/// returned by [`crate::EventBus::uuid`].
pub trait IdGenerator: Send + Sync + 'static {
    /// Returns a new globally-unique identifier.
    fn generate(&self) -> String;
}

/// Default [`IdGenerator`] producing random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    #[inline]
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

// ============================================================================
// ReplyAddress
// ============================================================================

/// Single-use address correlating one request with its reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplyAddress(String);

impl ReplyAddress {
    /// Prefix of generated reply addresses.
    pub const PREFIX: &'static str = "reply-";

    /// Mints a fresh reply address.
    #[inline]
    #[must_use]
    pub fn generate(ids: &dyn IdGenerator) -> Self {
        Self(format!("{}{}", Self::PREFIX, ids.generate()))
    }

    /// Wraps an address received on the wire.
    #[inline]
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the address as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper, returning the inner string.
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ReplyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// TrackId
// ============================================================================

/// Single-use token correlating a `register` with its acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    /// Prefix of generated track ids.
    pub const PREFIX: &'static str = "t-";

    /// Mints a fresh track id.
    #[inline]
    #[must_use]
    pub fn generate(ids: &dyn IdGenerator) -> Self {
        Self(format!("{}{}", Self::PREFIX, ids.generate()))
    }

    /// Wraps a track id received on the wire.
    #[inline]
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the track id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// ConsumerId
// ============================================================================

/// Identifies one consumer registration.
///
/// Used in place of callback identity when unregistering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsumerId(u64);

impl ConsumerId {
    /// Allocates the next consumer id.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_CONSUMER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "consumer-{}", self.0)
    }
}

// ============================================================================
// ListenerId
// ============================================================================

/// Identifies one lifecycle listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Allocates the next listener id.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

// ============================================================================
// SessionId
// ============================================================================

/// Numbers transport sessions of one bus.
///
/// Incremented on every connection attempt so events from a superseded
/// transport can be recognized and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SessionId(u64);

impl SessionId {
    /// Returns the following session id.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
