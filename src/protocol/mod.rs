//! Wire protocol message types.
//!
//! This module defines the JSON envelopes exchanged with the bus bridge.
//!
//! # Protocol Overview
//!
//! | Envelope | Direction | Purpose |
//! |----------|-----------|---------|
//! | `send` | Client → Bridge | Point-to-point message, optional `replyAddress` |
//! | `publish` | Client → Bridge | Message for all subscribers |
//! | `register` | Client → Bridge | Start receiving an address, acked by `trackId` |
//! | `unRegister` | Client → Bridge | Stop receiving an address |
//! | `ping` | Client → Bridge | Heartbeat |
//! | `done` | Bridge → Client | Handshake complete, registrations accepted |
//! | `pong` | Bridge → Client | Heartbeat acknowledgement |
//! | untagged | Bridge → Client | Pushed message, reply, or registration ack |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `codec` | Text frame encode/decode |
//! | `inbound` | Received envelopes and routing |
//! | `outbound` | Produced envelopes |

// ============================================================================
// Submodules
// ============================================================================

/// Text frame encode/decode.
pub mod codec;

/// Received envelopes and their routing.
pub mod inbound;

/// Envelopes produced by the client.
pub mod outbound;

// ============================================================================
// Types
// ============================================================================

/// Message headers.
pub type Headers = std::collections::BTreeMap<String, String>;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::{decode, encode};
pub use inbound::{InboundEnvelope, Message, Route};
pub use outbound::OutboundEnvelope;
