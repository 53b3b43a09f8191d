//! Transport layer.
//!
//! The bus only needs a text-frame transport that reports open, message
//! and close events and accepts outbound frames. This module defines that
//! contract and ships two implementations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   TransportHandle    ┌─────────────────┐
//! │                 │─────────────────────►│                 │
//! │   Event loop    │                      │   Transport     │◄──► bridge
//! │                 │◄─────────────────────│   (task)        │
//! └─────────────────┘      EventSink       └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `address` | Target URL resolution and scheme translation |
//! | `connector` | `Connector` trait, sink and handle |
//! | `memory` | In-process transport |
//! | `websocket` | tokio-tungstenite transport |

// ============================================================================
// Submodules
// ============================================================================

/// Target URL resolution.
pub mod address;

/// Transport contract.
pub mod connector;

/// In-process transport.
pub mod memory;

/// WebSocket transport.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use address::resolve_ws_url;
pub use connector::{
    CloseInfo, Connector, EventSink, TransportCommand, TransportEvent, TransportHandle,
};
pub use memory::{MemoryAcceptor, MemoryConnector, MemoryPeer, PeerFrame};
pub use websocket::WsConnector;
