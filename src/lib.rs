//! WebSocket event bus client.
//!
//! This library turns a bidirectional WebSocket connection to an event bus
//! bridge into an addressable message bus: publish/subscribe, point-to-point
//! send and correlated request/reply.
//!
//! # Architecture
//!
//! The client follows a handle/event-loop model:
//!
//! - **Handle ([`EventBus`])**: Clonable, checks the state synchronously and
//!   forwards everything else as a command
//! - **Event loop**: One task per bus owning the registry, the reply table
//!   and the connection state machine
//! - **Transport ([`transport::Connector`])**: Text-frame connection,
//!   WebSocket by default
//!
//! Key behaviors:
//!
//! - The bus is open only after the bridge sends `done`
//! - `ping` every 5 s while open
//! - Reconnects 1 s after an unexpected close, until [`EventBus::close`]
//! - Consumers requested before the handshake are registered after it
//!
//! # Quick Start
//!
//! ```no_run
//! use serde_json::json;
//! use ws_eventbus::{EventBus, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let bus = EventBus::connect("ws://localhost:8080/eventbus")?;
//!
//!     // Registered once the bus opens
//!     let consumer = bus
//!         .consumer("news", |message| {
//!             println!("news: {}", message.body);
//!             None
//!         })?
//!         .await?;
//!
//!     let reply = bus.request("svc.time", json!({}), None)?.await?;
//!     println!("time: {reply}");
//!
//!     consumer.unregister();
//!     bus.close();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bus`] | [`EventBus`], builder, consumers, replies |
//! | [`diagnostics`] | Structured dispatch anomalies |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Reply addresses, track ids, handle ids |
//! | [`protocol`] | Wire envelopes and routing |
//! | [`transport`] | Transport contract, WebSocket and in-memory transports |

// ============================================================================
// Modules
// ============================================================================

/// Event bus client.
///
/// Use [`EventBus::connect()`] or [`EventBus::builder()`] to start a bus.
pub mod bus;

/// Structured dispatch diagnostics.
pub mod diagnostics;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Correlation and handle identifiers.
pub mod identifiers;

/// Wire protocol envelopes.
pub mod protocol;

/// Transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Bus types
pub use bus::{
    BusStats, Consumer, EventBus, EventBusBuilder, LifecycleEvent, LifecycleKind, PendingConsumer,
    PendingReply, ReadyState, ResubscribePolicy,
};

// Diagnostics
pub use diagnostics::{Diagnostic, Severity};

// Error types
pub use error::{Error, ReplyFailure, Result};

// Identifier types
pub use identifiers::{
    ConsumerId, IdGenerator, ListenerId, ReplyAddress, SessionId, TrackId, UuidGenerator,
};

// Protocol types
pub use protocol::{Headers, Message};

// Transport types
pub use transport::{CloseInfo, Connector, MemoryConnector, WsConnector};
