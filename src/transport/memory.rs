//! In-process transport for tests and embedding.
//!
//! [`MemoryConnector`] hands every connection attempt to a [`MemoryAcceptor`]
//! as a [`MemoryPeer`]. The peer plays the bridge: it decides when the
//! transport opens, delivers inbound frames, observes outbound envelopes
//! and closes the transport.
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use ws_eventbus::{EventBus, MemoryConnector};
//!
//! # async fn example() -> ws_eventbus::Result<()> {
//! let (connector, mut acceptor) = MemoryConnector::pair();
//! let bus = EventBus::builder("ws://bridge/bus").connector(connector).build()?;
//!
//! if let Some(mut peer) = acceptor.accept().await {
//!     peer.handshake();
//!     // Commands are handled in order, so the bus is open afterwards.
//!     bus.stats().await?;
//!
//!     bus.publish("news", json!("hello"), None)?;
//!     let envelope = peer.recv_envelope().await;
//!     assert_eq!(envelope.map(|e| e.kind()), Some("publish"));
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::warn;
use url::Url;

use crate::protocol::OutboundEnvelope;

use super::connector::{CloseInfo, Connector, EventSink, TransportCommand, TransportHandle};

// ============================================================================
// PeerFrame
// ============================================================================

/// What the bus sent to a [`MemoryPeer`].
#[derive(Debug, Clone, PartialEq)]
pub enum PeerFrame {
    /// A decoded outbound envelope.
    Envelope(OutboundEnvelope),
    /// A text frame that is not a known envelope.
    Raw(String),
    /// The bus asked to close the transport.
    Close,
}

// ============================================================================
// MemoryConnector
// ============================================================================

/// [`Connector`] producing in-process transports.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    peers: mpsc::UnboundedSender<MemoryPeer>,
    urls: Arc<Mutex<Vec<Url>>>,
}

impl MemoryConnector {
    /// Creates a connector and the acceptor receiving its connection attempts.
    #[must_use]
    pub fn pair() -> (Self, MemoryAcceptor) {
        let (tx, rx) = mpsc::unbounded_channel();
        let urls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                peers: tx,
                urls: Arc::clone(&urls),
            },
            MemoryAcceptor { peers: rx, urls },
        )
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, url: &Url, sink: EventSink) -> TransportHandle {
        let (handle, commands) = TransportHandle::channel();
        self.urls.lock().push(url.clone());

        let peer = MemoryPeer {
            url: url.clone(),
            sink,
            commands,
        };
        if self.peers.send(peer).is_err() {
            warn!(%url, "Memory acceptor dropped, connection attempt lost");
        }

        handle
    }
}

// ============================================================================
// MemoryAcceptor
// ============================================================================

/// Receives the connection attempts of a [`MemoryConnector`].
#[derive(Debug)]
pub struct MemoryAcceptor {
    peers: mpsc::UnboundedReceiver<MemoryPeer>,
    urls: Arc<Mutex<Vec<Url>>>,
}

impl MemoryAcceptor {
    /// Waits for the next connection attempt.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.peers.recv().await
    }

    /// Returns the next connection attempt if one is queued.
    pub fn try_accept(&mut self) -> Option<MemoryPeer> {
        self.peers.try_recv().ok()
    }

    /// Returns the number of connection attempts so far.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.urls.lock().len()
    }

    /// Returns the URL of every connection attempt, oldest first.
    #[must_use]
    pub fn urls(&self) -> Vec<Url> {
        self.urls.lock().clone()
    }
}

// ============================================================================
// MemoryPeer
// ============================================================================

/// The bridge side of one in-process transport.
#[derive(Debug)]
pub struct MemoryPeer {
    url: Url,
    sink: EventSink,
    commands: mpsc::UnboundedReceiver<TransportCommand>,
}

impl MemoryPeer {
    /// Returns the URL the bus connected to.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Reports the transport as connected.
    pub fn open(&self) -> bool {
        self.sink.opened()
    }

    /// Opens the transport and completes the handshake with `done`.
    pub fn handshake(&self) -> bool {
        self.open() && self.deliver(&json!({"type": "done"}))
    }

    /// Delivers a JSON envelope to the bus.
    pub fn deliver(&self, envelope: &Value) -> bool {
        self.sink.message(envelope.to_string())
    }

    /// Delivers a raw text frame to the bus.
    pub fn deliver_text(&self, text: impl Into<String>) -> bool {
        self.sink.message(text)
    }

    /// Reports the transport as closed.
    pub fn close(&self, info: CloseInfo) -> bool {
        self.sink.closed(info)
    }

    /// Waits for the next frame from the bus.
    ///
    /// Returns `None` once the bus released the transport.
    pub async fn recv(&mut self) -> Option<PeerFrame> {
        self.commands.recv().await.map(decode_command)
    }

    /// Returns the next frame from the bus if one is queued.
    pub fn try_recv(&mut self) -> Option<PeerFrame> {
        self.commands.try_recv().ok().map(decode_command)
    }

    /// Waits for the next outbound envelope, skipping raw frames.
    ///
    /// Returns `None` on a close request or once the bus released the
    /// transport.
    pub async fn recv_envelope(&mut self) -> Option<OutboundEnvelope> {
        loop {
            match self.recv().await? {
                PeerFrame::Envelope(envelope) => return Some(envelope),
                PeerFrame::Raw(_) => continue,
                PeerFrame::Close => return None,
            }
        }
    }

    /// Returns `true` if the bus has released this transport.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.commands.is_closed()
    }
}

fn decode_command(command: TransportCommand) -> PeerFrame {
    match command {
        TransportCommand::Text(text) => match serde_json::from_str(&text) {
            Ok(envelope) => PeerFrame::Envelope(envelope),
            Err(_) => PeerFrame::Raw(text),
        },
        TransportCommand::Close => PeerFrame::Close,
    }
}

// ============================================================================
// Tests
// ============================================================================
