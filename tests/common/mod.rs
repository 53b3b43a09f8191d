//! Shared helpers for integration tests.

#![allow(dead_code)]

use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;
use ws_eventbus::bus::BusStats;
use ws_eventbus::transport::{MemoryAcceptor, MemoryPeer, PeerFrame};
use ws_eventbus::{EventBus, EventBusBuilder, MemoryConnector};

/// Initializes logging once; `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ws_eventbus=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_test_writer()
        .try_init();
}

/// Builder wired to an in-memory bridge.
pub fn builder() -> (EventBusBuilder, MemoryAcceptor) {
    init_logging();
    let (connector, acceptor) = MemoryConnector::pair();
    let builder = EventBus::builder("/bus")
        .origin("http://localhost")
        .connector(connector);
    (builder, acceptor)
}

/// Bus that completed its handshake.
pub async fn open_bus_with(
    builder: EventBusBuilder,
    acceptor: &mut MemoryAcceptor,
) -> (EventBus, MemoryPeer) {
    let bus = builder.build().expect("build");
    let peer = acceptor.accept().await.expect("connection attempt");
    assert!(peer.handshake());
    sync(&bus).await;
    assert!(bus.is_open());
    (bus, peer)
}

/// Bus with default settings that completed its handshake.
pub async fn open_bus() -> (EventBus, MemoryPeer, MemoryAcceptor) {
    let (builder, mut acceptor) = builder();
    let (bus, peer) = open_bus_with(builder, &mut acceptor).await;
    (bus, peer, acceptor)
}

/// Waits until the event loop handled everything queued so far.
pub async fn sync(bus: &EventBus) -> BusStats {
    bus.stats().await.expect("stats")
}

/// Returns every frame the bus has sent so far.
pub fn drain(peer: &mut MemoryPeer) -> Vec<PeerFrame> {
    std::iter::from_fn(|| peer.try_recv()).collect()
}

/// Acknowledges a registration.
pub fn ack(peer: &MemoryPeer, track_id: &str) {
    assert!(peer.deliver(&json!({ "trackId": track_id })));
}

/// Delivers a reply to one of the bus's requests.
pub fn reply(peer: &MemoryPeer, reply_address: &str, body: Value) {
    assert!(peer.deliver(&json!({ "replyAddress": reply_address, "body": body })));
}
