//! End-to-end bus behavior against an in-memory bridge.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_test::{assert_pending, assert_ready_ok, task};
use ws_eventbus::protocol::OutboundEnvelope;
use ws_eventbus::transport::PeerFrame;
use ws_eventbus::{
    CloseInfo, Diagnostic, Error, Headers, ReadyState, ReplyAddress, ResubscribePolicy,
};

use common::{ack, builder, drain, open_bus, open_bus_with, reply, sync};

// ============================================================================
// Helpers
// ============================================================================

fn expect_register(frame: Option<PeerFrame>, expected: &str) -> String {
    match frame {
        Some(PeerFrame::Envelope(OutboundEnvelope::Register { address, track_id })) => {
            assert_eq!(address, expected);
            assert!(track_id.as_str().starts_with("t-"));
            track_id.as_str().to_string()
        }
        other => panic!("expected register for {expected}, got {other:?}"),
    }
}

fn expect_request(frame: Option<PeerFrame>, expected: &str) -> ReplyAddress {
    match frame {
        Some(PeerFrame::Envelope(OutboundEnvelope::Send {
            address,
            reply_address: Some(reply_address),
            ..
        })) => {
            assert_eq!(address, expected);
            assert!(reply_address.as_str().starts_with("reply-"));
            reply_address
        }
        other => panic!("expected request to {expected}, got {other:?}"),
    }
}

// ============================================================================
// Handshake and Lazy Registration
// ============================================================================

#[tokio::test(start_paused = true)]
async fn lazy_consumer_registers_after_handshake() {
    let (builder, mut acceptor) = builder();
    let bus = builder.build().expect("build");
    assert_eq!(bus.url().as_str(), "ws://localhost/bus");

    let mut pending = task::spawn(bus.consumer("a.b", |_| None).expect("consumer"));

    let mut peer = acceptor.accept().await.expect("connection attempt");
    assert_eq!(peer.url().as_str(), "ws://localhost/bus");

    // Transport open alone is not enough.
    assert!(peer.open());
    let stats = sync(&bus).await;
    assert_eq!(stats.state, ReadyState::Connecting);
    assert_eq!(stats.lazy_consumers, 1);
    assert!(drain(&mut peer).is_empty());

    assert!(peer.deliver(&json!({"type": "done"})));
    sync(&bus).await;
    assert!(bus.is_open());

    let frames = drain(&mut peer);
    assert_eq!(frames.len(), 1);
    let track_id = expect_register(frames.into_iter().next(), "a.b");
    assert_pending!(pending.poll());

    ack(&peer, &track_id);
    sync(&bus).await;

    let consumer = assert_ready_ok!(pending.poll());
    assert_eq!(consumer.address(), "a.b");
    assert_eq!(sync(&bus).await.pending_tracks, 0);
}

#[tokio::test(start_paused = true)]
async fn lazy_consumers_register_in_call_order() {
    let (builder, mut acceptor) = builder();
    let bus = builder.build().expect("build");

    let _x = bus.consumer("x", |_| None).expect("consumer");
    let _y = bus.consumer("y", |_| None).expect("consumer");
    let _z = bus.consumer("z", |_| None).expect("consumer");

    let mut peer = acceptor.accept().await.expect("connection attempt");
    peer.handshake();
    sync(&bus).await;

    let addresses: Vec<String> = drain(&mut peer)
        .into_iter()
        .map(|frame| match frame {
            PeerFrame::Envelope(OutboundEnvelope::Register { address, .. }) => address,
            other => panic!("unexpected frame {other:?}"),
        })
        .collect();
    assert_eq!(addresses, vec!["x", "y", "z"]);
}

#[tokio::test(start_paused = true)]
async fn open_listener_can_send() {
    let (builder, mut acceptor) = builder();
    let bus = builder.build().expect("build");

    bus.on_open(|bus| {
        bus.publish("presence", json!("online"), None)
            .expect("open inside listener");
    });
    let _queued = bus.consumer("a", |_| None).expect("consumer");

    let mut peer = acceptor.accept().await.expect("connection attempt");
    peer.handshake();
    sync(&bus).await;

    // Queued registrations go out during the handshake, listener sends
    // right after it.
    let frames = drain(&mut peer);
    assert_eq!(frames.len(), 2);
    assert!(matches!(
        &frames[0],
        PeerFrame::Envelope(OutboundEnvelope::Register { address, .. }) if address == "a"
    ));
    assert_eq!(
        frames[1],
        PeerFrame::Envelope(OutboundEnvelope::publish("presence", json!("online"), None))
    );
}

#[tokio::test(start_paused = true)]
async fn duplicate_handshake_is_reported() {
    let (bus, peer, _acceptor) = open_bus().await;
    let mut diagnostics = bus.diagnostics();

    peer.deliver(&json!({"type": "done"}));
    sync(&bus).await;

    assert_eq!(diagnostics.try_recv(), Ok(Diagnostic::DuplicateHandshake));
    assert!(bus.is_open());
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test(start_paused = true)]
async fn second_consumer_on_address_sends_no_register() {
    let (bus, mut peer, _acceptor) = open_bus().await;

    let first = bus.consumer("news", |_| None).expect("consumer");
    let track_id = expect_register(peer.recv().await, "news");
    ack(&peer, &track_id);
    let first = first.await.expect("first settles");

    let second = bus.consumer("news", |_| None).expect("consumer");
    let second = second.await.expect("second settles immediately");
    sync(&bus).await;

    assert!(drain(&mut peer).is_empty());
    assert_ne!(first.id(), second.id());

    let stats = sync(&bus).await;
    assert_eq!(stats.addresses, 1);
    assert_eq!(stats.consumers, 2);
}

#[tokio::test(start_paused = true)]
async fn unregister_last_consumer_while_open() {
    let (bus, mut peer, _acceptor) = open_bus().await;

    let first = bus.consumer("news", |_| None).expect("consumer");
    let track_id = expect_register(peer.recv().await, "news");
    ack(&peer, &track_id);
    let first = first.await.expect("first");
    let second = bus.consumer("news", |_| None).expect("consumer").await.expect("second");

    first.unregister();
    sync(&bus).await;
    assert!(drain(&mut peer).is_empty());

    // Idempotent
    first.unregister();
    bus.unregister_handler("news", second.id());
    sync(&bus).await;

    assert_eq!(
        drain(&mut peer),
        vec![PeerFrame::Envelope(OutboundEnvelope::unregister("news"))]
    );
    assert_eq!(sync(&bus).await.addresses, 0);

    second.unregister();
    sync(&bus).await;
    assert!(drain(&mut peer).is_empty());
}

#[tokio::test(start_paused = true)]
async fn unregister_while_closed_sends_nothing() {
    let (builder, mut acceptor) = builder();
    let builder = builder.resubscribe(ResubscribePolicy::ReplayAll);
    let (bus, mut peer) = open_bus_with(builder, &mut acceptor).await;

    let pending = bus.consumer("news", |_| None).expect("consumer");
    let track_id = expect_register(peer.recv().await, "news");
    ack(&peer, &track_id);
    let consumer = pending.await.expect("consumer");

    peer.close(CloseInfo::new(Some(1006), "gone"));
    sync(&bus).await;
    assert_eq!(bus.ready_state(), ReadyState::Closed);

    consumer.unregister();
    let stats = sync(&bus).await;
    assert_eq!(stats.addresses, 0);
    assert!(drain(&mut peer).is_empty());

    // Nothing left to replay.
    let mut next = acceptor.accept().await.expect("reconnect");
    next.handshake();
    sync(&bus).await;
    assert!(drain(&mut next).is_empty());
}

// ============================================================================
// Dispatch
// ============================================================================

#[tokio::test(start_paused = true)]
async fn message_reaches_every_consumer() {
    let (bus, mut peer, _acceptor) = open_bus().await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    for name in ["first", "second"] {
        let tx = tx.clone();
        let pending = bus
            .consumer("news", move |message| {
                let _ = tx.send((name, message.body.clone(), message.header("lang").map(String::from)));
                None
            })
            .expect("consumer");
        if name == "first" {
            let track_id = expect_register(peer.recv().await, "news");
            ack(&peer, &track_id);
        }
        pending.await.expect("consumer");
    }

    peer.deliver(&json!({
        "address": "news",
        "headers": {"lang": "en"},
        "body": {"title": "hello"}
    }));
    sync(&bus).await;

    let expected = |name| (name, json!({"title": "hello"}), Some("en".to_string()));
    assert_eq!(rx.try_recv(), Ok(expected("first")));
    assert_eq!(rx.try_recv(), Ok(expected("second")));
    assert!(rx.try_recv().is_err());

    // No reply address, nothing sent back.
    assert!(drain(&mut peer).is_empty());
}

#[tokio::test(start_paused = true)]
async fn only_first_reply_is_sent() {
    let (bus, mut peer, _acceptor) = open_bus().await;
    let mut diagnostics = bus.diagnostics();

    let first = bus
        .consumer("svc.echo", |message| Some(json!({"from": 1, "echo": message.body})))
        .expect("consumer");
    let track_id = expect_register(peer.recv().await, "svc.echo");
    ack(&peer, &track_id);
    first.await.expect("first");
    bus.consumer("svc.echo", |_| Some(json!({"from": 2})))
        .expect("consumer")
        .await
        .expect("second");

    peer.deliver(&json!({
        "address": "svc.echo",
        "replyAddress": "reply-remote",
        "body": "hi"
    }));
    sync(&bus).await;

    assert_eq!(
        drain(&mut peer),
        vec![PeerFrame::Envelope(OutboundEnvelope::send(
            "reply-remote",
            json!({"from": 1, "echo": "hi"}),
            None
        ))]
    );
    assert_eq!(
        diagnostics.try_recv(),
        Ok(Diagnostic::DuplicateReply {
            address: "svc.echo".into()
        })
    );
}

#[tokio::test(start_paused = true)]
async fn dispatch_anomalies_are_reported() {
    let (bus, mut peer, _acceptor) = open_bus().await;
    let mut diagnostics = bus.diagnostics();

    let quiet = bus.consumer("quiet", |_| None).expect("consumer");
    let track_id = expect_register(peer.recv().await, "quiet");
    ack(&peer, &track_id);
    quiet.await.expect("consumer");

    peer.deliver(&json!({"address": "quiet", "replyAddress": "reply-remote"}));
    peer.deliver(&json!({"address": "nobody", "body": 1}));
    peer.deliver(&json!({"replyAddress": "reply-unknown", "body": 1}));
    peer.deliver(&json!({"trackId": "t-unknown"}));
    peer.deliver(&json!({"body": 1}));
    peer.deliver_text("not json");
    sync(&bus).await;

    let received: Vec<&'static str> = std::iter::from_fn(|| diagnostics.try_recv().ok())
        .map(|diagnostic| diagnostic.code())
        .collect();
    assert_eq!(
        received,
        vec![
            "missing_reply",
            "no_consumers",
            "unknown_reply",
            "unknown_track",
            "unroutable",
            "malformed_frame",
        ]
    );
    assert!(drain(&mut peer).is_empty());
    assert!(bus.is_open());
}

// ============================================================================
// Request/Reply
// ============================================================================

#[tokio::test(start_paused = true)]
async fn send_transmits_without_reply_address() {
    let (bus, mut peer, _acceptor) = open_bus().await;

    let headers = Headers::from([("level".to_string(), "info".to_string())]);
    bus.send("svc.log", json!({"line": "started"}), Some(headers.clone()))
        .expect("send");

    match peer.recv().await {
        Some(PeerFrame::Envelope(OutboundEnvelope::Send {
            address,
            headers: sent_headers,
            body,
            reply_address,
        })) => {
            assert_eq!(address, "svc.log");
            assert_eq!(sent_headers, Some(headers));
            assert_eq!(body, json!({"line": "started"}));
            assert_eq!(reply_address, None);
        }
        other => panic!("expected send to svc.log, got {other:?}"),
    }
    assert_eq!(sync(&bus).await.pending_replies, 0);
}

#[tokio::test(start_paused = true)]
async fn request_resolves_with_reply_body() {
    let (bus, mut peer, _acceptor) = open_bus().await;

    let pending = bus.request("svc.echo", json!({"x": 1}), None).expect("request");
    let reply_address = expect_request(peer.recv().await, "svc.echo");
    assert_eq!(&reply_address, pending.reply_address());

    reply(&peer, reply_address.as_str(), json!({"x": 1}));

    assert_eq!(pending.await.expect("reply"), json!({"x": 1}));
    assert_eq!(sync(&bus).await.pending_replies, 0);
}

#[tokio::test(start_paused = true)]
async fn loosely_typed_reply_still_settles() {
    let (bus, mut peer, _acceptor) = open_bus().await;
    let mut diagnostics = bus.diagnostics();

    let pending = bus.request("svc.echo", json!(1), None).expect("request");
    let reply_address = expect_request(peer.recv().await, "svc.echo");

    assert!(peer.deliver(&json!({
        "replyAddress": reply_address.as_str(),
        "err": null,
        "headers": {"attempt": 2, "source": "cache"},
        "body": {"ok": true}
    })));

    assert_eq!(pending.await.expect("reply"), json!({"ok": true}));
    sync(&bus).await;
    assert!(diagnostics.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn request_rejects_with_failure_fields() {
    let (bus, mut peer, _acceptor) = open_bus().await;

    let pending = bus.request("svc.fail", json!({}), None).expect("request");
    let reply_address = expect_request(peer.recv().await, "svc.fail");

    peer.deliver(&json!({
        "replyAddress": reply_address.as_str(),
        "err": true,
        "message": "boom",
        "failureCode": 500,
        "failureType": "RECIPIENT_FAILURE"
    }));

    let err = pending.await.unwrap_err();
    let failure = err.reply_failure().expect("reply failure");
    assert_eq!(failure.message, "boom");
    assert_eq!(failure.failure_code, Some(500));
    assert_eq!(failure.failure_type.as_deref(), Some("RECIPIENT_FAILURE"));
}

#[tokio::test(start_paused = true)]
async fn callback_request_settles_once() {
    let (bus, mut peer, _acceptor) = open_bus().await;
    let (tx, rx) = oneshot::channel();

    let reply_address = bus
        .request_with_callback("svc.echo", json!("hi"), None, move |outcome| {
            let _ = tx.send(outcome);
        })
        .expect("request");
    assert_eq!(expect_request(peer.recv().await, "svc.echo"), reply_address);

    let mut diagnostics = bus.diagnostics();
    reply(&peer, reply_address.as_str(), json!("hi"));
    reply(&peer, reply_address.as_str(), json!("again"));
    sync(&bus).await;

    assert_eq!(rx.await.expect("callback"), Ok(json!("hi")));
    assert_eq!(
        diagnostics.try_recv(),
        Ok(Diagnostic::UnknownReply { reply_address })
    );
}

#[tokio::test(start_paused = true)]
async fn request_timeout_forgets_waiter() {
    let (bus, mut peer, _acceptor) = open_bus().await;
    let started = Instant::now();

    let err = bus
        .request_timeout("svc.slow", json!({}), None, Duration::from_millis(250))
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(started.elapsed() >= Duration::from_millis(250));
    let reply_address = expect_request(peer.try_recv(), "svc.slow");
    assert!(matches!(
        err,
        Error::RequestTimeout { reply_address: ref timed_out, timeout_ms: 250 } if *timed_out == reply_address
    ));
    assert_eq!(sync(&bus).await.pending_replies, 0);
}

// ============================================================================
// Heartbeat
// ============================================================================

#[tokio::test(start_paused = true)]
async fn heartbeat_every_period_while_open() {
    let (bus, mut peer, _acceptor) = open_bus().await;
    let opened = Instant::now();

    assert_eq!(peer.recv_envelope().await, Some(OutboundEnvelope::Ping));
    assert!(opened.elapsed() >= Duration::from_secs(5));

    assert_eq!(peer.recv_envelope().await, Some(OutboundEnvelope::Ping));
    assert!(opened.elapsed() >= Duration::from_secs(10));

    // Pongs are absorbed.
    let mut diagnostics = bus.diagnostics();
    peer.deliver(&json!({"type": "pong"}));
    sync(&bus).await;
    assert!(diagnostics.try_recv().is_err());
}

// ============================================================================
// Connection Loss
// ============================================================================

#[tokio::test(start_paused = true)]
async fn transport_close_reconnects_with_empty_tables() {
    let (bus, mut peer, mut acceptor) = open_bus().await;

    let closes = Arc::new(AtomicUsize::new(0));
    let closes_clone = Arc::clone(&closes);
    bus.on_close(move |bus, info| {
        assert_eq!(bus.ready_state(), ReadyState::Closed);
        assert_eq!(info.code, Some(1006));
        closes_clone.fetch_add(1, Ordering::SeqCst);
    });

    let (tx, rx) = oneshot::channel::<()>();
    let _callback = bus
        .request_with_callback("svc.lost", json!({}), None, move |_| {
            let _ = tx.send(());
        })
        .expect("request");
    let pending = bus.request("svc.lost", json!({}), None).expect("request");
    let registering = bus.consumer("news", |_| None).expect("consumer");
    let stats = sync(&bus).await;
    assert_eq!(stats.pending_replies, 2);
    assert_eq!(stats.pending_tracks, 1);

    peer.close(CloseInfo::new(Some(1006), "abnormal closure"));
    let stats = sync(&bus).await;

    assert_eq!(stats.state, ReadyState::Closed);
    assert_eq!(stats.pending_replies, 0);
    assert_eq!(stats.pending_tracks, 0);
    assert_eq!(stats.addresses, 0);
    assert!(stats.reconnect_pending);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert!(peer.is_released());

    assert!(matches!(pending.await, Err(Error::ConnectionClosed)));
    assert!(matches!(registering.await, Err(Error::ConnectionClosed)));
    // Abandoned callbacks are dropped, never called.
    assert!(rx.await.is_err());

    let closed_at = Instant::now();
    let mut next = acceptor.accept().await.expect("reconnect");
    assert!(closed_at.elapsed() >= Duration::from_secs(1));
    assert_eq!(next.url(), peer.url());
    assert_eq!(acceptor.connect_count(), 2);

    let stats = sync(&bus).await;
    assert_eq!(stats.state, ReadyState::Connecting);
    assert_eq!(stats.session.as_u64(), 2);
    assert_eq!(stats.consumers, 0);
    assert!(!stats.reconnect_pending);

    // No heartbeat on the old transport, none before the new handshake.
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert!(drain(&mut next).is_empty());
    assert_eq!(closes.load(Ordering::SeqCst), 1);

    next.handshake();
    sync(&bus).await;
    assert!(bus.is_open());
}

#[tokio::test(start_paused = true)]
async fn events_from_stale_session_are_ignored() {
    let (bus, peer, mut acceptor) = open_bus().await;

    peer.close(CloseInfo::abnormal("reset"));
    let mut next = acceptor.accept().await.expect("reconnect");

    // The old transport keeps talking.
    peer.deliver(&json!({"type": "done"}));
    peer.close(CloseInfo::abnormal("again"));
    let stats = sync(&bus).await;
    assert_eq!(stats.state, ReadyState::Connecting);
    assert!(!stats.reconnect_pending);

    next.handshake();
    sync(&bus).await;
    assert!(bus.is_open());
    assert!(drain(&mut next).is_empty());
}

#[tokio::test(start_paused = true)]
async fn replay_all_re_registers_after_reconnect() {
    let (builder, mut acceptor) = builder();
    let builder = builder.resubscribe(ResubscribePolicy::ReplayAll);
    let (bus, mut peer) = open_bus_with(builder, &mut acceptor).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let pending = bus
        .consumer("news", move |message| {
            let _ = tx.send(message.body.clone());
            None
        })
        .expect("consumer");
    let first_track = expect_register(peer.recv().await, "news");
    ack(&peer, &first_track);
    let consumer = pending.await.expect("consumer");

    peer.close(CloseInfo::abnormal("reset"));
    let stats = sync(&bus).await;
    assert_eq!(stats.consumers, 1);

    let mut next = acceptor.accept().await.expect("reconnect");
    next.handshake();
    sync(&bus).await;

    let second_track = expect_register(next.try_recv(), "news");
    assert_ne!(first_track, second_track);
    ack(&next, &second_track);

    next.deliver(&json!({"address": "news", "body": "after reconnect"}));
    sync(&bus).await;
    assert_eq!(rx.try_recv(), Ok(json!("after reconnect")));

    consumer.unregister();
    sync(&bus).await;
    assert_eq!(
        drain(&mut next),
        vec![PeerFrame::Envelope(OutboundEnvelope::unregister("news"))]
    );
}

#[tokio::test(start_paused = true)]
async fn replay_all_keeps_unacknowledged_consumer() {
    let (builder, mut acceptor) = builder();
    let builder = builder.resubscribe(ResubscribePolicy::ReplayAll);
    let (bus, mut peer) = open_bus_with(builder, &mut acceptor).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let pending = bus
        .consumer("news", move |message| {
            let _ = tx.send(message.body.clone());
            None
        })
        .expect("consumer");
    expect_register(peer.recv().await, "news");

    // Transport drops before the ack arrives.
    peer.close(CloseInfo::abnormal("reset"));
    let consumer = pending.await.expect("registration kept for replay");
    assert_eq!(consumer.address(), "news");

    let stats = sync(&bus).await;
    assert_eq!(stats.consumers, 1);
    assert_eq!(stats.pending_tracks, 0);

    let mut next = acceptor.accept().await.expect("reconnect");
    next.handshake();
    sync(&bus).await;

    let track = expect_register(next.try_recv(), "news");
    ack(&next, &track);
    next.deliver(&json!({"address": "news", "body": "replayed"}));
    sync(&bus).await;
    assert_eq!(rx.try_recv(), Ok(json!("replayed")));

    // The released handle removes the registration for good.
    consumer.unregister();
    let stats = sync(&bus).await;
    assert_eq!(stats.consumers, 0);
    assert_eq!(
        drain(&mut next),
        vec![PeerFrame::Envelope(OutboundEnvelope::unregister("news"))]
    );
}

#[tokio::test(start_paused = true)]
async fn drop_all_abandons_unacknowledged_consumer() {
    let (bus, mut peer, _acceptor) = open_bus().await;

    let pending = bus.consumer("news", |_| None).expect("consumer");
    expect_register(peer.recv().await, "news");

    peer.close(CloseInfo::abnormal("reset"));

    assert!(matches!(pending.await, Err(Error::ConnectionClosed)));
    assert_eq!(sync(&bus).await.consumers, 0);
}

// ============================================================================
// Close
// ============================================================================

#[tokio::test(start_paused = true)]
async fn close_stops_reconnection() {
    let (bus, mut peer, mut acceptor) = open_bus().await;
    let (closed_tx, closed_rx) = oneshot::channel();
    let mut closed_tx = Some(closed_tx);
    bus.on_close(move |_, info| {
        if let Some(tx) = closed_tx.take() {
            let _ = tx.send(info.clone());
        }
    });

    bus.close();
    assert_eq!(bus.ready_state(), ReadyState::Closing);
    assert!(matches!(
        bus.send("a", json!(1), None),
        Err(Error::InvalidState {
            state: ReadyState::Closing
        })
    ));
    bus.close();

    assert_eq!(peer.recv().await, Some(PeerFrame::Close));
    peer.close(CloseInfo::new(Some(1000), "bye"));

    let info = closed_rx.await.expect("close listener");
    assert_eq!(info.code, Some(1000));
    assert_eq!(bus.ready_state(), ReadyState::Closed);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(acceptor.connect_count(), 1);
    assert!(acceptor.try_accept().is_none());

    // The event loop is gone.
    assert!(matches!(bus.stats().await, Err(Error::ConnectionClosed)));
}

#[tokio::test(start_paused = true)]
async fn close_while_waiting_to_reconnect() {
    let (bus, peer, acceptor) = open_bus().await;

    peer.close(CloseInfo::abnormal("reset"));
    assert!(sync(&bus).await.reconnect_pending);

    bus.close();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(bus.ready_state(), ReadyState::Closed);
    assert_eq!(acceptor.connect_count(), 1);
    assert!(bus.stats().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn dropping_every_handle_releases_transport() {
    let (bus, mut peer, _acceptor) = open_bus().await;

    drop(bus);

    assert_eq!(peer.recv().await, Some(PeerFrame::Close));
    assert_eq!(peer.recv().await, None);
}
