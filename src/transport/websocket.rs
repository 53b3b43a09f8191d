//! WebSocket transport over tokio-tungstenite.
//!
//! # Socket Task
//!
//! Each connection attempt spawns one tokio task that:
//!
//! - Connects to the resolved `ws://`/`wss://` URL
//! - Forwards inbound text frames to the bus
//! - Writes outbound frames queued through the [`TransportHandle`]
//! - Reports the close (or the connect failure) exactly once
//!
//! The task exits silently when the bus drops the handle.

// ============================================================================
// Imports
// ============================================================================

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::Error;

use super::connector::{CloseInfo, Connector, EventSink, TransportCommand, TransportHandle};

// ============================================================================
// Constants
// ============================================================================

/// Close code sent when the client closes on purpose.
const NORMAL_CLOSURE: u16 = 1000;

// ============================================================================
// WsConnector
// ============================================================================

/// Default [`Connector`] backed by tokio-tungstenite.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn connect(&self, url: &Url, sink: EventSink) -> TransportHandle {
        let (handle, commands) = TransportHandle::channel();
        tokio::spawn(run_socket(url.clone(), sink, commands));
        handle
    }
}

// ============================================================================
// Socket Task
// ============================================================================

/// Drives one WebSocket until it closes or the bus lets go of it.
async fn run_socket(
    url: Url,
    sink: EventSink,
    mut commands: mpsc::UnboundedReceiver<TransportCommand>,
) {
    let session = sink.session();

    let ws_stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            let error = Error::from(e);
            warn!(%url, %session, %error, "WebSocket connect failed");
            sink.closed(abnormal(&error));
            return;
        }
    };

    info!(%url, %session, "WebSocket connected");

    if !sink.opened() {
        return;
    }

    let (mut ws_write, mut ws_read) = ws_stream.split();

    let close_info = loop {
        tokio::select! {
            // Frames from the bridge
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        if !sink.message(text.as_str()) {
                            let _ = ws_write.close().await;
                            return;
                        }
                    }

                    Some(Ok(Message::Close(frame))) => {
                        debug!(%session, "WebSocket closed by remote");
                        break close_info_from(frame);
                    }

                    Some(Err(e)) => {
                        let error = Error::from(e);
                        error!(%session, %error, "WebSocket read failed");
                        break abnormal(&error);
                    }

                    None => {
                        debug!(%session, "WebSocket stream ended");
                        break CloseInfo::abnormal("stream ended");
                    }

                    // Ignore Binary, Ping, Pong
                    _ => {}
                }
            }

            // Frames from the bus
            command = commands.recv() => {
                match command {
                    Some(TransportCommand::Text(text)) => {
                        trace!(%session, len = text.len(), "Frame sent");
                        if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                            let error = Error::from(e);
                            warn!(%session, %error, "Failed to send frame");
                            break abnormal(&error);
                        }
                    }

                    Some(TransportCommand::Close) => {
                        debug!(%session, "Close requested");
                        let _ = ws_write.close().await;
                        break CloseInfo::new(Some(NORMAL_CLOSURE), "closed by client");
                    }

                    None => {
                        debug!(%session, "Transport released by bus");
                        let _ = ws_write.close().await;
                        return;
                    }
                }
            }
        }
    };

    sink.closed(close_info);
}

/// Close info for a transport that failed without a close frame.
fn abnormal(error: &Error) -> CloseInfo {
    CloseInfo::abnormal(error.to_string())
}

fn close_info_from(frame: Option<CloseFrame>) -> CloseInfo {
    match frame {
        Some(frame) => CloseInfo::new(Some(u16::from(frame.code)), frame.reason.as_str()),
        None => CloseInfo::default(),
    }
}

// ============================================================================
// Tests
// ============================================================================
