use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use super::{NORMAL_CLOSE_REASON, OutboundFrame, SocketEvent, SocketHandle, TransportError};
use crate::session::Endpoint;

/// Validate the configured endpoint and produce the websocket address.
pub fn build_ws_url(endpoint: &Endpoint) -> Result<Url, TransportError> {
    let host = endpoint.host.trim();
    let port = endpoint.port.trim();
    if host.is_empty() || port.is_empty() {
        return Err(TransportError::Setup(
            "host and port must be non-empty".to_string(),
        ));
    }
    let raw = format!("ws://{host}:{port}");
    Url::parse(&raw).map_err(|err| TransportError::Setup(format!("invalid address {raw}: {err}")))
}

/// Dial the endpoint on a background task and return the generation-tagged
/// handle. Returns immediately; the outcome arrives later as [`SocketEvent`]s.
/// Only a malformed address fails synchronously.
pub fn connect(
    endpoint: &Endpoint,
    generation: u64,
    events: mpsc::UnboundedSender<SocketEvent>,
) -> Result<SocketHandle, TransportError> {
    let url = build_ws_url(endpoint)?;
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let io = tokio::spawn(run_socket(url, generation, outbound_rx, events));
    Ok(SocketHandle::new(generation, outbound_tx, Some(io)))
}

async fn run_socket(
    url: Url,
    generation: u64,
    mut outbound: mpsc::UnboundedReceiver<OutboundFrame>,
    events: mpsc::UnboundedSender<SocketEvent>,
) {
    let ws_stream = match connect_async(url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(err) => {
            let _ = events.send(SocketEvent::Failed {
                generation,
                error: err.to_string(),
            });
            return;
        }
    };
    tracing::debug!(target: "tether::transport", generation, url = %url, "websocket connected");
    let _ = events.send(SocketEvent::Opened { generation });

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Forward queued frames to the socket; a Close frame ends the writer.
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            match frame {
                OutboundFrame::Text(text) => {
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                OutboundFrame::Close => {
                    let close = CloseFrame {
                        code: CloseCode::Normal,
                        reason: NORMAL_CLOSE_REASON.into(),
                    };
                    let _ = ws_sender.send(Message::Close(Some(close))).await;
                    break;
                }
            }
        }
    });

    loop {
        match ws_receiver.next().await {
            Some(Ok(Message::Text(text))) => {
                tracing::trace!(target: "tether::transport", generation, %text, "received message");
                if events.send(SocketEvent::Message { generation, text }).is_err() {
                    break;
                }
            }
            Some(Ok(Message::Close(frame))) => {
                let reason = frame
                    .map(|f| f.reason.to_string())
                    .unwrap_or_else(|| "closed by server".to_string());
                let _ = events.send(SocketEvent::Closed { generation, reason });
                break;
            }
            Some(Ok(_)) => {} // Binary/Ping/Pong frames are outside the protocol.
            Some(Err(err)) => {
                let _ = events.send(SocketEvent::Failed {
                    generation,
                    error: err.to_string(),
                });
                break;
            }
            None => {
                let _ = events.send(SocketEvent::Closed {
                    generation,
                    reason: "connection lost".to_string(),
                });
                break;
            }
        }
    }

    writer.abort();
    let _ = writer.await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(host: &str, port: &str) -> Endpoint {
        Endpoint {
            host: host.to_string(),
            port: port.to_string(),
        }
    }

    #[test]
    fn builds_plain_ws_url() {
        let url = build_ws_url(&endpoint("10.0.2.2", "8080")).expect("valid url");
        assert_eq!(url.scheme(), "ws");
        assert_eq!(url.host_str(), Some("10.0.2.2"));
        assert_eq!(url.port(), Some(8080));
    }

    #[test]
    fn trims_whitespace_from_fields() {
        let url = build_ws_url(&endpoint(" 10.0.2.2 ", " 8080 ")).expect("valid url");
        assert_eq!(url.host_str(), Some("10.0.2.2"));
    }

    #[test]
    fn rejects_empty_host_or_port() {
        assert!(build_ws_url(&endpoint("", "8080")).is_err());
        assert!(build_ws_url(&endpoint("10.0.2.2", "")).is_err());
        assert!(build_ws_url(&endpoint("   ", "8080")).is_err());
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(build_ws_url(&endpoint("not a host", "8080")).is_err());
        assert!(build_ws_url(&endpoint("10.0.2.2", "not-a-port")).is_err());
    }
}
