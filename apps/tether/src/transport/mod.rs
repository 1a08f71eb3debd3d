use thiserror::Error;
use tokio::sync::mpsc;

pub mod mock;
pub mod websocket;

/// Reason string carried by the close frame on normal teardown.
pub const NORMAL_CLOSE_REASON: &str = "client shutting down";

#[derive(Debug, Error)]
pub enum TransportError {
    /// The address was malformed or the connection could not be set up.
    #[error("{0}")]
    Setup(String),
    /// The socket task is gone and the outbound queue no longer accepts writes.
    #[error("transport channel closed")]
    ChannelClosed,
}

/// Events emitted by a socket's I/O task. Every event carries the generation
/// of the handle that produced it so superseded sockets cannot mutate state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Opened { generation: u64 },
    Message { generation: u64, text: String },
    Failed { generation: u64, error: String },
    Closed { generation: u64, reason: String },
}

impl SocketEvent {
    pub fn generation(&self) -> u64 {
        match self {
            SocketEvent::Opened { generation }
            | SocketEvent::Message { generation, .. }
            | SocketEvent::Failed { generation, .. }
            | SocketEvent::Closed { generation, .. } => *generation,
        }
    }
}

/// Frames accepted by the writer half of a socket task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    /// Send a normal-closure close frame and stop writing.
    Close,
}

/// Exclusive handle to one live socket. Replaced wholesale on reconnect;
/// dropping it aborts the I/O task so a superseded connection cannot linger.
pub struct SocketHandle {
    generation: u64,
    outbound: mpsc::UnboundedSender<OutboundFrame>,
    io: Option<tokio::task::JoinHandle<()>>,
}

impl SocketHandle {
    pub(crate) fn new(
        generation: u64,
        outbound: mpsc::UnboundedSender<OutboundFrame>,
        io: Option<tokio::task::JoinHandle<()>>,
    ) -> Self {
        Self {
            generation,
            outbound,
            io,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Queue a text frame. Success means enqueued locally, not delivered.
    pub fn send_text(&self, text: &str) -> Result<(), TransportError> {
        self.outbound
            .send(OutboundFrame::Text(text.to_string()))
            .map_err(|_| TransportError::ChannelClosed)
    }

    /// Queue the normal close frame and detach the I/O task so it can flush
    /// the handshake before exiting on its own.
    pub fn close(mut self) {
        let _ = self.outbound.send(OutboundFrame::Close);
        self.io.take();
    }
}

impl Drop for SocketHandle {
    fn drop(&mut self) {
        if let Some(task) = self.io.take() {
            task.abort();
        }
    }
}
