use std::time::Duration;

use tokio::sync::mpsc;

use crate::client::{Command, MessageLog, PING_TOKEN, PONG_TOKEN};
use crate::transport::{websocket, SocketEvent, SocketHandle};

mod keepalive;

use keepalive::KeepAlive;

/// Where to dial. Read from persisted settings once per connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// Events pushed to the UI collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Status(ConnectionStatus),
    /// Full display text plus a cursor at its end, for scroll-to-bottom.
    Log { text: String, cursor: usize },
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Keep-alive period while connected.
    pub ping_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(10),
        }
    }
}

#[derive(Debug)]
enum SessionCommand {
    Connect(Endpoint),
    Reconnect(Endpoint),
    Dispatch(Command),
    Shutdown,
}

/// Handle to the per-process connection session. All operations are
/// fire-and-forget: they enqueue onto the session's event loop and return
/// immediately; outcomes surface as [`UiEvent`]s.
#[derive(Debug, Clone)]
pub struct ConnectionSession {
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl ConnectionSession {
    /// Spawn the session event loop. The returned receiver carries status
    /// changes and log updates for the UI collaborator.
    pub fn spawn(config: SessionConfig) -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (ui_tx, ui_rx) = mpsc::unbounded_channel();
        let state = SessionState::new(config, ui_tx);
        tokio::spawn(state.run(command_rx));
        (Self { commands: command_tx }, ui_rx)
    }

    pub fn connect(&self, endpoint: Endpoint) {
        let _ = self.commands.send(SessionCommand::Connect(endpoint));
    }

    /// Supersede the current connection (if any) and dial again. Safe to
    /// call repeatedly; the newest call wins.
    pub fn reconnect(&self, endpoint: Endpoint) {
        let _ = self.commands.send(SessionCommand::Reconnect(endpoint));
    }

    pub fn dispatch(&self, command: Command) {
        let _ = self.commands.send(SessionCommand::Dispatch(command));
    }

    /// Tear the session down with a normal-closure close frame. Safe to call
    /// even if the session never connected.
    pub fn shutdown(&self) {
        let _ = self.commands.send(SessionCommand::Shutdown);
    }
}

/// State owned exclusively by the session event loop. Socket events and
/// keep-alive ticks are marshaled onto the loop through channels before any
/// of these fields are touched.
struct SessionState {
    status: ConnectionStatus,
    generation: u64,
    socket: Option<SocketHandle>,
    keepalive: KeepAlive,
    log: MessageLog,
    ui: mpsc::UnboundedSender<UiEvent>,
    events_tx: mpsc::UnboundedSender<SocketEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<SocketEvent>>,
    ticks_tx: mpsc::UnboundedSender<()>,
    ticks_rx: Option<mpsc::UnboundedReceiver<()>>,
}

impl SessionState {
    fn new(config: SessionConfig, ui: mpsc::UnboundedSender<UiEvent>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (ticks_tx, ticks_rx) = mpsc::unbounded_channel();
        Self {
            status: ConnectionStatus::Disconnected,
            generation: 0,
            socket: None,
            keepalive: KeepAlive::new(config.ping_interval),
            log: MessageLog::new(),
            ui,
            events_tx,
            events_rx: Some(events_rx),
            ticks_tx,
            ticks_rx: Some(ticks_rx),
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
        let mut events = self
            .events_rx
            .take()
            .unwrap_or_else(|| mpsc::unbounded_channel().1);
        let mut ticks = self
            .ticks_rx
            .take()
            .unwrap_or_else(|| mpsc::unbounded_channel().1);
        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(command) => {
                            if !self.handle_command(command) {
                                break;
                            }
                        }
                        // Every handle is gone; tear down as on shutdown.
                        None => {
                            self.shutdown();
                            break;
                        }
                    }
                }
                event = events.recv() => {
                    if let Some(event) = event {
                        self.handle_event(event);
                    }
                }
                tick = ticks.recv() => {
                    if tick.is_some() {
                        self.on_ping_tick();
                    }
                }
            }
        }
    }

    /// Returns false when the loop should stop.
    fn handle_command(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::Connect(endpoint) => self.open_socket(endpoint),
            SessionCommand::Reconnect(endpoint) => {
                self.append_log("Attempting to reconnect...");
                self.discard_socket();
                self.open_socket(endpoint);
            }
            SessionCommand::Dispatch(command) => self.dispatch(command),
            SessionCommand::Shutdown => {
                self.shutdown();
                return false;
            }
        }
        true
    }

    fn handle_event(&mut self, event: SocketEvent) {
        // Late events from a superseded socket must not mutate state.
        if event.generation() != self.generation {
            tracing::trace!(
                target: "tether::session",
                stale = event.generation(),
                current = self.generation,
                "dropping stale socket event"
            );
            return;
        }
        match event {
            SocketEvent::Opened { .. } => {
                self.set_status(ConnectionStatus::Connected);
                self.append_log("Connected to server");
                let ticks = self.ticks_tx.clone();
                self.keepalive.start(move || {
                    let _ = ticks.send(());
                });
            }
            SocketEvent::Message { text, .. } => {
                if text == PONG_TOKEN {
                    return;
                }
                self.append_log(&format!("Server: {text}"));
            }
            SocketEvent::Failed { error, .. } => {
                self.drop_connection(&format!("Connection failed: {error}"));
            }
            SocketEvent::Closed { reason, .. } => {
                self.drop_connection(&format!("Connection closing: {reason}"));
            }
        }
    }

    /// One keep-alive tick, already marshaled onto the loop. Fire-and-forget:
    /// the send result is ignored beyond a trace line.
    fn on_ping_tick(&mut self) {
        if self.status != ConnectionStatus::Connected {
            return;
        }
        let sent = self.send(PING_TOKEN);
        tracing::trace!(target: "tether::session", sent, "keep-alive ping");
    }

    fn open_socket(&mut self, endpoint: Endpoint) {
        self.generation += 1;
        self.set_status(ConnectionStatus::Connecting);
        match websocket::connect(&endpoint, self.generation, self.events_tx.clone()) {
            Ok(handle) => self.socket = Some(handle),
            Err(err) => {
                self.socket = None;
                self.set_status(ConnectionStatus::Disconnected);
                self.append_log(&format!("Connection failed: {err}"));
            }
        }
    }

    /// Attempt to queue `token` on the live socket. Success means local
    /// enqueue only; delivery is never guaranteed.
    fn send(&mut self, token: &str) -> bool {
        if self.status != ConnectionStatus::Connected {
            return false;
        }
        match &self.socket {
            Some(handle) => handle.send_text(token).is_ok(),
            None => false,
        }
    }

    fn dispatch(&mut self, command: Command) {
        if self.status != ConnectionStatus::Connected {
            self.append_log("Not connected to server!");
            return;
        }
        let token = command.token();
        tracing::debug!(target: "tether::session", token, "dispatching command");
        if self.send(token) {
            self.append_log(&format!("Sent: {token}"));
        } else {
            self.append_log(&format!("Failed to send: {token}"));
        }
    }

    /// Forcibly discard the current socket without a close handshake; its
    /// in-flight events become stale once the generation moves on.
    fn discard_socket(&mut self) {
        self.keepalive.stop();
        if let Some(handle) = self.socket.take() {
            tracing::debug!(
                target: "tether::session",
                generation = handle.generation(),
                "discarding superseded socket"
            );
        }
    }

    fn drop_connection(&mut self, line: &str) {
        self.keepalive.stop();
        self.socket = None;
        self.set_status(ConnectionStatus::Disconnected);
        self.append_log(line);
    }

    fn shutdown(&mut self) {
        self.keepalive.stop();
        if let Some(handle) = self.socket.take() {
            handle.close();
        }
        self.set_status(ConnectionStatus::Disconnected);
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if self.status == status {
            return;
        }
        tracing::info!(target: "tether::session", ?status, "connection status changed");
        self.status = status;
        let _ = self.ui.send(UiEvent::Status(status));
    }

    fn append_log(&mut self, line: &str) {
        self.log.append(line);
        let (text, cursor) = self.log.snapshot();
        let _ = self.ui.send(UiEvent::Log { text, cursor });
    }
}
