use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyModifiers};
use crossterm::style::Stylize;
use crossterm::{cursor, queue, terminal};
use futures_util::StreamExt;
use tokio::sync::mpsc;

use tether_client_core::client::Command;
use tether_client_core::config::Settings;
use tether_client_core::session::{ConnectionSession, ConnectionStatus, SessionConfig, UiEvent};
use tether_client_core::telemetry::{self, LogConfig, LogLevel};

/// Per-key debounce so a held button cannot spam the server.
const DISPATCH_DEBOUNCE: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "tether", about = "Thin command pad over a persistent websocket")]
struct Cli {
    /// Server host; overrides and persists the stored setting.
    #[arg(long)]
    host: Option<String>,

    /// Server port; overrides and persists the stored setting.
    #[arg(long)]
    port: Option<String>,

    #[arg(long, value_enum, default_value_t = LogLevel::default())]
    log_level: LogLevel,

    /// Write logs to a file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(&LogConfig {
        level: cli.log_level,
        file: cli.log_file.clone(),
    })?;

    let mut settings = Settings::load();
    if cli.host.is_some() || cli.port.is_some() {
        if let Some(host) = cli.host {
            settings.host = host;
        }
        if let Some(port) = cli.port {
            settings.port = port;
        }
        if let Err(err) = settings.save() {
            tracing::warn!(target: "tether", %err, "failed to persist settings");
        }
    }

    let (session, mut ui) = ConnectionSession::spawn(SessionConfig::default());
    session.connect(settings.endpoint());

    terminal::enable_raw_mode()?;
    let result = frontend_loop(&session, &settings, &mut ui).await;
    terminal::disable_raw_mode()?;

    session.shutdown();
    // The close frame needs a beat to flush before the runtime exits.
    tokio::time::sleep(Duration::from_millis(100)).await;
    result
}

async fn frontend_loop(
    session: &ConnectionSession,
    settings: &Settings,
    ui: &mut mpsc::UnboundedReceiver<UiEvent>,
) -> Result<()> {
    let mut input = EventStream::new();
    let mut status = ConnectionStatus::Disconnected;
    let mut text = String::new();
    let mut last_dispatch: HashMap<Command, Instant> = HashMap::new();

    redraw(status, &text)?;
    loop {
        tokio::select! {
            event = ui.recv() => {
                match event {
                    Some(UiEvent::Status(new_status)) => {
                        status = new_status;
                        redraw(status, &text)?;
                    }
                    Some(UiEvent::Log { text: new_text, .. }) => {
                        text = new_text;
                        redraw(status, &text)?;
                    }
                    None => break,
                }
            }
            key = input.next() => {
                match key {
                    Some(Ok(Event::Key(key))) => {
                        if !handle_key(key, session, settings, &mut last_dispatch) {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }
        }
    }
    Ok(())
}

/// Returns false when the user asked to quit.
fn handle_key(
    key: KeyEvent,
    session: &ConnectionSession,
    settings: &Settings,
    last_dispatch: &mut HashMap<Command, Instant>,
) -> bool {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return false,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return false,
        KeyCode::Char('r') => session.reconnect(settings.endpoint()),
        KeyCode::Char(digit) => {
            if let Some(command) = Command::from_digit(digit) {
                let now = Instant::now();
                let ready = last_dispatch
                    .get(&command)
                    .map_or(true, |at| now.duration_since(*at) >= DISPATCH_DEBOUNCE);
                if ready {
                    last_dispatch.insert(command, now);
                    session.dispatch(command);
                }
            }
        }
        _ => {}
    }
    true
}

fn redraw(status: ConnectionStatus, text: &str) -> Result<()> {
    let mut stdout = std::io::stdout();
    queue!(
        stdout,
        terminal::Clear(terminal::ClearType::All),
        cursor::MoveTo(0, 0)
    )?;
    let marker = match status {
        ConnectionStatus::Connected => "● connected".green(),
        ConnectionStatus::Connecting => "● connecting".yellow(),
        ConnectionStatus::Disconnected => "● disconnected".red(),
    };
    write!(
        stdout,
        "{marker}   [1-6] send command   [r] reconnect   [q] quit\r\n\r\n"
    )?;
    for line in text.lines() {
        write!(stdout, "{line}\r\n")?;
    }
    stdout.flush()?;
    Ok(())
}
