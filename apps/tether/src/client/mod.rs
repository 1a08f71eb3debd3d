pub mod log;

pub use log::MessageLog;

/// Outbound keep-alive token.
pub const PING_TOKEN: &str = "ping";
/// Inbound keep-alive reply, suppressed from the display log.
pub const PONG_TOKEN: &str = "pong";

/// The fixed command set understood by the server. Closed at build time;
/// each identifier maps 1:1 to an immutable wire token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Cmd1,
    Cmd2,
    Cmd3,
    Cmd4,
    Cmd5,
    Cmd6,
}

impl Command {
    pub const ALL: [Command; 6] = [
        Command::Cmd1,
        Command::Cmd2,
        Command::Cmd3,
        Command::Cmd4,
        Command::Cmd5,
        Command::Cmd6,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Command::Cmd1 => "cmd1",
            Command::Cmd2 => "cmd2",
            Command::Cmd3 => "cmd3",
            Command::Cmd4 => "cmd4",
            Command::Cmd5 => "cmd5",
            Command::Cmd6 => "cmd6",
        }
    }

    /// Map a key press (`'1'`..`'6'`) to its command slot.
    pub fn from_digit(digit: char) -> Option<Self> {
        match digit {
            '1' => Some(Command::Cmd1),
            '2' => Some(Command::Cmd2),
            '3' => Some(Command::Cmd3),
            '4' => Some(Command::Cmd4),
            '5' => Some(Command::Cmd5),
            '6' => Some(Command::Cmd6),
            _ => None,
        }
    }
}
