use std::collections::VecDeque;

/// Display lines retained before FIFO eviction kicks in.
const MAX_LINES: usize = 5;

/// Bounded, append-only view model for the status/server text shown to the
/// user. Pure and synchronous; the session owns the only instance.
#[derive(Debug, Default)]
pub struct MessageLog {
    lines: VecDeque<String>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line, evicting from the front so at most the 5 most recent
    /// lines remain.
    pub fn append(&mut self, line: &str) {
        self.lines.push_back(line.to_string());
        while self.lines.len() > MAX_LINES {
            self.lines.pop_front();
        }
    }

    /// Joined display text plus a cursor at its end, for scroll-to-bottom.
    pub fn snapshot(&self) -> (String, usize) {
        let text = self
            .lines
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        let cursor = text.len();
        (text, cursor)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }
}
