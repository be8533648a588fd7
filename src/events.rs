//! Messages posted to the UI thread and the transient state they drive.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::screens::ScreenId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Events sent by background tasks. Only the UI thread applies them.
#[derive(Clone, Debug)]
pub enum UiEvent {
    Started {
        screen: ScreenId,
        pid: u32,
    },
    /// One line of process output, without its newline.
    Output {
        screen: ScreenId,
        pid: u32,
        stream: Stream,
        line: String,
    },
    /// Both streams drained and the process reaped.
    Finished {
        screen: ScreenId,
        pid: u32,
        runtime: Duration,
        /// `-1` when the process was killed by a signal.
        exit_code: i32,
        /// Working directory the process left behind, if `lsof` found one.
        cwd: Option<PathBuf>,
    },
    SpawnFailed {
        screen: ScreenId,
        command: String,
        error: String,
    },
    Status(String),
}

/// Message of the status bar; disappears after a fixed time.
#[derive(Debug)]
pub struct StatusLine {
    text: String,
    set_at: Option<Instant>,
    ttl: Duration,
}

impl StatusLine {
    pub fn new(ttl: Duration) -> Self {
        Self {
            text: String::new(),
            set_at: None,
            ttl,
        }
    }

    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.set_at = Some(Instant::now());
    }

    /// Clear the message once it has been shown long enough.
    pub fn tick(&mut self, now: Instant) {
        if let Some(at) = self.set_at
            && now.duration_since(at) >= self.ttl
        {
            self.text.clear();
            self.set_at = None;
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// PID/runtime and exit-code indicators of the status bar.
#[derive(Debug, Default)]
pub struct Indicators {
    pub pid: String,
    pub rc: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_clears_after_ttl() {
        let mut status = StatusLine::new(Duration::from_secs(3));
        status.set("Command interrupted.");
        let start = Instant::now();
        status.tick(start);
        assert_eq!(status.text(), "Command interrupted.");
        status.tick(start + Duration::from_secs(4));
        assert_eq!(status.text(), "");
    }
}
