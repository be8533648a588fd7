//! Scrollback console of a Shell screen.

use std::collections::VecDeque;
use std::sync::LazyLock;

use ratatui::{
    prelude::*,
    widgets::{Paragraph, Wrap},
};
use regex::Regex;

use crate::screens::InitFn;

use super::{ScreenView, panel_block};

/// Lines kept when the config does not say otherwise.
pub const DEFAULT_MAX_LINES: usize = 5000;

static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(\x07|\x1b\\)|\x1b[@-Z\\-_]")
        .expect("static regex")
});

/// How a console line is drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    /// Echo of a submitted command.
    Header,
    Stdout,
    Stderr,
    /// Post-exit runtime and exit code.
    Summary,
    Info,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsoleLine {
    pub kind: LineKind,
    pub text: String,
}

/// Bounded line buffer with a scroll offset counted from the newest line.
#[derive(Debug)]
pub struct ConsoleView {
    lines: VecDeque<ConsoleLine>,
    max_lines: usize,
    scroll: usize,
}

impl Default for ConsoleView {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_LINES)
    }
}

impl ConsoleView {
    pub fn with_capacity(max_lines: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            max_lines: max_lines.max(1),
            scroll: 0,
        }
    }

    /// Append a line and scroll to it. Process output has ANSI codes removed.
    pub fn push(&mut self, kind: LineKind, text: impl Into<String>) {
        let text = text.into();
        let text = match kind {
            LineKind::Stdout | LineKind::Stderr => strip_ansi(&text),
            _ => text,
        };
        self.lines.push_back(ConsoleLine { kind, text });
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
        self.scroll_to_end();
    }

    /// Echo a command line before its output.
    pub fn header(&mut self, command: &str) {
        self.push(LineKind::Info, "");
        self.push(LineKind::Header, format!("⯈ {command}:"));
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.scroll = 0;
    }

    pub fn lines(&self) -> impl Iterator<Item = &ConsoleLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn scroll_to_end(&mut self) {
        self.scroll = 0;
    }

    /// Positive values move towards newer lines.
    pub fn scroll_by(&mut self, delta: isize) {
        let max = self.len().saturating_sub(1) as isize;
        self.scroll = (self.scroll as isize - delta).clamp(0, max) as usize;
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    fn set_capacity(&mut self, max_lines: usize) {
        self.max_lines = max_lines.max(1);
    }
}

/// Remove terminal escape sequences from a line of process output.
pub fn strip_ansi(text: &str) -> String {
    ANSI_RE.replace_all(text, "").into_owned()
}

pub fn init(max_lines: usize) -> InitFn {
    Box::new(move |view, _payload| {
        if let ScreenView::Shell(console) = view {
            console.set_capacity(max_lines);
        }
        Ok(())
    })
}

fn style_for(kind: LineKind) -> Style {
    match kind {
        LineKind::Header => Style::default().fg(Color::Red),
        LineKind::Stdout | LineKind::Info => Style::default().fg(Color::White),
        LineKind::Stderr | LineKind::Summary => Style::default().fg(Color::Yellow),
        LineKind::Error => Style::default().fg(Color::LightRed),
    }
}

pub fn render(f: &mut Frame, area: Rect, view: &ConsoleView, focused: bool) {
    let height = area.height.saturating_sub(2) as usize;
    let end = view.len().saturating_sub(view.scroll());
    let start = end.saturating_sub(height);

    let lines: Vec<Line> = view
        .lines()
        .skip(start)
        .take(end - start)
        .map(|l| Line::from(Span::styled(l.text.clone(), style_for(l.kind))))
        .collect();

    let title = if view.scroll() > 0 {
        format!("Console (+{})", view.scroll())
    } else {
        "Console".to_string()
    };
    let widget = Paragraph::new(lines)
        .block(panel_block(title, focused))
        .wrap(Wrap { trim: false });
    f.render_widget(widget, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_strips_ansi_from_output_only() {
        let mut console = ConsoleView::default();
        console.push(LineKind::Stdout, "\x1b[1;32mgreen\x1b[0m text");
        console.push(LineKind::Info, "\x1b[1mkept");
        let lines: Vec<_> = console.lines().map(|l| l.text.as_str()).collect();
        assert_eq!(lines, vec!["green text", "\x1b[1mkept"]);
    }

    #[test]
    fn test_capacity_drops_oldest_lines() {
        let mut console = ConsoleView::with_capacity(3);
        for i in 0..5 {
            console.push(LineKind::Stdout, format!("line {i}"));
        }
        let lines: Vec<_> = console.lines().map(|l| l.text.clone()).collect();
        assert_eq!(lines, vec!["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn test_new_output_scrolls_to_end() {
        let mut console = ConsoleView::default();
        for i in 0..10 {
            console.push(LineKind::Stdout, format!("{i}"));
        }
        console.scroll_by(-4);
        assert_eq!(console.scroll(), 4);
        console.scroll_by(-100);
        assert_eq!(console.scroll(), 9);
        console.push(LineKind::Stderr, "late");
        assert_eq!(console.scroll(), 0);
    }

    #[test]
    fn test_header_and_clear() {
        let mut console = ConsoleView::default();
        console.header("ls -l");
        assert_eq!(console.len(), 2);
        assert_eq!(console.lines().last().map(|l| l.kind), Some(LineKind::Header));
        console.clear();
        assert_eq!(console.len(), 0);
    }
}
