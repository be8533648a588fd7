//! Frame layout helpers.

use ratatui::prelude::*;

/// The five rows of the main frame.
pub struct MainLayout {
    /// Date, title and time.
    pub header: Rect,
    /// The visible screen.
    pub body: Rect,
    pub prompt: Rect,
    /// Global and mode key hints.
    pub hints: Rect,
    pub status: Rect,
}

/// Status bar columns.
pub struct StatusLayout {
    pub user: Rect,
    pub message: Rect,
    pub pid: Rect,
    pub rc: Rect,
    pub cwd: Rect,
}

pub fn create_main_layout(area: Rect) -> MainLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(3),    // body
            Constraint::Length(3), // prompt
            Constraint::Length(2), // key hints
            Constraint::Length(1), // status
        ])
        .split(area);

    MainLayout {
        header: chunks[0],
        body: chunks[1],
        prompt: chunks[2],
        hints: chunks[3],
        status: chunks[4],
    }
}

pub fn create_status_layout(area: Rect) -> StatusLayout {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(24),
            Constraint::Min(10),
            Constraint::Length(14),
            Constraint::Length(9),
            Constraint::Percentage(30),
        ])
        .split(area);

    StatusLayout {
        user: chunks[0],
        message: chunks[1],
        pid: chunks[2],
        rc: chunks[3],
        cwd: chunks[4],
    }
}
