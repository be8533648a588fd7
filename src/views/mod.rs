//! Per-mode screen contents and the init functions that populate them.

pub mod console;
pub mod editor;
pub mod files;
pub mod help;
pub mod hexedit;
pub mod process;
pub mod sqlite;

use std::path::PathBuf;

use ratatui::prelude::*;

use crate::screens::{InitFn, Mode};

use self::{
    console::ConsoleView, editor::EditorView, files::FilesView, help::HelpView, hexedit::HexView,
    process::ProcessView, sqlite::SqlView,
};

/// Which widget of the visible screen receives keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    /// The persistent command prompt.
    Prompt,
    /// The screen's own panel (console, listing, editor...).
    Panel,
}

/// State owned by one screen.
pub enum ScreenView {
    Shell(ConsoleView),
    Files(FilesView),
    TextEdit(EditorView),
    HexEdit(HexView),
    Process(ProcessView),
    SQLite3(SqlView),
    Help(HelpView),
}

impl ScreenView {
    /// Empty state for a screen of `mode`; the init function fills it.
    pub fn new(mode: Mode) -> Self {
        match mode {
            Mode::Shell => Self::Shell(ConsoleView::default()),
            Mode::Files => Self::Files(FilesView::default()),
            Mode::TextEdit => Self::TextEdit(EditorView::default()),
            Mode::HexEdit => Self::HexEdit(HexView::default()),
            Mode::Process => Self::Process(ProcessView::default()),
            Mode::SQLite3 => Self::SQLite3(SqlView::default()),
            Mode::Help => Self::Help(HelpView::default()),
        }
    }

    pub fn console_mut(&mut self) -> Option<&mut ConsoleView> {
        match self {
            Self::Shell(console) => Some(console),
            _ => None,
        }
    }

    /// Move the panel selection or scroll position by `delta` rows.
    pub fn scroll_by(&mut self, delta: isize) {
        match self {
            Self::Shell(v) => v.scroll_by(delta),
            Self::Files(v) => v.select_by(delta),
            Self::Process(v) => v.select_by(delta),
            Self::HexEdit(v) => v.scroll_by(delta),
            Self::SQLite3(v) => v.scroll_by(delta),
            Self::Help(v) => v.scroll_by(delta),
            Self::TextEdit(_) => {}
        }
    }

    pub fn render(&self, f: &mut Frame, area: Rect, focused: bool) {
        match self {
            Self::Shell(v) => console::render(f, area, v, focused),
            Self::Files(v) => files::render(f, area, v, focused),
            Self::TextEdit(v) => editor::render(f, area, v, focused),
            Self::HexEdit(v) => hexedit::render(f, area, v, focused),
            Self::Process(v) => process::render(f, area, v, focused),
            Self::SQLite3(v) => sqlite::render(f, area, v, focused),
            Self::Help(v) => help::render(f, area, v, focused),
        }
    }
}

/// Values the init functions read from the running session.
pub struct InitContext {
    pub cwd: PathBuf,
    pub console_max_lines: usize,
}

/// Init function used when a screen of `mode` is opened.
pub fn init_for(mode: Mode, ctx: &InitContext) -> Option<InitFn> {
    match mode {
        Mode::Shell => Some(console::init(ctx.console_max_lines)),
        Mode::Files => Some(files::init(ctx.cwd.clone())),
        Mode::TextEdit => Some(editor::init(ctx.cwd.clone())),
        Mode::HexEdit => Some(hexedit::init(ctx.cwd.clone())),
        Mode::Process => Some(process::init()),
        Mode::SQLite3 => Some(sqlite::init()),
        Mode::Help => Some(help::init()),
    }
}

/// Border block shared by the panels; focused panels get a highlighted border.
pub(crate) fn panel_block(title: String, focused: bool) -> ratatui::widgets::Block<'static> {
    use ratatui::widgets::{Block, Borders};
    let border = if focused {
        Style::default().fg(Color::LightGreen)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(title)
}

/// Move `index` by `delta` inside `0..len`, clamping at both ends.
pub(crate) fn step(index: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let moved = index as isize + delta;
    moved.clamp(0, len as isize - 1) as usize
}
