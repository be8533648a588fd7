//! Screen stack: the ordered set of open screens and the one on display.
//!
//! Navigation (next/previous/jump) follows insertion order. Only closing a
//! screen uses recency: it returns to the screen that was active just before,
//! tracked in a single slot.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::views::{Focus, ScreenView};

/// Kind of an open screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Shell,
    Files,
    TextEdit,
    HexEdit,
    Process,
    SQLite3,
    Help,
}

impl Mode {
    /// Title shown in the header bar and the window title.
    pub fn title(self) -> &'static str {
        match self {
            Mode::Shell => "Shell",
            Mode::Files => "Files",
            Mode::TextEdit => "Text Editor",
            Mode::HexEdit => "HexEdit",
            Mode::Process => "Process",
            Mode::SQLite3 => "SQLite3",
            Mode::Help => "Help",
        }
    }

    /// Mode-specific line of the key-hint bar.
    pub fn key_hints(self) -> &'static str {
        match self {
            Mode::Shell => "Tab=Console Up/Down=History cls=Clear cd=Change directory",
            Mode::Files => "Enter=Open x=Hex Up/Down=Select F5=Reload",
            Mode::TextEdit => "Tab/Esc=Prompt Ctrl+O=Open Ctrl+S=Save Enter=New line",
            Mode::HexEdit => "Ctrl+O=Open Ctrl+S=Close Up/Down=Scroll",
            Mode::Process => "k=Kill s=Signal p=Pause/Resume F5=Reload",
            Mode::SQLite3 => "Ctrl+O=Open Ctrl+S=Close .tables .schema .databases",
            Mode::Help => "Up/Down=Scroll",
        }
    }

    /// Widget that receives focus when a screen of this mode is activated.
    pub fn primary_focus(self) -> Focus {
        match self {
            Mode::Shell | Mode::HexEdit | Mode::SQLite3 => Focus::Prompt,
            Mode::Files | Mode::TextEdit | Mode::Process | Mode::Help => Focus::Panel,
        }
    }
}

/// Short random identifier of a screen (six hex digits).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScreenId(String);

impl ScreenId {
    fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(hex[..6].to_string())
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value handed to a screen's init function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    /// Acting user name (Process screens).
    User(String),
    /// File to open right away (TextEdit and HexEdit screens).
    Path(PathBuf),
}

/// Populates a freshly created screen. Runs exactly once, synchronously.
pub type InitFn = Box<dyn FnOnce(&mut ScreenView, Option<&Payload>) -> anyhow::Result<()>>;

/// One open, independently stateful view.
pub struct Screen {
    pub id: ScreenId,
    pub mode: Mode,
    pub title: String,
    pub view: ScreenView,
    pub payload: Option<Payload>,
    pub focus: Focus,
}

impl Screen {
    fn new(id: ScreenId, mode: Mode, payload: Option<Payload>) -> Self {
        Self {
            id,
            mode,
            title: mode.title().to_string(),
            view: ScreenView::new(mode),
            payload,
            focus: mode.primary_focus(),
        }
    }

    /// Label used by the global menu and the header, e.g. `Shell-1a2b3c`.
    pub fn label(&self) -> String {
        format!("{}-{}", self.title, self.id)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CloseError {
    #[error("cannot close the last shell screen")]
    LastShell,
}

/// Result of opening a screen. The screen is open even when init failed.
pub struct Opened {
    pub id: ScreenId,
    pub init_error: Option<anyhow::Error>,
}

/// Ordered collection of open screens plus the cursor on the visible one.
pub struct ScreenStack {
    screens: Vec<Screen>,
    cursor: usize,
    previous: Option<ScreenId>,
}

impl ScreenStack {
    /// Create a stack holding a single Shell screen.
    pub fn new() -> Self {
        Self {
            screens: vec![Screen::new(ScreenId::generate(), Mode::Shell, None)],
            cursor: 0,
            previous: None,
        }
    }

    /// Open a new screen on top, run its init function and display it.
    pub fn add_new_screen(
        &mut self,
        mode: Mode,
        init: Option<InitFn>,
        payload: Option<Payload>,
    ) -> Opened {
        let leaving = self.current_screen_id().clone();
        let id = self.unused_id();
        self.screens.push(Screen::new(id.clone(), mode, payload));
        self.cursor = self.screens.len() - 1;

        let init_error = init.and_then(|init| {
            let screen = &mut self.screens[self.cursor];
            init(&mut screen.view, screen.payload.as_ref()).err()
        });

        self.activate(self.cursor, Some(leaving));
        Opened { id, init_error }
    }

    /// Close the visible screen and return to the one active before it.
    ///
    /// The last remaining Shell screen is never closed.
    pub fn close_current_screen(&mut self) -> Result<Screen, CloseError> {
        let closing = &self.screens[self.cursor];
        if closing.mode == Mode::Shell && self.count(Mode::Shell) == 1 {
            return Err(CloseError::LastShell);
        }

        let removed_at = self.cursor;
        let removed = self.screens.remove(removed_at);
        let fallback = removed_at.saturating_sub(1).min(self.screens.len() - 1);
        let target = self
            .previous
            .take()
            .and_then(|id| self.position(&id))
            .unwrap_or(fallback);
        // The leaving screen no longer exists, so the recency slot stays empty.
        self.activate(target, None);
        Ok(removed)
    }

    pub fn show_next_screen(&mut self) {
        let next = (self.cursor + 1) % self.screens.len();
        self.show(next);
    }

    pub fn show_previous_screen(&mut self) {
        let len = self.screens.len();
        let prev = (self.cursor + len - 1) % len;
        self.show(prev);
    }

    /// Jump to the screen at `index` (wrapped to the stack length).
    pub fn show_screen(&mut self, index: usize) {
        let index = index % self.screens.len();
        self.show(index);
    }

    pub fn current_screen_id(&self) -> &ScreenId {
        &self.screens[self.cursor].id
    }

    pub fn current(&self) -> &Screen {
        &self.screens[self.cursor]
    }

    pub fn current_mut(&mut self) -> &mut Screen {
        &mut self.screens[self.cursor]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.screens.len()
    }

    pub fn screens(&self) -> &[Screen] {
        &self.screens
    }

    pub fn get_mut(&mut self, id: &ScreenId) -> Option<&mut Screen> {
        self.screens.iter_mut().find(|s| &s.id == id)
    }

    pub fn position(&self, id: &ScreenId) -> Option<usize> {
        self.screens.iter().position(|s| &s.id == id)
    }

    /// Shell screen that receives output of commands typed from the visible
    /// screen: the visible screen itself when it is a Shell, otherwise the
    /// most recently opened Shell.
    pub fn shell_target(&self) -> &ScreenId {
        let current = self.current();
        if current.mode == Mode::Shell {
            return &current.id;
        }
        self.screens
            .iter()
            .rev()
            .find(|s| s.mode == Mode::Shell)
            .map(|s| &s.id)
            .unwrap_or(&current.id)
    }

    fn count(&self, mode: Mode) -> usize {
        self.screens.iter().filter(|s| s.mode == mode).count()
    }

    fn show(&mut self, index: usize) {
        let leaving = self.current_screen_id().clone();
        self.activate(index, Some(leaving));
    }

    fn activate(&mut self, index: usize, leaving: Option<ScreenId>) {
        self.cursor = index;
        let screen = &mut self.screens[index];
        if let Some(leaving) = leaving
            && leaving != screen.id
        {
            self.previous = Some(leaving);
        }
        screen.focus = screen.mode.primary_focus();
        tracing::debug!("screen {} active", screen.label());
    }

    fn unused_id(&self) -> ScreenId {
        loop {
            let id = ScreenId::generate();
            if self.position(&id).is_none() {
                return id;
            }
        }
    }
}

impl Default for ScreenStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn stack_with(modes: &[Mode]) -> ScreenStack {
        let mut stack = ScreenStack::new();
        for mode in modes {
            stack.add_new_screen(*mode, None, None);
        }
        stack
    }

    fn current_mode(stack: &ScreenStack) -> Mode {
        stack.current().mode
    }

    #[test]
    fn test_new_stack_holds_one_shell() {
        let stack = ScreenStack::new();
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.cursor(), 0);
        assert_eq!(current_mode(&stack), Mode::Shell);
        assert_eq!(stack.current_screen_id().to_string().len(), 6);
    }

    #[test]
    fn test_add_runs_init_once_with_payload() {
        let mut stack = ScreenStack::new();
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let init: InitFn = Box::new(move |_view, payload| {
            seen.set(seen.get() + 1);
            assert_eq!(payload, Some(&Payload::User("alice".into())));
            Ok(())
        });

        let opened = stack.add_new_screen(Mode::Process, Some(init), Some(Payload::User("alice".into())));
        assert!(opened.init_error.is_none());
        assert_eq!(calls.get(), 1);
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.cursor(), 1);
        assert_eq!(stack.current_screen_id(), &opened.id);
    }

    #[test]
    fn test_init_error_keeps_screen_open() {
        let mut stack = ScreenStack::new();
        let init: InitFn = Box::new(|_view, _payload| anyhow::bail!("ps not found"));

        let opened = stack.add_new_screen(Mode::Process, Some(init), None);
        let err = opened.init_error.expect("init error surfaced");
        assert_eq!(err.to_string(), "ps not found");
        assert_eq!(current_mode(&stack), Mode::Process);
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_activation_moves_focus_to_primary_widget() {
        let mut stack = stack_with(&[Mode::Files]);
        stack.current_mut().focus = Focus::Prompt;
        stack.show_next_screen();
        stack.show_next_screen();
        assert_eq!(current_mode(&stack), Mode::Files);
        assert_eq!(stack.current().focus, Focus::Panel);
    }

    #[test]
    fn test_next_wraps_after_len_steps() {
        let mut stack = stack_with(&[Mode::Files, Mode::Process, Mode::Help]);
        stack.show_screen(1);
        let start = stack.cursor();
        for _ in 0..stack.len() {
            stack.show_next_screen();
        }
        assert_eq!(stack.cursor(), start);
    }

    #[test]
    fn test_previous_wraps_after_len_steps() {
        let mut stack = stack_with(&[Mode::Files, Mode::Process]);
        stack.show_screen(0);
        stack.show_previous_screen();
        assert_eq!(stack.cursor(), 2);
        stack.show_previous_screen();
        stack.show_previous_screen();
        assert_eq!(stack.cursor(), 0);
    }

    #[test]
    fn test_show_screen_wraps_index() {
        let mut stack = stack_with(&[Mode::Files]);
        stack.show_screen(5);
        assert_eq!(stack.cursor(), 1);
    }

    #[test]
    fn test_close_returns_to_previously_active_screen() {
        // [Shell, Files, Process, Help] with Help on display.
        let mut stack = stack_with(&[Mode::Files, Mode::Process, Mode::Help]);
        stack.show_screen(0);
        stack.show_screen(2);

        let closed = stack.close_current_screen().expect("close process");
        assert_eq!(closed.mode, Mode::Process);
        // Shell was active last, not the list neighbour Files.
        assert_eq!(current_mode(&stack), Mode::Shell);
    }

    #[test]
    fn test_close_does_not_chain_more_than_one_level() {
        let mut stack = stack_with(&[Mode::Files, Mode::Process, Mode::Help]);
        stack.show_screen(1);
        stack.show_screen(2);

        stack.close_current_screen().expect("close process");
        assert_eq!(current_mode(&stack), Mode::Files);

        // Help was active before Files, but the recency slot is spent:
        // the list neighbour is used instead.
        stack.close_current_screen().expect("close files");
        assert_eq!(current_mode(&stack), Mode::Shell);
    }

    #[test]
    fn test_close_last_shell_is_rejected() {
        let mut stack = ScreenStack::new();
        let err = stack.close_current_screen().err();
        assert_eq!(err, Some(CloseError::LastShell));
        assert_eq!(stack.len(), 1);

        let mut stack = stack_with(&[Mode::Files]);
        stack.show_screen(0);
        assert!(stack.close_current_screen().is_err());
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_close_one_of_two_shells() {
        let mut stack = stack_with(&[Mode::Shell]);
        let second = stack.current_screen_id().clone();
        let closed = stack.close_current_screen().expect("close second shell");
        assert_eq!(closed.id, second);
        assert_eq!(stack.len(), 1);
        assert!(stack.close_current_screen().is_err());
    }

    #[test]
    fn test_cursor_stays_valid_for_any_sequence() {
        let modes = [Mode::Shell, Mode::Files, Mode::Process, Mode::Help, Mode::HexEdit];
        let mut stack = ScreenStack::new();
        let mut seed: u32 = 0x2545_f491;
        for _ in 0..2000 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            match (seed >> 16) % 5 {
                0 => {
                    let mode = modes[((seed >> 8) % modes.len() as u32) as usize];
                    stack.add_new_screen(mode, None, None);
                }
                1 => {
                    let _ = stack.close_current_screen();
                }
                2 => stack.show_next_screen(),
                3 => stack.show_previous_screen(),
                _ => stack.show_screen((seed >> 4) as usize),
            }
            assert!(stack.len() > 0);
            assert!(stack.cursor() < stack.len());
            assert!(stack.screens().iter().any(|s| s.mode == Mode::Shell));
        }
    }

    #[test]
    fn test_previous_screen_after_two_builtins_shows_files() {
        let mut stack = stack_with(&[Mode::Files, Mode::Process]);
        stack.show_previous_screen();
        assert_eq!(current_mode(&stack), Mode::Files);
    }

    #[test]
    fn test_shell_target_prefers_visible_shell() {
        let mut stack = stack_with(&[Mode::Shell, Mode::Files]);
        let newest_shell = stack.screens()[1].id.clone();
        assert_eq!(stack.shell_target(), &newest_shell);

        stack.show_screen(0);
        let first = stack.current_screen_id().clone();
        assert_eq!(stack.shell_target(), &first);
    }
}
