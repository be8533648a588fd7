//! Single-line text input used by the prompt and the popup input box.

use ratatui::{
    layout::Alignment,
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

/// Editable line with a character cursor.
///
/// When `selected` is set the whole text is selected: the next typed
/// character replaces it and Backspace/Delete erase it.
#[derive(Clone, Debug, Default)]
pub struct LineInput {
    value: String,
    /// Cursor position in characters.
    cursor: usize,
    selected: bool,
}

impl LineInput {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Replace the text, select all of it and put the cursor at the end.
    pub fn set_selected(&mut self, text: &str) {
        self.value = text.to_string();
        self.cursor = self.value.chars().count();
        self.selected = true;
    }

    /// Hand out the current text and leave the input empty.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        self.selected = false;
        std::mem::take(&mut self.value)
    }

    pub fn insert_char(&mut self, c: char) {
        if self.selected {
            self.clear_line();
        }
        let mut chars: Vec<char> = self.value.chars().collect();
        chars.insert(self.cursor, c);
        self.value = chars.into_iter().collect();
        self.cursor += 1;
    }

    /// Delete the character before the cursor.
    pub fn backspace(&mut self) {
        if self.selected {
            self.clear_line();
        } else if self.cursor > 0 {
            let mut chars: Vec<char> = self.value.chars().collect();
            chars.remove(self.cursor - 1);
            self.value = chars.into_iter().collect();
            self.cursor -= 1;
        }
    }

    /// Delete the character under the cursor.
    pub fn delete(&mut self) {
        if self.selected {
            self.clear_line();
            return;
        }
        let mut chars: Vec<char> = self.value.chars().collect();
        if self.cursor < chars.len() {
            chars.remove(self.cursor);
            self.value = chars.into_iter().collect();
        }
    }

    pub fn move_left(&mut self) {
        self.selected = false;
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.selected = false;
        if self.cursor < self.value.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.selected = false;
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.selected = false;
        self.cursor = self.value.chars().count();
    }

    pub fn clear_line(&mut self) {
        self.value.clear();
        self.cursor = 0;
        self.selected = false;
    }

    /// Text with a `|` cursor marker, scrolled so the cursor stays inside
    /// `width` columns.
    pub fn visible(&self, width: usize) -> String {
        let scroll = if self.cursor > width.saturating_sub(2) {
            self.cursor.saturating_sub(width.saturating_sub(2))
        } else {
            0
        };
        let chars: Vec<char> = self.value.chars().skip(scroll).take(width).collect();
        let at = self.cursor.saturating_sub(scroll).min(chars.len());
        let before: String = chars[..at].iter().collect();
        let after: String = chars[at..].iter().collect();
        format!("{before}|{after}")
    }
}

/// Popup asking for one line of text.
#[derive(Clone, Debug)]
pub struct InputBoxState {
    pub prompt: String,
    pub input: LineInput,
    /// What to do with the text on confirm.
    pub callback_id: InputCallbackId,
}

impl InputBoxState {
    pub fn new(prompt: impl Into<String>, callback_id: InputCallbackId) -> Self {
        Self {
            prompt: prompt.into(),
            input: LineInput::default(),
            callback_id,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputCallbackId {
    /// Open a database in the visible SQLite3 screen.
    OpenDatabase,
    /// Load a file into the visible HexEdit screen.
    OpenHexFile,
    /// Load a file into the visible TextEdit screen.
    OpenTextFile,
    /// Name an untitled TextEdit buffer and save it.
    SaveTextFile,
    /// Send the named or numbered signal to a process.
    SendSignal(u32),
}

pub fn render_input_box(f: &mut Frame, state: &InputBoxState) {
    let popup_area = centered_popup(f.area(), 70, 7);
    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Input")
        .style(Style::default().bg(Color::DarkGray));
    f.render_widget(block, popup_area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // prompt
            Constraint::Length(1), // value
            Constraint::Length(1),
            Constraint::Length(1), // help
        ])
        .split(popup_area);

    let prompt = Paragraph::new(state.prompt.clone()).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );
    f.render_widget(prompt, inner[0]);

    let value = Paragraph::new(state.input.visible(inner[1].width as usize))
        .style(Style::default().fg(Color::Green));
    f.render_widget(value, inner[1]);

    let help = Paragraph::new("Enter=Confirm | Esc=Cancel | Ctrl+U=Clear")
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
    f.render_widget(help, inner[3]);
}

/// Centered area `width_percent` wide and `height` rows high.
pub fn centered_popup(area: Rect, width_percent: u16, height: u16) -> Rect {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(rows[1])[1]
}
