//! Line-based text buffer of a TextEdit screen.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use ratatui::{prelude::*, widgets::Paragraph};

use crate::screens::{InitFn, Payload};

use super::{ScreenView, panel_block};

#[derive(Debug)]
pub struct EditorView {
    pub name: String,
    /// File the buffer is saved to. `None` until opened or saved as.
    pub path: Option<PathBuf>,
    lines: Vec<String>,
    modified: bool,
}

impl Default for EditorView {
    fn default() -> Self {
        Self {
            name: "untitled".into(),
            path: None,
            lines: vec![String::new()],
            modified: false,
        }
    }
}

impl EditorView {
    /// Replace the buffer with the contents of `path` (relative to `cwd`).
    pub fn open(&mut self, path: &Path, cwd: &Path) -> Result<()> {
        let path = resolve(path, cwd);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
        if lines.is_empty() {
            lines.push(String::new());
        }
        self.lines = lines;
        self.set_path(path);
        self.modified = false;
        Ok(())
    }

    /// Write the buffer to its file and return the path written.
    pub fn save(&mut self) -> Result<PathBuf> {
        let Some(path) = self.path.clone() else {
            bail!("buffer has no file name");
        };
        let mut text = self.text();
        text.push('\n');
        fs::write(&path, text).with_context(|| format!("cannot write {}", path.display()))?;
        self.modified = false;
        tracing::info!("saved {}", path.display());
        Ok(path)
    }

    /// Give the buffer a file name, then save it.
    pub fn save_as(&mut self, path: &Path, cwd: &Path) -> Result<PathBuf> {
        self.set_path(resolve(path, cwd));
        self.save()
    }

    fn set_path(&mut self, path: PathBuf) {
        self.name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.path = Some(path);
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Append a character at the end of the last line.
    pub fn insert_char(&mut self, c: char) {
        if let Some(line) = self.lines.last_mut() {
            line.push(c);
            self.modified = true;
        }
    }

    pub fn newline(&mut self) {
        self.lines.push(String::new());
        self.modified = true;
    }

    /// Delete the last character, joining with the previous line at its start.
    pub fn backspace(&mut self) {
        let Some(line) = self.lines.last_mut() else {
            return;
        };
        if line.pop().is_some() {
            self.modified = true;
        } else if self.lines.len() > 1 {
            self.lines.pop();
            self.modified = true;
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

fn resolve(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Opens the file given as payload, if any.
pub fn init(cwd: PathBuf) -> InitFn {
    Box::new(move |view, payload| {
        let ScreenView::TextEdit(editor) = view else {
            return Ok(());
        };
        *editor = EditorView::default();
        if let Some(Payload::Path(path)) = payload {
            editor.open(path, &cwd)?;
        }
        Ok(())
    })
}

pub fn render(f: &mut Frame, area: Rect, view: &EditorView, focused: bool) {
    let lines = view.lines();
    let height = area.height.saturating_sub(2) as usize;
    let start = lines.len().saturating_sub(height);
    let last = lines.len().saturating_sub(1);
    let shown: Vec<Line> = lines[start..]
        .iter()
        .enumerate()
        .map(|(i, l)| {
            if focused && start + i == last {
                Line::from(vec![Span::raw(l.clone()), Span::raw("▏").fg(Color::LightGreen)])
            } else {
                Line::from(l.clone())
            }
        })
        .collect();

    let mut title = format!("{} [Ln {}]", view.name, lines.len());
    if view.is_modified() {
        title.push_str(" *");
    }
    f.render_widget(Paragraph::new(shown).block(panel_block(title, focused)), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typing_and_newlines() {
        let mut editor = EditorView::default();
        for c in "ab".chars() {
            editor.insert_char(c);
        }
        editor.newline();
        editor.insert_char('c');
        assert_eq!(editor.text(), "ab\nc");
        assert!(editor.is_modified());
    }

    #[test]
    fn test_backspace_joins_lines() {
        let mut editor = EditorView::default();
        editor.insert_char('a');
        editor.newline();
        editor.backspace();
        assert_eq!(editor.lines(), ["a"]);
        editor.backspace();
        editor.backspace();
        assert_eq!(editor.lines(), [""]);
    }

    #[test]
    fn test_open_edit_and_save() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join("notes.txt"), "one\ntwo\n").expect("write");

        let mut editor = EditorView::default();
        editor.open(Path::new("notes.txt"), dir.path()).expect("open");
        assert_eq!(editor.name, "notes.txt");
        assert_eq!(editor.lines(), ["one", "two"]);
        assert!(!editor.is_modified());

        editor.insert_char('!');
        let saved = editor.save().expect("save");
        assert_eq!(saved, dir.path().join("notes.txt"));
        assert!(!editor.is_modified());
        assert_eq!(std::fs::read_to_string(saved).expect("read"), "one\ntwo!\n");
    }

    #[test]
    fn test_untitled_buffer_needs_a_name() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut editor = EditorView::default();
        editor.insert_char('x');
        assert!(editor.save().is_err());

        editor.save_as(Path::new("new.txt"), dir.path()).expect("save as");
        assert_eq!(editor.name, "new.txt");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("new.txt")).expect("read"),
            "x\n"
        );
    }

    #[test]
    fn test_open_missing_file_keeps_buffer() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut editor = EditorView::default();
        editor.insert_char('k');
        let err = editor.open(Path::new("nope.txt"), dir.path()).expect_err("missing");
        assert!(err.to_string().starts_with("Could not read"));
        assert_eq!(editor.text(), "k");
    }

    #[test]
    fn test_init_opens_payload_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join("a.txt"), "hello").expect("write");
        let mut view = ScreenView::new(crate::screens::Mode::TextEdit);
        let payload = Payload::Path(PathBuf::from("a.txt"));
        init(dir.path().to_path_buf())(&mut view, Some(&payload)).expect("init");
        let ScreenView::TextEdit(editor) = &view else {
            panic!("editor view");
        };
        assert_eq!(editor.text(), "hello");
    }
}
