//! Directory listing of a Files screen.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ratatui::{
    prelude::*,
    widgets::{Row, Table, TableState},
};

use crate::screens::InitFn;

use super::{ScreenView, panel_block, step};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

#[derive(Debug, Default)]
pub struct FilesView {
    pub dir: PathBuf,
    pub entries: Vec<FileEntry>,
    pub selected: usize,
}

impl FilesView {
    /// List `dir`: `..` first, then directories, then files, each by name.
    pub fn load(&mut self, dir: &Path) -> Result<()> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir).with_context(|| format!("cannot list {}", dir.display()))? {
            let entry = entry?;
            // Entries vanishing mid-listing are skipped.
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            entries.push(FileEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: meta.is_dir(),
                size: meta.len(),
            });
        }
        entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
        if dir.parent().is_some() {
            entries.insert(
                0,
                FileEntry {
                    name: "..".into(),
                    is_dir: true,
                    size: 0,
                },
            );
        }

        self.dir = dir.to_path_buf();
        self.entries = entries;
        self.selected = 0;
        Ok(())
    }

    pub fn reload(&mut self) -> Result<()> {
        let dir = self.dir.clone();
        self.load(&dir)
    }

    pub fn selected_entry(&self) -> Option<&FileEntry> {
        self.entries.get(self.selected)
    }

    /// Directory the selected entry points to, if it is one.
    pub fn selected_dir(&self) -> Option<PathBuf> {
        let entry = self.selected_entry().filter(|e| e.is_dir)?;
        if entry.name == ".." {
            self.dir.parent().map(Path::to_path_buf)
        } else {
            Some(self.dir.join(&entry.name))
        }
    }

    /// Path of the selected entry if it is not a directory.
    pub fn selected_file(&self) -> Option<PathBuf> {
        let entry = self.selected_entry().filter(|e| !e.is_dir)?;
        Some(self.dir.join(&entry.name))
    }

    pub fn select_by(&mut self, delta: isize) {
        self.selected = step(self.selected, delta, self.entries.len());
    }
}

pub fn init(cwd: PathBuf) -> InitFn {
    Box::new(move |view, _payload| match view {
        ScreenView::Files(files) => files.load(&cwd),
        _ => Ok(()),
    })
}

pub fn render(f: &mut Frame, area: Rect, view: &FilesView, focused: bool) {
    let rows = view.entries.iter().map(|e| {
        let (kind, size, color) = if e.is_dir {
            ("<DIR>".to_string(), String::new(), Color::LightGreen)
        } else {
            (String::new(), e.size.to_string(), Color::Yellow)
        };
        Row::new(vec![kind, size, e.name.clone()]).style(Style::default().fg(color))
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(12),
            Constraint::Min(10),
        ],
    )
    .block(panel_block(view.dir.display().to_string(), focused))
    .header(Row::new(vec!["", "size", "name"]).bold())
    .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

    let mut state = TableState::default();
    if !view.entries.is_empty() {
        state.select(Some(view.selected));
    }
    f.render_stateful_widget(table, area, &mut state);
}
