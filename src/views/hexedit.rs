//! Read-only hex dump of a HexEdit screen.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use ratatui::{prelude::*, widgets::Paragraph};

use crate::screens::{InitFn, Payload};

use super::{ScreenView, panel_block};

/// Bytes shown per dump row.
pub const ROW_BYTES: usize = 16;
/// Largest file loaded into memory.
pub const MAX_FILE_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Debug, Default)]
pub struct HexView {
    pub path: Option<PathBuf>,
    bytes: Vec<u8>,
    scroll: usize,
}

impl HexView {
    /// Load `path`, relative paths resolved against `cwd`.
    pub fn open(&mut self, path: &Path, cwd: &Path) -> Result<()> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            cwd.join(path)
        };
        let meta = fs::metadata(&path).with_context(|| format!("cannot open {}", path.display()))?;
        if !meta.is_file() {
            bail!("{} is not a regular file", path.display());
        }
        if meta.len() > MAX_FILE_BYTES {
            bail!("{} is larger than {} bytes", path.display(), MAX_FILE_BYTES);
        }
        self.bytes = fs::read(&path).with_context(|| format!("cannot read {}", path.display()))?;
        self.path = Some(path);
        self.scroll = 0;
        Ok(())
    }

    pub fn close(&mut self) {
        *self = Self::default();
    }

    pub fn is_open(&self) -> bool {
        self.path.is_some()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn row_count(&self) -> usize {
        self.bytes.len().div_ceil(ROW_BYTES)
    }

    pub fn scroll_by(&mut self, delta: isize) {
        let max = self.row_count().saturating_sub(1) as isize;
        self.scroll = (self.scroll as isize + delta).clamp(0, max) as usize;
    }

    /// Formatted rows `start..start + count`.
    pub fn dump_rows(&self, start: usize, count: usize) -> Vec<String> {
        self.bytes
            .chunks(ROW_BYTES)
            .enumerate()
            .skip(start)
            .take(count)
            .map(|(row, chunk)| format_row(row * ROW_BYTES, chunk))
            .collect()
    }
}

/// `offset  hex bytes  |ascii|`; missing bytes in a short row are padded.
fn format_row(offset: usize, chunk: &[u8]) -> String {
    let mut hex = String::with_capacity(ROW_BYTES * 3);
    for i in 0..ROW_BYTES {
        match chunk.get(i) {
            Some(b) => hex.push_str(&format!("{b:02x} ")),
            None => hex.push_str("   "),
        }
        if i == 7 {
            hex.push(' ');
        }
    }
    let ascii: String = chunk
        .iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
        .collect();
    format!("{offset:08x}  {hex} |{ascii}|")
}

/// Opens the file given as payload, if any.
pub fn init(cwd: PathBuf) -> InitFn {
    Box::new(move |view, payload| {
        if let (ScreenView::HexEdit(hex), Some(Payload::Path(path))) = (view, payload) {
            hex.open(path, &cwd)?;
        }
        Ok(())
    })
}

pub fn render(f: &mut Frame, area: Rect, view: &HexView, focused: bool) {
    let title = match &view.path {
        Some(p) => format!("{} ({} bytes)", p.display(), view.len()),
        None => "no file (Ctrl+O to open)".to_string(),
    };
    let height = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = view
        .dump_rows(view.scroll, height)
        .into_iter()
        .map(Line::from)
        .collect();
    f.render_widget(
        Paragraph::new(lines)
            .style(Style::default().fg(Color::Cyan))
            .block(panel_block(title, focused)),
        area,
    );
}
