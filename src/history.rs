//! Command history of one execution domain (shell lines or SQL statements).
//!
//! Persisted as a flat file, one entry per line.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};

/// Recorded lines plus a circular recall cursor.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<String>,
    /// `None` means "past the newest entry".
    cursor: Option<usize>,
    max: usize,
}

impl History {
    pub fn new(max: usize) -> Self {
        Self::from_entries(Vec::new(), max)
    }

    /// Keep at most the newest `max` of `entries`.
    pub fn from_entries(mut entries: Vec<String>, max: usize) -> Self {
        let max = max.max(1);
        if entries.len() > max {
            entries.drain(..entries.len() - max);
        }
        Self {
            entries,
            cursor: None,
            max,
        }
    }

    /// Record a submitted line and reset recall to the newest entry.
    pub fn push(&mut self, line: &str) {
        self.entries.push(line.to_string());
        if self.entries.len() > self.max {
            self.entries.remove(0);
        }
        self.cursor = None;
    }

    /// Step back in time, wrapping from the oldest to the newest entry.
    pub fn previous(&mut self) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let last = self.entries.len() - 1;
        let index = match self.cursor {
            None | Some(0) => last,
            Some(i) => i - 1,
        };
        self.cursor = Some(index);
        Some(&self.entries[index])
    }

    /// Step forward in time, wrapping from the newest to the oldest entry.
    pub fn next(&mut self) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let index = match self.cursor {
            Some(i) if i + 1 < self.entries.len() => i + 1,
            _ => 0,
        };
        self.cursor = Some(index);
        Some(&self.entries[index])
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

/// Read a history file. A missing file is an empty history.
pub fn load(path: &Path) -> Result<Vec<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e).with_context(|| format!("cannot read history {}", path.display())),
    }
}

/// Rewrite a history file with `entries`.
pub fn save(path: &Path, entries: &[String]) -> Result<()> {
    let mut text = entries.join("\n");
    if !text.is_empty() {
        text.push('\n');
    }
    fs::write(path, text).with_context(|| format!("cannot write history {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(lines: &[&str]) -> History {
        let mut h = History::new(100);
        for line in lines {
            h.push(line);
        }
        h
    }

    #[test]
    fn test_previous_wraps_to_newest() {
        let mut h = history(&["a", "b", "c"]);
        let seen: Vec<_> = (0..4).map(|_| h.previous().map(str::to_string)).collect();
        assert_eq!(
            seen,
            vec![Some("c".into()), Some("b".into()), Some("a".into()), Some("c".into())]
        );
    }

    #[test]
    fn test_next_wraps_to_oldest() {
        let mut h = history(&["a", "b"]);
        assert_eq!(h.previous(), Some("b"));
        assert_eq!(h.next(), Some("a"));
        assert_eq!(h.next(), Some("b"));
        assert_eq!(h.next(), Some("a"));
    }

    #[test]
    fn test_push_resets_cursor() {
        let mut h = history(&["a", "b", "c"]);
        h.previous();
        h.previous();
        h.push("d");
        assert_eq!(h.previous(), Some("d"));
    }

    #[test]
    fn test_empty_history_recalls_nothing() {
        let mut h = History::new(10);
        assert_eq!(h.previous(), None);
        assert_eq!(h.next(), None);
    }

    #[test]
    fn test_max_keeps_newest_entries() {
        let mut h = History::new(2);
        h.push("a");
        h.push("b");
        h.push("c");
        assert_eq!(h.entries(), ["b", "c"]);

        let h = History::from_entries(vec!["1".into(), "2".into(), "3".into()], 2);
        assert_eq!(h.entries(), ["2", "3"]);
    }

    #[test]
    fn test_load_and_save_round_trip_through_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("history_cmd");
        assert!(load(&path).expect("missing file").is_empty());

        save(&path, &["ls -l".to_string(), "uname -a".to_string()]).expect("save");
        assert_eq!(fs::read_to_string(&path).expect("read"), "ls -l\nuname -a\n");
        assert_eq!(load(&path).expect("load"), vec!["ls -l", "uname -a"]);
    }
}
