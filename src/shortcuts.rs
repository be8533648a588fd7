//! Configurable key bindings.
//!
//! Bindings are strings such as `"F4"`, `"Enter"`, `"Ctrl+o"` or `"y"`, kept
//! in `shortcuts.toml` inside the application directory.

use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Shortcuts {
    pub global: GlobalShortcuts,
    pub prompt: PromptShortcuts,
    pub panel: PanelShortcuts,
    pub files: FilesShortcuts,
    pub process: ProcessShortcuts,
    pub input_box: InputBoxShortcuts,
    pub menu: MenuShortcuts,
    pub dialog: DialogShortcuts,
}

/// Hotkeys handled before any widget sees the key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalShortcuts {
    pub help: Vec<String>,
    pub prompt: Vec<String>,
    pub close: Vec<String>,
    pub interrupt: Vec<String>,
    pub refresh: Vec<String>,
    pub previous: Vec<String>,
    pub next: Vec<String>,
    pub menu: Vec<String>,
    pub quit: Vec<String>,
    /// Mode dependent: open a database or a file.
    pub open: Vec<String>,
    /// Mode dependent: close the database or the file.
    pub save: Vec<String>,
}

/// Command prompt. Line editing uses the `input_box` editing keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptShortcuts {
    pub submit: Vec<String>,
    pub history_prev: Vec<String>,
    pub history_next: Vec<String>,
    /// Move focus to the screen panel.
    pub focus: Vec<String>,
}

/// Screen panel (console, listings, editors).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelShortcuts {
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub page_up: Vec<String>,
    pub page_down: Vec<String>,
    pub activate: Vec<String>,
    /// Move focus back to the prompt.
    pub focus: Vec<String>,
}

/// Focused Files panel. Enter (panel `activate`) opens directories and text files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesShortcuts {
    /// Open the selected file in a Hex Editor screen.
    pub hex: Vec<String>,
}

/// Focused Process panel; act on the selected row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessShortcuts {
    pub kill: Vec<String>,
    pub signal: Vec<String>,
    /// SIGSTOP, or SIGCONT for a stopped process.
    pub pause: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputBoxShortcuts {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub backspace: Vec<String>,
    pub delete: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub home: Vec<String>,
    pub end: Vec<String>,
    pub clear_line: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuShortcuts {
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub select: Vec<String>,
    pub cancel: Vec<String>,
}

/// Yes/no confirmation dialogs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogShortcuts {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

impl Shortcuts {
    /// Read bindings from TOML; missing file or sections fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            let shortcuts: Shortcuts = toml::from_str(&content)
                .with_context(|| format!("invalid shortcuts in {}", path.display()))?;
            Ok(shortcuts)
        } else {
            let shortcuts = Self::default();
            shortcuts.save(path)?;
            Ok(shortcuts)
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// One-line summary of the global hotkeys for the key-hint bar.
    pub fn global_hints(&self) -> String {
        let g = &self.global;
        [
            (&g.help, "Help"),
            (&g.prompt, "Prompt"),
            (&g.close, "Close"),
            (&g.interrupt, "Stop"),
            (&g.refresh, "Refresh"),
            (&g.previous, "Prev"),
            (&g.next, "Next"),
            (&g.menu, "Menu"),
            (&g.quit, "Quit"),
        ]
        .iter()
        .filter_map(|(keys, label)| keys.first().map(|k| format!("{k}={label}")))
        .collect::<Vec<_>>()
        .join(" ")
    }
}

fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(|k| k.to_string()).collect()
}

impl Default for Shortcuts {
    fn default() -> Self {
        Self {
            global: GlobalShortcuts {
                help: keys(&["F1"]),
                prompt: keys(&["F2"]),
                close: keys(&["F3"]),
                interrupt: keys(&["F4"]),
                refresh: keys(&["F5"]),
                previous: keys(&["F6"]),
                next: keys(&["F7"]),
                menu: keys(&["F10"]),
                quit: keys(&["F12"]),
                open: keys(&["Ctrl+o"]),
                save: keys(&["Ctrl+s"]),
            },
            prompt: PromptShortcuts {
                submit: keys(&["Enter"]),
                history_prev: keys(&["Up"]),
                history_next: keys(&["Down"]),
                focus: keys(&["Tab"]),
            },
            panel: PanelShortcuts {
                up: keys(&["Up"]),
                down: keys(&["Down"]),
                page_up: keys(&["PageUp"]),
                page_down: keys(&["PageDown"]),
                activate: keys(&["Enter"]),
                focus: keys(&["Tab", "Esc"]),
            },
            files: FilesShortcuts { hex: keys(&["x"]) },
            process: ProcessShortcuts {
                kill: keys(&["k"]),
                signal: keys(&["s"]),
                pause: keys(&["p"]),
            },
            input_box: InputBoxShortcuts {
                confirm: keys(&["Enter"]),
                cancel: keys(&["Esc"]),
                backspace: keys(&["Backspace"]),
                delete: keys(&["Delete"]),
                left: keys(&["Left"]),
                right: keys(&["Right"]),
                home: keys(&["Home"]),
                end: keys(&["End"]),
                clear_line: keys(&["Ctrl+u"]),
            },
            menu: MenuShortcuts {
                up: keys(&["Up"]),
                down: keys(&["Down"]),
                select: keys(&["Enter"]),
                cancel: keys(&["Esc"]),
            },
            dialog: DialogShortcuts {
                confirm: keys(&["Enter", "y"]),
                cancel: keys(&["Esc", "n"]),
            },
        }
    }
}

/// True if `key` matches any of the binding strings.
pub fn matches_shortcut(key: &KeyEvent, shortcuts: &[String]) -> bool {
    shortcuts.iter().any(|s| matches_single_shortcut(key, s))
}

fn matches_single_shortcut(key: &KeyEvent, shortcut: &str) -> bool {
    let parts: Vec<&str> = shortcut.split('+').collect();
    let (modifiers_str, key_str) = match parts.split_last() {
        Some((last, mods)) if !last.is_empty() => (mods, *last),
        _ => return false,
    };

    let mut expected_modifiers = KeyModifiers::empty();
    for modifier in modifiers_str {
        match *modifier {
            "Ctrl" | "ctrl" => expected_modifiers |= KeyModifiers::CONTROL,
            "Alt" | "alt" => expected_modifiers |= KeyModifiers::ALT,
            "Shift" | "shift" => expected_modifiers |= KeyModifiers::SHIFT,
            _ => return false,
        }
    }

    // Terminals report Shift on upper-case characters; ignore it there.
    let (actual, expected) = match key.code {
        KeyCode::Char(_) => (
            key.modifiers - KeyModifiers::SHIFT,
            expected_modifiers - KeyModifiers::SHIFT,
        ),
        _ => (key.modifiers, expected_modifiers),
    };
    if actual != expected {
        return false;
    }

    match key_str {
        "Enter" | "enter" => key.code == KeyCode::Enter,
        "Esc" | "esc" => key.code == KeyCode::Esc,
        "Tab" | "tab" => key.code == KeyCode::Tab,
        "Backspace" | "backspace" => key.code == KeyCode::Backspace,
        "Delete" | "delete" => key.code == KeyCode::Delete,
        "Up" | "up" => key.code == KeyCode::Up,
        "Down" | "down" => key.code == KeyCode::Down,
        "Left" | "left" => key.code == KeyCode::Left,
        "Right" | "right" => key.code == KeyCode::Right,
        "Home" | "home" => key.code == KeyCode::Home,
        "End" | "end" => key.code == KeyCode::End,
        "PageUp" | "pageup" => key.code == KeyCode::PageUp,
        "PageDown" | "pagedown" => key.code == KeyCode::PageDown,
        f if f.len() > 1 && (f.starts_with('F') || f.starts_with('f')) => f[1..]
            .parse::<u8>()
            .is_ok_and(|n| key.code == KeyCode::F(n)),
        s if s.chars().count() == 1 => s.chars().next().is_some_and(|c| key.code == KeyCode::Char(c)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_shortcut_simple_char() {
        let key = KeyEvent::new(KeyCode::Char('y'), KeyModifiers::empty());
        assert!(matches_shortcut(&key, &[String::from("y")]));
        assert!(!matches_shortcut(&key, &[String::from("n")]));
    }

    #[test]
    fn test_matches_shortcut_special_key() {
        let key = KeyEvent::new(KeyCode::Enter, KeyModifiers::empty());
        assert!(matches_shortcut(&key, &[String::from("Enter")]));
        assert!(!matches_shortcut(&key, &[String::from("Esc")]));
    }

    #[test]
    fn test_matches_shortcut_with_modifier() {
        let key = KeyEvent::new(KeyCode::Char('o'), KeyModifiers::CONTROL);
        assert!(matches_shortcut(&key, &[String::from("Ctrl+o")]));
        assert!(!matches_shortcut(&key, &[String::from("o")]));
    }

    #[test]
    fn test_matches_function_and_paging_keys() {
        let f4 = KeyEvent::new(KeyCode::F(4), KeyModifiers::empty());
        assert!(matches_shortcut(&f4, &[String::from("F4")]));
        assert!(!matches_shortcut(&f4, &[String::from("F1")]));

        let f12 = KeyEvent::new(KeyCode::F(12), KeyModifiers::empty());
        assert!(matches_shortcut(&f12, &[String::from("F12")]));

        let page = KeyEvent::new(KeyCode::PageDown, KeyModifiers::empty());
        assert!(matches_shortcut(&page, &[String::from("PageDown")]));
        assert!(!matches_shortcut(&page, &[String::from("PageUp")]));
    }

    #[test]
    fn test_plain_f_is_a_character() {
        let key = KeyEvent::new(KeyCode::Char('F'), KeyModifiers::SHIFT);
        assert!(matches_shortcut(&key, &[String::from("F")]));
        assert!(!matches_shortcut(&key, &[String::from("F1")]));
    }

    #[test]
    fn test_matches_shortcut_multiple_keys() {
        let shortcuts = Shortcuts::default().dialog.confirm;
        let enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::empty());
        let y = KeyEvent::new(KeyCode::Char('y'), KeyModifiers::empty());
        let n = KeyEvent::new(KeyCode::Char('n'), KeyModifiers::empty());
        assert!(matches_shortcut(&enter, &shortcuts));
        assert!(matches_shortcut(&y, &shortcuts));
        assert!(!matches_shortcut(&n, &shortcuts));
    }

    #[test]
    fn test_global_hints_follow_bindings() {
        let mut shortcuts = Shortcuts::default();
        assert!(shortcuts.global_hints().starts_with("F1=Help F2=Prompt"));
        shortcuts.global.quit = vec!["Ctrl+q".into()];
        assert!(shortcuts.global_hints().ends_with("Ctrl+q=Quit"));
    }

    #[test]
    fn test_load_creates_default_file_and_reads_partial_config() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("shortcuts.toml");
        let loaded = Shortcuts::load_or_default(&path).expect("defaults");
        assert!(path.exists());
        assert_eq!(loaded.global.menu, vec!["F10"]);

        std::fs::write(
            &path,
            "[dialog]\nconfirm = [\"o\"]\ncancel = [\"Esc\"]\n",
        )
        .expect("write partial");
        let loaded = Shortcuts::load_or_default(&path).expect("partial");
        assert_eq!(loaded.dialog.confirm, vec!["o"]);
        assert_eq!(loaded.global.quit, vec!["F12"]);
        assert_eq!(loaded.process.kill, vec!["k"]);
        assert_eq!(loaded.files.hex, vec!["x"]);
    }
}
