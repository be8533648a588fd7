//! Prompt line parsing.
//!
//! A line is either a built-in (first word starts with `!`), one of the
//! in-place words `cls` and `cd`, or an external program with its
//! whitespace-separated arguments. No shell expansion is performed.

use crate::screens::Mode;

/// First character of every built-in command word.
pub const BUILTIN_PREFIX: char = '!';

/// Built-in names are compared on this many leading characters.
const BUILTIN_LEN: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    /// Ask for confirmation, then leave.
    Quit,
    /// Open a new screen of the given mode.
    Open(Mode),
}

/// Recognised built-in names, already cut to their first five characters.
pub const BUILTINS: &[(&str, Builtin)] = &[
    ("!quit", Builtin::Quit),
    ("!exit", Builtin::Quit),
    ("!bye", Builtin::Quit),
    ("!shel", Builtin::Open(Mode::Shell)),
    ("!file", Builtin::Open(Mode::Files)),
    ("!proc", Builtin::Open(Mode::Process)),
    ("!edit", Builtin::Open(Mode::TextEdit)),
    ("!sql", Builtin::Open(Mode::SQLite3)),
    ("!help", Builtin::Open(Mode::Help)),
    ("!hex", Builtin::Open(Mode::HexEdit)),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandLine {
    Builtin(Builtin),
    /// Prefixed word with no entry in [`BUILTINS`]; carries the full word.
    UnknownBuiltin(String),
    /// `cls`: empty the console.
    Clear,
    /// `cd [dir]`.
    ChangeDir(Option<String>),
    External { program: String, args: Vec<String> },
}

/// Classify a submitted line. Returns `None` for blank input.
pub fn parse_line(line: &str) -> Option<CommandLine> {
    let mut words = line.split_whitespace();
    let word = words.next()?;

    if word.starts_with(BUILTIN_PREFIX) {
        let key: String = word.chars().take(BUILTIN_LEN).collect();
        let key = key.trim();
        let parsed = BUILTINS
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, builtin)| CommandLine::Builtin(*builtin))
            .unwrap_or_else(|| CommandLine::UnknownBuiltin(word.to_string()));
        return Some(parsed);
    }

    let parsed = match word {
        "cls" => CommandLine::Clear,
        "cd" => CommandLine::ChangeDir(words.next().map(str::to_string)),
        _ => CommandLine::External {
            program: word.to_string(),
            args: words.map(str::to_string).collect(),
        },
    };
    Some(parsed)
}
