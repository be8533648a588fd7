//! Process listing of a Process screen.

use std::process::Command;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use ratatui::{
    prelude::*,
    widgets::{Row, Table, TableState},
};

use crate::screens::{InitFn, Payload};

use super::{ScreenView, panel_block, step};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessRow {
    pub pid: u32,
    pub state: String,
    pub command: String,
}

#[derive(Debug, Default)]
pub struct ProcessView {
    pub user: String,
    pub rows: Vec<ProcessRow>,
    pub selected: usize,
}

impl ProcessView {
    /// Replace the listing with the processes owned by `user`.
    pub fn load(&mut self, user: &str) -> Result<()> {
        self.user = user.to_string();
        let output = Command::new("ps")
            .args(["-u", user, "-o", "pid=,stat=,comm="])
            .output()
            .context("cannot run ps")?;
        if !output.status.success() {
            bail!(
                "ps failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        self.rows = parse_ps(&String::from_utf8_lossy(&output.stdout));
        self.selected = self.selected.min(self.rows.len().saturating_sub(1));
        Ok(())
    }

    pub fn reload(&mut self) -> Result<()> {
        let user = self.user.clone();
        self.load(&user)
    }

    pub fn select_by(&mut self, delta: isize) {
        self.selected = step(self.selected, delta, self.rows.len());
    }

    pub fn selected_row(&self) -> Option<&ProcessRow> {
        self.rows.get(self.selected)
    }
}

/// Parse a signal given as number (`15`) or name (`term`, `SIGTERM`).
pub fn parse_signal(text: &str) -> Result<Signal> {
    let text = text.trim();
    if let Ok(number) = text.parse::<i32>() {
        return Signal::try_from(number).map_err(|_| anyhow!("Unknown signal {text}"));
    }
    let mut name = text.to_ascii_uppercase();
    if !name.starts_with("SIG") {
        name.insert_str(0, "SIG");
    }
    Signal::from_str(&name).map_err(|_| anyhow!("Unknown signal {text}"))
}

/// SIGCONT for a stopped process, SIGSTOP otherwise.
pub fn pause_signal(state: &str) -> Signal {
    if state.starts_with('T') {
        Signal::SIGCONT
    } else {
        Signal::SIGSTOP
    }
}

pub fn send_signal(pid: u32, signal: Signal) -> Result<()> {
    let raw = i32::try_from(pid).with_context(|| format!("invalid pid {pid}"))?;
    kill(Pid::from_raw(raw), signal)
        .with_context(|| format!("cannot send {} to process {pid}", signal.as_str()))?;
    tracing::info!("{} sent to process {pid}", signal.as_str());
    Ok(())
}

/// Parse `ps -o pid=,stat=,comm=` output. Malformed lines are skipped.
pub fn parse_ps(text: &str) -> Vec<ProcessRow> {
    text.lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let pid = parts.next()?.parse().ok()?;
            let state = parts.next()?.to_string();
            let command = parts.collect::<Vec<_>>().join(" ");
            Some(ProcessRow {
                pid,
                state,
                command,
            })
        })
        .collect()
}

/// Expects the acting user name as payload.
pub fn init() -> InitFn {
    Box::new(|view, payload| {
        let ScreenView::Process(procs) = view else {
            return Ok(());
        };
        match payload {
            Some(Payload::User(user)) => procs.load(user),
            _ => bail!("process screen needs a user name"),
        }
    })
}

pub fn render(f: &mut Frame, area: Rect, view: &ProcessView, focused: bool) {
    let rows = view.rows.iter().map(|r| {
        Row::new(vec![r.pid.to_string(), r.state.clone(), r.command.clone()])
    });
    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Length(6),
            Constraint::Min(10),
        ],
    )
    .block(panel_block(format!("Processes of {}", view.user), focused))
    .header(Row::new(vec!["pid", "stat", "command"]).bold())
    .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

    let mut state = TableState::default();
    if !view.rows.is_empty() {
        state.select(Some(view.selected));
    }
    f.render_stateful_widget(table, area, &mut state);
}
