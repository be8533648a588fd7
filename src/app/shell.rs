//! UI side of command execution: dispatch of prompt lines, opening and
//! closing screens and application of background events.

use std::time::Duration;

use crate::{
    commands::{Builtin, BUILTIN_PREFIX, CommandLine, parse_line},
    events::{Stream, UiEvent},
    exec::{self, ExecRequest},
    jobs::JobError,
    screens::{Mode, Payload, ScreenId},
    views::{InitContext, ScreenView, console::LineKind, init_for},
};

use super::{App, Overlay};

impl App {
    /// Enter at the prompt.
    pub fn submit_prompt(&mut self) {
        let line = self.prompt.take();
        if line.trim().is_empty() {
            return;
        }
        // SQLite3 screens take plain lines as SQL.
        let sql_screen = self.screens.current().mode == Mode::SQLite3;
        if sql_screen && !line.trim_start().starts_with(BUILTIN_PREFIX) {
            self.run_sql(&line);
        } else {
            self.execute_line(&line);
        }
    }

    /// Record `line` in the shell history, then run it.
    pub fn execute_line(&mut self, line: &str) {
        let Some(parsed) = parse_line(line) else {
            return;
        };
        // Every parsed line is recorded, rejected ones included.
        self.shell_history.push(line);
        tracing::info!("command: {line}");

        match parsed {
            CommandLine::Builtin(Builtin::Quit) => self.overlay = Overlay::Quit,
            CommandLine::Builtin(Builtin::Open(mode)) => self.open_screen(mode),
            CommandLine::UnknownBuiltin(word) => self.status.set(format!("Invalid command {word}")),
            CommandLine::Clear => {
                let target = self.screens.shell_target().clone();
                if let Some(console) = self.console_of(&target) {
                    console.clear();
                }
            }
            CommandLine::ChangeDir(arg) => self.change_dir(arg.as_deref()),
            CommandLine::External { program, args } => self.run_external(line, program, args),
        }
    }

    fn run_sql(&mut self, line: &str) {
        self.sql_history.push(line);
        tracing::info!("sql: {line}");
        let cwd = self.session.cwd();
        let ScreenView::SQLite3(sql) = &mut self.screens.current_mut().view else {
            return;
        };
        match sql.execute(line, &cwd) {
            Ok(msg) => self.status.set(msg),
            Err(e) => self.status.set(e.to_string()),
        }
    }

    /// Start an external command in the background. Never waits for it.
    fn run_external(&mut self, line: &str, program: String, args: Vec<String>) {
        // Claim the slot of the target shell; a busy one rejects the line.
        let target = self.screens.shell_target().clone();
        if let Err(e) = self.session.jobs.reserve(&target, line) {
            self.status.set(e.to_string());
            return;
        }
        // Echo the line before any output arrives.
        if let Some(console) = self.console_of(&target) {
            console.header(line);
        }
        let req = ExecRequest {
            screen: target,
            command: line.to_string(),
            program,
            args,
            cwd: self.session.cwd(),
        };
        // Hand off to the background; output comes back as events.
        exec::spawn(
            req,
            self.session.jobs.clone(),
            self.session.cwd_handle(),
            self.ui_tx.clone(),
        );
    }

    fn change_dir(&mut self, arg: Option<&str>) {
        let Some(dir) = self.session.resolve_dir(arg) else {
            self.status.set("cd: cannot locate the home directory");
            return;
        };
        match dir.canonicalize() {
            Ok(dir) if dir.is_dir() => {
                tracing::info!("cwd: {}", dir.display());
                self.session.set_cwd(&dir);
            }
            _ => self.status.set(format!("cd: {}: no such directory", dir.display())),
        }
    }

    /// F4: interrupt the command of the visible shell screen.
    pub fn stop_current_command(&mut self) {
        let current = self.screens.current();
        if current.mode != Mode::Shell {
            self.status.set("F4 key pressed (not in shell mode)");
            return;
        }
        let screen = current.id.clone();
        match self.session.jobs.interrupt(&screen) {
            Ok(pid) => {
                self.status.set("Command interrupted.");
                // Free the slot after the grace period even if the process lingers.
                let jobs = self.session.jobs.clone();
                let grace = Duration::from_millis(self.cfg.interrupt_grace_ms);
                tokio::spawn(async move {
                    tokio::time::sleep(grace).await;
                    jobs.release(&screen, Some(pid));
                });
            }
            Err(JobError::Signal { pgid, source }) => {
                tracing::warn!("SIGINT to {pgid} failed: {source}");
                self.status.set(format!("Cannot interrupt PID {pgid}: {source}"));
            }
            Err(e) => self.status.set(e.to_string()),
        }
    }

    /// Open a screen of `mode` with its init function.
    pub fn open_screen(&mut self, mode: Mode) {
        let payload = match mode {
            Mode::Process => Some(Payload::User(self.session.user.clone())),
            _ => None,
        };
        self.open_screen_with(mode, payload);
    }

    /// Open a screen of `mode` and hand `payload` to its init function.
    pub fn open_screen_with(&mut self, mode: Mode, payload: Option<Payload>) {
        let ctx = InitContext {
            cwd: self.session.cwd(),
            console_max_lines: self.cfg.console_max_lines,
        };
        let opened = self
            .screens
            .add_new_screen(mode, init_for(mode, &ctx), payload);
        tracing::info!("opened {}-{}", mode.title(), opened.id);
        if let Some(e) = opened.init_error {
            tracing::warn!("init of {}-{} failed: {e:#}", mode.title(), opened.id);
            self.status.set(e.to_string());
        }
    }

    /// F3: close the visible screen, interrupting its command if any.
    pub fn close_current(&mut self) {
        match self.screens.close_current_screen() {
            Ok(screen) => {
                // A command of the closed screen must not keep running.
                let jobs = &self.session.jobs;
                if jobs.is_running(&screen.id) {
                    if let Err(e) = jobs.interrupt(&screen.id) {
                        tracing::warn!("{e}");
                    }
                    jobs.release(&screen.id, None);
                }
                tracing::info!("closed {}", screen.label());
            }
            Err(e) => self.status.set(e.to_string()),
        }
    }

    /// Up/Down at the prompt. SQLite3 screens browse the SQL history.
    pub fn recall_history(&mut self, back: bool) {
        let history = if self.screens.current().mode == Mode::SQLite3 {
            &mut self.sql_history
        } else {
            &mut self.shell_history
        };
        let entry = if back { history.previous() } else { history.next() };
        if let Some(entry) = entry {
            self.prompt.set_selected(entry);
        }
    }

    fn console_of(&mut self, screen: &ScreenId) -> Option<&mut crate::views::console::ConsoleView> {
        self.screens
            .get_mut(screen)
            .and_then(|s| s.view.console_mut())
    }

    /// Apply one event posted by a background task.
    pub fn apply_event(&mut self, ev: UiEvent) {
        match ev {
            UiEvent::Started { screen, pid } => {
                tracing::debug!("pid {pid} runs in screen {screen}");
                self.indicators.pid = format!("PID={pid}");
            }
            UiEvent::Output {
                screen,
                pid,
                stream,
                line,
            } => {
                self.indicators.pid = format!("PID={pid}");
                let kind = match stream {
                    Stream::Stdout => LineKind::Stdout,
                    Stream::Stderr => LineKind::Stderr,
                };
                if let Some(console) = self.console_of(&screen) {
                    console.push(kind, line);
                }
            }
            UiEvent::Finished {
                screen,
                pid,
                runtime,
                exit_code,
                cwd,
            } => {
                // Summary line, then the status bar indicators.
                if let Some(dir) = cwd {
                    tracing::debug!("pid {pid} left cwd {}", dir.display());
                }
                let secs = runtime.as_secs_f64();
                if let Some(console) = self.console_of(&screen) {
                    console.push(LineKind::Info, "");
                    console.push(
                        LineKind::Summary,
                        format!("Runtime for PID {pid} is {secs:.3} seconds, exit code {exit_code}."),
                    );
                }
                self.indicators.pid = format!("{secs:.2}s");
                self.indicators.rc = Some(exit_code);
            }
            UiEvent::SpawnFailed {
                screen,
                command,
                error,
            } => {
                if let Some(console) = self.console_of(&screen) {
                    console.push(LineKind::Error, format!("{command}: {error}"));
                }
                self.indicators.rc = Some(-1);
                self.status.set(error);
            }
            UiEvent::Status(text) => self.status.set(text),
        }
    }
}
