//! Actions on the panel of the visible screen: reload, open/save documents,
//! directory and file selection, process signals.

use std::path::Path;

use nix::sys::signal::Signal;

use crate::{
    input::{InputBoxState, InputCallbackId},
    screens::{Mode, Payload},
    views::{
        ScreenView,
        process::{self, ProcessView},
    },
};

use super::{App, Overlay};

impl App {
    /// F5.
    pub fn refresh(&mut self) {
        let result = match &mut self.screens.current_mut().view {
            ScreenView::Files(files) => files.reload(),
            ScreenView::Process(procs) => procs.reload(),
            ScreenView::Shell(console) => {
                console.scroll_to_end();
                Ok(())
            }
            _ => Ok(()),
        };
        if let Err(e) = result {
            self.status.set(e.to_string());
        }
    }

    /// Ctrl+O.
    pub fn request_open(&mut self) {
        let (prompt, callback) = match self.screens.current().mode {
            Mode::SQLite3 => ("Database to open:", InputCallbackId::OpenDatabase),
            Mode::HexEdit => ("File to open:", InputCallbackId::OpenHexFile),
            Mode::TextEdit => ("File to edit:", InputCallbackId::OpenTextFile),
            _ => return,
        };
        self.overlay = Overlay::InputBox(InputBoxState::new(prompt, callback));
    }

    /// Ctrl+S: save the text buffer, or close the database or the hex file.
    pub fn save_document(&mut self) {
        let message = match &mut self.screens.current_mut().view {
            ScreenView::TextEdit(editor) if editor.path.is_none() => {
                self.overlay = Overlay::InputBox(InputBoxState::new(
                    "Save as:",
                    InputCallbackId::SaveTextFile,
                ));
                return;
            }
            ScreenView::TextEdit(editor) => match editor.save() {
                Ok(_) => format!("File {} successfully saved", editor.name),
                Err(e) => format!("{e:#}"),
            },
            ScreenView::SQLite3(sql) => {
                let closed = if sql.is_open() { sql.close() } else { Ok(()) };
                match closed.and_then(|()| sql.open_memory()) {
                    Ok(()) => "Database closed".to_string(),
                    Err(e) => e.to_string(),
                }
            }
            ScreenView::HexEdit(hex) => {
                hex.close();
                "File closed".to_string()
            }
            _ => return,
        };
        self.status.set(message);
    }

    /// Input box confirmed with `text`.
    pub fn confirm_input(&mut self, callback: InputCallbackId, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        // Relative names are resolved against the session cwd.
        let cwd = self.session.cwd();
        let result = match (callback, &mut self.screens.current_mut().view) {
            (InputCallbackId::OpenDatabase, ScreenView::SQLite3(sql)) => sql
                .open(&cwd.join(text))
                .map(|()| format!("Database {text} open successfully")),
            (InputCallbackId::OpenHexFile, ScreenView::HexEdit(hex)) => hex
                .open(Path::new(text), &cwd)
                .map(|()| format!("File {text} open")),
            (InputCallbackId::OpenTextFile, ScreenView::TextEdit(editor)) => editor
                .open(Path::new(text), &cwd)
                .map(|()| format!("File {text} open")),
            (InputCallbackId::SaveTextFile, ScreenView::TextEdit(editor)) => editor
                .save_as(Path::new(text), &cwd)
                .map(|_| format!("File {text} successfully saved")),
            (InputCallbackId::SendSignal(pid), ScreenView::Process(procs)) => {
                process::parse_signal(text)
                    .and_then(|signal| {
                        process::send_signal(pid, signal)?;
                        Ok(format!("{} sent to process {pid}", signal.as_str()))
                    })
                    .inspect(|_| reload_listing(procs))
            }
            _ => return,
        };
        match result {
            Ok(msg) => self.status.set(msg),
            Err(e) => self.status.set(format!("{e:#}")),
        }
    }

    /// Enter in the panel of the visible screen.
    pub fn activate_panel(&mut self) {
        match &mut self.screens.current_mut().view {
            ScreenView::Files(files) => {
                // Directories are entered, files open in an editor.
                if let Some(dir) = files.selected_dir() {
                    match files.load(&dir) {
                        Ok(()) => self.session.set_cwd(&dir),
                        Err(e) => self.status.set(e.to_string()),
                    }
                } else if let Some(file) = files.selected_file() {
                    self.open_screen_with(Mode::TextEdit, Some(Payload::Path(file)));
                }
            }
            ScreenView::TextEdit(editor) => editor.newline(),
            _ => {}
        }
    }

    /// Open the file selected in a Files screen in a new Hex Editor screen.
    pub fn open_selected_in_hex(&mut self) {
        let ScreenView::Files(files) = &self.screens.current().view else {
            return;
        };
        match files.selected_file() {
            Some(file) => self.open_screen_with(Mode::HexEdit, Some(Payload::Path(file))),
            None => self.status.set("No file selected"),
        }
    }

    /// Ask before killing the selected process.
    pub fn request_kill(&mut self) {
        if let Some(pid) = self.selected_pid() {
            self.overlay = Overlay::KillProcess(pid);
        }
    }

    pub fn kill_process(&mut self, pid: u32) {
        let message = match process::send_signal(pid, Signal::SIGKILL) {
            Ok(()) => format!("Killing process {pid}"),
            Err(e) => {
                tracing::warn!("{e:#}");
                format!("Unable to kill process {pid}")
            }
        };
        self.status.set(message);
        // Show the listing without the killed process.
        if let ScreenView::Process(procs) = &mut self.screens.current_mut().view {
            reload_listing(procs);
        }
    }

    /// Ask which signal to send to the selected process.
    pub fn request_signal(&mut self) {
        if let Some(pid) = self.selected_pid() {
            self.overlay = Overlay::InputBox(InputBoxState::new(
                format!("Signal for process {pid} (name or number):"),
                InputCallbackId::SendSignal(pid),
            ));
        }
    }

    /// Stop the selected process, or continue it if it is stopped.
    pub fn toggle_pause(&mut self) {
        let ScreenView::Process(procs) = &mut self.screens.current_mut().view else {
            return;
        };
        let Some(row) = procs.selected_row() else {
            self.status.set("No process selected");
            return;
        };
        let (pid, signal) = (row.pid, process::pause_signal(&row.state));
        let message = match process::send_signal(pid, signal) {
            Ok(()) if signal == Signal::SIGCONT => format!("Process {pid} resumed"),
            Ok(()) => format!("Process {pid} paused"),
            Err(e) => format!("{e:#}"),
        };
        reload_listing(procs);
        self.status.set(message);
    }

    fn selected_pid(&mut self) -> Option<u32> {
        let ScreenView::Process(procs) = &self.screens.current().view else {
            return None;
        };
        let pid = procs.selected_row().map(|row| row.pid);
        if pid.is_none() {
            self.status.set("No process selected");
        }
        pid
    }
}

/// Listing refresh after a signal; failures only reach the log.
fn reload_listing(procs: &mut ProcessView) {
    if let Err(e) = procs.reload() {
        tracing::warn!("process list reload failed: {e:#}");
    }
}
