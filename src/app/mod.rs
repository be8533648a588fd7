//! Event loop, application state and startup.

mod handlers;
mod panels;
mod render;
mod shell;

use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use std::{process::Command, time::Duration, time::Instant};
use tokio::sync::mpsc;

use crate::{
    config::{AppPaths, Config},
    events::{Indicators, StatusLine, UiEvent},
    history::{self, History},
    input::{InputBoxState, LineInput},
    menu::MenuState,
    screens::{Mode, ScreenStack},
    session::Session,
    shortcuts::Shortcuts,
    ui::{self, Tui},
    views::console::LineKind,
};

use handlers::handle_key;
use render::draw;

/// Popup drawn above the visible screen. At most one at a time.
pub enum Overlay {
    None,
    Menu(MenuState),
    Quit,
    /// Asks before SIGKILL goes to the process with this pid.
    KillProcess(u32),
    InputBox(InputBoxState),
}

/// State shared by key handling and rendering. Owned by the UI thread.
pub struct App {
    pub cfg: Config,
    pub paths: AppPaths,
    pub shortcuts: Shortcuts,
    pub session: Session,
    pub screens: ScreenStack,
    pub prompt: LineInput,
    pub shell_history: History,
    pub sql_history: History,
    pub status: StatusLine,
    pub indicators: Indicators,
    pub overlay: Overlay,
    /// Cloned into every background task.
    pub ui_tx: mpsc::Sender<UiEvent>,
    pub ui_rx: mpsc::Receiver<UiEvent>,
    pub should_quit: bool,
}

impl App {
    pub fn new(cfg: Config, paths: AppPaths, shortcuts: Shortcuts, session: Session) -> Self {
        let (ui_tx, ui_rx) = mpsc::channel::<UiEvent>(1024);
        // Histories of earlier sessions.
        let shell_history = load_history(&paths.shell_history(&cfg), cfg.history_max);
        let sql_history = load_history(&paths.sql_history(&cfg), cfg.history_max);
        let status = StatusLine::new(Duration::from_secs(cfg.status_secs));

        // Screen 0 is the first shell; size its console from the config.
        let mut screens = ScreenStack::new();
        if let Some(console) = screens.current_mut().view.console_mut() {
            *console = crate::views::console::ConsoleView::with_capacity(cfg.console_max_lines);
        }

        Self {
            cfg,
            paths,
            shortcuts,
            session,
            screens,
            prompt: LineInput::default(),
            shell_history,
            sql_history,
            status,
            indicators: Indicators::default(),
            overlay: Overlay::None,
            ui_tx,
            ui_rx,
            should_quit: false,
        }
    }

    /// Welcome text in the first console, then the configured startup screen.
    pub fn startup(&mut self) {
        let version = env!("CARGO_PKG_VERSION");
        let greeting = self.session.greeting();
        if let Some(console) = self.screens.current_mut().view.console_mut() {
            // Banner, then the kernel line.
            console.header(":: Welcome to sysh :");
            console.push(LineKind::Info, format!("sysh version {version} - {greeting}"));
            match Command::new("uname").arg("-a").output() {
                Ok(out) => {
                    for line in String::from_utf8_lossy(&out.stdout).lines() {
                        console.push(LineKind::Stdout, line);
                    }
                }
                Err(e) => tracing::warn!("uname failed: {e}"),
            }
        }
        if self.cfg.startup_screen != Mode::Shell {
            self.open_screen(self.cfg.startup_screen);
        }
        self.status.set("Welcome.");
    }

    /// Drop the status message once it expired.
    pub fn tick(&mut self) {
        self.status.tick(Instant::now());
    }

    /// Apply every event the background tasks have posted so far.
    pub fn drain_events(&mut self) {
        while let Ok(ev) = self.ui_rx.try_recv() {
            self.apply_event(ev);
        }
    }

    /// Window title for the visible screen.
    pub fn window_title(&self) -> String {
        format!("sysh - {}", self.screens.current().label())
    }

    pub fn save_histories(&self) {
        let targets = [
            (self.paths.shell_history(&self.cfg), &self.shell_history),
            (self.paths.sql_history(&self.cfg), &self.sql_history),
        ];
        for (path, history) in targets {
            if let Err(e) = history::save(&path, history.entries()) {
                tracing::error!("{e:#}");
            }
        }
    }

    /// Interrupt running commands, save both histories and leave the loop.
    pub fn quit(&mut self) {
        let interrupted = self.session.jobs.interrupt_all();
        if interrupted > 0 {
            tracing::info!("interrupted {interrupted} running command(s) on quit");
        }
        self.save_histories();
        self.should_quit = true;
    }
}

fn load_history(path: &std::path::Path, max: usize) -> History {
    match history::load(path) {
        Ok(entries) => History::from_entries(entries, max),
        Err(e) => {
            tracing::warn!("{e:#}");
            History::new(max)
        }
    }
}

/// Run the main TUI loop until the user quits.
pub async fn run_app(
    terminal: &mut Tui,
    cfg: Config,
    paths: AppPaths,
    shortcuts: Shortcuts,
) -> Result<()> {
    let session = Session::new(std::env::current_dir()?);
    tracing::info!(
        "session {} for {} in {}",
        session.id,
        session.greeting(),
        session.cwd().display()
    );

    let mut app = App::new(cfg, paths, shortcuts, session);
    app.startup();

    let mut title = String::new();
    loop {
        app.tick();
        // Window title only when it changed.
        let wanted = app.window_title();
        if wanted != title {
            if let Err(e) = ui::set_title(&wanted) {
                tracing::debug!("cannot set window title: {e}");
            }
            title = wanted;
        }

        // Draw the frame.
        terminal.draw(|f| draw(f, &app))?;

        // Background events first, then keys.
        app.drain_events();
        if app.should_quit {
            break;
        }

        // Short poll keeps output flowing while no key is pressed.
        if event::poll(Duration::from_millis(50))?
            && let Event::Key(k) = event::read()?
            && k.kind == KeyEventKind::Press
        {
            handle_key(&mut app, k)?;
        }
        if app.should_quit {
            break;
        }
    }
    tracing::info!("session {} closed", app.session.id);
    Ok(())
}
