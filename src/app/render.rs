//! Frame drawing.

use std::fmt::Write as _;

use ratatui::{
    Frame,
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::{
    input::{self, centered_popup},
    layout,
    menu::render_menu,
    views::Focus,
};

use super::{App, Overlay};

const WHEAT: Color = Color::Rgb(245, 222, 179);

/// Draw the whole frame: header, visible screen, prompt, hints, status and
/// the overlay, if any.
pub fn draw(f: &mut Frame, app: &App) {
    let main_layout = layout::create_main_layout(f.area());
    let screen = app.screens.current();

    // Header row.
    draw_header(f, app, main_layout.header);

    // Body; the panel only looks focused when no popup covers it.
    let no_overlay = matches!(app.overlay, Overlay::None);
    screen.view.render(
        f,
        main_layout.body,
        no_overlay && screen.focus == Focus::Panel,
    );

    draw_prompt(f, app, main_layout.prompt, no_overlay && screen.focus == Focus::Prompt);

    // Global hints, then the ones of the visible mode.
    let hints = format!(
        "{}\n{}",
        app.shortcuts.global_hints(),
        screen.mode.key_hints()
    );
    f.render_widget(
        Paragraph::new(hints)
            .style(Style::default().fg(Color::Gray))
            .wrap(Wrap { trim: true }),
        main_layout.hints,
    );

    draw_status(f, app, main_layout.status);

    // Popups last, above everything else.
    match &app.overlay {
        Overlay::None => {}
        Overlay::Menu(menu) => render_menu(f, menu),
        Overlay::Quit => draw_confirm(f, "Quit", "Quit sysh?"),
        Overlay::KillProcess(pid) => draw_confirm(f, "Kill", &format!("Kill process {pid}?")),
        Overlay::InputBox(state) => input::render_input_box(f, state),
    }
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let now = chrono::Local::now();
    let screen = app.screens.current();
    let style = Style::default()
        .bg(Color::Blue)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD);

    // write! reports a bad user format as an error instead of panicking.
    let mut date = String::from(" ");
    let _ = write!(date, "{}", now.format(&app.cfg.date_format));
    let mut time = String::new();
    let _ = write!(time, "{} ", now.format(&app.cfg.time_format));

    let mut title = format!("sysh :: {}", screen.label());
    if let Some(job) = app.session.jobs.get(&screen.id) {
        let _ = write!(
            title,
            "  [running: {} {}s]",
            job.command,
            job.started.elapsed().as_secs()
        );
    }

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(20),
            Constraint::Min(10),
            Constraint::Length(20),
        ])
        .split(area);
    f.render_widget(Paragraph::new(date).style(style), cols[0]);
    f.render_widget(
        Paragraph::new(title).style(style).alignment(Alignment::Center),
        cols[1],
    );
    f.render_widget(
        Paragraph::new(time).style(style).alignment(Alignment::Right),
        cols[2],
    );
}

fn draw_prompt(f: &mut Frame, app: &App, area: Rect, focused: bool) {
    let title = format!(
        "{}:{}",
        app.session.greeting(),
        app.session.cwd().display()
    );
    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let width = area.width.saturating_sub(4) as usize;
    let text = if focused {
        app.prompt.visible(width)
    } else {
        app.prompt.value().to_string()
    };
    let mut line = Style::default();
    if app.prompt.is_selected() {
        line = line.add_modifier(Modifier::REVERSED);
    }
    let prompt = Paragraph::new(format!("> {text}"))
        .style(line)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(title),
        );
    f.render_widget(prompt, area);
}

fn draw_status(f: &mut Frame, app: &App, area: Rect) {
    let cols = layout::create_status_layout(area);
    let bar = Style::default().bg(Color::DarkGray).fg(Color::White);

    f.render_widget(
        Paragraph::new(app.session.greeting()).style(bar.add_modifier(Modifier::BOLD)),
        cols.user,
    );
    f.render_widget(Paragraph::new(app.status.text().to_string()).style(bar), cols.message);
    f.render_widget(
        Paragraph::new(app.indicators.pid.clone()).style(bar),
        cols.pid,
    );

    // Exit code: wheat when it succeeded, red otherwise.
    let (rc_text, rc_style) = match app.indicators.rc {
        Some(0) => ("RC 0".to_string(), bar.fg(WHEAT)),
        Some(rc) => (format!("RC {rc}"), bar.fg(Color::Red)),
        None => (String::new(), bar),
    };
    f.render_widget(Paragraph::new(rc_text).style(rc_style), cols.rc);

    f.render_widget(
        Paragraph::new(app.session.cwd().display().to_string())
            .style(bar)
            .alignment(Alignment::Right),
        cols.cwd,
    );
}

/// Yes/no question in a red box.
fn draw_confirm(f: &mut Frame, title: &str, question: &str) {
    let area = centered_popup(f.area(), 40, 5);
    f.render_widget(Clear, area);
    let dialog = Paragraph::new(format!("{question}\n[y]es / [n]o"))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string())
                .style(Style::default().bg(Color::Red).fg(Color::White)),
        );
    f.render_widget(dialog, area);
}
