//! Key dispatch.
//!
//! Order: Ctrl+C (swallowed), global hotkeys, the open overlay, then the
//! focused widget of the visible screen.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::{
    input::LineInput,
    menu::{MenuAction, MenuState},
    screens::Mode,
    shortcuts::{InputBoxShortcuts, matches_shortcut},
    views::{Focus, ScreenView},
};

use super::{App, Overlay};

/// Rows moved by PageUp/PageDown.
const PAGE: isize = 10;

/// Handle one key press.
pub fn handle_key(app: &mut App, k: KeyEvent) -> Result<()> {
    if is_ctrl_c(&k) {
        return Ok(());
    }
    // Hotkeys win over any overlay or widget.
    if handle_global_key(app, &k) {
        return Ok(());
    }

    // The overlay is put back unless the key dismissed it.
    match std::mem::replace(&mut app.overlay, Overlay::None) {
        Overlay::None => {}
        Overlay::Menu(menu) => {
            handle_menu_key(app, menu, &k);
            return Ok(());
        }
        Overlay::Quit => {
            match confirm_answer(app, &k) {
                Some(true) => app.quit(),
                Some(false) => {}
                None => app.overlay = Overlay::Quit,
            }
            return Ok(());
        }
        Overlay::KillProcess(pid) => {
            match confirm_answer(app, &k) {
                Some(true) => app.kill_process(pid),
                Some(false) => {}
                None => app.overlay = Overlay::KillProcess(pid),
            }
            return Ok(());
        }
        Overlay::InputBox(mut state) => {
            let sc = &app.shortcuts.input_box;
            if matches_shortcut(&k, &sc.confirm) {
                let text = state.input.take();
                app.confirm_input(state.callback_id, &text);
            } else if !matches_shortcut(&k, &sc.cancel) {
                edit_line(&mut state.input, &k, sc);
                app.overlay = Overlay::InputBox(state);
            }
            return Ok(());
        }
    }

    // No overlay: the focused widget of the visible screen.
    match app.screens.current().focus {
        Focus::Prompt => handle_prompt_key(app, &k),
        Focus::Panel => handle_panel_key(app, &k),
    }
    Ok(())
}

pub fn is_ctrl_c(k: &KeyEvent) -> bool {
    k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c')
}

/// Returns `true` if `k` was a global hotkey. Any overlay is dismissed first.
fn handle_global_key(app: &mut App, k: &KeyEvent) -> bool {
    let sc = app.shortcuts.global.clone();
    let matched = |keys: &[String]| matches_shortcut(k, keys);

    let hit = [
        &sc.help,
        &sc.prompt,
        &sc.close,
        &sc.interrupt,
        &sc.refresh,
        &sc.previous,
        &sc.next,
        &sc.menu,
        &sc.quit,
        &sc.open,
        &sc.save,
    ]
    .into_iter()
    .any(|keys| matched(keys));
    if !hit {
        return false;
    }
    // F10 toggles the menu.
    let menu_open = matches!(app.overlay, Overlay::Menu(_));
    app.overlay = Overlay::None;

    // Dispatch the hotkey.
    if matched(&sc.help) {
        app.open_screen(Mode::Help);
    } else if matched(&sc.prompt) {
        app.screens.current_mut().focus = Focus::Prompt;
    } else if matched(&sc.close) {
        app.close_current();
    } else if matched(&sc.interrupt) {
        app.stop_current_command();
    } else if matched(&sc.refresh) {
        app.refresh();
    } else if matched(&sc.previous) {
        app.screens.show_previous_screen();
    } else if matched(&sc.next) {
        app.screens.show_next_screen();
    } else if matched(&sc.menu) {
        if !menu_open {
            app.overlay = Overlay::Menu(MenuState::main(&app.screens));
        }
    } else if matched(&sc.quit) {
        app.overlay = Overlay::Quit;
    } else if matched(&sc.open) {
        app.request_open();
    } else if matched(&sc.save) {
        app.save_document();
    }
    true
}

fn handle_menu_key(app: &mut App, mut menu: MenuState, k: &KeyEvent) {
    let sc = &app.shortcuts.menu;
    if matches_shortcut(k, &sc.cancel) {
        return;
    }
    // Act on the entry; separators keep the menu open.
    if matches_shortcut(k, &sc.select) {
        match menu.selected_action() {
            Some(MenuAction::ShowScreen(index)) => app.screens.show_screen(index),
            Some(MenuAction::Open(mode)) => app.open_screen(mode),
            Some(MenuAction::Quit) => app.overlay = Overlay::Quit,
            None => app.overlay = Overlay::Menu(menu),
        }
        return;
    }
    if matches_shortcut(k, &sc.up) {
        menu.move_up();
    } else if matches_shortcut(k, &sc.down) {
        menu.move_down();
    }
    app.overlay = Overlay::Menu(menu);
}

/// `Some(true)` on confirm, `Some(false)` on cancel, `None` for other keys.
fn confirm_answer(app: &App, k: &KeyEvent) -> Option<bool> {
    let sc = &app.shortcuts.dialog;
    if matches_shortcut(k, &sc.confirm) {
        Some(true)
    } else if matches_shortcut(k, &sc.cancel) {
        Some(false)
    } else {
        None
    }
}

fn handle_prompt_key(app: &mut App, k: &KeyEvent) {
    let sc = &app.shortcuts.prompt;
    if matches_shortcut(k, &sc.submit) {
        app.submit_prompt();
    } else if matches_shortcut(k, &sc.history_prev) {
        app.recall_history(true);
    } else if matches_shortcut(k, &sc.history_next) {
        app.recall_history(false);
    } else if matches_shortcut(k, &sc.focus) {
        app.screens.current_mut().focus = Focus::Panel;
    } else {
        edit_line(&mut app.prompt, k, &app.shortcuts.input_box);
    }
}

fn handle_panel_key(app: &mut App, k: &KeyEvent) {
    let sc = &app.shortcuts.panel;
    let screen = app.screens.current_mut();

    if matches_shortcut(k, &sc.focus) {
        screen.focus = Focus::Prompt;
    } else if matches_shortcut(k, &sc.activate) {
        app.activate_panel();
    } else if matches_shortcut(k, &sc.up) {
        screen.view.scroll_by(-1);
    } else if matches_shortcut(k, &sc.down) {
        screen.view.scroll_by(1);
    } else if matches_shortcut(k, &sc.page_up) {
        screen.view.scroll_by(-PAGE);
    } else if matches_shortcut(k, &sc.page_down) {
        screen.view.scroll_by(PAGE);
    } else if let ScreenView::TextEdit(editor) = &mut screen.view {
        match k.code {
            KeyCode::Backspace => editor.backspace(),
            KeyCode::Char(c) if !k.modifiers.contains(KeyModifiers::CONTROL) => {
                editor.insert_char(c)
            }
            _ => {}
        }
    } else {
        handle_mode_key(app, k);
    }
}

/// Row actions of the Files and Process panels.
fn handle_mode_key(app: &mut App, k: &KeyEvent) {
    match app.screens.current().mode {
        Mode::Files => {
            if matches_shortcut(k, &app.shortcuts.files.hex) {
                app.open_selected_in_hex();
            }
        }
        Mode::Process => {
            let sc = &app.shortcuts.process;
            if matches_shortcut(k, &sc.kill) {
                app.request_kill();
            } else if matches_shortcut(k, &sc.signal) {
                app.request_signal();
            } else if matches_shortcut(k, &sc.pause) {
                app.toggle_pause();
            }
        }
        _ => {}
    }
}

/// Line editing shared by the prompt and the input box.
fn edit_line(input: &mut LineInput, k: &KeyEvent, sc: &InputBoxShortcuts) {
    if matches_shortcut(k, &sc.backspace) {
        input.backspace();
    } else if matches_shortcut(k, &sc.delete) {
        input.delete();
    } else if matches_shortcut(k, &sc.left) {
        input.move_left();
    } else if matches_shortcut(k, &sc.right) {
        input.move_right();
    } else if matches_shortcut(k, &sc.home) {
        input.move_home();
    } else if matches_shortcut(k, &sc.end) {
        input.move_end();
    } else if matches_shortcut(k, &sc.clear_line) {
        input.clear_line();
    } else if let KeyCode::Char(c) = k.code
        && !k.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
    {
        input.insert_char(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{press, test_app, type_line};

    #[test]
    fn test_tab_toggles_focus() {
        let (mut app, _dir) = test_app();
        assert_eq!(app.screens.current().focus, Focus::Prompt);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.screens.current().focus, Focus::Panel);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.screens.current().focus, Focus::Prompt);
    }

    #[test]
    fn test_menu_jumps_to_screen() {
        let (mut app, _dir) = test_app();
        type_line(&mut app, "!help");
        press(&mut app, KeyCode::F(10));
        assert!(matches!(app.overlay, Overlay::Menu(_)));

        press(&mut app, KeyCode::Up);
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.overlay, Overlay::None));
        assert_eq!(app.screens.current().mode, Mode::Shell);
        assert_eq!(app.screens.len(), 2);
    }

    #[test]
    fn test_menu_opens_new_screen() {
        let (mut app, _dir) = test_app();
        press(&mut app, KeyCode::F(10));
        // Skip the separator to the first fixed entry (Help), then Shell.
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.screens.len(), 2);
        assert_eq!(app.screens.current().mode, Mode::Shell);
    }

    #[test]
    fn test_quit_dialog_cancel_keeps_running() {
        let (mut app, _dir) = test_app();
        press(&mut app, KeyCode::F(12));
        assert!(matches!(app.overlay, Overlay::Quit));
        press(&mut app, KeyCode::Char('x'));
        assert!(matches!(app.overlay, Overlay::Quit));
        press(&mut app, KeyCode::Esc);
        assert!(matches!(app.overlay, Overlay::None));
        assert!(!app.should_quit);
    }

    #[test]
    fn test_global_key_dismisses_overlay() {
        let (mut app, _dir) = test_app();
        press(&mut app, KeyCode::F(12));
        press(&mut app, KeyCode::F(1));
        assert!(matches!(app.overlay, Overlay::None));
        assert_eq!(app.screens.current().mode, Mode::Help);
    }

    #[test]
    fn test_text_editor_receives_typing() {
        let (mut app, _dir) = test_app();
        type_line(&mut app, "!edit");
        assert_eq!(app.screens.current().focus, Focus::Panel);
        for c in "hi".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('!'));
        let ScreenView::TextEdit(editor) = &app.screens.current().view else {
            panic!("editor screen");
        };
        assert_eq!(editor.text(), "hi\n!");
        assert_eq!(app.prompt.value(), "");
    }
}
