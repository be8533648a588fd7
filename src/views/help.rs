use ratatui::{
    prelude::*,
    widgets::{Paragraph, Wrap},
};

use crate::screens::InitFn;

use super::{ScreenView, panel_block};

const HELP_TEXT: &str = "\
sysh - terminal shell for system administration

Screens
  Every screen is an independent view. F6/F7 cycle through them in the
  order they were opened, F10 opens the menu to jump to any of them and
  F3 closes the visible one. Closing returns to the screen shown just
  before. The last Shell screen cannot be closed.

Commands
  Lines typed at the prompt run in the current directory. Their output
  is appended to the Shell console together with the runtime and exit
  code. One command runs per Shell screen at a time; F4 interrupts it.

Built-in commands
  !shell   open a new Shell screen
  !files   open a Files screen
  !proc    open a Process screen
  !edit    open a Text Editor screen
  !sql     open a SQLite3 screen
  !hex     open a HexEdit screen
  !help    show this help
  !quit    leave (also !exit, !bye)
  cls      clear the console
  cd DIR   change the working directory

Keys
  F1 Help  F2 Prompt  F3 Close  F4 Interrupt  F5 Refresh
  F6 Previous  F7 Next  F10 Menu  F12 Quit
  Tab switches between the prompt and the panel.
  Up/Down at the prompt recall history.

Panels
  Files      Enter opens a directory or edits a file, x shows it in hex
  Process    k kills, s sends a signal, p pauses or resumes the process
  Text Edit  Ctrl+O opens a file, Ctrl+S saves it
  SQLite3    Ctrl+O opens a database, Ctrl+S closes it
  HexEdit    Ctrl+O opens a file, Ctrl+S closes it

Key bindings can be changed in shortcuts.toml inside the settings
directory (~/.sysh, or $SYSH_HOME).
";

#[derive(Debug, Default)]
pub struct HelpView {
    scroll: u16,
}

impl HelpView {
    pub fn scroll_by(&mut self, delta: isize) {
        let max = HELP_TEXT.lines().count().saturating_sub(1) as isize;
        self.scroll = (self.scroll as isize + delta).clamp(0, max) as u16;
    }
}

pub fn init() -> InitFn {
    Box::new(|view, _payload| {
        if let ScreenView::Help(help) = view {
            help.scroll = 0;
        }
        Ok(())
    })
}

pub fn render(f: &mut Frame, area: Rect, view: &HelpView, focused: bool) {
    let widget = Paragraph::new(HELP_TEXT)
        .wrap(Wrap { trim: false })
        .scroll((view.scroll, 0))
        .block(panel_block("Help".into(), focused));
    f.render_widget(widget, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_is_clamped() {
        let mut help = HelpView::default();
        help.scroll_by(-3);
        assert_eq!(help.scroll, 0);
        help.scroll_by(10_000);
        assert_eq!(help.scroll as usize, HELP_TEXT.lines().count() - 1);
    }
}
