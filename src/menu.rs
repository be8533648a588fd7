//! Global menu: jump to an open screen or open a new one.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState},
};

use crate::input::centered_popup;
use crate::screens::{Mode, ScreenStack};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuAction {
    ShowScreen(usize),
    Open(Mode),
    Quit,
}

#[derive(Clone, Debug)]
pub struct MenuItem {
    pub label: String,
    /// `None` for separators.
    pub action: Option<MenuAction>,
    pub checked: bool,
}

impl MenuItem {
    fn action(label: impl Into<String>, action: MenuAction) -> Self {
        Self {
            label: label.into(),
            action: Some(action),
            checked: false,
        }
    }

    fn separator() -> Self {
        Self {
            label: String::new(),
            action: None,
            checked: false,
        }
    }
}

const OPEN_ENTRIES: &[(&str, Mode)] = &[
    ("Help", Mode::Help),
    ("Shell", Mode::Shell),
    ("Files", Mode::Files),
    ("Process", Mode::Process),
    ("Text Editor", Mode::TextEdit),
    ("SQLite3", Mode::SQLite3),
    ("Hex Editor", Mode::HexEdit),
];

#[derive(Clone, Debug)]
pub struct MenuState {
    pub items: Vec<MenuItem>,
    pub selected: usize,
}

impl MenuState {
    /// Menu for the current stack, with the visible screen checked and selected.
    pub fn main(stack: &ScreenStack) -> Self {
        let mut items: Vec<MenuItem> = stack
            .screens()
            .iter()
            .enumerate()
            .map(|(i, screen)| MenuItem {
                label: format!("{:02}) {}", i + 1, screen.label()),
                action: Some(MenuAction::ShowScreen(i)),
                checked: i == stack.cursor(),
            })
            .collect();
        items.push(MenuItem::separator());
        items.extend(
            OPEN_ENTRIES
                .iter()
                .map(|(label, mode)| MenuItem::action(*label, MenuAction::Open(*mode))),
        );
        items.push(MenuItem::separator());
        items.push(MenuItem::action("Quit", MenuAction::Quit));

        Self {
            items,
            selected: stack.cursor(),
        }
    }

    pub fn move_up(&mut self) {
        self.step(-1);
    }

    pub fn move_down(&mut self) {
        self.step(1);
    }

    /// Move by one, wrapping and skipping separators.
    fn step(&mut self, delta: isize) {
        let len = self.items.len() as isize;
        let mut index = self.selected as isize;
        for _ in 0..len {
            index = (index + delta).rem_euclid(len);
            if self.items[index as usize].action.is_some() {
                self.selected = index as usize;
                return;
            }
        }
    }

    pub fn selected_action(&self) -> Option<MenuAction> {
        self.items.get(self.selected).and_then(|item| item.action)
    }
}

pub fn render_menu(f: &mut Frame, state: &MenuState) {
    let height = (state.items.len() as u16 + 2).min(f.area().height);
    let area = centered_popup(f.area(), 40, height);
    f.render_widget(Clear, area);

    let items: Vec<ListItem> = state
        .items
        .iter()
        .map(|item| {
            if item.action.is_none() {
                return ListItem::new("─".repeat(area.width.saturating_sub(2) as usize))
                    .style(Style::default().fg(Color::DarkGray));
            }
            let mark = if item.checked { "✓ " } else { "  " };
            ListItem::new(format!("{mark}{}", item.label))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Menu")
                .style(Style::default().bg(Color::Blue)),
        )
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));
    let mut list_state = ListState::default();
    list_state.select(Some(state.selected));
    f.render_stateful_widget(list, area, &mut list_state);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_lists_open_screens_then_fixed_entries() {
        let mut stack = ScreenStack::new();
        stack.add_new_screen(Mode::Files, None, None);
        let menu = MenuState::main(&stack);

        assert!(menu.items[0].label.starts_with("01) Shell-"));
        assert!(menu.items[1].label.starts_with("02) Files-"));
        assert!(menu.items[1].checked);
        assert!(!menu.items[0].checked);
        assert_eq!(menu.selected, 1);
        assert_eq!(menu.items.last().and_then(|i| i.action), Some(MenuAction::Quit));
        assert_eq!(menu.items.len(), 2 + 1 + OPEN_ENTRIES.len() + 1 + 1);
    }

    #[test]
    fn test_navigation_skips_separators_and_wraps() {
        let stack = ScreenStack::new();
        let mut menu = MenuState::main(&stack);
        menu.move_down();
        assert_eq!(menu.selected_action(), Some(MenuAction::Open(Mode::Help)));
        menu.move_up();
        assert_eq!(menu.selected_action(), Some(MenuAction::ShowScreen(0)));
        menu.move_up();
        assert_eq!(menu.selected_action(), Some(MenuAction::Quit));
    }
}
