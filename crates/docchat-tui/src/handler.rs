use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use docchat_core::MenuAction;
use ratatui::layout::Rect;

use crate::app::{App, Focus};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Backend(event) => app.handle_backend(event),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }

    // The response overlay swallows keys until dismissed
    if app.menu.overlay().is_some() {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
            app.menu.dismiss_overlay();
        }
        return;
    }

    match app.focus {
        Focus::Page => handle_page_keys(app, key),
        Focus::Chat => handle_chat_keys(app, key),
        Focus::Menu => handle_menu_keys(app, key),
        Focus::MenuQuestion => handle_question_keys(app, key),
    }
}

/// Next focus target when cycling with Tab
fn next_focus(app: &App) -> Focus {
    let order = [Focus::Page, Focus::Chat, Focus::Menu];
    let current = match app.focus {
        Focus::MenuQuestion => Focus::Menu,
        other => other,
    };
    let start = order.iter().position(|f| *f == current).unwrap_or(0);
    for step in 1..=order.len() {
        let candidate = order[(start + step) % order.len()];
        let available = match candidate {
            Focus::Page => true,
            Focus::Chat => app.widget.is_open(),
            Focus::Menu | Focus::MenuQuestion => app.menu_visible(),
        };
        if available {
            return candidate;
        }
    }
    Focus::Page
}

fn handle_page_keys(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('q') => app.quit(),

        // Scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_page(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_page(-1),
        KeyCode::Char('d') if ctrl => app.scroll_page(app.half_page()),
        KeyCode::Char('u') if ctrl => app.scroll_page(-app.half_page()),
        KeyCode::PageDown => app.scroll_page(app.half_page()),
        KeyCode::PageUp => app.scroll_page(-app.half_page()),
        KeyCode::Char('g') | KeyCode::Home => app.page.scroll = 0,
        KeyCode::Char('G') | KeyCode::End => app.scroll_page(isize::MAX / 2),

        // Floating button
        KeyCode::Char('c') => app.toggle_widget(),

        KeyCode::Tab => app.focus = next_focus(app),
        KeyCode::Esc => {
            if app.menu_visible() {
                app.close_menu();
            }
        }
        _ => {}
    }
}

fn handle_chat_keys(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_widget(),
        KeyCode::Tab => app.focus = next_focus(app),
        KeyCode::Enter => {
            // Shift is not reported by every terminal, so Alt works too.
            let literal_newline = key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT);
            app.commit_chat(literal_newline);
        }
        KeyCode::Backspace => app.widget.input_backspace(),
        KeyCode::Delete => app.widget.input_delete(),
        KeyCode::Left => app.widget.input_mut().move_left(),
        KeyCode::Right => app.widget.input_mut().move_right(),
        KeyCode::Home => app.widget.input_mut().move_home(),
        KeyCode::End => app.widget.input_mut().move_end(),
        KeyCode::Up => {
            app.chat_follow = false;
            app.chat_scroll = app.chat_scroll.saturating_sub(1);
        }
        KeyCode::Down => app.chat_scroll = app.chat_scroll.saturating_add(1),
        KeyCode::Char(c) => app.widget.input_char(c),
        _ => {}
    }
}

fn handle_menu_keys(app: &mut App, key: KeyEvent) {
    if !app.menu_visible() {
        app.focus = Focus::Page;
        return;
    }
    match key.code {
        KeyCode::Char('a') | KeyCode::Enter => app.run_menu_action(MenuAction::Ask),
        KeyCode::Char('t') => app.run_menu_action(MenuAction::Translate),
        KeyCode::Char('x') | KeyCode::Esc => app.run_menu_action(MenuAction::Close),
        KeyCode::Tab => app.focus = next_focus(app),
        KeyCode::Char('q') => app.quit(),
        _ => {}
    }
}

fn handle_question_keys(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.focus = Focus::Menu,
        KeyCode::Enter => app.run_menu_action(MenuAction::Ask),
        KeyCode::Backspace => app.menu.question_mut().backspace(),
        KeyCode::Delete => app.menu.question_mut().delete(),
        KeyCode::Left => app.menu.question_mut().move_left(),
        KeyCode::Right => app.menu.question_mut().move_right(),
        KeyCode::Home => app.menu.question_mut().move_home(),
        KeyCode::End => app.menu.question_mut().move_end(),
        KeyCode::Char(c) => app.menu.question_mut().insert(c),
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let on_button = app.button_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let menu_hit = app
        .menu_items
        .iter()
        .find(|(_, rect)| point_in_rect(x, y, *rect))
        .map(|(action, _)| *action);

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if app.menu.overlay().is_some() {
                app.menu.dismiss_overlay();
            } else if let Some(action) = menu_hit {
                app.run_menu_action(action);
            } else if on_button {
                app.toggle_widget();
            } else if in_chat {
                app.focus = Focus::Chat;
            } else if let Some(pos) = app.page_position(x, y) {
                app.begin_drag(pos);
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            if let Some(pos) = app.page_position(x, y) {
                app.extend_drag(pos);
            }
        }
        MouseEventKind::Up(MouseButton::Left) => app.end_drag(x, y),
        MouseEventKind::ScrollDown => {
            if in_chat {
                app.chat_scroll = app.chat_scroll.saturating_add(3);
            } else {
                app.scroll_page(3);
            }
        }
        MouseEventKind::ScrollUp => {
            if in_chat {
                app.chat_follow = false;
                app.chat_scroll = app.chat_scroll.saturating_sub(3);
            } else {
                app.scroll_page(-3);
            }
        }
        _ => {}
    }
}
