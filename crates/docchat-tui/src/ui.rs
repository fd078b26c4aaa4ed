use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use docchat_core::{MenuAction, Sender, TextPosition, WidgetStatus};

use crate::app::{App, Focus};

const BUTTON_LABEL: &str = " Ask AI ";
const CLOSE_LABEL: &str = "[x]";

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_page(app, frame, body_area);

    if app.widget.is_open() {
        render_chat_panel(app, frame, body_area);
    } else {
        app.chat_area = None;
        render_floating_button(app, frame, body_area);
    }

    app.menu_items.clear();
    if app.menu_visible() {
        render_context_menu(app, frame, body_area);
    }

    render_footer(app, frame, footer_area);

    if app.menu.overlay().is_some() {
        render_overlay(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" docchat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.page.title.clone(), Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(
            format!("[{}]", app.client.config().backend_url),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let translate = app.menu.actions().contains(&MenuAction::Translate);
    let (mode, hints) = match app.focus {
        Focus::Page => ("PAGE", " drag: select | j/k: scroll | c: assistant | Tab: focus | q: quit"),
        Focus::Chat => ("CHAT", " Enter: send | Alt/Shift+Enter: newline | Tab: focus | Esc: close"),
        Focus::Menu if translate => ("MENU", " a: ask about this | t: translate | x: close | Tab: focus"),
        Focus::Menu => ("MENU", " a: ask about this | x: close | Tab: focus"),
        Focus::MenuQuestion => ("ASK", " type a question | Enter: ask | Esc: back"),
    };

    let footer = Line::from(vec![
        Span::styled(
            format!(" {} ", mode),
            Style::default().fg(Color::Black).bg(Color::Cyan).bold(),
        ),
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(footer), area);
}

/// Split one page line into plain and highlighted spans
fn highlight_line(text: &str, line_idx: usize, app: &App) -> Line<'static> {
    let selection = app.drag.or(app.highlight);
    let Some(selection) = selection else {
        return Line::from(text.to_string());
    };

    let highlight = Style::default().bg(Color::Blue).fg(Color::White);
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut current = String::new();
    let mut current_selected = false;

    for (col, c) in text.chars().enumerate() {
        let selected = selection.contains(TextPosition::new(line_idx, col));
        if selected != current_selected && !current.is_empty() {
            let style = if current_selected { highlight } else { Style::default() };
            spans.push(Span::styled(std::mem::take(&mut current), style));
        }
        current_selected = selected;
        current.push(c);
    }

    if !current.is_empty() {
        let style = if current_selected { highlight } else { Style::default() };
        spans.push(Span::styled(current, style));
    }

    Line::from(spans)
}

fn render_page(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == Focus::Page;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {} ", app.page.title));

    let inner = block.inner(area);
    app.page_area = Some(inner);
    app.page_height = inner.height;

    // Re-clamp after resize
    app.page.scroll = app.page.scroll.min(app.page.max_scroll(inner.height as usize));

    let view: &App = app;
    let lines: Vec<Line> = view
        .page
        .lines
        .iter()
        .enumerate()
        .skip(view.page.scroll)
        .take(inner.height as usize)
        .map(|(idx, text)| highlight_line(text, idx, view))
        .collect();

    frame.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
}

fn render_floating_button(app: &mut App, frame: &mut Frame, area: Rect) {
    let width = BUTTON_LABEL.chars().count() as u16;
    if area.width < width + 2 || area.height < 3 {
        app.button_area = None;
        return;
    }

    let button = Rect::new(
        area.x + area.width - width - 2,
        area.y + area.height - 2,
        width,
        1,
    );
    app.button_area = Some(button);

    let style = if app.widget.is_loading() {
        Style::default().fg(Color::Black).bg(Color::Yellow).bold()
    } else {
        Style::default().fg(Color::Black).bg(Color::Cyan).bold()
    };
    frame.render_widget(Paragraph::new(BUTTON_LABEL).style(style), button);
}

/// Break `text` into rows of at most `width` columns, on word boundaries.
/// Words longer than a row are split.
fn wrap_to_width(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        // Hard-split anything that can never fit on one row
        while word.len() > width {
            if current_len > 0 {
                rows.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(width);
            rows.push(word.into_iter().collect());
            word = rest;
        }

        let word_len = word.len();
        if word_len == 0 {
            continue;
        }
        if current_len == 0 {
            current = word.into_iter().collect();
            current_len = word_len;
        } else if current_len + 1 + word_len <= width {
            current.push(' ');
            current.extend(word);
            current_len += 1 + word_len;
        } else {
            rows.push(std::mem::take(&mut current));
            current = word.into_iter().collect();
            current_len = word_len;
        }
    }

    if !current.is_empty() {
        rows.push(current);
    }
    if rows.is_empty() {
        rows.push(String::new());
    }
    rows
}

/// Transcript rows, already wrapped to `width` so one line is one row
fn transcript_lines(app: &App, width: u16) -> Vec<Line<'static>> {
    let width = width as usize;
    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in app.widget.transcript().messages() {
        match msg.sender() {
            Sender::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
            }
            Sender::Bot => {
                lines.push(Line::from(Span::styled(
                    "AI:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
            }
        }
        for line in msg.text().lines() {
            lines.extend(wrap_to_width(line, width).into_iter().map(Line::from));
        }
        if !msg.sources().is_empty() {
            let sources = format!("Sources: {}", msg.sources().join(", "));
            let style = Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC);
            for row in wrap_to_width(&sources, width) {
                lines.push(Line::from(Span::styled(row, style)));
            }
        }
        lines.push(Line::default());
    }

    if app.widget.is_loading() {
        lines.push(Line::from(Span::styled(
            "AI:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

fn render_chat_panel(app: &mut App, frame: &mut Frame, area: Rect) {
    // Floating panel anchored bottom-right
    let width = (area.width / 20 * 9).clamp(30.min(area.width), area.width);
    let height = (area.height / 10 * 7).clamp(10.min(area.height), area.height);
    let panel = Rect::new(
        area.x + area.width - width,
        area.y + area.height - height,
        width,
        height,
    );
    app.chat_area = Some(panel);

    frame.render_widget(Clear, panel);

    let focused = app.focus == Focus::Chat;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Assistant ");
    let inner = block.inner(panel);
    frame.render_widget(block, panel);

    // Close marker in the top border acts as the panel's button
    let close_width = CLOSE_LABEL.chars().count() as u16;
    if panel.width > close_width + 2 {
        let close = Rect::new(panel.x + panel.width - close_width - 1, panel.y, close_width, 1);
        frame.render_widget(
            Paragraph::new(CLOSE_LABEL).style(Style::default().fg(Color::Red)),
            close,
        );
        app.button_area = Some(close);
    } else {
        app.button_area = None;
    }

    let banner_height = if app.widget.error_banner().is_some() { 1 } else { 0 };
    let input_lines = app.widget.input().text().split('\n').count().clamp(1, 4) as u16;
    let [chat_area, banner_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(banner_height),
        Constraint::Length(input_lines + 2),
    ])
    .areas(inner);

    // Transcript
    let lines = transcript_lines(app, chat_area.width);
    let total = u16::try_from(lines.len()).unwrap_or(u16::MAX);
    let max_scroll = total.saturating_sub(chat_area.height);
    if app.chat_follow || app.chat_scroll >= max_scroll {
        app.chat_scroll = max_scroll;
        app.chat_follow = true;
    }

    let chat = Paragraph::new(Text::from(lines)).scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    // Error banner
    if let WidgetStatus::OpenError(message) = app.widget.status() {
        let banner = Paragraph::new(Span::styled(
            format!(" {} ", message),
            Style::default().fg(Color::White).bg(Color::Red),
        ));
        frame.render_widget(banner, banner_area);
    }

    // Input
    let input_color = if focused { Color::Yellow } else { Color::DarkGray };
    let input_title = if app.widget.is_loading() { " Sending... " } else { " Ask a question " };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_color))
        .title(input_title);

    let input = app.widget.input();
    let before_cursor: String = input.text().chars().take(input.cursor()).collect();
    let cursor_row = before_cursor.matches('\n').count() as u16;
    let cursor_col = before_cursor
        .rsplit('\n')
        .next()
        .map(|l| l.chars().count())
        .unwrap_or(0) as u16;

    let visible_rows = input_area.height.saturating_sub(2).max(1);
    let row_offset = cursor_row.saturating_sub(visible_rows - 1);

    let input_widget = Paragraph::new(input.text().to_string())
        .style(Style::default().fg(Color::Cyan))
        .block(input_block)
        .scroll((row_offset, 0));
    frame.render_widget(input_widget, input_area);

    // Show cursor when editing
    if focused {
        let max_col = input_area.width.saturating_sub(3);
        frame.set_cursor_position((
            input_area.x + 1 + cursor_col.min(max_col),
            input_area.y + 1 + cursor_row - row_offset,
        ));
    }
}

fn render_context_menu(app: &mut App, frame: &mut Frame, area: Rect) {
    let actions = app.menu.actions();
    let asking = app.focus == Focus::MenuQuestion || !app.menu.question().text().is_empty();
    let width = 34.min(area.width);
    let question_rows: u16 = if asking { 2 } else { 0 };
    let status_rows: u16 = if app.menu.is_busy() { 1 } else { 0 };
    let height = (actions.len() as u16 + 2 + question_rows + status_rows).min(area.height);

    // Place below the release point, pulled back inside the body
    let (anchor_x, anchor_y) = app.menu_anchor;
    let x = anchor_x.clamp(area.x, (area.x + area.width).saturating_sub(width));
    let y = (anchor_y + 1).clamp(area.y, (area.y + area.height).saturating_sub(height));
    let popup = Rect::new(x, y, width, height);

    frame.render_widget(Clear, popup);

    let focused = matches!(app.focus, Focus::Menu | Focus::MenuQuestion);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Magenta } else { Color::DarkGray }))
        .title(" Selection ");
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let mut row = inner.y;
    let busy = app.menu.is_busy();

    if busy {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        frame.render_widget(
            Paragraph::new(Span::styled(
                format!(" Working{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )),
            Rect::new(inner.x, row, inner.width, 1),
        );
        row += 1;
    }

    for action in actions {
        if row >= inner.y + inner.height {
            break;
        }
        let item = Rect::new(inner.x, row, inner.width, 1);
        let key = match action {
            MenuAction::Ask => "a",
            MenuAction::Translate => "t",
            MenuAction::Close => "x",
        };
        let disabled = busy && action != MenuAction::Close;
        let style = if disabled {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(format!(" {} ", key), Style::default().fg(Color::Magenta).bold()),
                Span::styled(action.label(), style),
            ])),
            item,
        );
        if !disabled {
            app.menu_items.push((action, item));
        }
        row += 1;
    }

    if asking && row + 1 < inner.y + inner.height {
        let question = app.menu.question();
        frame.render_widget(
            Paragraph::new(Span::styled(" Question:", Style::default().fg(Color::DarkGray))),
            Rect::new(inner.x, row, inner.width, 1),
        );
        row += 1;

        let field_width = inner.width.saturating_sub(2) as usize;
        let scroll_offset = question.cursor().saturating_sub(field_width.saturating_sub(1));
        let visible: String = question
            .text()
            .chars()
            .skip(scroll_offset)
            .take(field_width)
            .collect();
        frame.render_widget(
            Paragraph::new(format!(" {}", visible)).style(Style::default().fg(Color::Cyan)),
            Rect::new(inner.x, row, inner.width, 1),
        );

        if app.focus == Focus::MenuQuestion {
            let cursor_x = (question.cursor() - scroll_offset) as u16;
            frame.set_cursor_position((inner.x + 1 + cursor_x, row));
        }
    }
}

fn render_overlay(app: &App, frame: &mut Frame, area: Rect) {
    let Some(overlay) = app.menu.overlay() else {
        return;
    };

    // Calculate popup size and position (centered)
    let popup_width = 70.min(area.width.saturating_sub(4));
    let popup_height = 14.min(area.height.saturating_sub(4));
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let title = match overlay.action {
        MenuAction::Translate => " Translation (Esc to close) ",
        _ => " Response (Esc to close) ",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);

    let mut lines: Vec<Line> = overlay
        .text
        .lines()
        .map(|l| Line::from(l.to_string()))
        .collect();
    if overlay.provisional {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "Placeholder output: translation is not available from the backend yet.",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
        )));
    }

    let paragraph = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Page;
    use crate::tui::BackendEvent;
    use docchat_core::{ChatReply, Config};
    use ratatui::{backend::TestBackend, Terminal};
    use tokio::sync::mpsc;

    fn test_app(config: Config) -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        let page = Page::from_text("guide.md", "Joints are driven by servo motors.");
        App::new(config, page, tx).unwrap()
    }

    fn draw(app: &mut App, width: u16, height: u16) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .chunks(width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect()
    }

    #[test]
    fn test_wrap_breaks_on_words() {
        assert_eq!(wrap_to_width("aaa bb cccc", 6), vec!["aaa bb", "cccc"]);
        assert_eq!(wrap_to_width("ab cd", 5), vec!["ab cd"]);
        assert_eq!(wrap_to_width("", 5), vec![""]);
    }

    #[test]
    fn test_wrap_splits_overlong_words() {
        assert_eq!(wrap_to_width("x abcdefgh y", 3), vec!["x", "abc", "def", "gh", "y"]);
    }

    #[test]
    fn test_following_shows_end_of_long_reply() {
        let mut app = test_app(Config::default());
        app.toggle_widget();
        app.widget.input_char('?');
        let request = app.widget.submit().unwrap();

        let words = ["a", "bb", "ccc", "dddd", "eeeee", "ffffff", "ggggggg", "hhhhhhhh", "iii", "jjjjjjjjj"];
        let mut reply: Vec<&str> = (0..300).map(|i| words[i % words.len()]).collect();
        reply.push("ENDMARK");
        app.handle_backend(BackendEvent::Chat {
            id: request.id,
            outcome: Ok(ChatReply {
                response: reply.join(" "),
                sources: Vec::new(),
            }),
        });

        let screen = draw(&mut app, 50, 24).join("\n");
        assert!(screen.contains("ENDMARK"), "reply tail hidden:\n{}", screen);
    }

    #[test]
    fn test_menu_hint_omits_translate_when_disabled() {
        let mut app = test_app(Config::default());
        app.focus = Focus::Menu;
        let footer = draw(&mut app, 80, 12).pop().unwrap();
        assert!(footer.contains("a: ask about this"));
        assert!(!footer.contains("t: translate"));

        let mut app = test_app(Config::default().with_translation(true));
        app.focus = Focus::Menu;
        let footer = draw(&mut app, 80, 12).pop().unwrap();
        assert!(footer.contains("t: translate"));
    }
}
