use docchat_core::{
    ApiClient, Config, ContextMenu, DocumentEvents, MenuAction, MenuRequest, MenuRequestKind,
    PendingRequest, ReleaseKind, SelectionCapture, TextPosition, TextSelection, Widget,
};
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::page::Page;
use crate::tui::{AppEvent, BackendEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Page,
    Chat,
    Menu,
    MenuQuestion,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub focus: Focus,

    // Document
    pub page: Page,
    pub page_height: u16,
    pub document_events: DocumentEvents,
    pub capture: SelectionCapture,
    pub drag: Option<TextSelection>,
    pub highlight: Option<TextSelection>,

    // Context menu
    pub menu: ContextMenu,
    pub menu_anchor: (u16, u16),
    pub menu_task: Option<JoinHandle<()>>,

    // Chat widget
    pub widget: Widget,
    pub chat_scroll: u16,
    pub chat_follow: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub page_area: Option<Rect>,
    pub button_area: Option<Rect>,
    pub chat_area: Option<Rect>,
    pub menu_items: Vec<(MenuAction, Rect)>,

    pub client: ApiClient,
    backend_tx: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(config: Config, page: Page, backend_tx: UnboundedSender<AppEvent>) -> anyhow::Result<Self> {
        let document_events = DocumentEvents::new();
        let capture = SelectionCapture::mount(&document_events);
        let widget = Widget::new(&config);
        let menu = ContextMenu::new(&config);
        let client = ApiClient::new(config)?;

        Ok(Self {
            should_quit: false,
            focus: Focus::Page,

            page,
            page_height: 0,
            document_events,
            capture,
            drag: None,
            highlight: None,

            menu,
            menu_anchor: (0, 0),
            menu_task: None,

            widget,
            chat_scroll: 0,
            chat_follow: true,

            animation_frame: 0,

            page_area: None,
            button_area: None,
            chat_area: None,
            menu_items: Vec::new(),

            client,
            backend_tx,
        })
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.widget.is_loading() || self.menu.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Page scrolling

    pub fn scroll_page(&mut self, delta: isize) {
        self.page.scroll_by(delta, self.page_height as usize);
    }

    pub fn half_page(&self) -> isize {
        (self.page_height / 2).max(1) as isize
    }

    // Chat widget

    pub fn toggle_widget(&mut self) {
        self.widget.toggle();
        if self.widget.is_open() {
            self.focus = Focus::Chat;
            self.chat_follow = true;
        } else if self.focus == Focus::Chat {
            self.focus = Focus::Page;
        }
    }

    pub fn close_widget(&mut self) {
        self.widget.close();
        if self.focus == Focus::Chat {
            self.focus = Focus::Page;
        }
    }

    pub fn commit_chat(&mut self, literal_newline: bool) {
        if let Some(request) = self.widget.commit_key(literal_newline) {
            self.chat_follow = true;
            self.dispatch_chat(request);
        }
    }

    fn dispatch_chat(&mut self, request: PendingRequest) {
        let client = self.client.clone();
        let tx = self.backend_tx.clone();
        tokio::spawn(async move {
            let outcome = client.ask(&request.query).await;
            let _ = tx.send(AppEvent::Backend(BackendEvent::Chat {
                id: request.id,
                outcome,
            }));
        });
    }

    // Selection

    /// Map a terminal cell to a page position, if it lies on the page
    pub fn page_position(&self, column: u16, row: u16) -> Option<TextPosition> {
        let area = self.page_area?;
        if column < area.x || column >= area.x + area.width || row < area.y || row >= area.y + area.height {
            return None;
        }
        Some(TextPosition::new(
            self.page.scroll + (row - area.y) as usize,
            (column - area.x) as usize,
        ))
    }

    pub fn begin_drag(&mut self, pos: TextPosition) {
        self.drag = Some(TextSelection::start_at(pos));
    }

    pub fn extend_drag(&mut self, pos: TextPosition) {
        if let Some(drag) = self.drag.as_mut() {
            drag.extend_to(pos);
        }
    }

    /// Pointer release: hand the selected text to the document listeners.
    pub fn end_drag(&mut self, column: u16, row: u16) {
        let Some(selection) = self.drag.take() else {
            return;
        };
        let text = selection.text_in(&self.page.lines);
        self.document_events.dispatch_release(ReleaseKind::Pointer, &text);

        if !text.trim().is_empty() {
            self.highlight = Some(selection);
            self.menu_anchor = (column, row);
            self.focus = Focus::Menu;
        }
    }

    // Context menu

    pub fn menu_visible(&self) -> bool {
        self.menu.is_visible(&self.capture)
    }

    pub fn run_menu_action(&mut self, action: MenuAction) {
        match action {
            MenuAction::Ask => {
                if self.menu.question().is_blank() {
                    self.focus = Focus::MenuQuestion;
                } else if let Some(request) = self.menu.ask(&self.capture) {
                    self.focus = Focus::Menu;
                    self.dispatch_menu(request);
                }
            }
            MenuAction::Translate => {
                if let Some(request) = self.menu.translate(&self.capture) {
                    self.dispatch_menu(request);
                }
            }
            MenuAction::Close => self.close_menu(),
        }
    }

    fn dispatch_menu(&mut self, request: MenuRequest) {
        let client = self.client.clone();
        let tx = self.backend_tx.clone();
        let ticket = request.ticket;
        self.menu_task = Some(tokio::spawn(async move {
            let event = match request.kind {
                MenuRequestKind::Ask { selected_text, query } => BackendEvent::SelectionAnswer {
                    ticket,
                    outcome: client.ask_about_selection(&selected_text, &query).await,
                },
                MenuRequestKind::Translate { text } => BackendEvent::Translation {
                    ticket,
                    outcome: client.translate(&text).await,
                },
            };
            let _ = tx.send(AppEvent::Backend(event));
        }));
    }

    pub fn close_menu(&mut self) {
        if let Some(ticket) = self.menu.close(&self.capture) {
            if let Some(task) = self.menu_task.take() {
                task.abort();
                debug!(ticket, "aborted context menu request");
            }
        }
        self.menu_task = None;
        self.highlight = None;
        if matches!(self.focus, Focus::Menu | Focus::MenuQuestion) {
            self.focus = Focus::Page;
        }
    }

    // Background results

    pub fn handle_backend(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::Chat { id, outcome } => {
                if self.widget.complete(id, outcome) {
                    self.chat_follow = true;
                }
            }
            BackendEvent::SelectionAnswer { ticket, outcome } => {
                if self.menu.resolve_answer(ticket, outcome) {
                    self.menu_task = None;
                }
            }
            BackendEvent::Translation { ticket, outcome } => {
                if self.menu.resolve_translation(ticket, outcome) {
                    self.menu_task = None;
                }
            }
        }
    }

    pub fn quit(&mut self) {
        info!(messages = self.widget.transcript().len(), "quitting");
        self.should_quit = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docchat_core::{ChatReply, ClientError, WidgetStatus};
    use tokio::sync::mpsc;

    fn test_app(translation: bool) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = Config::new("http://127.0.0.1:9").with_translation(translation);
        let page = Page::from_text("test.md", "Servo motors drive\neach joint.");
        let mut app = App::new(config, page, tx).unwrap();
        app.page_area = Some(Rect::new(0, 1, 40, 10));
        app.page_height = 10;
        (app, rx)
    }

    #[tokio::test]
    async fn test_drag_release_captures_and_opens_menu() {
        let (mut app, _rx) = test_app(false);

        let start = app.page_position(0, 1).unwrap();
        app.begin_drag(start);
        app.extend_drag(app.page_position(5, 1).unwrap());
        app.end_drag(5, 1);

        assert_eq!(app.capture.snapshot().unwrap().text(), "Servo");
        assert!(app.menu_visible());
        assert_eq!(app.focus, Focus::Menu);
    }

    #[tokio::test]
    async fn test_click_keeps_previous_snapshot() {
        let (mut app, _rx) = test_app(false);
        app.begin_drag(TextPosition::new(0, 0));
        app.extend_drag(TextPosition::new(0, 5));
        app.end_drag(5, 1);

        app.focus = Focus::Page;
        app.begin_drag(TextPosition::new(1, 2));
        app.end_drag(2, 2);
        assert_eq!(app.capture.snapshot().unwrap().text(), "Servo");
    }

    #[test]
    fn test_page_position_outside_area() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let page = Page::from_text("t", "text");
        let mut app = App::new(Config::default(), page, tx).unwrap();
        assert_eq!(app.page_position(1, 1), None);

        app.page_area = Some(Rect::new(2, 1, 10, 5));
        app.page.scroll = 3;
        assert_eq!(app.page_position(1, 1), None);
        assert_eq!(app.page_position(4, 2), Some(TextPosition::new(4, 2)));
    }

    #[tokio::test]
    async fn test_chat_submit_and_completion() {
        let (mut app, _rx) = test_app(false);
        app.toggle_widget();
        assert_eq!(app.focus, Focus::Chat);

        app.widget.input_char('q');
        app.commit_chat(false);
        assert_eq!(app.widget.status(), &WidgetStatus::OpenLoading);

        let id = app.widget.pending().unwrap().id;
        app.handle_backend(BackendEvent::Chat {
            id,
            outcome: Ok(ChatReply {
                response: "a".to_string(),
                sources: Vec::new(),
            }),
        });
        assert_eq!(app.widget.status(), &WidgetStatus::OpenIdle);
        assert_eq!(app.widget.transcript().len(), 3);
    }

    #[tokio::test]
    async fn test_translate_result_arrives_over_channel() {
        let (mut app, mut rx) = test_app(true);
        app.document_events.dispatch_release(ReleaseKind::Pointer, "hello");
        app.run_menu_action(MenuAction::Translate);

        let event = loop {
            match rx.recv().await.unwrap() {
                AppEvent::Backend(event) => break event,
                _ => continue,
            }
        };
        app.handle_backend(event);
        let overlay = app.menu.overlay().unwrap();
        assert!(overlay.text.contains("hello"));
        assert!(overlay.provisional);
        assert!(app.menu_task.is_none());
    }

    #[tokio::test]
    async fn test_close_menu_drops_late_answer() {
        let (mut app, _rx) = test_app(false);
        app.document_events.dispatch_release(ReleaseKind::Pointer, "passage");
        app.focus = Focus::Menu;

        app.run_menu_action(MenuAction::Ask);
        assert_eq!(app.focus, Focus::MenuQuestion);
        app.menu.question_mut().insert('?');
        app.run_menu_action(MenuAction::Ask);
        let ticket = app.menu.in_flight().unwrap();

        app.run_menu_action(MenuAction::Close);
        assert!(!app.menu_visible());
        assert!(app.menu_task.is_none());
        assert_eq!(app.focus, Focus::Page);

        app.handle_backend(BackendEvent::SelectionAnswer {
            ticket,
            outcome: Err(ClientError::Timeout),
        });
        assert!(app.menu.overlay().is_none());
    }
}
