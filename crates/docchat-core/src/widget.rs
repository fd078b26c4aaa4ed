//! Chat panel state machine.
//!
//! ```text
//! Closed -> OpenIdle <-> OpenLoading -> OpenIdle | OpenError -> OpenIdle
//! ```
//!
//! The widget never performs I/O itself. [`Widget::submit`] hands back a
//! [`PendingRequest`] for the host to run against the client, and the host
//! reports the outcome with [`Widget::complete`].

use tracing::{debug, warn};

use crate::client::ChatReply;
use crate::config::Config;
use crate::error::ClientError;
use crate::message::Transcript;

pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again.";
pub const ERROR_BANNER: &str = "Failed to send message. Please try again.";

pub type RequestId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetStatus {
    Closed,
    OpenIdle,
    OpenLoading,
    OpenError(String),
}

impl WidgetStatus {
    pub fn is_open(&self) -> bool {
        !matches!(self, WidgetStatus::Closed)
    }
}

/// The chat request currently in flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub id: RequestId,
    pub query: String,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Editable text with a char-indexed cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputBuffer {
    text: String,
    cursor: usize,
}

impl InputBuffer {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn insert_newline(&mut self) {
        self.insert('\n');
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.text.chars().count() {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.text.chars().count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.text.chars().count();
    }

    /// Empty the buffer, returning what it held
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }
}

pub struct Widget {
    status: WidgetStatus,
    transcript: Transcript,
    input: InputBuffer,
    pending: Option<PendingRequest>,
    // Survives close so reopening shows the same banner
    error_banner: Option<String>,
    welcome_message: String,
    next_request_id: RequestId,
}

impl Widget {
    pub fn new(config: &Config) -> Self {
        Self {
            status: WidgetStatus::Closed,
            transcript: Transcript::new(),
            input: InputBuffer::default(),
            pending: None,
            error_banner: None,
            welcome_message: config.welcome_message.clone(),
            next_request_id: 0,
        }
    }

    pub fn status(&self) -> &WidgetStatus {
        &self.status
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn input(&self) -> &InputBuffer {
        &self.input
    }

    pub fn error_banner(&self) -> Option<&str> {
        self.error_banner.as_deref()
    }

    /// Whether the send action should be enabled
    pub fn can_submit(&self) -> bool {
        self.is_open() && !self.is_loading() && !self.input.is_blank()
    }

    // Visibility

    pub fn toggle(&mut self) {
        if self.is_open() {
            self.close();
        } else {
            self.open();
        }
    }

    pub fn open(&mut self) {
        if self.is_open() {
            return;
        }
        if self.transcript.is_empty() {
            self.transcript.push_bot(self.welcome_message.clone(), Vec::new());
        }
        self.status = self.open_status();
    }

    /// Transcript, banner and any in-flight request are kept.
    pub fn close(&mut self) {
        self.status = WidgetStatus::Closed;
    }

    fn open_status(&self) -> WidgetStatus {
        if self.pending.is_some() {
            WidgetStatus::OpenLoading
        } else if let Some(banner) = &self.error_banner {
            WidgetStatus::OpenError(banner.clone())
        } else {
            WidgetStatus::OpenIdle
        }
    }

    fn refresh_status(&mut self) {
        if self.is_open() {
            self.status = self.open_status();
        }
    }

    /// Clear a visible error banner; any interaction counts.
    pub fn dismiss_error(&mut self) {
        if self.error_banner.take().is_some() {
            self.refresh_status();
        }
    }

    // Input editing

    pub fn input_char(&mut self, c: char) {
        self.dismiss_error();
        self.input.insert(c);
    }

    pub fn input_backspace(&mut self) {
        self.dismiss_error();
        self.input.backspace();
    }

    pub fn input_delete(&mut self) {
        self.dismiss_error();
        self.input.delete();
    }

    pub fn input_mut(&mut self) -> &mut InputBuffer {
        &mut self.input
    }

    /// Handle the commit key. With the newline modifier held, insert a
    /// line break instead of sending.
    pub fn commit_key(&mut self, literal_newline: bool) -> Option<PendingRequest> {
        if literal_newline {
            self.dismiss_error();
            self.input.insert_newline();
            None
        } else {
            self.submit()
        }
    }

    /// Append the user's message and start a request. No-op while a request
    /// is outstanding or the input is blank.
    pub fn submit(&mut self) -> Option<PendingRequest> {
        if !self.can_submit() {
            return None;
        }

        let query = self.input.take();
        self.transcript.push_user(query.clone());
        self.error_banner = None;

        self.next_request_id += 1;
        let request = PendingRequest {
            id: self.next_request_id,
            query,
        };
        debug!(request_id = request.id, "chat request dispatched");
        self.pending = Some(request.clone());
        self.refresh_status();
        Some(request)
    }

    /// Apply the outcome of a request returned by [`Widget::submit`].
    /// Unknown ids are ignored and reported as false.
    pub fn complete(&mut self, id: RequestId, outcome: Result<ChatReply, ClientError>) -> bool {
        match &self.pending {
            Some(pending) if pending.id == id => {}
            _ => {
                debug!(request_id = id, "ignoring result for unknown chat request");
                return false;
            }
        }
        self.pending = None;

        match outcome {
            Ok(reply) => {
                self.transcript.push_bot(reply.response, reply.sources);
            }
            Err(err) => {
                warn!(request_id = id, error = %err, "chat request failed, showing fallback");
                self.transcript.push_bot(FALLBACK_REPLY, Vec::new());
                self.error_banner = Some(ERROR_BANNER.to_string());
            }
        }
        self.refresh_status();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Sender;

    fn open_widget() -> Widget {
        let mut widget = Widget::new(&Config::default());
        widget.open();
        widget
    }

    fn type_text(widget: &mut Widget, text: &str) {
        for c in text.chars() {
            widget.input_char(c);
        }
    }

    fn reply(text: &str) -> ChatReply {
        ChatReply {
            response: text.to_string(),
            sources: vec!["docs/intro.md".to_string()],
        }
    }

    #[test]
    fn test_starts_closed_without_welcome() {
        let widget = Widget::new(&Config::default());
        assert_eq!(widget.status(), &WidgetStatus::Closed);
        assert!(widget.transcript().is_empty());
    }

    #[test]
    fn test_first_open_seeds_welcome_once() {
        let mut widget = open_widget();
        assert_eq!(widget.status(), &WidgetStatus::OpenIdle);
        assert_eq!(widget.transcript().len(), 1);
        let welcome = widget.transcript().last().unwrap();
        assert_eq!(welcome.sender(), Sender::Bot);
        assert_eq!(welcome.text(), Config::default().welcome_message);

        widget.toggle();
        widget.toggle();
        assert_eq!(widget.transcript().len(), 1);
    }

    #[test]
    fn test_submit_appends_user_message_immediately() {
        let mut widget = open_widget();
        type_text(&mut widget, "What is a URDF?");

        let request = widget.submit().unwrap();
        assert_eq!(request.query, "What is a URDF?");
        assert_eq!(widget.status(), &WidgetStatus::OpenLoading);
        assert_eq!(widget.transcript().len(), 2);
        assert_eq!(widget.transcript().last().unwrap().sender(), Sender::User);
        assert_eq!(widget.input().text(), "");
        assert_eq!(widget.input().cursor(), 0);
    }

    #[test]
    fn test_submit_rejected_while_loading() {
        let mut widget = open_widget();
        type_text(&mut widget, "first");
        widget.submit().unwrap();

        type_text(&mut widget, "second");
        assert!(widget.submit().is_none());
        assert_eq!(widget.transcript().len(), 2);
        assert_eq!(widget.input().text(), "second");
    }

    #[test]
    fn test_blank_input_is_noop() {
        let mut widget = open_widget();
        type_text(&mut widget, "  \t ");
        assert!(widget.submit().is_none());
        assert_eq!(widget.status(), &WidgetStatus::OpenIdle);
        assert_eq!(widget.transcript().len(), 1);
    }

    #[test]
    fn test_submit_requires_open_panel() {
        let mut widget = Widget::new(&Config::default());
        widget.input_mut().insert('x');
        assert!(widget.submit().is_none());
    }

    #[test]
    fn test_success_appends_bot_reply_with_sources() {
        let mut widget = open_widget();
        type_text(&mut widget, "q");
        let request = widget.submit().unwrap();

        assert!(widget.complete(request.id, Ok(reply("answer"))));
        assert_eq!(widget.status(), &WidgetStatus::OpenIdle);
        let last = widget.transcript().last().unwrap();
        assert_eq!(last.text(), "answer");
        assert_eq!(last.sources(), ["docs/intro.md".to_string()]);
    }

    #[test]
    fn test_failure_shows_fallback_and_banner() {
        let mut widget = open_widget();
        type_text(&mut widget, "q");
        let request = widget.submit().unwrap();

        widget.complete(request.id, Err(ClientError::Server { status: 500 }));
        assert_eq!(widget.status(), &WidgetStatus::OpenError(ERROR_BANNER.to_string()));
        assert_eq!(widget.transcript().last().unwrap().text(), FALLBACK_REPLY);
        assert!(!widget.is_loading());

        // Next interaction clears the banner
        widget.input_char('r');
        assert_eq!(widget.status(), &WidgetStatus::OpenIdle);
        assert_eq!(widget.error_banner(), None);
    }

    #[test]
    fn test_retry_after_error_clears_banner() {
        let mut widget = open_widget();
        type_text(&mut widget, "q");
        let first = widget.submit().unwrap();
        widget.complete(first.id, Err(ClientError::Timeout));

        widget.input_mut().insert('q');
        let retry = widget.submit().unwrap();
        assert_eq!(widget.status(), &WidgetStatus::OpenLoading);
        assert_eq!(widget.error_banner(), None);
        assert_ne!(first.id, retry.id);
    }

    #[test]
    fn test_each_submission_gets_exactly_one_reply() {
        let mut widget = open_widget();
        type_text(&mut widget, "q");
        let request = widget.submit().unwrap();

        assert!(widget.complete(request.id, Ok(reply("a"))));
        assert!(!widget.complete(request.id, Ok(reply("again"))));
        assert!(!widget.complete(999, Err(ClientError::Timeout)));
        assert_eq!(widget.transcript().len(), 3);
    }

    #[test]
    fn test_close_and_reopen_preserves_transcript() {
        let mut widget = open_widget();
        type_text(&mut widget, "q");
        let request = widget.submit().unwrap();
        widget.complete(request.id, Ok(reply("a")));

        let before: Vec<_> = widget.transcript().messages().to_vec();
        widget.close();
        assert_eq!(widget.status(), &WidgetStatus::Closed);
        widget.open();
        assert_eq!(widget.transcript().messages(), before.as_slice());
    }

    #[test]
    fn test_close_while_loading_then_reopen() {
        let mut widget = open_widget();
        type_text(&mut widget, "q");
        let request = widget.submit().unwrap();

        widget.close();
        assert!(widget.is_loading());
        widget.open();
        assert_eq!(widget.status(), &WidgetStatus::OpenLoading);

        widget.close();
        widget.complete(request.id, Err(ClientError::Network("refused".to_string())));
        assert_eq!(widget.status(), &WidgetStatus::Closed);
        widget.open();
        assert_eq!(widget.status(), &WidgetStatus::OpenError(ERROR_BANNER.to_string()));
    }

    #[test]
    fn test_commit_key_with_modifier_inserts_newline() {
        let mut widget = open_widget();
        type_text(&mut widget, "line one");
        assert!(widget.commit_key(true).is_none());
        type_text(&mut widget, "line two");
        assert_eq!(widget.input().text(), "line one\nline two");

        let request = widget.commit_key(false).unwrap();
        assert_eq!(request.query, "line one\nline two");
    }

    #[test]
    fn test_input_buffer_utf8_editing() {
        let mut input = InputBuffer::default();
        for c in "héllo".chars() {
            input.insert(c);
        }
        input.move_left();
        input.move_left();
        input.backspace();
        assert_eq!(input.text(), "hélo");
        input.move_home();
        input.delete();
        assert_eq!(input.text(), "élo");
        input.move_end();
        input.move_right();
        assert_eq!(input.cursor(), 3);
    }
}
