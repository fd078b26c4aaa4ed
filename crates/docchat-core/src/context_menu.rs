//! Actions offered for a captured selection.
//!
//! Responses are shown in a transient [`Overlay`] and never enter the chat
//! transcript. Each dispatched request carries a [`MenuTicket`]; closing the
//! menu invalidates the ticket so a late result is dropped.

use tracing::{debug, warn};

use crate::client::{SelectionReply, Translation};
use crate::config::Config;
use crate::error::ClientError;
use crate::selection::SelectionCapture;
use crate::widget::{InputBuffer, FALLBACK_REPLY};

pub const TRANSLATION_FAILED: &str = "Translation failed. Please try again.";

pub type MenuTicket = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Ask,
    Translate,
    Close,
}

impl MenuAction {
    pub fn label(&self) -> &'static str {
        match self {
            MenuAction::Ask => "Ask about this",
            MenuAction::Translate => "Translate",
            MenuAction::Close => "Close",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuRequestKind {
    Ask { selected_text: String, query: String },
    Translate { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuRequest {
    pub ticket: MenuTicket,
    pub kind: MenuRequestKind,
}

/// Transient response panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    pub action: MenuAction,
    pub text: String,
    /// Set for placeholder output such as the translation stub
    pub provisional: bool,
}

pub struct ContextMenu {
    translation_enabled: bool,
    question: InputBuffer,
    in_flight: Option<(MenuTicket, MenuAction)>,
    overlay: Option<Overlay>,
    next_ticket: MenuTicket,
}

impl ContextMenu {
    pub fn new(config: &Config) -> Self {
        Self {
            translation_enabled: config.enable_translation,
            question: InputBuffer::default(),
            in_flight: None,
            overlay: None,
            next_ticket: 0,
        }
    }

    pub fn is_visible(&self, capture: &SelectionCapture) -> bool {
        capture.has_snapshot()
    }

    pub fn actions(&self) -> Vec<MenuAction> {
        let mut actions = vec![MenuAction::Ask];
        if self.translation_enabled {
            actions.push(MenuAction::Translate);
        }
        actions.push(MenuAction::Close);
        actions
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<MenuTicket> {
        self.in_flight.map(|(ticket, _)| ticket)
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn question(&self) -> &InputBuffer {
        &self.question
    }

    pub fn question_mut(&mut self) -> &mut InputBuffer {
        &mut self.question
    }

    fn issue(&mut self, action: MenuAction, kind: MenuRequestKind) -> MenuRequest {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.in_flight = Some((ticket, action));
        debug!(ticket, ?action, "context menu request dispatched");
        MenuRequest { ticket, kind }
    }

    /// Ask the follow-up question about the captured passage. Needs both a
    /// snapshot and a non-blank question.
    pub fn ask(&mut self, capture: &SelectionCapture) -> Option<MenuRequest> {
        if self.is_busy() || self.question.is_blank() {
            return None;
        }
        let snapshot = capture.snapshot()?;
        let query = self.question.take().trim().to_string();

        Some(self.issue(
            MenuAction::Ask,
            MenuRequestKind::Ask {
                selected_text: snapshot.text().to_string(),
                query,
            },
        ))
    }

    pub fn translate(&mut self, capture: &SelectionCapture) -> Option<MenuRequest> {
        if self.is_busy() || !self.translation_enabled {
            return None;
        }
        let snapshot = capture.snapshot()?;

        Some(self.issue(
            MenuAction::Translate,
            MenuRequestKind::Translate {
                text: snapshot.text().to_string(),
            },
        ))
    }

    /// Take the in-flight slot if `ticket` still owns it
    fn settle(&mut self, ticket: MenuTicket) -> Option<MenuAction> {
        match self.in_flight {
            Some((current, action)) if current == ticket => {
                self.in_flight = None;
                Some(action)
            }
            _ => {
                debug!(ticket, "dropping context menu result for a dismissed request");
                None
            }
        }
    }

    pub fn resolve_answer(&mut self, ticket: MenuTicket, outcome: Result<SelectionReply, ClientError>) -> bool {
        let Some(action) = self.settle(ticket) else {
            return false;
        };
        let text = match outcome {
            Ok(reply) => reply.response,
            Err(err) => {
                warn!(ticket, error = %err, "ask about selection failed");
                FALLBACK_REPLY.to_string()
            }
        };
        self.overlay = Some(Overlay { action, text, provisional: false });
        true
    }

    pub fn resolve_translation(&mut self, ticket: MenuTicket, outcome: Result<Translation, ClientError>) -> bool {
        let Some(action) = self.settle(ticket) else {
            return false;
        };
        let overlay = match outcome {
            Ok(translation) => Overlay {
                action,
                provisional: translation.is_stub(),
                text: translation.translated_text,
            },
            Err(err) => {
                warn!(ticket, error = %err, "translation failed");
                Overlay {
                    action,
                    text: TRANSLATION_FAILED.to_string(),
                    provisional: false,
                }
            }
        };
        self.overlay = Some(overlay);
        true
    }

    /// Clear the snapshot and hide the menu. Returns the ticket of a request
    /// that was still running so the host can abort it.
    pub fn close(&mut self, capture: &SelectionCapture) -> Option<MenuTicket> {
        capture.clear();
        self.question.take();
        self.in_flight.take().map(|(ticket, _)| ticket)
    }

    pub fn dismiss_overlay(&mut self) {
        self.overlay = None;
    }
}
