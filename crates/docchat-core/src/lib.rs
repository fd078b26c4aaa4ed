pub mod client;
pub mod config;
pub mod context_menu;
pub mod error;
pub mod message;
pub mod selection;
pub mod widget;

// Re-export main types for convenience
pub use client::{ApiClient, ChatReply, SelectionReply, Translation};
pub use config::{Config, FileConfig, DEFAULT_BACKEND_URL, DEFAULT_TIMEOUT};
pub use context_menu::{ContextMenu, MenuAction, MenuRequest, MenuRequestKind, MenuTicket, Overlay};
pub use error::ClientError;
pub use message::{Message, MessageId, Sender, Transcript};
pub use selection::{DocumentEvents, ListenerId, ReleaseKind, SelectionCapture, SelectionSnapshot, TextPosition, TextSelection};
pub use widget::{InputBuffer, PendingRequest, RequestId, Widget, WidgetStatus};
