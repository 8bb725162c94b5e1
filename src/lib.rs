pub mod app;
pub mod attachment;
pub mod backend;
pub mod chat;
pub mod config;
pub mod exchange;
pub mod handler;
pub mod notify;
pub mod tui;
pub mod ui;

// Re-export main types for convenience
pub use attachment::{AttachmentError, Document};
pub use backend::{AskClient, AskError, AskReply, Backend};
pub use chat::{Message, Outcome, QuickQuestion, RequestState, Sender, Transcript, QUICK_QUESTIONS};
pub use config::Config;
pub use exchange::{ChatExchange, PendingRequest, Rejection};
