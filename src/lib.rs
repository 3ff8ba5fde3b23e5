//! Streaming documentation-chat engine.
//!
//! A turn starts with [`Chat::begin_turn`], which records the prompt and returns a
//! [`StreamSession`]. [`StreamSession::run`] opens the request through a
//! [`chat_api::ChatTransport`], parses the event stream as it arrives, renders the
//! accumulated markdown at most once per frame through a [`RenderSink`], and
//! finalizes the response once (validation banners, source aside). The resulting
//! [`SessionReport`] goes back to [`Chat::finish_turn`], which appends the answer to
//! the conversation.
//!
//! Invariant: the session's accumulation buffer is append-only and is the only
//! input to rendering; fence parity is corrected on a transient copy.

pub mod chat;
pub mod config;
pub mod conversation;
pub mod error;
pub mod logging;
pub mod postprocess;
pub mod render;
pub mod session;

pub use chat_api::ChatMessage as Message;
pub use chat_api::{CancellationSignal, ChatRole as Role, ChatTransport};

pub use crate::chat::{Chat, TurnId};
pub use crate::config::EnvConfig;
pub use crate::conversation::Conversation;
pub use crate::error::{ChatError, ConversationError, TurnFailure};
pub use crate::render::{
    prewarm_highlighting, Advisory, Banner, MarkdownRenderer, RenderSink, RenderTheme,
    RenderedDocument, RenderedLine, ResponseView, SourceEntry, SourceList,
};
pub use crate::session::{SessionReport, StreamSession, TurnOutcome};
