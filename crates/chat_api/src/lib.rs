//! Transport primitives for the documentation chat stream endpoint.
//!
//! This crate owns request building, the HTTP exchange, and incremental parsing of
//! the `event:`/`data:` stream returned by `POST /chat/stream`. It contains no
//! rendering or conversation state; those live in the `doc_chat` crate.
//!
//! Parsing is split in two layers: [`LineBuffer`] turns arbitrary byte fragments
//! into complete lines, and [`EventFrameParser`] turns lines into named
//! [`StreamEvent`]s. [`SseStreamParser`] composes both. Typed payloads are
//! obtained with [`ChatEvent::from_stream_event`].

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod headers;
pub mod payload;
pub mod sse;
pub mod url;

pub use client::{
    await_or_cancel, is_cancelled, CancellationSignal, ChatApiClient, ChatTransport,
    FragmentStream,
};
pub use config::ChatApiConfig;
pub use error::ChatApiError;
pub use events::{ChatEvent, Source, Usage, ValidationWarning};
pub use payload::{ChatMessage, ChatRequest, ChatRole};
pub use reqwest::StatusCode;
pub use sse::{EventFrameParser, LineBuffer, SseStreamParser, StreamEvent, DEFAULT_EVENT_NAME};
pub use url::normalize_chat_url;
