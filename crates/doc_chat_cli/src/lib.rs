//! Interactive terminal front end for `doc_chat`.
//!
//! ## Configuration
//!
//! - `DOC_CHAT_ENDPOINT` chat service base URL
//! - `DOC_CHAT_TIMEOUT_SECS` request timeout
//! - `DOC_CHAT_FRAME_MS` live redraw interval
//! - `DOC_CHAT_THEME`, `DOC_CHAT_NO_HIGHLIGHT`, `DOC_CHAT_PLAIN` code block styling
//! - `DOC_CHAT_LOG` log filter directives, `DOC_CHAT_LOG_FILE` log destination

pub mod app;
pub mod commands;
pub mod interrupt;
pub mod terminal;

pub use app::{App, Flow};
