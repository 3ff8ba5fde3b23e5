/// Default base URL for the chat service.
pub const DEFAULT_CHAT_BASE_URL: &str = "http://127.0.0.1:8000";

const STREAM_PATH: &str = "/chat/stream";

/// Normalize a base URL to the streaming chat endpoint.
///
/// Normalization rules:
/// 1) keep `/chat/stream` unchanged
/// 2) append `/stream` when path ends in `/chat`
/// 3) append `/chat/stream` otherwise
pub fn normalize_chat_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_CHAT_BASE_URL
    } else {
        input.trim()
    };

    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with(STREAM_PATH) {
        return trimmed.to_string();
    }
    if trimmed.ends_with("/chat") {
        return format!("{trimmed}/stream");
    }
    format!("{trimmed}{STREAM_PATH}")
}
