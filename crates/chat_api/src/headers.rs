use std::collections::BTreeMap;

use crate::config::ChatApiConfig;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_USER_AGENT: &str = "user-agent";

/// Build a deterministic header map for chat stream requests.
///
/// Extra headers are applied last, so they may override the defaults. Keys are
/// lowercased and blank keys are skipped.
pub fn build_headers(config: &ChatApiConfig) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();

    headers.insert(HEADER_ACCEPT.to_owned(), "text/event-stream".to_owned());
    headers.insert(
        HEADER_CONTENT_TYPE.to_owned(),
        "application/json".to_owned(),
    );

    let ua = config
        .user_agent
        .as_deref()
        .and_then(sanitize_nonempty)
        .unwrap_or_else(default_user_agent);
    headers.insert(HEADER_USER_AGENT.to_owned(), ua);

    for (key, value) in &config.extra_headers {
        let Some(key) = sanitize_nonempty(key) else {
            continue;
        };
        headers.insert(key.to_ascii_lowercase(), value.trim().to_owned());
    }

    headers
}

pub fn default_user_agent() -> String {
    format!("doc-chat/{}", env!("CARGO_PKG_VERSION"))
}

fn sanitize_nonempty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}
