//! Environment configuration.

use std::env;
use std::time::Duration;

use chat_api::url::DEFAULT_CHAT_BASE_URL;
use chat_api::ChatApiConfig;

use crate::render::coalescer::DEFAULT_FRAME_INTERVAL;
use crate::render::highlight::{SyntectHighlighter, DEFAULT_THEME};
use crate::render::markdown::{MarkdownRenderer, RenderTheme};

pub const ENDPOINT_VAR: &str = "DOC_CHAT_ENDPOINT";
pub const FRAME_MS_VAR: &str = "DOC_CHAT_FRAME_MS";
pub const TIMEOUT_SECS_VAR: &str = "DOC_CHAT_TIMEOUT_SECS";
pub const THEME_VAR: &str = "DOC_CHAT_THEME";
pub const NO_HIGHLIGHT_VAR: &str = "DOC_CHAT_NO_HIGHLIGHT";
pub const PLAIN_VAR: &str = "DOC_CHAT_PLAIN";
pub const LOG_VAR: &str = "DOC_CHAT_LOG";
pub const LOG_FILE_VAR: &str = "DOC_CHAT_LOG_FILE";

pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub endpoint: String,
    pub frame_interval: Duration,
    pub request_timeout: Option<Duration>,
    pub highlight_theme: String,
    pub highlight: bool,
    pub plain: bool,
    pub log_filter: String,
    pub log_file: Option<String>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CHAT_BASE_URL.to_string(),
            frame_interval: DEFAULT_FRAME_INTERVAL,
            request_timeout: None,
            highlight_theme: DEFAULT_THEME.to_string(),
            highlight: true,
            plain: false,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_file: None,
        }
    }
}

impl EnvConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: env_string_opt(ENDPOINT_VAR).unwrap_or(defaults.endpoint),
            frame_interval: env_u64(FRAME_MS_VAR)
                .map(|ms| Duration::from_millis(ms.max(1)))
                .unwrap_or(defaults.frame_interval),
            request_timeout: env_u64(TIMEOUT_SECS_VAR)
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            highlight_theme: env_string_opt(THEME_VAR).unwrap_or(defaults.highlight_theme),
            highlight: !env_flag(NO_HIGHLIGHT_VAR),
            plain: env_flag(PLAIN_VAR),
            log_filter: env_string_opt(LOG_VAR).unwrap_or(defaults.log_filter),
            log_file: env_string_opt(LOG_FILE_VAR),
        }
    }

    pub fn api_config(&self) -> ChatApiConfig {
        let config = ChatApiConfig::new(&self.endpoint);
        match self.request_timeout {
            Some(timeout) => config.with_timeout(timeout),
            None => config,
        }
    }

    /// Plain output never carries highlighting escapes.
    pub fn highlighting_enabled(&self) -> bool {
        self.highlight && !self.plain
    }

    pub fn render_theme(&self) -> RenderTheme {
        if self.plain {
            return RenderTheme::plain();
        }
        let theme = RenderTheme::ansi();
        if self.highlighting_enabled() {
            theme.with_highlighter(
                SyntectHighlighter::new(&self.highlight_theme).into_highlight_fn(),
            )
        } else {
            theme
        }
    }

    pub fn renderer(&self) -> MarkdownRenderer {
        MarkdownRenderer::new(self.render_theme())
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| value == "1").unwrap_or(false)
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env_string_opt(key).and_then(|value| value.trim().parse().ok())
}
