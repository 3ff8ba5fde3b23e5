use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;

#[derive(Debug)]
pub enum ChatApiError {
    InvalidBaseUrl(String),
    InvalidHeader(String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    Stream(String),
    Cancelled,
}

impl ChatApiError {
    /// Whether the failure happened on the wire rather than by caller choice.
    pub fn is_transport(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

/// Error bodies seen from the chat service: framework-style `{"detail": ..}` or
/// `{"message": ..}`, optionally nested under `error`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    pub detail: Option<serde_json::Value>,
    pub message: Option<String>,
    pub error: Option<ErrorPayloadFields>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayloadFields {
    pub message: Option<String>,
}

impl ErrorPayload {
    fn message_or_fallback(&self) -> Option<String> {
        if let Some(detail) = self.detail.as_ref() {
            match detail {
                serde_json::Value::String(text) => {
                    if let Some(text) = non_empty_string(text) {
                        return Some(text.to_owned());
                    }
                }
                serde_json::Value::Null => {}
                other => return Some(other.to_string()),
            }
        }

        self.message
            .as_deref()
            .and_then(non_empty_string)
            .or_else(|| {
                self.error
                    .as_ref()
                    .and_then(|error| error.message.as_deref())
                    .and_then(non_empty_string)
            })
            .map(ToOwned::to_owned)
    }
}

impl fmt::Display for ChatApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBaseUrl(value) => write!(f, "invalid base URL: {value}"),
            Self::InvalidHeader(message) => write!(f, "invalid header: {message}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => {
                if message.is_empty() {
                    write!(f, "Server error: HTTP {}", status.as_u16())
                } else {
                    write!(f, "Server error: HTTP {}: {message}", status.as_u16())
                }
            }
            Self::Stream(message) => write!(f, "stream read failure: {message}"),
            Self::Cancelled => write!(f, "request was cancelled"),
        }
    }
}

impl std::error::Error for ChatApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(error) => Some(error),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ChatApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

/// Extract a human-readable message from a non-success response body.
///
/// Returns an empty string when the body carries nothing beyond the status.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    match serde_json::from_str::<ErrorPayload>(body) {
        Ok(payload) => payload
            .message_or_fallback()
            .unwrap_or_else(|| canonical_reason(status)),
        Err(_) if body.is_empty() => canonical_reason(status),
        Err(_) => body.to_string(),
    }
}

fn canonical_reason(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or_default().to_string()
}

fn non_empty_string(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
