use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::sse::StreamEvent;

/// Retrieved document backing an answer, in server-ranked order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub low_confidence: bool,
}

impl Source {
    /// Deduplication key: the URL, falling back to the title.
    pub fn dedup_key(&self) -> Option<&str> {
        non_empty(self.url.as_deref()).or_else(|| non_empty(self.title.as_deref()))
    }
}

/// Server-side syntax check result for one code block of the answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationWarning {
    /// 1-based ordinal of the code block in the rendered answer.
    pub code_index: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub errors: String,
    #[serde(default)]
    pub code_preview: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: Option<u64>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
}

/// Typed view of a [`StreamEvent`].
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Sources(Vec<Source>),
    Delta { text: String },
    Done { usage: Usage },
    Error { message: Option<String> },
    ValidationWarning(ValidationWarning),
    /// Unknown event name, retained for forward-compatible passthrough.
    Unknown { name: String, payload: Value },
}

impl ChatEvent {
    /// Map a raw frame to its typed form.
    ///
    /// Returns `None` when a recognised event carries a payload of the wrong shape;
    /// callers treat that like any other malformed payload and drop it.
    pub fn from_stream_event(event: StreamEvent) -> Option<Self> {
        let StreamEvent { name, payload } = event;
        match name.as_str() {
            "sources" => match payload {
                // Entries are decoded one by one; a bad entry does not cost the others.
                Value::Array(entries) => Some(Self::Sources(
                    entries
                        .into_iter()
                        .filter_map(|entry| serde_json::from_value(entry).ok())
                        .collect(),
                )),
                _ => None,
            },
            "delta" => {
                let text = payload.get("text")?.as_str()?;
                Some(Self::Delta {
                    text: text.to_owned(),
                })
            }
            "done" => {
                let usage = serde_json::from_value(payload).unwrap_or_default();
                Some(Self::Done { usage })
            }
            "error" => {
                let message = payload
                    .get("message")
                    .and_then(|value| value.as_str())
                    .map(ToString::to_string);
                Some(Self::Error { message })
            }
            "validation_warning" => serde_json::from_value(payload)
                .ok()
                .map(Self::ValidationWarning),
            _ => Some(Self::Unknown { name, payload }),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Sources(_) => "sources",
            Self::Delta { .. } => "delta",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
            Self::ValidationWarning(_) => "validation_warning",
            Self::Unknown { name, .. } => name,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}
