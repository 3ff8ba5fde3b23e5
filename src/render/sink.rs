//! Presentation boundary between the streaming session and whatever displays it.

use super::markdown::RenderedDocument;

pub const LOW_CONFIDENCE_NOTICE: &str =
    "Based on limited sources -- this answer may be less reliable.";
pub const UNAVAILABLE_FALLBACK: &str = "Syntax validation unavailable";
pub const FLAGGED_HEADER: &str = "Could not verify syntax - use with caution";
pub const SOURCES_LABEL: &str = "Sources";
pub const SOURCE_FALLBACK_TITLE: &str = "Source";

/// Notice displayed ahead of the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    LowConfidence,
}

impl Advisory {
    pub fn message(&self) -> &'static str {
        match self {
            Self::LowConfidence => LOW_CONFIDENCE_NOTICE,
        }
    }
}

/// Syntax-check annotation placed immediately before a code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Banner {
    Unavailable {
        message: String,
    },
    Flagged {
        errors: String,
        preview: Option<String>,
    },
}

impl Banner {
    pub fn lines(&self) -> Vec<String> {
        match self {
            Self::Unavailable { message } => vec![message.clone()],
            Self::Flagged { errors, .. } => {
                let mut lines = vec![FLAGGED_HEADER.to_string()];
                lines.extend(errors.lines().map(str::to_string));
                lines
            }
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub label: String,
    pub url: Option<String>,
    pub badge: Option<String>,
}

impl SourceEntry {
    /// `label <url> [badge]`, omitting the URL when it is the label itself.
    pub fn display(&self) -> String {
        let mut out = self.label.clone();
        if let Some(url) = self.url.as_deref() {
            if url != self.label {
                out.push_str(&format!(" <{url}>"));
            }
        }
        if let Some(badge) = self.badge.as_deref() {
            out.push_str(&format!(" [{badge}]"));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceList {
    pub label: String,
    pub entries: Vec<SourceEntry>,
}

impl SourceList {
    pub fn new(entries: Vec<SourceEntry>) -> Self {
        Self {
            label: SOURCES_LABEL.to_string(),
            entries,
        }
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.entries.len() + 1);
        lines.push(self.label.clone());
        lines.extend(
            self.entries
                .iter()
                .map(|entry| format!("- {}", entry.display())),
        );
        lines
    }
}

/// Receives everything a turn wants displayed.
pub trait RenderSink {
    /// Replaces the response content.
    fn render(&mut self, document: &RenderedDocument);

    fn advisory(&mut self, advisory: Advisory);

    /// `code_block` is the 0-based ordinal in document order.
    fn annotate(&mut self, code_block: usize, banner: Banner);

    fn append_aside(&mut self, sources: SourceList);

    /// Replaces the response content with `Error: {message}`.
    fn fail(&mut self, message: &str);

    /// The response is final; streaming affordances go away.
    fn finish(&mut self);
}

impl<S: RenderSink + ?Sized> RenderSink for &mut S {
    fn render(&mut self, document: &RenderedDocument) {
        (**self).render(document);
    }

    fn advisory(&mut self, advisory: Advisory) {
        (**self).advisory(advisory);
    }

    fn annotate(&mut self, code_block: usize, banner: Banner) {
        (**self).annotate(code_block, banner);
    }

    fn append_aside(&mut self, sources: SourceList) {
        (**self).append_aside(sources);
    }

    fn fail(&mut self, message: &str) {
        (**self).fail(message);
    }

    fn finish(&mut self) {
        (**self).finish();
    }
}
