//! In-memory response view.

use std::collections::BTreeMap;

use super::markdown::RenderedDocument;
use super::sink::{Advisory, Banner, RenderSink, SourceList};

pub const STREAMING_INDICATOR: &str = "▍";

/// Holds the state a chat bubble would: latest document, notices, banners and the
/// source aside. Flattens to display lines with [`ResponseView::lines`].
#[derive(Debug, Clone, Default)]
pub struct ResponseView {
    document: RenderedDocument,
    advisory: Option<Advisory>,
    banners: BTreeMap<usize, Vec<Banner>>,
    aside: Option<SourceList>,
    failure: Option<String>,
    finished: bool,
    render_count: usize,
}

impl ResponseView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self) -> &RenderedDocument {
        &self.document
    }

    pub fn advisory_notice(&self) -> Option<Advisory> {
        self.advisory
    }

    pub fn banners(&self, code_block: usize) -> &[Banner] {
        self.banners
            .get(&code_block)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn banner_count(&self) -> usize {
        self.banners.values().map(Vec::len).sum()
    }

    pub fn aside(&self) -> Option<&SourceList> {
        self.aside.as_ref()
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of `render` calls received.
    pub fn render_count(&self) -> usize {
        self.render_count
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(advisory) = self.advisory {
            lines.push(advisory.message().to_string());
        }

        if let Some(failure) = self.failure.as_deref() {
            lines.push(failure.to_string());
            return lines;
        }

        for line in &self.document.lines {
            if let Some(ordinal) = line.code_block {
                for banner in self.banners(ordinal) {
                    lines.extend(banner.lines());
                }
            }
            lines.push(line.text.clone());
        }

        if !self.finished {
            lines.push(STREAMING_INDICATOR.to_string());
        }

        if let Some(aside) = self.aside.as_ref() {
            lines.push(String::new());
            lines.extend(aside.lines());
        }
        lines
    }

    pub fn text(&self) -> String {
        self.lines().join("\n")
    }
}

impl RenderSink for ResponseView {
    fn render(&mut self, document: &RenderedDocument) {
        self.document = document.clone();
        self.banners.clear();
        self.render_count += 1;
    }

    fn advisory(&mut self, advisory: Advisory) {
        self.advisory = Some(advisory);
    }

    fn annotate(&mut self, code_block: usize, banner: Banner) {
        self.banners.entry(code_block).or_default().push(banner);
    }

    fn append_aside(&mut self, sources: SourceList) {
        self.aside = Some(sources);
    }

    fn fail(&mut self, message: &str) {
        self.document = RenderedDocument::default();
        self.banners.clear();
        self.failure = Some(format!("Error: {message}"));
        self.finished = true;
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}
