//! One-shot post-processing of a finished (or cancelled) response.
//!
//! Buffered validation warnings become banners on their code blocks, cited sources
//! become a deduplicated aside, and the sink is told the response is final.

pub mod sources;
pub mod warnings;

use chat_api::{Source, ValidationWarning};
use tracing::debug;

use crate::render::markdown::RenderedDocument;
use crate::render::sink::RenderSink;

pub use sources::{build_source_list, dedup_sources, has_low_confidence};
pub use warnings::{banner_for, classify, resolve, WarningClass};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FinalizeSummary {
    pub banners: usize,
    pub dropped_warnings: usize,
    pub sources_listed: usize,
}

/// Per-turn buffers consumed by the finalization pass.
#[derive(Debug, Default)]
pub struct Finalizer {
    pending_warnings: Vec<ValidationWarning>,
    sources: Vec<Source>,
    finalized: bool,
}

impl Finalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_warning(&mut self, warning: ValidationWarning) {
        self.pending_warnings.push(warning);
    }

    pub fn pending_warnings(&self) -> &[ValidationWarning] {
        &self.pending_warnings
    }

    /// Replaces the recorded sources; returns whether any is low-confidence.
    pub fn record_sources(&mut self, sources: Vec<Source>) -> bool {
        self.sources = sources;
        has_low_confidence(&self.sources)
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Runs once; later calls return `None` and touch nothing.
    pub fn finalize<S>(
        &mut self,
        document: &RenderedDocument,
        sink: &mut S,
    ) -> Option<FinalizeSummary>
    where
        S: RenderSink + ?Sized,
    {
        if self.finalized {
            return None;
        }
        self.finalized = true;

        let mut summary = FinalizeSummary::default();
        let code_blocks = document.code_block_count();
        for warning in self.pending_warnings.drain(..) {
            match resolve(warning.code_index, code_blocks) {
                Some(ordinal) => {
                    sink.annotate(ordinal, banner_for(&warning));
                    summary.banners += 1;
                }
                None => {
                    debug!(
                        code_index = warning.code_index,
                        code_blocks, "dropping validation warning for missing code block"
                    );
                    summary.dropped_warnings += 1;
                }
            }
        }

        if let Some(list) = build_source_list(&self.sources) {
            summary.sources_listed = list.entries.len();
            sink.append_aside(list);
        }

        sink.finish();
        debug!(?summary, "response finalized");
        Some(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::{FinalizeSummary, Finalizer};
    use crate::render::markdown::MarkdownRenderer;
    use crate::render::sink::RenderSink;
    use crate::render::view::ResponseView;
    use chat_api::{Source, ValidationWarning};

    #[test]
    fn finalize_runs_once() {
        let mut finalizer = Finalizer::new();
        finalizer.push_warning(ValidationWarning {
            code_index: 1,
            errors: String::new(),
            code_preview: None,
        });
        finalizer.record_sources(vec![Source {
            url: Some("https://docs/a".to_string()),
            ..Source::default()
        }]);

        let document = MarkdownRenderer::plain().render("```\nx\n```");
        let mut view = ResponseView::new();
        view.render(&document);

        assert_eq!(
            finalizer.finalize(&document, &mut view),
            Some(FinalizeSummary {
                banners: 1,
                dropped_warnings: 0,
                sources_listed: 1,
            })
        );
        assert!(finalizer.pending_warnings().is_empty());
        assert_eq!(finalizer.finalize(&document, &mut view), None);
        assert_eq!(view.banner_count(), 1);
        assert!(view.is_finished());
    }

    #[test]
    fn low_confidence_is_reported_when_recording() {
        let mut finalizer = Finalizer::new();
        assert!(finalizer.record_sources(vec![Source {
            low_confidence: true,
            ..Source::default()
        }]));
        assert!(!finalizer.record_sources(Vec::new()));
    }
}
