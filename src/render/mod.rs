//! Rendering: markdown to line documents, highlighting, fence parity, frame
//! coalescing and the sink that displays the result.

pub mod coalescer;
pub mod fence;
pub mod highlight;
pub mod markdown;
pub mod sink;
pub mod text;
pub mod view;

pub use coalescer::{RenderCoalescer, DEFAULT_FRAME_INTERVAL};
pub use fence::{balance_fences, fence_count};
pub use highlight::{prewarm_highlighting, SyntectHighlighter};
pub use markdown::{MarkdownRenderer, RenderTheme, RenderedDocument, RenderedLine};
pub use sink::{Advisory, Banner, RenderSink, SourceEntry, SourceList};
pub use view::ResponseView;

/// Renders `text` after closing any unbalanced code fence on a transient copy.
pub fn render_streaming(renderer: &MarkdownRenderer, text: &str) -> RenderedDocument {
    renderer.render(&balance_fences(text))
}
