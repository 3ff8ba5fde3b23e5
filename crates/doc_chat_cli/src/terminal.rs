//! Terminal output for a streamed answer.

use std::io::{self, Write};

use doc_chat::render::text::visible_width;
use doc_chat::{Advisory, Banner, RenderSink, RenderedDocument, ResponseView, SourceList};
use tracing::warn;

const FALLBACK_COLUMNS: u16 = 80;

/// How the sink repaints while the answer streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedrawMode {
    /// Erase the previous frame and repaint in place.
    Live,
    /// Print once, when the response is final. Used when stdout is not a terminal.
    FinalOnly,
}

#[cfg(unix)]
pub fn stdout_is_terminal() -> bool {
    unsafe { libc::isatty(libc::STDOUT_FILENO) == 1 }
}

#[cfg(not(unix))]
pub fn stdout_is_terminal() -> bool {
    false
}

#[cfg(unix)]
pub fn stderr_is_terminal() -> bool {
    unsafe { libc::isatty(libc::STDERR_FILENO) == 1 }
}

#[cfg(not(unix))]
pub fn stderr_is_terminal() -> bool {
    false
}

/// Redraw mode for stdout: live on a terminal, final-only otherwise.
pub fn redraw_mode() -> RedrawMode {
    if stdout_is_terminal() {
        RedrawMode::Live
    } else {
        RedrawMode::FinalOnly
    }
}

#[cfg(unix)]
pub fn terminal_columns() -> u16 {
    let mut size = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut size) };
    if result == 0 && size.ws_col > 0 {
        size.ws_col
    } else {
        FALLBACK_COLUMNS
    }
}

#[cfg(not(unix))]
pub fn terminal_columns() -> u16 {
    FALLBACK_COLUMNS
}

/// Screen rows `lines` occupy once soft-wrapped at `columns`.
pub fn wrapped_rows<'a>(lines: impl IntoIterator<Item = &'a str>, columns: u16) -> usize {
    let columns = usize::from(columns.max(1));
    lines
        .into_iter()
        .map(|line| visible_width(line).div_ceil(columns).max(1))
        .sum()
}

/// [`RenderSink`] that keeps a [`ResponseView`] and paints it to `out`.
pub struct TerminalSink<W: Write> {
    out: W,
    view: ResponseView,
    mode: RedrawMode,
    columns: u16,
    painted_rows: usize,
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W, mode: RedrawMode, columns: u16) -> Self {
        Self {
            out,
            view: ResponseView::new(),
            mode,
            columns,
            painted_rows: 0,
        }
    }

    pub fn view(&self) -> &ResponseView {
        &self.view
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn repaint(&mut self) {
        if self.mode == RedrawMode::FinalOnly && !self.view.is_finished() {
            return;
        }
        if let Err(error) = self.paint() {
            warn!(%error, "failed to write response to terminal");
        }
    }

    fn paint(&mut self) -> io::Result<()> {
        let lines = self.view.lines();
        if self.mode == RedrawMode::Live && self.painted_rows > 0 {
            // Cursor to the first painted row, then clear to end of screen.
            write!(self.out, "\x1b[{}F\x1b[J", self.painted_rows)?;
        }
        for line in &lines {
            writeln!(self.out, "{line}")?;
        }
        self.out.flush()?;
        self.painted_rows = wrapped_rows(lines.iter().map(String::as_str), self.columns);
        Ok(())
    }
}

impl<W: Write> RenderSink for TerminalSink<W> {
    fn render(&mut self, document: &RenderedDocument) {
        self.view.render(document);
        self.repaint();
    }

    fn advisory(&mut self, advisory: Advisory) {
        self.view.advisory(advisory);
        self.repaint();
    }

    fn annotate(&mut self, code_block: usize, banner: Banner) {
        // Painted by the `finish` that always follows.
        self.view.annotate(code_block, banner);
    }

    fn append_aside(&mut self, sources: SourceList) {
        self.view.append_aside(sources);
    }

    fn fail(&mut self, message: &str) {
        self.view.fail(message);
        self.repaint();
    }

    fn finish(&mut self) {
        self.view.finish();
        self.repaint();
    }
}
