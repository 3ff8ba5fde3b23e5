//! Markdown renderer producing line documents with code-block ordinals.

use markdown::{mdast, to_mdast, ParseOptions};

use super::text::{pad_to_width, strip_ansi, visible_width};

pub type StyleFn = Box<dyn Fn(&str) -> String>;

/// Highlights a whole code block, returning one styled string per source line.
pub type CodeHighlighterFn = Box<dyn Fn(&str, Option<&str>) -> Vec<String>>;

const RULE_WIDTH: usize = 40;

pub struct RenderTheme {
    pub heading: StyleFn,
    pub link: StyleFn,
    pub link_url: StyleFn,
    pub code: StyleFn,
    pub code_block: StyleFn,
    pub code_block_border: StyleFn,
    pub quote: StyleFn,
    pub quote_border: StyleFn,
    pub hr: StyleFn,
    pub list_bullet: StyleFn,
    pub bold: StyleFn,
    pub italic: StyleFn,
    pub strikethrough: StyleFn,
    pub underline: StyleFn,
    pub highlight_code: Option<CodeHighlighterFn>,
    pub code_block_indent: String,
}

impl RenderTheme {
    /// SGR styling with targeted resets so styles nest.
    pub fn ansi() -> Self {
        Self {
            heading: Box::new(|text| format!("\x1b[36m{text}\x1b[39m")),
            link: Box::new(|text| format!("\x1b[34m{text}\x1b[39m")),
            link_url: Box::new(|text| format!("\x1b[90m{text}\x1b[39m")),
            code: Box::new(|text| format!("\x1b[33m{text}\x1b[39m")),
            code_block: Box::new(|text| format!("\x1b[32m{text}\x1b[39m")),
            code_block_border: Box::new(|text| format!("\x1b[90m{text}\x1b[39m")),
            quote: Box::new(|text| format!("\x1b[90m{text}\x1b[39m")),
            quote_border: Box::new(|text| format!("\x1b[90m{text}\x1b[39m")),
            hr: Box::new(|text| format!("\x1b[90m{text}\x1b[39m")),
            list_bullet: Box::new(|text| format!("\x1b[36m{text}\x1b[39m")),
            bold: Box::new(|text| format!("\x1b[1m{text}\x1b[22m")),
            italic: Box::new(|text| format!("\x1b[3m{text}\x1b[23m")),
            strikethrough: Box::new(|text| format!("\x1b[9m{text}\x1b[29m")),
            underline: Box::new(|text| format!("\x1b[4m{text}\x1b[24m")),
            highlight_code: None,
            code_block_indent: "  ".to_string(),
        }
    }

    /// No escape sequences; inline code keeps its backticks.
    pub fn plain() -> Self {
        Self {
            heading: Box::new(|text| text.to_string()),
            link: Box::new(|text| text.to_string()),
            link_url: Box::new(|text| text.to_string()),
            code: Box::new(|text| format!("`{text}`")),
            code_block: Box::new(|text| text.to_string()),
            code_block_border: Box::new(|text| text.to_string()),
            quote: Box::new(|text| text.to_string()),
            quote_border: Box::new(|text| text.to_string()),
            hr: Box::new(|text| text.to_string()),
            list_bullet: Box::new(|text| text.to_string()),
            bold: Box::new(|text| text.to_string()),
            italic: Box::new(|text| text.to_string()),
            strikethrough: Box::new(|text| text.to_string()),
            underline: Box::new(|text| text.to_string()),
            highlight_code: None,
            code_block_indent: "  ".to_string(),
        }
    }

    pub fn with_highlighter(mut self, highlighter: CodeHighlighterFn) -> Self {
        self.highlight_code = Some(highlighter);
        self
    }
}

impl Default for RenderTheme {
    fn default() -> Self {
        Self::ansi()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    pub text: String,
    /// Set on the opening fence line of the n-th code block (0-based).
    pub code_block: Option<usize>,
}

impl RenderedLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code_block: None,
        }
    }

    fn code_fence(text: String, ordinal: usize) -> Self {
        Self {
            text,
            code_block: Some(ordinal),
        }
    }

    fn prefixed(self, prefix: &str) -> Self {
        Self {
            text: format!("{prefix}{}", self.text),
            code_block: self.code_block,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedDocument {
    pub lines: Vec<RenderedLine>,
}

impl RenderedDocument {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn code_block_count(&self) -> usize {
        self.lines
            .iter()
            .filter(|line| line.code_block.is_some())
            .count()
    }

    /// Index of the line that opens code block `ordinal`.
    pub fn code_block_line(&self, ordinal: usize) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| line.code_block == Some(ordinal))
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|line| line.text.as_str())
    }

    /// Lines with escape sequences removed.
    pub fn plain_lines(&self) -> Vec<String> {
        self.texts().map(strip_ansi).collect()
    }
}

#[derive(Clone, Copy)]
enum InlineStyleKind {
    Default,
    Quote,
}

struct InlineStyleContext {
    kind: InlineStyleKind,
    style_prefix: String,
}

impl InlineStyleContext {
    fn default_context() -> Self {
        Self {
            kind: InlineStyleKind::Default,
            style_prefix: String::new(),
        }
    }
}

/// Stateless markdown renderer; the same input always yields the same document.
pub struct MarkdownRenderer {
    theme: RenderTheme,
}

impl MarkdownRenderer {
    pub fn new(theme: RenderTheme) -> Self {
        Self { theme }
    }

    pub fn plain() -> Self {
        Self::new(RenderTheme::plain())
    }

    pub fn theme(&self) -> &RenderTheme {
        &self.theme
    }

    pub fn render(&self, text: &str) -> RenderedDocument {
        if text.trim().is_empty() {
            return RenderedDocument::default();
        }

        let normalized_text = text.replace('\t', "   ");
        let root = match to_mdast(&normalized_text, &ParseOptions::gfm()) {
            Ok(node) => node,
            Err(_) => mdast::Node::Text(mdast::Text {
                value: normalized_text.clone(),
                position: None,
            }),
        };

        let nodes = match root {
            mdast::Node::Root(root) => root.children,
            other => vec![other],
        };

        let mut pass = RenderPass {
            theme: &self.theme,
            source: &normalized_text,
            next_code_block: 0,
        };
        let context = InlineStyleContext::default_context();
        RenderedDocument {
            lines: pass.render_blocks(&nodes, &context, false),
        }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new(RenderTheme::default())
    }
}

/// Per-call state: code blocks are numbered in depth-first document order.
struct RenderPass<'a> {
    theme: &'a RenderTheme,
    source: &'a str,
    next_code_block: usize,
}

impl RenderPass<'_> {
    fn style_prefix<F>(&self, style_fn: F) -> String
    where
        F: Fn(&str) -> String,
    {
        let sentinel = "\u{0000}";
        let styled = style_fn(sentinel);
        styled
            .find(sentinel)
            .map(|idx| styled[..idx].to_string())
            .unwrap_or_default()
    }

    fn apply_inline_style(&self, text: &str, kind: InlineStyleKind) -> String {
        match kind {
            InlineStyleKind::Default => text.to_string(),
            InlineStyleKind::Quote => (self.theme.quote)(&(self.theme.italic)(text)),
        }
    }

    fn apply_inline_style_with_newlines(&self, text: &str, kind: InlineStyleKind) -> String {
        text.split('\n')
            .map(|segment| self.apply_inline_style(segment, kind))
            .collect::<Vec<String>>()
            .join("\n")
    }

    fn render_inline_nodes(&self, nodes: &[mdast::Node], context: &InlineStyleContext) -> String {
        let style_prefix = context.style_prefix.as_str();
        let kind = context.kind;

        let mut result = String::new();

        for node in nodes {
            match node {
                mdast::Node::Text(text) => {
                    result.push_str(&self.apply_inline_style_with_newlines(&text.value, kind));
                }
                mdast::Node::Paragraph(paragraph) => {
                    result.push_str(&self.render_inline_nodes(&paragraph.children, context));
                }
                mdast::Node::Strong(strong) => {
                    let content = self.render_inline_nodes(&strong.children, context);
                    result.push_str(&(self.theme.bold)(&content));
                    result.push_str(style_prefix);
                }
                mdast::Node::Emphasis(emphasis) => {
                    let content = self.render_inline_nodes(&emphasis.children, context);
                    result.push_str(&(self.theme.italic)(&content));
                    result.push_str(style_prefix);
                }
                mdast::Node::Delete(delete) => {
                    let content = self.render_inline_nodes(&delete.children, context);
                    result.push_str(&(self.theme.strikethrough)(&content));
                    result.push_str(style_prefix);
                }
                mdast::Node::InlineCode(code) => {
                    result.push_str(&(self.theme.code)(&code.value));
                    result.push_str(style_prefix);
                }
                mdast::Node::Link(link) => {
                    let link_text = self.render_inline_nodes(&link.children, context);
                    let link_text_plain = plain_text_from_nodes(&link.children);
                    let href = link.url.as_str();
                    let href_cmp = href.strip_prefix("mailto:").unwrap_or(href);
                    result.push_str(&(self.theme.link)(&(self.theme.underline)(&link_text)));
                    if link_text_plain != href && link_text_plain != href_cmp {
                        result.push_str(&(self.theme.link_url)(&format!(" ({href})")));
                    }
                    result.push_str(style_prefix);
                }
                mdast::Node::Break(_) => {
                    result.push('\n');
                }
                mdast::Node::Html(html) => {
                    result.push_str(&self.apply_inline_style_with_newlines(&html.value, kind));
                }
                mdast::Node::Image(image) => {
                    let alt = if image.alt.is_empty() {
                        image.url.as_str()
                    } else {
                        image.alt.as_str()
                    };
                    result.push_str(&self.apply_inline_style_with_newlines(alt, kind));
                }
                mdast::Node::InlineMath(math) => {
                    result.push_str(&self.apply_inline_style_with_newlines(&math.value, kind));
                }
                _ => {}
            }
        }

        result
    }

    fn render_blocks(
        &mut self,
        nodes: &[mdast::Node],
        context: &InlineStyleContext,
        tight: bool,
    ) -> Vec<RenderedLine> {
        let mut lines = Vec::new();
        for (idx, node) in nodes.iter().enumerate() {
            let next_node = nodes.get(idx + 1);
            lines.extend(self.render_block(node, context));

            let Some(next_node) = next_node else {
                continue;
            };
            let space_after = match (node_position(node), node_position(next_node)) {
                (Some((end, _)), Some((_, next_start))) => {
                    has_blank_line_between(self.source, end, next_start)
                }
                _ => false,
            };
            let next_is_list = matches!(next_node, mdast::Node::List(_));
            if space_after || !(tight || next_is_list) {
                lines.push(RenderedLine::new(""));
            }
        }
        lines
    }

    fn render_block(
        &mut self,
        node: &mdast::Node,
        context: &InlineStyleContext,
    ) -> Vec<RenderedLine> {
        match node {
            mdast::Node::Heading(heading) => {
                let heading_text = self.render_inline_nodes(&heading.children, context);
                let styled = match heading.depth {
                    1 => (self.theme.heading)(&(self.theme.bold)(&(self.theme.underline)(
                        &heading_text,
                    ))),
                    2 => (self.theme.heading)(&(self.theme.bold)(&heading_text)),
                    _ => {
                        let prefix = "#".repeat(heading.depth as usize);
                        (self.theme.heading)(&(self.theme.bold)(&format!(
                            "{prefix} {heading_text}"
                        )))
                    }
                };
                vec![RenderedLine::new(styled)]
            }
            mdast::Node::Paragraph(paragraph) => {
                let text = self.render_inline_nodes(&paragraph.children, context);
                text.split('\n').map(RenderedLine::new).collect()
            }
            mdast::Node::Code(code) => self.render_code(code),
            mdast::Node::List(list) => self.render_list(list, context),
            mdast::Node::Blockquote(blockquote) => self.render_blockquote(blockquote),
            mdast::Node::ThematicBreak(_) => {
                vec![RenderedLine::new((self.theme.hr)(&"─".repeat(RULE_WIDTH)))]
            }
            mdast::Node::Html(html) => html
                .value
                .trim()
                .split('\n')
                .map(|line| RenderedLine::new(self.apply_inline_style(line, context.kind)))
                .collect(),
            mdast::Node::Table(table) => self.render_table(table, context),
            mdast::Node::Math(math) => math
                .value
                .split('\n')
                .map(|line| RenderedLine::new(self.apply_inline_style(line, context.kind)))
                .collect(),
            mdast::Node::Text(text) => text
                .value
                .split('\n')
                .map(|line| RenderedLine::new(self.apply_inline_style(line, context.kind)))
                .collect(),
            mdast::Node::Break(_) => vec![RenderedLine::new("")],
            _ => Vec::new(),
        }
    }

    fn render_code(&mut self, code: &mdast::Code) -> Vec<RenderedLine> {
        let ordinal = self.next_code_block;
        self.next_code_block += 1;

        let indent = self.theme.code_block_indent.as_str();
        let mut lines = vec![RenderedLine::code_fence(
            (self.theme.code_block_border)(&format!(
                "```{}",
                code.lang.as_deref().unwrap_or_default()
            )),
            ordinal,
        )];
        if let Some(highlighter) = self.theme.highlight_code.as_ref() {
            for line in highlighter(&code.value, code.lang.as_deref()) {
                lines.push(RenderedLine::new(format!("{indent}{line}")));
            }
        } else {
            for line in code.value.split('\n') {
                lines.push(RenderedLine::new(format!(
                    "{indent}{}",
                    (self.theme.code_block)(line)
                )));
            }
        }
        lines.push(RenderedLine::new((self.theme.code_block_border)("```")));
        lines
    }

    fn render_list(
        &mut self,
        list: &mdast::List,
        context: &InlineStyleContext,
    ) -> Vec<RenderedLine> {
        let mut lines = Vec::new();
        let start_number = list.start.unwrap_or(1);
        let items: Vec<&mdast::ListItem> = list
            .children
            .iter()
            .filter_map(|node| match node {
                mdast::Node::ListItem(item) => Some(item),
                _ => None,
            })
            .collect();

        for (i, item) in items.iter().enumerate() {
            let bullet = if list.ordered {
                format!("{}. ", start_number + i as u32)
            } else {
                "- ".to_string()
            };
            let checkbox = match item.checked {
                Some(true) => "[x] ",
                Some(false) => "[ ] ",
                None => "",
            };
            let continuation = " ".repeat(visible_width(&bullet));
            let styled_bullet = (self.theme.list_bullet)(&bullet);

            let item_lines = self.render_blocks(&item.children, context, !list.spread);
            if item_lines.is_empty() {
                lines.push(RenderedLine::new(format!("{styled_bullet}{checkbox}")));
            }
            for (line_idx, line) in item_lines.into_iter().enumerate() {
                if line_idx == 0 {
                    lines.push(line.prefixed(&format!("{styled_bullet}{checkbox}")));
                } else if line.text.is_empty() {
                    lines.push(line);
                } else {
                    lines.push(line.prefixed(&continuation));
                }
            }

            if list.spread && i + 1 < items.len() {
                lines.push(RenderedLine::new(""));
            }
        }

        lines
    }

    fn render_blockquote(&mut self, blockquote: &mdast::Blockquote) -> Vec<RenderedLine> {
        let style_prefix =
            self.style_prefix(|text| (self.theme.quote)(&(self.theme.italic)(text)));
        let context = InlineStyleContext {
            kind: InlineStyleKind::Quote,
            style_prefix,
        };
        let border = (self.theme.quote_border)("│ ");

        self.render_blocks(&blockquote.children, &context, false)
            .into_iter()
            .map(|line| line.prefixed(&border))
            .collect()
    }

    fn render_table(
        &mut self,
        table: &mdast::Table,
        context: &InlineStyleContext,
    ) -> Vec<RenderedLine> {
        let rows: Vec<Vec<String>> = table
            .children
            .iter()
            .filter_map(|node| match node {
                mdast::Node::TableRow(row) => Some(
                    row.children
                        .iter()
                        .map(|cell| self.render_cell_text(cell, context))
                        .collect(),
                ),
                _ => None,
            })
            .collect();

        let Some(header) = rows.first() else {
            return Vec::new();
        };
        let num_cols = header.len();
        if num_cols == 0 {
            return Vec::new();
        }

        let mut column_widths = vec![1usize; num_cols];
        for row in &rows {
            for (col_idx, cell) in row.iter().enumerate().take(num_cols) {
                column_widths[col_idx] = column_widths[col_idx].max(visible_width(cell));
            }
        }

        let border = |left: &str, join: &str, right: &str| {
            let cells: Vec<String> = column_widths.iter().map(|w| "─".repeat(*w)).collect();
            RenderedLine::new(format!("{left}─{}─{right}", cells.join(&format!("─{join}─"))))
        };

        let mut lines = vec![border("┌", "┬", "┐")];
        for (row_idx, row) in rows.iter().enumerate() {
            let mut parts = Vec::with_capacity(num_cols);
            for (col_idx, width) in column_widths.iter().enumerate() {
                let text = row.get(col_idx).map(String::as_str).unwrap_or_default();
                let align = table.align.get(col_idx).cloned();
                let padded = align_cell(text, *width, align);
                if row_idx == 0 {
                    parts.push((self.theme.bold)(&padded));
                } else {
                    parts.push(padded);
                }
            }
            lines.push(RenderedLine::new(format!("│ {} │", parts.join(" │ "))));
            if row_idx == 0 && rows.len() > 1 {
                lines.push(border("├", "┼", "┤"));
            }
        }
        lines.push(border("└", "┴", "┘"));
        lines
    }

    fn render_cell_text(&self, cell: &mdast::Node, context: &InlineStyleContext) -> String {
        match cell {
            mdast::Node::TableCell(table_cell) => {
                self.render_inline_nodes(&table_cell.children, context)
            }
            _ => self.render_inline_nodes(std::slice::from_ref(cell), context),
        }
    }
}

fn align_cell(text: &str, width: usize, align: Option<mdast::AlignKind>) -> String {
    let padding = width.saturating_sub(visible_width(text));
    match align {
        Some(mdast::AlignKind::Right) => format!("{}{text}", " ".repeat(padding)),
        Some(mdast::AlignKind::Center) => {
            let left = padding / 2;
            format!("{}{text}{}", " ".repeat(left), " ".repeat(padding - left))
        }
        _ => pad_to_width(text, width),
    }
}

fn plain_text_from_nodes(nodes: &[mdast::Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            mdast::Node::Text(text) => out.push_str(&text.value),
            mdast::Node::InlineCode(code) => out.push_str(&code.value),
            mdast::Node::Strong(strong) => out.push_str(&plain_text_from_nodes(&strong.children)),
            mdast::Node::Emphasis(emphasis) => {
                out.push_str(&plain_text_from_nodes(&emphasis.children))
            }
            mdast::Node::Delete(delete) => out.push_str(&plain_text_from_nodes(&delete.children)),
            mdast::Node::Link(link) => out.push_str(&plain_text_from_nodes(&link.children)),
            mdast::Node::Html(html) => out.push_str(&html.value),
            mdast::Node::Image(image) => out.push_str(&image.alt),
            _ => {}
        }
    }
    out
}

fn node_position(node: &mdast::Node) -> Option<(usize, usize)> {
    node.position()
        .map(|pos| (pos.end.offset, pos.start.offset))
}

fn has_blank_line_between(source: &str, end: usize, start: usize) -> bool {
    if start <= end || end >= source.len() {
        return false;
    }
    let Some(slice) = source.get(end..start.min(source.len())) else {
        return false;
    };
    let mut saw_newline = false;
    let mut only_whitespace = true;

    for ch in slice.chars() {
        if ch == '\n' || ch == '\r' {
            if saw_newline && only_whitespace {
                return true;
            }
            saw_newline = true;
            only_whitespace = true;
        } else if !ch.is_whitespace() {
            saw_newline = false;
            only_whitespace = false;
        }
    }

    false
}
