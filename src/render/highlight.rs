//! Code-block syntax highlighting backed by syntect's bundled syntaxes and themes.

use once_cell::sync::Lazy;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};
use tracing::warn;

use super::markdown::CodeHighlighterFn;

pub const DEFAULT_THEME: &str = "base16-ocean.dark";

const RESET: &str = "\x1b[0m";

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

/// Loads the syntax and theme sets so the first highlighted block doesn't stall a frame.
pub fn prewarm_highlighting() {
    Lazy::force(&SYNTAX_SET);
    Lazy::force(&THEME_SET);
}

#[derive(Debug, Clone)]
pub struct SyntectHighlighter {
    theme_name: String,
}

impl SyntectHighlighter {
    /// Unknown theme names fall back to [`DEFAULT_THEME`].
    pub fn new(theme_name: &str) -> Self {
        let theme_name = if THEME_SET.themes.contains_key(theme_name) {
            theme_name.to_string()
        } else {
            warn!(theme = theme_name, "unknown highlight theme, using default");
            DEFAULT_THEME.to_string()
        };
        Self { theme_name }
    }

    pub fn theme_name(&self) -> &str {
        &self.theme_name
    }

    fn theme(&self) -> Option<&'static Theme> {
        THEME_SET
            .themes
            .get(&self.theme_name)
            .or_else(|| THEME_SET.themes.get(DEFAULT_THEME))
    }

    /// Highlights `code`, returning one escaped line per source line.
    pub fn highlight(&self, code: &str, lang: Option<&str>) -> Vec<String> {
        let Some(theme) = self.theme() else {
            return code.split('\n').map(str::to_string).collect();
        };
        let mut highlighter = HighlightLines::new(find_syntax(lang), theme);

        let mut lines = Vec::new();
        for line in LinesWithEndings::from(code) {
            let rendered = match highlighter.highlight_line(line, &SYNTAX_SET) {
                Ok(ranges) => {
                    let escaped = as_24_bit_terminal_escaped(&ranges[..], false);
                    format!("{}{RESET}", escaped.replace(['\n', '\r'], ""))
                }
                Err(_) => line.trim_end_matches(['\n', '\r']).to_string(),
            };
            lines.push(rendered);
        }
        if code.is_empty() || code.ends_with('\n') {
            lines.push(String::new());
        }
        lines
    }

    pub fn into_highlight_fn(self) -> CodeHighlighterFn {
        Box::new(move |code, lang| self.highlight(code, lang))
    }
}

impl Default for SyntectHighlighter {
    fn default() -> Self {
        Self::new(DEFAULT_THEME)
    }
}

fn find_syntax(lang: Option<&str>) -> &'static SyntaxReference {
    lang.map(str::trim)
        .filter(|lang| !lang.is_empty())
        .and_then(|lang| {
            SYNTAX_SET
                .find_syntax_by_token(lang)
                .or_else(|| SYNTAX_SET.find_syntax_by_extension(lang))
        })
        .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text())
}

#[cfg(test)]
mod tests {
    use super::{find_syntax, SyntectHighlighter, DEFAULT_THEME};
    use crate::render::text::strip_ansi;

    #[test]
    fn known_language_resolves_by_token_or_extension() {
        assert_eq!(find_syntax(Some("rust")).name, "Rust");
        assert_eq!(find_syntax(Some("rs")).name, "Rust");
    }

    #[test]
    fn unknown_language_falls_back_to_plain_text() {
        assert_eq!(find_syntax(Some("bbj")).name, "Plain Text");
        assert_eq!(find_syntax(None).name, "Plain Text");
    }

    #[test]
    fn highlighted_lines_keep_visible_text() {
        let highlighter = SyntectHighlighter::default();
        let lines = highlighter.highlight("fn main() {\n    println!(\"hi\");\n}", Some("rust"));
        let plain: Vec<String> = lines.iter().map(|line| strip_ansi(line)).collect();
        assert_eq!(plain, vec!["fn main() {", "    println!(\"hi\");", "}"]);
        assert!(lines[0].contains("\x1b[38;2;"));
    }

    #[test]
    fn unknown_theme_uses_default() {
        assert_eq!(SyntectHighlighter::new("no-such-theme").theme_name(), DEFAULT_THEME);
    }
}
