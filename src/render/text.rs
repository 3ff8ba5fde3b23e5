//! ANSI-aware text measurement.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

const TAB_WIDTH: usize = 3;
const ESC: u8 = 0x1b;
const BEL: u8 = 0x07;

/// Length in bytes of the escape sequence starting at `pos`, if any.
///
/// Recognizes CSI (`ESC [` .. final byte) and OSC (`ESC ]` .. BEL or `ESC \`).
pub fn escape_len(input: &str, pos: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    if bytes.get(pos) != Some(&ESC) {
        return None;
    }

    match bytes.get(pos + 1)? {
        b'[' => {
            let mut idx = pos + 2;
            while idx < bytes.len() {
                if (0x40..=0x7e).contains(&bytes[idx]) {
                    return Some(idx + 1 - pos);
                }
                idx += 1;
            }
            None
        }
        b']' => {
            let mut idx = pos + 2;
            while idx < bytes.len() {
                if bytes[idx] == BEL {
                    return Some(idx + 1 - pos);
                }
                if bytes[idx] == ESC && bytes.get(idx + 1) == Some(&b'\\') {
                    return Some(idx + 2 - pos);
                }
                idx += 1;
            }
            None
        }
        _ => None,
    }
}

/// Removes terminal escape sequences, keeping the visible characters.
pub fn strip_ansi(input: &str) -> String {
    let mut clean = String::with_capacity(input.len());
    let mut idx = 0;
    while idx < input.len() {
        if let Some(length) = escape_len(input, idx) {
            idx += length;
            continue;
        }
        let Some(ch) = input[idx..].chars().next() else {
            break;
        };
        clean.push(ch);
        idx += ch.len_utf8();
    }
    clean
}

pub fn grapheme_width(grapheme: &str) -> usize {
    if grapheme == "\t" {
        return TAB_WIDTH;
    }
    // Emoji presentation selector forces a double-width cell.
    if grapheme.contains('\u{fe0f}') {
        return 2;
    }
    grapheme
        .chars()
        .map(|ch| UnicodeWidthChar::width(ch).unwrap_or(0))
        .sum()
}

/// Display width in terminal cells, ignoring escape sequences.
pub fn visible_width(input: &str) -> usize {
    if input.is_empty() {
        return 0;
    }
    strip_ansi(input).graphemes(true).map(grapheme_width).sum()
}

/// Pads `text` with spaces up to `width` visible cells.
pub fn pad_to_width(text: &str, width: usize) -> String {
    let padding = width.saturating_sub(visible_width(text));
    format!("{text}{}", " ".repeat(padding))
}
