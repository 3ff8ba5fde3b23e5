//! Validation-warning classification and code-block resolution.

use chat_api::ValidationWarning;

use crate::render::sink::{Banner, UNAVAILABLE_FALLBACK};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningClass {
    /// The validator could not run.
    Unavailable,
    /// The validator ran and reported errors.
    Flagged,
}

pub fn classify(warning: &ValidationWarning) -> WarningClass {
    let errors = warning.errors.as_str();
    if errors.is_empty() || errors.contains("unavailable") || errors.contains("timed out") {
        WarningClass::Unavailable
    } else {
        WarningClass::Flagged
    }
}

pub fn banner_for(warning: &ValidationWarning) -> Banner {
    match classify(warning) {
        WarningClass::Unavailable => Banner::Unavailable {
            message: if warning.errors.is_empty() {
                UNAVAILABLE_FALLBACK.to_string()
            } else {
                warning.errors.clone()
            },
        },
        WarningClass::Flagged => Banner::Flagged {
            errors: warning.errors.clone(),
            preview: warning.code_preview.clone(),
        },
    }
}

/// Maps a 1-based `code_index` to a 0-based ordinal, or `None` when out of range.
pub fn resolve(code_index: i64, code_blocks: usize) -> Option<usize> {
    let ordinal = usize::try_from(code_index).ok()?.checked_sub(1)?;
    (ordinal < code_blocks).then_some(ordinal)
}

#[cfg(test)]
mod tests {
    use super::{banner_for, classify, resolve, WarningClass};
    use crate::render::sink::Banner;
    use chat_api::ValidationWarning;

    fn warning(code_index: i64, errors: &str) -> ValidationWarning {
        ValidationWarning {
            code_index,
            errors: errors.to_string(),
            code_preview: None,
        }
    }

    #[test]
    fn empty_or_unavailable_errors_classify_as_unavailable() {
        assert_eq!(classify(&warning(1, "")), WarningClass::Unavailable);
        assert_eq!(
            classify(&warning(1, "validator unavailable")),
            WarningClass::Unavailable
        );
        assert_eq!(
            classify(&warning(1, "validation timed out after 5s")),
            WarningClass::Unavailable
        );
        assert_eq!(
            classify(&warning(1, "line 3: unexpected ENDIF")),
            WarningClass::Flagged
        );
    }

    #[test]
    fn unavailable_banner_uses_fallback_text() {
        assert_eq!(
            banner_for(&warning(1, "")),
            Banner::Unavailable {
                message: "Syntax validation unavailable".to_string()
            }
        );
        assert_eq!(
            banner_for(&warning(1, "timed out")),
            Banner::Unavailable {
                message: "timed out".to_string()
            }
        );
    }

    #[test]
    fn resolve_rejects_out_of_range_indices() {
        assert_eq!(resolve(1, 1), Some(0));
        assert_eq!(resolve(2, 2), Some(1));
        assert_eq!(resolve(0, 2), None);
        assert_eq!(resolve(-1, 2), None);
        assert_eq!(resolve(5, 2), None);
        assert_eq!(resolve(1, 0), None);
    }
}
