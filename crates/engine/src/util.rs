//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API.

use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidInput(format!("invalid {label} id")))
}

/// Canonical form of a login name: trimmed, NFKC-normalized, lowercase.
///
/// Login names are unique per principal kind under this form, so `"SM1"` and
/// `" sm1 "` collide.
pub(crate) fn normalize_login_name(value: &str) -> ResultEngine<String> {
    let normalized: String = value.trim().nfkc().collect::<String>().to_lowercase();
    if normalized.is_empty() {
        return Err(EngineError::InvalidInput(
            "login name must not be empty".to_string(),
        ));
    }
    Ok(normalized)
}

pub(crate) fn normalize_required_text(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidInput(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_names_fold_case_and_width() {
        assert_eq!(normalize_login_name(" SM1 ").unwrap(), "sm1");
        // Fullwidth digits fold to ASCII under NFKC.
        assert_eq!(normalize_login_name("sm\u{FF11}").unwrap(), "sm1");
        assert!(normalize_login_name("   ").is_err());
    }

    #[test]
    fn optional_text_drops_blank_values() {
        assert_eq!(normalize_optional_text(Some("  ")), None);
        assert_eq!(normalize_optional_text(Some(" hi ")), Some("hi".to_string()));
        assert_eq!(normalize_optional_text(None), None);
    }
}
