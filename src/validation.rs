//! Request normalization applied once at the boundary.
//!
//! Usernames are trimmed and must be non-empty; nothing else is checked. Instance ids are
//! trimmed and blank entries dropped, so the core only ever sees clean, non-empty ids.

use crate::gacha::GachaError;

pub fn normalize_username(raw: Option<&str>) -> Result<String, GachaError> {
    let name = raw.map(str::trim).unwrap_or("");
    if name.is_empty() {
        return Err(GachaError::MissingUsername);
    }
    Ok(name.to_string())
}

/// Trim every id and drop blanks, keeping order. An absent list becomes empty.
pub fn normalize_ids(raw: Option<&[String]>) -> Vec<String> {
    raw.unwrap_or_default()
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Trim a single id; absent becomes empty, which the core rejects as `InvalidRequest`.
pub fn normalize_id(raw: Option<&str>) -> String {
    raw.map(str::trim).unwrap_or("").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_are_trimmed() {
        assert_eq!(normalize_username(Some("  alice ")).unwrap(), "alice");
        assert_eq!(normalize_username(Some("Bob Smith")).unwrap(), "Bob Smith");
    }

    #[test]
    fn blank_or_missing_username_is_rejected() {
        assert!(matches!(
            normalize_username(Some("   ")),
            Err(GachaError::MissingUsername)
        ));
        assert!(matches!(
            normalize_username(None),
            Err(GachaError::MissingUsername)
        ));
    }

    #[test]
    fn ids_are_cleaned_in_order() {
        let raw = vec![" a1 ".to_string(), "".into(), "b2".into(), "  ".into()];
        assert_eq!(normalize_ids(Some(&raw)), vec!["a1", "b2"]);
        assert!(normalize_ids(None).is_empty());
        assert_eq!(normalize_id(Some(" x ")), "x");
        assert_eq!(normalize_id(None), "");
    }
}
