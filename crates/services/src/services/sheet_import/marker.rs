//! `[UNIQUE:<value>]` markers embedded at the start of a free-text field so a
//! sheet row can be found again on the next sync.

const PREFIX: &str = "[UNIQUE:";
const SUFFIX: char = ']';

pub fn format_marker(unique_value: &str) -> String {
    format!("{PREFIX}{unique_value}{SUFFIX}")
}

/// Persisted text for a row: the marker (when present) followed by the sheet's
/// own text. Always rebuilt from scratch, never appended to stored text.
pub fn compose_description(unique_value: Option<&str>, sheet_text: Option<&str>) -> Option<String> {
    let sheet_text = sheet_text.map(str::trim).filter(|t| !t.is_empty());
    match (unique_value, sheet_text) {
        (Some(value), Some(text)) => Some(format!("{} {}", format_marker(value), text)),
        (Some(value), None) => Some(format_marker(value)),
        (None, Some(text)) => Some(text.to_string()),
        (None, None) => None,
    }
}

/// Text for a record that already exists. Whatever the row leaves out is
/// taken from the stored text, so a row without a unique value keeps the
/// record's marker.
pub fn recompose_description(
    stored: Option<&str>,
    unique_value: Option<&str>,
    sheet_text: Option<&str>,
) -> Option<String> {
    let unique_value = unique_value.or_else(|| stored.and_then(extract_marker));
    let sheet_text = sheet_text.or_else(|| stored.map(strip_marker));
    compose_description(unique_value, sheet_text)
}

/// Marker value at the start of `text`, if any
pub fn extract_marker(text: &str) -> Option<&str> {
    let rest = text.trim_start().strip_prefix(PREFIX)?;
    let end = rest.find(SUFFIX)?;
    Some(&rest[..end])
}

/// User-facing part of a stored description
pub fn strip_marker(text: &str) -> &str {
    let trimmed = text.trim_start();
    match trimmed.strip_prefix(PREFIX).and_then(|rest| rest.find(SUFFIX).map(|end| &rest[end + 1..])) {
        Some(remainder) => remainder.trim_start(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_description() {
        assert_eq!(
            compose_description(Some("U-100"), Some("Deep clean")).as_deref(),
            Some("[UNIQUE:U-100] Deep clean")
        );
        assert_eq!(
            compose_description(Some("U-100"), Some("   ")).as_deref(),
            Some("[UNIQUE:U-100]")
        );
        assert_eq!(
            compose_description(None, Some("Deep clean")).as_deref(),
            Some("Deep clean")
        );
        assert_eq!(compose_description(None, None), None);
    }

    #[test]
    fn test_extract_and_strip() {
        let stored = "[UNIQUE:U-100] Deep clean";
        assert_eq!(extract_marker(stored), Some("U-100"));
        assert_eq!(strip_marker(stored), "Deep clean");
        assert_eq!(extract_marker("Deep clean"), None);
        assert_eq!(strip_marker("Deep clean"), "Deep clean");
        assert_eq!(strip_marker("[UNIQUE:U-100]"), "");
    }

    #[test]
    fn test_recompose_keeps_what_the_row_leaves_out() {
        let stored = Some("[UNIQUE:U-100] bring keys");
        assert_eq!(
            recompose_description(stored, None, Some("new note")).as_deref(),
            Some("[UNIQUE:U-100] new note")
        );
        assert_eq!(
            recompose_description(stored, Some("U-100"), None).as_deref(),
            Some("[UNIQUE:U-100] bring keys")
        );
        assert_eq!(
            recompose_description(Some("plain"), None, None).as_deref(),
            Some("plain")
        );
        assert_eq!(recompose_description(None, None, None), None);
    }

    #[test]
    fn test_recomposing_does_not_stack_markers() {
        let first = compose_description(Some("A1"), Some("note")).unwrap();
        let second = compose_description(Some("A1"), Some(strip_marker(&first))).unwrap();
        assert_eq!(first, second);
    }
}
