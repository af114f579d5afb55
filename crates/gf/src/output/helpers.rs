//! Common helper functions for output formatting.

use gridfilter::value::{as_text, get_column_value, Row};

/// Truncates an ID to 8 characters for display.
pub fn truncate_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// Truncates a string to a maximum number of characters.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        s.to_string()
    }
}

/// Renders one cell of a row as single-line text.
pub fn cell_text(row: &Row, column: &str) -> String {
    as_text(get_column_value(row, column)).replace('\n', " ")
}

/// Pads `s` with spaces to `width` characters.
pub fn pad(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        s.to_string()
    } else {
        format!("{s}{}", " ".repeat(width - len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truncate_id() {
        assert_eq!(truncate_id("0123456789"), "01234567");
        assert_eq!(truncate_id("abc"), "abc");
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
    }

    #[test]
    fn test_truncate_str_multibyte() {
        assert_eq!(truncate_str("ærøåæøå", 5), "ær...");
    }

    #[test]
    fn test_cell_text() {
        let row = json!({ "name": "a\nb", "n": 3, "nested": { "x": true }, "none": null });
        assert_eq!(cell_text(&row, "name"), "a b");
        assert_eq!(cell_text(&row, "n"), "3");
        assert_eq!(cell_text(&row, "nested.x"), "true");
        assert_eq!(cell_text(&row, "none"), "");
        assert_eq!(cell_text(&row, "missing"), "");
    }

    #[test]
    fn test_pad() {
        assert_eq!(pad("ab", 4), "ab  ");
        assert_eq!(pad("abcdef", 4), "abcdef");
    }
}
