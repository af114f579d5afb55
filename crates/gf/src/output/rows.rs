//! Filtered row output formatting.

use gridfilter::value::Row;
use owo_colors::OwoColorize;
use serde::Serialize;

use super::helpers::{cell_text, pad, truncate_str};

/// Widest a table column is allowed to grow.
const MAX_COLUMN_WIDTH: usize = 30;

/// JSON output structure for filtered rows.
#[derive(Serialize)]
pub struct RowsOutput<'a> {
    pub total: usize,
    pub matched: usize,
    pub rows: &'a [Row],
}

/// Formats rows as JSON.
pub fn format_rows_json(
    rows: &[Row],
    matched: usize,
    total: usize,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&RowsOutput {
        total,
        matched,
        rows,
    })
}

/// Formats rows as a table.
///
/// With no explicit `columns`, the keys of the first row are used.
pub fn format_rows_table(
    rows: &[Row],
    columns: &[String],
    matched: usize,
    total: usize,
    use_colors: bool,
) -> String {
    if rows.is_empty() {
        return format!("No matching rows ({total} total).\n");
    }

    let columns: Vec<String> = if columns.is_empty() {
        rows[0]
            .as_object()
            .map(|first| first.keys().cloned().collect())
            .unwrap_or_default()
    } else {
        columns.to_vec()
    };

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| truncate_str(&cell_text(row, column), MAX_COLUMN_WIDTH))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            cells
                .iter()
                .map(|line| line[i].chars().count())
                .chain(std::iter::once(column.chars().count()))
                .max()
                .unwrap_or(0)
                .min(MAX_COLUMN_WIDTH)
        })
        .collect();

    let mut output = String::new();

    // Header
    let header = join_padded(columns.iter().map(String::as_str), &widths);
    if use_colors {
        output.push_str(&format!("{}\n", header.dimmed()));
    } else {
        output.push_str(&header);
        output.push('\n');
    }

    // Rows
    for line in &cells {
        output.push_str(&join_padded(line.iter().map(String::as_str), &widths));
        output.push('\n');
    }

    let footer = if rows.len() < matched {
        format!("\n{matched} of {total} rows match (showing {})", rows.len())
    } else {
        format!("\n{matched} of {total} rows match")
    };
    if use_colors {
        output.push_str(&format!("{}\n", footer.dimmed()));
    } else {
        output.push_str(&footer);
        output.push('\n');
    }

    output
}

fn join_padded<'a>(values: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    values
        .zip(widths)
        .map(|(value, &width)| pad(value, width))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<Row> {
        vec![
            json!({ "name": "Jon", "age": 30 }),
            json!({ "name": "Josephine", "age": 7 }),
        ]
    }

    #[test]
    fn test_table_uses_first_row_keys() {
        let output = format_rows_table(&rows(), &[], 2, 5, false);
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "age  name");
        assert_eq!(lines[1], "30   Jon");
        assert_eq!(lines[2], "7    Josephine");
        assert_eq!(lines[4], "2 of 5 rows match");
    }

    #[test]
    fn test_table_explicit_columns() {
        let output = format_rows_table(&rows(), &["name".to_string()], 2, 2, false);
        assert!(output.starts_with("name\nJon\nJosephine\n"));
    }

    #[test]
    fn test_table_reports_truncation() {
        let output = format_rows_table(&rows()[..1], &[], 2, 2, false);
        assert!(output.contains("2 of 2 rows match (showing 1)"));
    }

    #[test]
    fn test_table_empty() {
        assert_eq!(
            format_rows_table(&[], &[], 0, 3, false),
            "No matching rows (3 total).\n"
        );
    }

    #[test]
    fn test_json_shape() {
        let json = format_rows_json(&rows(), 2, 4).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["total"], 4);
        assert_eq!(value["matched"], 2);
        assert_eq!(value["rows"][1]["name"], "Josephine");
    }
}
