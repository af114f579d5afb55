//! Data sources the engine filters.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::value::Row;

/// A column as seen by the host grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub id: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl ColumnDef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            visible: true,
        }
    }

    pub fn hidden(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            visible: false,
        }
    }
}

/// Supplies the rows to filter and the column layout.
///
/// `rows` is called on every filter application, so implementations should
/// hand out a shared snapshot rather than copying.
pub trait DataSource: Send + Sync {
    fn rows(&self) -> Arc<Vec<Row>>;

    fn columns(&self) -> Vec<ColumnDef>;

    /// Ids of visible columns, searched by the quick filter.
    fn visible_column_ids(&self) -> Vec<String> {
        self.columns()
            .into_iter()
            .filter(|c| c.visible)
            .map(|c| c.id)
            .collect()
    }
}

/// An in-memory dataset.
///
/// Columns default to the keys of the first row when not given explicitly.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Arc<Vec<Row>>,
    columns: Vec<ColumnDef>,
}

impl Dataset {
    pub fn new(rows: Vec<Row>) -> Self {
        let columns = rows
            .first()
            .and_then(Row::as_object)
            .map(|first| first.keys().map(|key| ColumnDef::new(key.as_str())).collect())
            .unwrap_or_default();
        Self {
            rows: Arc::new(rows),
            columns,
        }
    }

    pub fn with_columns(mut self, columns: Vec<ColumnDef>) -> Self {
        self.columns = columns;
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl DataSource for Dataset {
    fn rows(&self) -> Arc<Vec<Row>> {
        Arc::clone(&self.rows)
    }

    fn columns(&self) -> Vec<ColumnDef> {
        self.columns.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_columns_inferred_from_first_row() {
        let dataset = Dataset::new(vec![json!({ "b": 1, "a": 2 }), json!({ "c": 3 })]);
        let ids: Vec<String> = dataset.columns().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_visible_column_ids_skip_hidden() {
        let dataset = Dataset::new(vec![json!({ "a": 1 })])
            .with_columns(vec![ColumnDef::new("a"), ColumnDef::hidden("secret")]);
        assert_eq!(dataset.visible_column_ids(), vec!["a"]);
    }

    #[test]
    fn test_rows_are_shared() {
        let dataset = Dataset::new(vec![json!({ "a": 1 })]);
        assert!(Arc::ptr_eq(&dataset.rows(), &dataset.rows()));
    }
}
