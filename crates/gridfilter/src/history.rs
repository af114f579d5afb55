//! Undo/redo of filter model changes.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::FilterModel;

/// Default number of undo steps kept.
pub const DEFAULT_MAX_HISTORY: usize = 50;

/// The mutation that produced a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HistoryAction {
    ApplyFilter { column_id: String },
    ClearFilter { column_id: String },
    ClearAllFilters,
    SetFilterModel,
    ApplyPreset { name: String },
    Import,
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryAction::ApplyFilter { column_id } => write!(f, "apply filter on '{}'", column_id),
            HistoryAction::ClearFilter { column_id } => write!(f, "clear filter on '{}'", column_id),
            HistoryAction::ClearAllFilters => f.write_str("clear all filters"),
            HistoryAction::SetFilterModel => f.write_str("set filter model"),
            HistoryAction::ApplyPreset { name } => write!(f, "apply preset '{}'", name),
            HistoryAction::Import => f.write_str("import filter model"),
        }
    }
}

/// A model snapshot taken before a mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub model: FilterModel,
    pub action: HistoryAction,
    pub timestamp: DateTime<Utc>,
}

/// Bounded undo stack plus redo stack.
///
/// Recording a new mutation clears the redo stack. When the undo stack is
/// full the oldest snapshot is dropped.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    undo: VecDeque<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    max_entries: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl HistoryManager {
    pub fn new(max_entries: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_entries,
        }
    }

    /// Records the model as it was before `action`.
    pub fn record(&mut self, previous: FilterModel, action: HistoryAction) {
        self.push_undo(HistoryEntry {
            model: previous,
            action,
            timestamp: Utc::now(),
        });
        self.redo.clear();
    }

    fn push_undo(&mut self, entry: HistoryEntry) {
        if self.max_entries == 0 {
            return;
        }
        self.undo.push_back(entry);
        while self.undo.len() > self.max_entries {
            self.undo.pop_front();
        }
    }

    /// Steps back: returns the model to install, saving `current` for redo.
    ///
    /// Returns `None` when there is nothing to undo.
    pub fn undo(&mut self, current: FilterModel) -> Option<FilterModel> {
        let entry = self.undo.pop_back()?;
        self.redo.push(HistoryEntry {
            model: current,
            action: entry.action.clone(),
            timestamp: Utc::now(),
        });
        Some(entry.model)
    }

    /// Steps forward: returns the model to install, saving `current` for undo.
    ///
    /// Returns `None` when there is nothing to redo.
    pub fn redo(&mut self, current: FilterModel) -> Option<FilterModel> {
        let entry = self.redo.pop()?;
        self.push_undo(HistoryEntry {
            model: current,
            action: entry.action.clone(),
            timestamp: Utc::now(),
        });
        Some(entry.model)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Undo entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.undo.iter()
    }

    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnFilter, Filter, NumberOperator};

    fn model(n: f64) -> FilterModel {
        FilterModel::new().with("n", ColumnFilter::new(Filter::number(NumberOperator::Equals, n)))
    }

    fn apply(column_id: &str) -> HistoryAction {
        HistoryAction::ApplyFilter {
            column_id: column_id.to_string(),
        }
    }

    #[test]
    fn test_undo_on_empty_is_none() {
        let mut history = HistoryManager::default();
        assert!(!history.can_undo());
        assert_eq!(history.undo(model(1.0)), None);
        assert_eq!(history.redo(model(1.0)), None);
    }

    #[test]
    fn test_undo_then_redo_restores() {
        let mut history = HistoryManager::default();
        // m0 -> m1 -> m2
        history.record(FilterModel::new(), apply("n"));
        history.record(model(1.0), apply("n"));
        let current = model(2.0);

        let back = history.undo(current.clone()).unwrap();
        assert_eq!(back, model(1.0));
        assert!(history.can_redo());

        let forward = history.redo(back).unwrap();
        assert_eq!(forward, current);
        assert!(!history.can_redo());
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_record_clears_redo() {
        let mut history = HistoryManager::default();
        history.record(FilterModel::new(), apply("n"));
        let back = history.undo(model(1.0)).unwrap();
        assert!(history.can_redo());

        history.record(back, HistoryAction::SetFilterModel);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut history = HistoryManager::new(3);
        for i in 0..5 {
            history.record(model(i as f64), apply("n"));
        }

        assert_eq!(history.len(), 3);
        let oldest = history.entries().next().unwrap();
        assert_eq!(oldest.model, model(2.0));
    }

    #[test]
    fn test_action_display() {
        assert_eq!(apply("age").to_string(), "apply filter on 'age'");
        assert_eq!(
            HistoryAction::ApplyPreset {
                name: "adults".to_string()
            }
            .to_string(),
            "apply preset 'adults'"
        );
    }
}
