//! Predicate evaluation for filter models.
//!
//! This module evaluates [`Filter`] conditions against cell values, combines
//! the (at most two) conditions of a [`ColumnFilter`], and joins every column
//! of a [`FilterModel`] with AND into a [`RowFilter`].
//!
//! # Families
//!
//! - `text` - case/whitespace normalized comparison, regex and fuzzy matching
//! - `number` - comparisons, inclusive ranges, parity, divisibility, primality
//! - `date` - ordering, inclusive ranges, calendar-relative keywords
//! - `boolean` - equality after coercion
//! - `set` - membership without coercion
//! - `custom` - a predicate registered by name on the [`PredicateRegistry`]
//!
//! Inactive conditions and conditions with an unknown operator pass every row.
//!
//! # Example
//!
//! ```
//! use gridfilter::filter::{EvalContext, RowFilter};
//! use gridfilter::model::{ColumnFilter, Filter, FilterModel, NumberOperator};
//! use serde_json::json;
//!
//! let model = FilterModel::new().with(
//!     "age",
//!     ColumnFilter::new(Filter::number(NumberOperator::Equals, 30.0)),
//! );
//! let rows = vec![json!({"name": "Jon", "age": 30}), json!({"name": "Jane", "age": 25})];
//!
//! let filter = RowFilter::new(model, EvalContext::default());
//! assert_eq!(filter.filter_indices(&rows), vec![0]);
//! ```

mod date;
mod number;
mod scalar;
mod text;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate};
use rayon::prelude::*;
use serde_json::Value;

use crate::model::{ColumnFilter, Filter, FilterModel, JoinOperator};
use crate::value::{as_text, get_column_value, Row};

pub use text::{similarity, RegexCache};

/// Default fuzzy-match similarity threshold.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.8;

/// A caller-supplied predicate: `(cell value, operand, whole row) -> bool`.
pub type CustomPredicate = Arc<dyn Fn(&Value, &Value, &Row) -> bool + Send + Sync>;

/// Named custom predicates referenced by `custom` filters.
///
/// The generation counter advances on every registration, so results computed
/// with an earlier set of predicates can be told apart.
#[derive(Clone, Default)]
pub struct PredicateRegistry {
    predicates: HashMap<String, CustomPredicate>,
    generation: u64,
}

impl PredicateRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a predicate under `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&Value, &Value, &Row) -> bool + Send + Sync + 'static,
    {
        self.predicates.insert(name.into(), Arc::new(predicate));
        self.generation = self.generation.wrapping_add(1);
    }

    /// Number of registrations so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Looks up a predicate by name.
    pub fn get(&self, name: &str) -> Option<&CustomPredicate> {
        self.predicates.get(name)
    }

    /// Returns true if a predicate is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }
}

impl fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.predicates.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("PredicateRegistry")
            .field("predicates", &names)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Settings shared by every predicate in one evaluation pass.
///
/// "Now" is captured once, so relative date predicates are consistent across
/// all rows of a pass. Regex operands are compiled once per pass and shared
/// by clones of the context.
#[derive(Debug, Clone)]
pub struct EvalContext {
    now: DateTime<Local>,
    case_sensitive: bool,
    fuzzy_threshold: f64,
    predicates: PredicateRegistry,
    regexes: Arc<RegexCache>,
}

impl Default for EvalContext {
    fn default() -> Self {
        Self {
            now: Local::now(),
            case_sensitive: false,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            predicates: PredicateRegistry::new(),
            regexes: Arc::default(),
        }
    }
}

impl EvalContext {
    /// Creates a context with the given text defaults, capturing the current time.
    pub fn new(case_sensitive: bool, fuzzy_threshold: f64) -> Self {
        Self {
            case_sensitive,
            fuzzy_threshold,
            ..Self::default()
        }
    }

    /// Pins "now" for relative date predicates.
    pub fn with_now(mut self, now: DateTime<Local>) -> Self {
        self.now = now;
        self
    }

    /// Attaches the custom predicates.
    pub fn with_predicates(mut self, predicates: PredicateRegistry) -> Self {
        self.predicates = predicates;
        self
    }

    /// The current local date as seen by this pass.
    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn fuzzy_threshold(&self) -> f64 {
        self.fuzzy_threshold
    }

    pub fn predicates(&self) -> &PredicateRegistry {
        &self.predicates
    }

    pub fn regexes(&self) -> &RegexCache {
        &self.regexes
    }
}

/// Evaluates one condition against a cell value.
///
/// `row` is only consulted by custom predicates.
pub fn evaluate(value: &Value, filter: &Filter, row: &Row, ctx: &EvalContext) -> bool {
    if !filter.is_active() {
        return true;
    }

    match filter {
        Filter::Text(f) => text::evaluate(value, f, ctx),
        Filter::Number(f) => number::evaluate(value, f),
        Filter::Date(f) => date::evaluate(value, f, ctx.today()),
        Filter::Boolean(f) => scalar::evaluate_boolean(value, f),
        Filter::Set(f) => scalar::evaluate_set(value, f),
        Filter::Custom(f) => match ctx.predicates.get(&f.name) {
            Some(predicate) => predicate(value, &f.filter, row),
            None => true,
        },
    }
}

/// Evaluates a column filter against a row.
///
/// A missing first condition passes; a missing second condition reduces to
/// the first. A second condition without a join operator is treated as AND
/// (models are validated before they reach evaluation).
pub fn evaluate_column_filter(
    row: &Row,
    column_id: &str,
    column_filter: &ColumnFilter,
    ctx: &EvalContext,
) -> bool {
    let Some(condition1) = &column_filter.condition1 else {
        return true;
    };

    let value = get_column_value(row, column_id);
    let first = evaluate(value, condition1, row, ctx);

    let Some(condition2) = &column_filter.condition2 else {
        return first;
    };

    match column_filter.operator.unwrap_or(JoinOperator::And) {
        JoinOperator::Or => first || evaluate(value, condition2, row, ctx),
        JoinOperator::And => first && evaluate(value, condition2, row, ctx),
    }
}

/// Free-text search across columns, independent of the filter model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickFilter {
    needle: String,
    columns: Vec<String>,
}

impl QuickFilter {
    /// Creates a quick filter; blank text yields `None`.
    ///
    /// When `columns` is empty every top-level field of the row is searched.
    pub fn new(text: &str, columns: Vec<String>) -> Option<Self> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        Some(Self { needle, columns })
    }

    /// The normalized (trimmed, lowercased) search text.
    pub fn text(&self) -> &str {
        &self.needle
    }

    /// The columns searched; empty means every field.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns true if any searched column contains the text (case-insensitive).
    pub fn matches(&self, row: &Row) -> bool {
        let contains = |value: &Value| as_text(value).to_lowercase().contains(&self.needle);

        if self.columns.is_empty() {
            return match row {
                Value::Object(map) => map.values().any(contains),
                other => contains(other),
            };
        }
        self.columns
            .iter()
            .any(|column| contains(get_column_value(row, column)))
    }
}

/// A compiled row predicate: every column filter ANDed, plus an optional quick filter.
#[derive(Debug, Clone)]
pub struct RowFilter {
    model: FilterModel,
    quick: Option<QuickFilter>,
    context: EvalContext,
}

impl RowFilter {
    /// Creates a row filter from a model.
    pub fn new(model: FilterModel, context: EvalContext) -> Self {
        Self {
            model,
            quick: None,
            context,
        }
    }

    /// Adds a quick filter that must also match.
    pub fn with_quick_filter(mut self, quick: Option<QuickFilter>) -> Self {
        self.quick = quick;
        self
    }

    /// The model being evaluated.
    pub fn model(&self) -> &FilterModel {
        &self.model
    }

    /// Returns true if the row satisfies every column filter and the quick filter.
    ///
    /// Stops at the first failing column.
    pub fn matches(&self, row: &Row) -> bool {
        self.model
            .iter()
            .all(|(column, filter)| evaluate_column_filter(row, column, filter, &self.context))
            && self.quick.as_ref().map_or(true, |q| q.matches(row))
    }

    /// Returns the indices of matching rows, in dataset order.
    pub fn filter_indices(&self, rows: &[Row]) -> Vec<usize> {
        rows.iter()
            .enumerate()
            .filter(|(_, row)| self.matches(row))
            .map(|(i, _)| i)
            .collect()
    }

    /// Parallel variant of [`filter_indices`](Self::filter_indices).
    ///
    /// Rows are split into chunks evaluated on the rayon pool; the result keeps
    /// dataset order.
    pub fn par_filter_indices(&self, rows: &[Row], chunk_size: usize) -> Vec<usize> {
        let chunk_size = chunk_size.max(1);
        rows.par_chunks(chunk_size)
            .enumerate()
            .map(|(chunk_index, chunk)| {
                let offset = chunk_index * chunk_size;
                chunk
                    .iter()
                    .enumerate()
                    .filter(|(_, row)| self.matches(row))
                    .map(|(i, _)| offset + i)
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
            .concat()
    }
}
