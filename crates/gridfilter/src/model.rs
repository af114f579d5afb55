//! Declarative filter model.
//!
//! A [`FilterModel`] maps column identifiers to a [`ColumnFilter`], which holds
//! up to two [`Filter`] conditions joined by [`JoinOperator`]. Filters are a
//! closed, serde-tagged union over the supported data-type families, so a
//! model can be serialized for fingerprinting, history, presets and export.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{EngineError, Result};

/// Declares an operator enum with camelCase wire names.
///
/// A name this version does not recognise becomes `Unknown` holding the
/// original text, so it is written back unchanged on export.
macro_rules! operator_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum $name {
            $($variant,)+
            /// Unrecognised operator; passes every row.
            Unknown(String),
        }

        impl $name {
            /// The wire name of the operator.
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $wire,)+
                    $name::Unknown(raw) => raw,
                }
            }

            pub fn is_unknown(&self) -> bool {
                matches!(self, $name::Unknown(_))
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                match s {
                    $($wire => $name::$variant,)+
                    other => $name::Unknown(other.to_string()),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Ok($name::from(raw.as_str()))
            }
        }
    };
}

/// The full set of per-column filters.
///
/// Backed by a `BTreeMap` so that serialization is canonical: two models with
/// the same columns and filters always serialize to the same string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterModel(BTreeMap<String, ColumnFilter>);

impl FilterModel {
    /// Creates an empty model (no filtering).
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns true if no column filters are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of filtered columns.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the filter for a column, if any.
    pub fn get(&self, column_id: &str) -> Option<&ColumnFilter> {
        self.0.get(column_id)
    }

    /// Sets the filter for a column, replacing any previous one.
    pub fn insert(&mut self, column_id: impl Into<String>, filter: ColumnFilter) {
        self.0.insert(column_id.into(), filter);
    }

    /// Builder-style variant of [`insert`](Self::insert).
    pub fn with(mut self, column_id: impl Into<String>, filter: ColumnFilter) -> Self {
        self.insert(column_id, filter);
        self
    }

    /// Removes the filter for a column, returning it.
    pub fn remove(&mut self, column_id: &str) -> Option<ColumnFilter> {
        self.0.remove(column_id)
    }

    /// Iterates over `(column_id, filter)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ColumnFilter)> {
        self.0.iter()
    }

    /// Checks the structural invariants of every column filter.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MalformedFilter`] if a column has a second
    /// condition without a join operator, or a custom filter without a name.
    pub fn validate(&self) -> Result<()> {
        for (column, filter) in &self.0 {
            if filter.condition2.is_some() && filter.operator.is_none() {
                return Err(EngineError::malformed(
                    column,
                    "condition2 is set but no join operator was given",
                ));
            }
            for condition in filter.conditions() {
                if let Filter::Custom(custom) = condition {
                    if custom.name.trim().is_empty() {
                        return Err(EngineError::malformed(
                            column,
                            "custom filter has an empty predicate name",
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns true if any condition delegates to a custom predicate.
    pub fn has_custom_filters(&self) -> bool {
        self.0
            .values()
            .flat_map(ColumnFilter::conditions)
            .any(|c| matches!(c, Filter::Custom(_)))
    }

    /// Lists conditions whose operator is not recognised.
    ///
    /// Unknown operators pass every row at evaluation time; this gives callers
    /// a way to surface them instead.
    pub fn diagnostics(&self) -> Vec<FilterDiagnostic> {
        self.0
            .iter()
            .flat_map(|(column, filter)| {
                filter
                    .conditions()
                    .filter(|c| c.has_unknown_operator())
                    .map(move |c| FilterDiagnostic {
                        column: column.clone(),
                        message: format!("unknown {} operator, condition always passes", c.kind()),
                    })
            })
            .collect()
    }
}

impl FromIterator<(String, ColumnFilter)> for FilterModel {
    fn from_iter<I: IntoIterator<Item = (String, ColumnFilter)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A non-fatal problem found in a filter model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDiagnostic {
    /// The column the problem was found on.
    pub column: String,
    /// Human readable description.
    pub message: String,
}

/// Up to two conditions for a single column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnFilter {
    /// First condition. A column filter without one passes every row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition1: Option<Filter>,

    /// Optional second condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition2: Option<Filter>,

    /// How the two conditions combine. Required when `condition2` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<JoinOperator>,
}

impl ColumnFilter {
    /// Creates a column filter with a single condition.
    pub fn new(condition: Filter) -> Self {
        Self {
            condition1: Some(condition),
            condition2: None,
            operator: None,
        }
    }

    /// Adds a second condition joined with AND.
    pub fn and(self, condition: Filter) -> Self {
        self.join(JoinOperator::And, condition)
    }

    /// Adds a second condition joined with OR.
    pub fn or(self, condition: Filter) -> Self {
        self.join(JoinOperator::Or, condition)
    }

    fn join(mut self, operator: JoinOperator, condition: Filter) -> Self {
        self.condition2 = Some(condition);
        self.operator = Some(operator);
        self
    }

    /// Iterates over the conditions that are present.
    pub fn conditions(&self) -> impl Iterator<Item = &Filter> {
        self.condition1.iter().chain(self.condition2.iter())
    }
}

/// Join operator between the two conditions of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinOperator {
    /// Both conditions must hold.
    And,
    /// Either condition may hold.
    Or,
}

/// A single predicate, tagged by data-type family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Filter {
    /// String predicates.
    Text(TextFilter),
    /// Numeric predicates.
    Number(NumberFilter),
    /// Calendar predicates.
    Date(DateFilter),
    /// Boolean equality.
    Boolean(BooleanFilter),
    /// Set membership.
    Set(SetFilter),
    /// Caller-registered predicate.
    Custom(CustomFilter),
}

impl Filter {
    /// Creates an active text filter.
    pub fn text(operator: TextOperator, value: impl Into<String>) -> Self {
        Filter::Text(TextFilter {
            operator,
            filter: Some(value.into()),
            ..TextFilter::default()
        })
    }

    /// Creates an active number filter.
    pub fn number(operator: NumberOperator, value: f64) -> Self {
        Filter::Number(NumberFilter {
            operator,
            filter: Some(value),
            ..NumberFilter::default()
        })
    }

    /// Creates an active inclusive `inRange` number filter.
    pub fn number_range(from: f64, to: f64) -> Self {
        Filter::Number(NumberFilter {
            operator: NumberOperator::InRange,
            filter: Some(from),
            filter_to: Some(to),
            active: true,
        })
    }

    /// Creates an active date filter with a single operand.
    pub fn date(operator: DateOperator, value: impl Into<String>) -> Self {
        Filter::Date(DateFilter {
            operator,
            filter: Some(value.into()),
            ..DateFilter::default()
        })
    }

    /// Creates an active date filter that needs no operand (e.g. `isToday`).
    pub fn date_keyword(operator: DateOperator) -> Self {
        Filter::Date(DateFilter {
            operator,
            ..DateFilter::default()
        })
    }

    /// Creates an active set-membership filter.
    pub fn set(operator: SetOperator, values: Vec<Value>) -> Self {
        Filter::Set(SetFilter {
            operator,
            values,
            active: true,
        })
    }

    /// Creates an active boolean filter.
    pub fn boolean(operator: BooleanOperator, value: bool) -> Self {
        Filter::Boolean(BooleanFilter {
            operator,
            filter: Some(value),
            active: true,
        })
    }

    /// Creates an active custom filter referring to a registered predicate.
    pub fn custom(name: impl Into<String>, operand: Value) -> Self {
        Filter::Custom(CustomFilter {
            name: name.into(),
            filter: operand,
            active: true,
        })
    }

    /// Returns the family name used in the `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Filter::Text(_) => "text",
            Filter::Number(_) => "number",
            Filter::Date(_) => "date",
            Filter::Boolean(_) => "boolean",
            Filter::Set(_) => "set",
            Filter::Custom(_) => "custom",
        }
    }

    /// Returns false for filters that should pass every row.
    pub fn is_active(&self) -> bool {
        match self {
            Filter::Text(f) => f.active,
            Filter::Number(f) => f.active,
            Filter::Date(f) => f.active,
            Filter::Boolean(f) => f.active,
            Filter::Set(f) => f.active,
            Filter::Custom(f) => f.active,
        }
    }

    /// Returns true if the operator was not recognised when deserializing.
    pub fn has_unknown_operator(&self) -> bool {
        match self {
            Filter::Text(f) => f.operator.is_unknown(),
            Filter::Number(f) => f.operator.is_unknown(),
            Filter::Date(f) => f.operator.is_unknown(),
            Filter::Boolean(f) => f.operator.is_unknown(),
            Filter::Set(f) => f.operator.is_unknown(),
            Filter::Custom(_) => false,
        }
    }

    /// Returns a copy of this filter with its `active` flag changed.
    pub fn with_active(mut self, active: bool) -> Self {
        match &mut self {
            Filter::Text(f) => f.active = active,
            Filter::Number(f) => f.active = active,
            Filter::Date(f) => f.active = active,
            Filter::Boolean(f) => f.active = active,
            Filter::Set(f) => f.active = active,
            Filter::Custom(f) => f.active = active,
        }
        self
    }
}

fn default_active() -> bool {
    true
}

// ==================== Text ====================

/// String predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFilter {
    pub operator: TextOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Overrides the engine's default case sensitivity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,
    /// Overrides the engine's default fuzzy-match threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

impl Default for TextFilter {
    fn default() -> Self {
        Self {
            operator: TextOperator::Equals,
            filter: None,
            active: true,
            case_sensitive: None,
            threshold: None,
        }
    }
}

operator_enum! {
    TextOperator {
        Equals => "equals",
        NotEquals => "notEquals",
        Contains => "contains",
        NotContains => "notContains",
        StartsWith => "startsWith",
        EndsWith => "endsWith",
        IsEmpty => "isEmpty",
        IsNotEmpty => "isNotEmpty",
        Regex => "regex",
        FuzzyMatch => "fuzzyMatch",
    }
}

// ==================== Number ====================

/// Numeric predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberFilter {
    pub operator: NumberOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<f64>,
    /// Upper bound for range operators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_to: Option<f64>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl Default for NumberFilter {
    fn default() -> Self {
        Self {
            operator: NumberOperator::Equals,
            filter: None,
            filter_to: None,
            active: true,
        }
    }
}

operator_enum! {
    NumberOperator {
        Equals => "equals",
        NotEquals => "notEquals",
        LessThan => "lessThan",
        LessThanOrEqual => "lessThanOrEqual",
        GreaterThan => "greaterThan",
        GreaterThanOrEqual => "greaterThanOrEqual",
        InRange => "inRange",
        NotInRange => "notInRange",
        IsEmpty => "isEmpty",
        IsNotEmpty => "isNotEmpty",
        IsEven => "isEven",
        IsOdd => "isOdd",
        IsDivisibleBy => "isDivisibleBy",
        IsPrime => "isPrime",
        IsInteger => "isInteger",
        IsDecimal => "isDecimal",
    }
}

// ==================== Date ====================

/// Calendar predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateFilter {
    pub operator: DateOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Upper bound for `between`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_to: Option<String>,
    /// Window for `inRelativeRange`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative: Option<RelativeRange>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl Default for DateFilter {
    fn default() -> Self {
        Self {
            operator: DateOperator::Equals,
            filter: None,
            filter_to: None,
            relative: None,
            active: true,
        }
    }
}

impl DateFilter {
    /// Creates an active `inRelativeRange` filter reaching `amount` units back from today.
    pub fn relative(amount: i64, unit: TimeUnit) -> Self {
        Self {
            operator: DateOperator::InRelativeRange,
            relative: Some(RelativeRange { amount, unit }),
            ..Self::default()
        }
    }
}

operator_enum! {
    DateOperator {
        Equals => "equals",
        NotEquals => "notEquals",
        Before => "before",
        After => "after",
        Between => "between",
        IsEmpty => "isEmpty",
        IsNotEmpty => "isNotEmpty",
        IsToday => "isToday",
        IsYesterday => "isYesterday",
        IsTomorrow => "isTomorrow",
        IsThisWeek => "isThisWeek",
        IsLastWeek => "isLastWeek",
        IsNextWeek => "isNextWeek",
        IsThisMonth => "isThisMonth",
        IsLastMonth => "isLastMonth",
        IsNextMonth => "isNextMonth",
        IsThisYear => "isThisYear",
        IsLastYear => "isLastYear",
        IsNextYear => "isNextYear",
        IsWeekend => "isWeekend",
        IsWeekday => "isWeekday",
        InRelativeRange => "inRelativeRange",
    }
}

/// A signed offset measured backward from now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativeRange {
    pub amount: i64,
    pub unit: TimeUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Days,
    Weeks,
    Months,
    Years,
}

// ==================== Boolean ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanFilter {
    pub operator: BooleanOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<bool>,
    #[serde(default = "default_active")]
    pub active: bool,
}

operator_enum! {
    BooleanOperator {
        Equals => "equals",
        NotEquals => "notEquals",
    }
}

// ==================== Set ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetFilter {
    pub operator: SetOperator,
    #[serde(default)]
    pub values: Vec<Value>,
    #[serde(default = "default_active")]
    pub active: bool,
}

operator_enum! {
    SetOperator {
        In => "in",
        NotIn => "notIn",
    }
}

// ==================== Custom ====================

/// Delegates to a predicate registered under `name`.
///
/// The predicate receives the cell value, `filter` as its operand, and the
/// whole row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFilter {
    pub name: String,
    #[serde(default)]
    pub filter: Value,
    #[serde(default = "default_active")]
    pub active: bool,
}
