//! Boolean and set-membership predicates.

use serde_json::Value;

use crate::model::{BooleanFilter, BooleanOperator, SetFilter, SetOperator};
use crate::value::as_bool;

pub(super) fn evaluate_boolean(value: &Value, filter: &BooleanFilter) -> bool {
    let Some(expected) = filter.filter else {
        return true;
    };

    match &filter.operator {
        BooleanOperator::Equals => as_bool(value) == expected,
        BooleanOperator::NotEquals => as_bool(value) != expected,
        BooleanOperator::Unknown(_) => true,
    }
}

/// Membership uses exact JSON equality: `1` and `"1"` are different values.
pub(super) fn evaluate_set(value: &Value, filter: &SetFilter) -> bool {
    match &filter.operator {
        SetOperator::In => filter.values.contains(value),
        SetOperator::NotIn => !filter.values.contains(value),
        SetOperator::Unknown(_) => true,
    }
}
