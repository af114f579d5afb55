//! Numeric predicates.

use serde_json::Value;

use crate::model::{NumberFilter, NumberOperator};
use crate::value::as_number;

pub(super) fn evaluate(value: &Value, filter: &NumberFilter) -> bool {
    let number = as_number(value);

    match &filter.operator {
        // Non-numeric cells count as empty.
        NumberOperator::IsEmpty => number.is_none(),
        NumberOperator::IsNotEmpty => number.is_some(),
        NumberOperator::Unknown(_) => true,
        operator => match number {
            Some(v) => matches(operator, v, filter),
            None => false,
        },
    }
}

fn matches(operator: &NumberOperator, v: f64, filter: &NumberFilter) -> bool {
    match operator {
        NumberOperator::IsEven => v % 2.0 == 0.0,
        NumberOperator::IsOdd => v.abs() % 2.0 == 1.0,
        NumberOperator::IsPrime => is_prime(v),
        NumberOperator::IsInteger => v.fract() == 0.0,
        NumberOperator::IsDecimal => v.fract() != 0.0,
        NumberOperator::InRange | NumberOperator::NotInRange => {
            let (Some(from), Some(to)) = (filter.filter, filter.filter_to) else {
                return true;
            };
            let inside = from <= v && v <= to;
            if *operator == NumberOperator::InRange {
                inside
            } else {
                !inside
            }
        }
        _ => {
            let Some(operand) = filter.filter else {
                return true;
            };
            match operator {
                NumberOperator::Equals => v == operand,
                NumberOperator::NotEquals => v != operand,
                NumberOperator::LessThan => v < operand,
                NumberOperator::LessThanOrEqual => v <= operand,
                NumberOperator::GreaterThan => v > operand,
                NumberOperator::GreaterThanOrEqual => v >= operand,
                NumberOperator::IsDivisibleBy => operand != 0.0 && v % operand == 0.0,
                _ => true,
            }
        }
    }
}

/// Trial division up to the square root.
fn is_prime(v: f64) -> bool {
    if v.fract() != 0.0 || v < 2.0 || v > u64::MAX as f64 {
        return false;
    }
    let n = v as u64;
    if n < 4 {
        return true;
    }
    if n % 2 == 0 {
        return false;
    }
    let mut divisor = 3u64;
    while divisor.saturating_mul(divisor) <= n {
        if n % divisor == 0 {
            return false;
        }
        divisor += 2;
    }
    true
}
