//! Calendar predicates.
//!
//! All comparisons are at day granularity in local time. Weeks start on Sunday.

use chrono::{Datelike, Days, Duration, Months, NaiveDate, Weekday};
use serde_json::Value;

use crate::model::{DateFilter, DateOperator, RelativeRange, TimeUnit};
use crate::value::{as_date, parse_date};

pub(super) fn evaluate(value: &Value, filter: &DateFilter, today: NaiveDate) -> bool {
    let date = as_date(value);

    match &filter.operator {
        DateOperator::IsEmpty => date.is_none(),
        DateOperator::IsNotEmpty => date.is_some(),
        DateOperator::Unknown(_) => true,
        operator => match date {
            Some(date) => matches(operator, date, filter, today),
            None => false,
        },
    }
}

fn matches(operator: &DateOperator, date: NaiveDate, filter: &DateFilter, today: NaiveDate) -> bool {
    match operator {
        DateOperator::Equals => with_operand(filter.filter.as_deref(), |d| date == d),
        DateOperator::NotEquals => with_operand(filter.filter.as_deref(), |d| date != d),
        DateOperator::Before => with_operand(filter.filter.as_deref(), |d| date < d),
        DateOperator::After => with_operand(filter.filter.as_deref(), |d| date > d),
        DateOperator::Between => {
            let (Some(from), Some(to)) = (filter.filter.as_deref(), filter.filter_to.as_deref())
            else {
                return true;
            };
            match (parse_date(from), parse_date(to)) {
                (Some(from), Some(to)) => from <= date && date <= to,
                _ => false,
            }
        }

        DateOperator::IsToday => date == today,
        DateOperator::IsYesterday => Some(date) == today.pred_opt(),
        DateOperator::IsTomorrow => Some(date) == today.succ_opt(),

        DateOperator::IsThisWeek => same_week(date, today, 0),
        DateOperator::IsLastWeek => same_week(date, today, -1),
        DateOperator::IsNextWeek => same_week(date, today, 1),

        DateOperator::IsThisMonth => same_month(date, Some(today)),
        DateOperator::IsLastMonth => same_month(date, today.checked_sub_months(Months::new(1))),
        DateOperator::IsNextMonth => same_month(date, today.checked_add_months(Months::new(1))),

        DateOperator::IsThisYear => date.year() == today.year(),
        DateOperator::IsLastYear => date.year() == today.year() - 1,
        DateOperator::IsNextYear => date.year() == today.year() + 1,

        DateOperator::IsWeekend => matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
        DateOperator::IsWeekday => !matches!(date.weekday(), Weekday::Sat | Weekday::Sun),

        DateOperator::InRelativeRange => match filter.relative {
            Some(range) => in_relative_range(date, range, today),
            None => true,
        },

        DateOperator::IsEmpty | DateOperator::IsNotEmpty | DateOperator::Unknown(_) => true,
    }
}

/// Missing operand passes; an unparsable one matches nothing.
fn with_operand(operand: Option<&str>, test: impl Fn(NaiveDate) -> bool) -> bool {
    match operand {
        None => true,
        Some(s) => parse_date(s).is_some_and(test),
    }
}

/// The Sunday on or before `date`; `None` at the edge of the calendar.
fn week_start(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_sunday())))
}

fn same_week(date: NaiveDate, today: NaiveDate, offset_weeks: i64) -> bool {
    let start = week_start(today)
        .and_then(|start| start.checked_add_signed(Duration::try_weeks(offset_weeks)?));
    match (week_start(date), start) {
        (Some(week), Some(start)) => week == start,
        _ => false,
    }
}

fn same_month(date: NaiveDate, reference: Option<NaiveDate>) -> bool {
    reference.is_some_and(|r| date.year() == r.year() && date.month() == r.month())
}

/// Shifts `today` back by `amount` units; negative amounts shift forward.
fn shift_back(today: NaiveDate, range: RelativeRange) -> Option<NaiveDate> {
    let months = |n: i64| -> Option<NaiveDate> {
        let magnitude = Months::new(u32::try_from(n.unsigned_abs()).ok()?);
        if n >= 0 {
            today.checked_sub_months(magnitude)
        } else {
            today.checked_add_months(magnitude)
        }
    };

    match range.unit {
        TimeUnit::Days => today.checked_sub_signed(Duration::try_days(range.amount)?),
        TimeUnit::Weeks => today.checked_sub_signed(Duration::try_weeks(range.amount)?),
        TimeUnit::Months => months(range.amount),
        TimeUnit::Years => months(range.amount.checked_mul(12)?),
    }
}

fn in_relative_range(date: NaiveDate, range: RelativeRange, today: NaiveDate) -> bool {
    let Some(edge) = shift_back(today, range) else {
        return false;
    };
    let (from, to) = if edge <= today { (edge, today) } else { (today, edge) };
    from <= date && date <= to
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_start_is_sunday() {
        // 2025-06-18 is a Wednesday
        assert_eq!(week_start(ymd(2025, 6, 18)), Some(ymd(2025, 6, 15)));
        assert_eq!(week_start(ymd(2025, 6, 15)), Some(ymd(2025, 6, 15)));
        assert_eq!(week_start(ymd(2025, 6, 21)), Some(ymd(2025, 6, 15)));
    }

    #[test]
    fn test_same_week_at_calendar_edges() {
        let today = ymd(2025, 6, 18);
        assert!(!same_week(NaiveDate::MIN, today, 0));
        assert!(!same_week(NaiveDate::MIN, NaiveDate::MIN, -1));
        assert!(!same_week(today, NaiveDate::MAX, 1));
        assert!(!same_week(NaiveDate::MAX, NaiveDate::MAX, 1));
    }

    #[test]
    fn test_shift_back_units() {
        let today = ymd(2025, 3, 31);
        let back = |amount, unit| shift_back(today, RelativeRange { amount, unit });

        assert_eq!(back(10, TimeUnit::Days), Some(ymd(2025, 3, 21)));
        assert_eq!(back(2, TimeUnit::Weeks), Some(ymd(2025, 3, 17)));
        assert_eq!(back(1, TimeUnit::Months), Some(ymd(2025, 2, 28)));
        assert_eq!(back(1, TimeUnit::Years), Some(ymd(2024, 3, 31)));
        assert_eq!(back(-1, TimeUnit::Days), Some(ymd(2025, 4, 1)));
    }

    #[test]
    fn test_in_relative_range_forward() {
        let today = ymd(2025, 1, 10);
        let next_week = RelativeRange {
            amount: -7,
            unit: TimeUnit::Days,
        };

        assert!(in_relative_range(ymd(2025, 1, 10), next_week, today));
        assert!(in_relative_range(ymd(2025, 1, 17), next_week, today));
        assert!(!in_relative_range(ymd(2025, 1, 18), next_week, today));
        assert!(!in_relative_range(ymd(2025, 1, 9), next_week, today));
    }
}
