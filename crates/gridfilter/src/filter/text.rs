//! Text predicates.

use std::sync::RwLock;

use regex::{Regex, RegexBuilder};
use rustc_hash::FxHashMap;
use serde_json::Value;
use strsim::levenshtein;

use super::EvalContext;
use crate::model::{TextFilter, TextOperator};
use crate::value::as_text;

pub(super) fn evaluate(value: &Value, filter: &TextFilter, ctx: &EvalContext) -> bool {
    let case_sensitive = filter.case_sensitive.unwrap_or(ctx.case_sensitive());
    let raw = as_text(value);
    let cell = normalize(&raw, case_sensitive);

    match &filter.operator {
        TextOperator::IsEmpty => cell.is_empty(),
        TextOperator::IsNotEmpty => !cell.is_empty(),
        TextOperator::Unknown(_) => true,
        operator => {
            let Some(operand) = filter.filter.as_deref() else {
                return true;
            };
            match operator {
                TextOperator::Regex => ctx
                    .regexes()
                    .get_or_compile(operand, case_sensitive)
                    .is_some_and(|re| re.is_match(raw.trim())),
                TextOperator::FuzzyMatch => {
                    let threshold = filter.threshold.unwrap_or(ctx.fuzzy_threshold());
                    similarity(&cell, &normalize(operand, case_sensitive)) >= threshold
                }
                _ => compare(operator, &cell, &normalize(operand, case_sensitive)),
            }
        }
    }
}

fn compare(operator: &TextOperator, cell: &str, operand: &str) -> bool {
    match operator {
        TextOperator::Equals => cell == operand,
        TextOperator::NotEquals => cell != operand,
        TextOperator::Contains => cell.contains(operand),
        TextOperator::NotContains => !cell.contains(operand),
        TextOperator::StartsWith => cell.starts_with(operand),
        TextOperator::EndsWith => cell.ends_with(operand),
        _ => true,
    }
}

fn normalize(s: &str, case_sensitive: bool) -> String {
    let trimmed = s.trim();
    if case_sensitive {
        trimmed.to_string()
    } else {
        trimmed.to_lowercase()
    }
}

/// Patterns compiled during one evaluation pass.
///
/// Keyed by pattern, separately for case-sensitive and case-insensitive
/// matching. An invalid pattern is cached as `None` and matches nothing.
#[derive(Debug, Default)]
pub struct RegexCache {
    compiled: [RwLock<FxHashMap<String, Option<Regex>>>; 2],
}

impl RegexCache {
    pub fn get_or_compile(&self, pattern: &str, case_sensitive: bool) -> Option<Regex> {
        let slot = &self.compiled[usize::from(case_sensitive)];
        if let Ok(cache) = slot.read() {
            if let Some(compiled) = cache.get(pattern) {
                return compiled.clone();
            }
        }

        let compiled = RegexBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .build()
            .ok();
        if let Ok(mut cache) = slot.write() {
            cache.insert(pattern.to_string(), compiled.clone());
        }
        compiled
    }

    /// Number of distinct patterns compiled so far.
    pub fn len(&self) -> usize {
        self.compiled
            .iter()
            .filter_map(|slot| slot.read().ok().map(|cache| cache.len()))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Normalized Levenshtein similarity: `1 - distance / max(len)` over chars.
///
/// Two empty strings are identical (similarity 1).
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}
