//! Content-derived cache keys.
//!
//! A key combines three parts, so that the same model over a different dataset
//! never shares an entry:
//!
//! ```text
//! <filter hash>:<dataset length>:<sample hash>
//! ```
//!
//! The filter hash covers the canonical serialization of the model plus the
//! quick filter. Models that reference custom predicates also fold in the
//! predicate registry generation, since the model names a predicate but not
//! its behavior. The sample hash covers the first `sample_size` rows only, so
//! two datasets of equal length that differ past the sample collide. Callers
//! guard against stale indices by discarding any index beyond the dataset.

use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;
use serde_json::Value;

use crate::filter::QuickFilter;
use crate::model::FilterModel;
use crate::value::Row;

/// Default number of leading rows folded into the dataset fingerprint.
pub const DEFAULT_SAMPLE_SIZE: usize = 10;

/// A cache key for one (model, quick filter, dataset) combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Computes the key.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be serialized.
    pub fn compute(
        model: &FilterModel,
        quick: Option<&QuickFilter>,
        predicate_generation: u64,
        rows: &[Row],
        sample_size: usize,
    ) -> serde_json::Result<Self> {
        let serialized = serde_json::to_string(model)?;

        let mut filter_hasher = FxHasher::default();
        serialized.hash(&mut filter_hasher);
        if model.has_custom_filters() {
            predicate_generation.hash(&mut filter_hasher);
        }
        match quick {
            Some(quick) => {
                1u8.hash(&mut filter_hasher);
                quick.text().hash(&mut filter_hasher);
                quick.columns().hash(&mut filter_hasher);
            }
            None => 0u8.hash(&mut filter_hasher),
        }

        Ok(Self(format!(
            "{:016x}:{}:{:016x}",
            filter_hasher.finish(),
            rows.len(),
            dataset_sample_hash(rows, sample_size)
        )))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

/// Hashes the first `sample_size` rows.
pub fn dataset_sample_hash(rows: &[Row], sample_size: usize) -> u64 {
    let mut hasher = FxHasher::default();
    for row in rows.iter().take(sample_size) {
        hash_value(row, &mut hasher);
    }
    hasher.finish()
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Null => state.write_u8(0),
        Value::Bool(b) => {
            state.write_u8(1);
            b.hash(state);
        }
        Value::Number(n) => {
            state.write_u8(2);
            n.to_string().hash(state);
        }
        Value::String(s) => {
            state.write_u8(3);
            s.hash(state);
        }
        Value::Array(items) => {
            state.write_u8(4);
            state.write_usize(items.len());
            for item in items {
                hash_value(item, state);
            }
        }
        Value::Object(map) => {
            state.write_u8(5);
            state.write_usize(map.len());
            for (key, item) in map {
                key.hash(state);
                hash_value(item, state);
            }
        }
    }
}
