//! Filter evaluation and result caching for in-memory tabular data.
//!
//! Rows are JSON objects. A [`FilterModel`](model::FilterModel) maps column ids
//! to up to two typed conditions (text, number, date, boolean, set or a
//! registered custom predicate); a row passes when every column filter passes.
//!
//! The [`FilterEngine`](engine::FilterEngine) owns the current model and
//! layers on top of evaluation:
//!
//! - an in-memory result cache and an optional persistent result store,
//!   both keyed by a fingerprint of the model and the dataset
//! - a parallel worker for large datasets, with a per-request timeout
//! - bounded undo/redo history
//! - named presets and JSON import/export
//! - performance samples and change events
//!
//! # Quick Start
//!
//! For convenient imports, use the prelude:
//!
//! ```
//! use gridfilter::prelude::*;
//! ```

pub mod cache;
pub mod config;
pub mod dataset;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod events;
pub mod filter;
pub mod fingerprint;
pub mod history;
pub mod metrics;
pub mod model;
pub mod prelude;
pub mod preset;
pub mod store;
pub mod value;

pub use error::{EngineError, Result};
