//! Prelude module for convenient imports.
//!
//! Re-exports the types most hosts need to build an engine, describe filters
//! and react to changes.
//!
//! # Example
//!
//! ```
//! use gridfilter::prelude::*;
//!
//! let model = FilterModel::new().with(
//!     "age",
//!     ColumnFilter::new(Filter::number(NumberOperator::GreaterThan, 18.0)),
//! );
//! assert_eq!(model.len(), 1);
//! ```

// Engine
pub use crate::config::EngineConfig;
pub use crate::engine::{ExportEnvelope, FilterEngine, SharedEngine};

// Error types
pub use crate::error::{EngineError, Result, WorkerError};

// Data
pub use crate::dataset::{ColumnDef, DataSource, Dataset};
pub use crate::value::Row;

// Filter model
pub use crate::model::{
    BooleanOperator, ColumnFilter, DateFilter, DateOperator, Filter, FilterModel, JoinOperator,
    NumberOperator, SetOperator, TextFilter, TextOperator, TimeUnit,
};

// Events, presets and metrics
pub use crate::events::{EventSource, FilterEvent};
pub use crate::metrics::{PerformanceMetrics, ResultSource};
pub use crate::preset::{Preset, PresetStore, PresetUpdate};
pub use crate::store::ResultStore;
