//! Output formatting utilities for the gf CLI.
//!
//! This module provides functions for formatting data as tables or JSON:
//!
//! - [`rows`] - Filtered row output
//! - [`presets`] - Preset output formatting (list, save, delete)
//! - [`helpers`] - Common formatting utilities (truncation, cell text)

pub mod helpers;
mod presets;
mod rows;

// Rows
pub use rows::{format_rows_json, format_rows_table};

// Presets
pub use presets::{
    format_deleted_preset, format_presets_json, format_presets_table, format_saved_preset,
};
