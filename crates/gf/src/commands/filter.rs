//! Filter command implementation.
//!
//! Loads a JSON data file, applies a filter model and/or quick filter, and
//! prints the matching rows.

use std::path::PathBuf;

use gridfilter::dataset::Dataset;
use gridfilter::engine::FilterEngine;
use gridfilter::value::Row;

use super::data::{self, ModelInput};
use super::{CommandContext, Result};
use crate::output::{format_rows_json, format_rows_table};

/// Options for the filter command.
#[derive(Debug, Default)]
pub struct FilterOptions {
    /// Row data file.
    pub data: PathBuf,
    /// Filter model file.
    pub model: Option<PathBuf>,
    /// Inline filter model JSON.
    pub filter: Option<String>,
    /// Quick filter text.
    pub quick: Option<String>,
    /// Columns to display.
    pub columns: Vec<String>,
    /// Maximum rows to print.
    pub limit: Option<usize>,
}

/// Options shared by commands that print rows.
#[derive(Debug, Default)]
pub struct RowsDisplay<'a> {
    pub columns: &'a [String],
    pub limit: Option<usize>,
}

/// Executes the filter command.
///
/// # Errors
///
/// Returns an error if the data or model cannot be read, or filtering fails.
pub async fn execute(ctx: &CommandContext, opts: &FilterOptions) -> Result<()> {
    let config = ctx.load_config()?;
    let rows = data::load_rows(&opts.data)?;
    let total = rows.len();
    tracing::debug!(rows = total, path = %opts.data.display(), "loaded data");

    let mut engine = FilterEngine::from_config(config)?.with_data_source(Dataset::new(rows));

    let model = match (&opts.model, &opts.filter) {
        (Some(path), _) => Some(data::load_model(path)?),
        (None, Some(inline)) => Some(data::parse_model(inline)?),
        (None, None) => None,
    };

    let mut matched = match model {
        Some(ModelInput::Model(model)) => engine.set_filter_model(model).await?,
        Some(ModelInput::Envelope(json)) => engine.import_filter_model(&json).await?,
        None => engine.current_rows().await?,
    };
    if let Some(text) = &opts.quick {
        matched = engine.set_quick_filter(text).await?;
    }

    if ctx.verbose {
        if let Some(last) = engine.performance_metrics().last {
            eprintln!(
                "Filtered {} rows in {:.2}ms ({:?})",
                last.row_count, last.duration_ms, last.source
            );
        }
    }

    let display = RowsDisplay {
        columns: &opts.columns,
        limit: opts.limit,
    };
    print_rows(ctx, &matched, total, &display)
}

/// Prints rows as JSON or a table, honoring the display limit.
pub fn print_rows(
    ctx: &CommandContext,
    matched: &[Row],
    total: usize,
    display: &RowsDisplay<'_>,
) -> Result<()> {
    let shown = match display.limit {
        Some(limit) => &matched[..limit.min(matched.len())],
        None => matched,
    };

    if ctx.json_output {
        let output = format_rows_json(shown, matched.len(), total)?;
        println!("{output}");
    } else if !ctx.quiet {
        let output = format_rows_table(shown, display.columns, matched.len(), total, ctx.use_colors);
        print!("{output}");
    }
    Ok(())
}
