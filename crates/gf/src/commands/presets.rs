//! Presets command implementation.
//!
//! Lists, saves, applies and deletes saved filter models. Presets live in the
//! file named by `[presets] path` in the config, or the default data dir.

use std::path::PathBuf;

use gridfilter::dataset::Dataset;
use gridfilter::engine::FilterEngine;

use super::data::{self, ModelInput};
use super::filter::{print_rows, RowsDisplay};
use super::{CommandContext, Result};
use crate::output::{
    format_deleted_preset, format_presets_json, format_presets_table, format_saved_preset,
};

/// Executes the presets list command.
///
/// # Errors
///
/// Returns an error if the preset file cannot be read.
pub fn execute_list(ctx: &CommandContext) -> Result<()> {
    let config = ctx.load_config()?;
    let store = ctx.open_presets(&config)?;

    if ctx.json_output {
        let output = format_presets_json(store.list())?;
        println!("{output}");
    } else if !ctx.quiet {
        let output = format_presets_table(store.list(), ctx.use_colors);
        print!("{output}");
    }
    Ok(())
}

// ============================================================================
// Presets Save Command
// ============================================================================

/// Options for the presets save command.
#[derive(Debug, Default)]
pub struct PresetSaveOptions {
    /// Preset name.
    pub name: String,
    /// Filter model file.
    pub model: PathBuf,
    /// Optional description.
    pub description: Option<String>,
    /// Tags.
    pub tags: Vec<String>,
}

/// Executes the presets save command.
///
/// The model file may be a bare filter model or an exported envelope.
///
/// # Errors
///
/// Returns an error if the model is invalid or the preset file cannot be written.
pub async fn execute_save(ctx: &CommandContext, opts: &PresetSaveOptions) -> Result<()> {
    let config = ctx.load_config()?;
    let store = ctx.open_presets(&config)?;
    let mut engine = FilterEngine::from_config(config)?.with_preset_store(store);

    match data::load_model(&opts.model)? {
        ModelInput::Model(model) => engine.set_filter_model(model).await?,
        ModelInput::Envelope(json) => engine.import_filter_model(&json).await?,
    };
    let preset = engine.save_preset(&opts.name, opts.description.clone(), opts.tags.clone())?;

    if ctx.json_output {
        let output = format_saved_preset(&preset)?;
        println!("{output}");
    } else if !ctx.quiet {
        println!("Saved preset '{}' ({})", preset.name, preset.id);
    }
    Ok(())
}

// ============================================================================
// Presets Apply Command
// ============================================================================

/// Options for the presets apply command.
#[derive(Debug, Default)]
pub struct PresetApplyOptions {
    /// Preset id or name.
    pub preset: String,
    /// Row data file.
    pub data: PathBuf,
    /// Columns to display.
    pub columns: Vec<String>,
    /// Maximum rows to print.
    pub limit: Option<usize>,
}

/// Executes the presets apply command.
///
/// # Errors
///
/// Returns an error if the preset does not exist or the data cannot be read.
pub async fn execute_apply(ctx: &CommandContext, opts: &PresetApplyOptions) -> Result<()> {
    let config = ctx.load_config()?;
    let store = ctx.open_presets(&config)?;
    let rows = data::load_rows(&opts.data)?;
    let total = rows.len();

    let mut engine = FilterEngine::from_config(config)?
        .with_preset_store(store)
        .with_data_source(Dataset::new(rows));
    let matched = engine.apply_preset(&opts.preset).await?;

    let display = RowsDisplay {
        columns: &opts.columns,
        limit: opts.limit,
    };
    print_rows(ctx, &matched, total, &display)
}

// ============================================================================
// Presets Delete Command
// ============================================================================

/// Executes the presets delete command. Deleting a missing preset succeeds.
///
/// # Errors
///
/// Returns an error if the preset file cannot be read or written.
pub fn execute_delete(ctx: &CommandContext, identifier: &str) -> Result<()> {
    let config = ctx.load_config()?;
    let mut store = ctx.open_presets(&config)?;
    let removed = store.delete(identifier)?;

    if ctx.json_output {
        let output = format_deleted_preset(identifier, removed.as_ref())?;
        println!("{output}");
    } else if !ctx.quiet {
        match removed {
            Some(preset) => println!("Deleted preset '{}'", preset.name),
            None => println!("No preset matching '{}'", identifier),
        }
    }
    Ok(())
}
