//! Preset output formatting.

use gridfilter::preset::Preset;
use owo_colors::OwoColorize;
use serde::Serialize;

use super::helpers::{truncate_id, truncate_str};

/// JSON output structure for presets list command.
#[derive(Serialize)]
pub struct PresetsListOutput<'a> {
    pub presets: &'a [Preset],
}

/// Formats presets as JSON.
pub fn format_presets_json(presets: &[Preset]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&PresetsListOutput { presets })
}

/// Formats presets as a table.
pub fn format_presets_table(presets: &[Preset], use_colors: bool) -> String {
    if presets.is_empty() {
        return "No presets found.\n".to_string();
    }

    let mut output = String::new();

    // Header
    let header = format!(
        "{:<10} {:<20} {:<8} {:<16} {}",
        "ID", "Name", "Columns", "Modified", "Tags"
    );
    if use_colors {
        output.push_str(&format!("{}\n", header.dimmed()));
    } else {
        output.push_str(&header);
        output.push('\n');
    }

    for preset in presets {
        let tags = preset
            .tags
            .iter()
            .map(|t| format!("#{t}"))
            .collect::<Vec<_>>()
            .join(" ");
        let tags = if use_colors {
            tags.cyan().to_string()
        } else {
            tags
        };
        let line = format!(
            "{:<10} {:<20} {:<8} {:<16} {}",
            truncate_id(&preset.id),
            truncate_str(&preset.name, 20),
            preset.filter_model.len(),
            preset.modified_at.format("%Y-%m-%d %H:%M").to_string(),
            tags
        );
        output.push_str(line.trim_end());
        output.push('\n');

        if let Some(description) = &preset.description {
            let description = format!("           {}", truncate_str(description, 60));
            if use_colors {
                output.push_str(&format!("{}\n", description.dimmed()));
            } else {
                output.push_str(&description);
                output.push('\n');
            }
        }
    }

    output
}

/// JSON output structure for a saved or deleted preset.
#[derive(Serialize)]
pub struct PresetChangeOutput<'a> {
    pub status: &'static str,
    pub id: &'a str,
    pub name: &'a str,
}

/// Formats a saved preset as JSON.
pub fn format_saved_preset(preset: &Preset) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&PresetChangeOutput {
        status: "saved",
        id: &preset.id,
        name: &preset.name,
    })
}

/// Formats a deleted preset as JSON.
///
/// `preset` is `None` when nothing matched; deleting is idempotent.
pub fn format_deleted_preset(
    identifier: &str,
    preset: Option<&Preset>,
) -> Result<String, serde_json::Error> {
    let output = match preset {
        Some(preset) => PresetChangeOutput {
            status: "deleted",
            id: &preset.id,
            name: &preset.name,
        },
        None => PresetChangeOutput {
            status: "not_found",
            id: "",
            name: identifier,
        },
    };
    serde_json::to_string_pretty(&output)
}
