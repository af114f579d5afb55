//! Config command implementation.
//!
//! Shows and initializes the engine configuration.
//! Config file is located at ~/.config/gridfilter/config.toml.

use std::fs;

use gridfilter::config::{ConfigError, DEFAULT_CONFIG};
use owo_colors::OwoColorize;
use serde_json::json;

use super::{CommandContext, CommandError, Result};

/// Executes the config show command.
///
/// Prints the effective configuration: file values over defaults.
pub fn execute_show(ctx: &CommandContext) -> Result<()> {
    let path = ctx.config_file()?;
    let config = ctx.load_config()?;

    if ctx.json_output {
        let output = json!({
            "path": path.display().to_string(),
            "exists": path.exists(),
            "config": config,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !ctx.quiet {
        let header = "Configuration";
        if ctx.use_colors {
            println!("{}\n", header.green().bold());
        } else {
            println!("{}\n", header);
        }

        println!("File: {}", path.display());
        println!("Exists: {}\n", path.exists());
        if !path.exists() {
            println!("(No config file exists. Run 'gf config init' to create one.)\n");
        }

        let content = toml::to_string_pretty(&config).map_err(ConfigError::from)?;
        print!("{content}");
    }

    Ok(())
}

/// Executes the config path command.
pub fn execute_path(ctx: &CommandContext) -> Result<()> {
    let path = ctx.config_file()?;

    if ctx.json_output {
        let output = json!({
            "path": path.display().to_string(),
            "exists": path.exists(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", path.display());
    }

    Ok(())
}

/// Executes the config init command.
///
/// # Errors
///
/// Returns an error if the file exists and `force` is not set, or it cannot be written.
pub fn execute_init(ctx: &CommandContext, force: bool) -> Result<()> {
    let path = ctx.config_file()?;

    if path.exists() && !force {
        return Err(CommandError::Input(format!(
            "config file already exists at {} (use --force to overwrite)",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(&path, DEFAULT_CONFIG).map_err(|source| ConfigError::Write {
        path: path.clone(),
        source,
    })?;

    if ctx.json_output {
        let output = json!({
            "status": "success",
            "path": path.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !ctx.quiet {
        println!("Created default config at: {}", path.display());
    }

    Ok(())
}
