//! Command dispatch module for routing CLI commands to their handlers.

use crate::cli::{CacheCommands, Cli, Commands, ConfigCommands, PresetsCommands};
use crate::commands::{self, CommandContext, Result};

/// Routes the parsed command line to its handler.
pub async fn dispatch(cli: &Cli, ctx: &CommandContext) -> Result<()> {
    match &cli.command {
        Some(Commands::Filter {
            data,
            model,
            filter,
            quick,
            columns,
            limit,
        }) => {
            let opts = commands::filter::FilterOptions {
                data: data.clone(),
                model: model.clone(),
                filter: filter.clone(),
                quick: quick.clone(),
                columns: columns.clone(),
                limit: *limit,
            };
            commands::filter::execute(ctx, &opts).await
        }
        Some(Commands::Presets { command }) => dispatch_presets(ctx, command).await,
        Some(Commands::Cache { command }) => match command {
            CacheCommands::Clear => commands::cache::execute_clear(ctx).await,
        },
        Some(Commands::Config { command }) => dispatch_config(ctx, command),
        Some(Commands::Completions { shell }) => Ok(commands::completions::execute(shell)?),
        None => {
            if !ctx.quiet {
                println!("gf - filter JSON row data");
                println!("Use --help for usage information");
            }
            Ok(())
        }
    }
}

/// Dispatch presets subcommands.
async fn dispatch_presets(ctx: &CommandContext, command: &PresetsCommands) -> Result<()> {
    match command {
        PresetsCommands::List => commands::presets::execute_list(ctx),
        PresetsCommands::Save {
            name,
            model,
            description,
            tags,
        } => {
            let opts = commands::presets::PresetSaveOptions {
                name: name.clone(),
                model: model.clone(),
                description: description.clone(),
                tags: tags.clone(),
            };
            commands::presets::execute_save(ctx, &opts).await
        }
        PresetsCommands::Apply {
            preset,
            data,
            columns,
            limit,
        } => {
            let opts = commands::presets::PresetApplyOptions {
                preset: preset.clone(),
                data: data.clone(),
                columns: columns.clone(),
                limit: *limit,
            };
            commands::presets::execute_apply(ctx, &opts).await
        }
        PresetsCommands::Delete { preset } => commands::presets::execute_delete(ctx, preset),
    }
}

/// Dispatch config subcommands.
fn dispatch_config(ctx: &CommandContext, command: &Option<ConfigCommands>) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::execute_show(ctx),
        Some(ConfigCommands::Path) => commands::config::execute_path(ctx),
        Some(ConfigCommands::Init { force }) => commands::config::execute_init(ctx, *force),
    }
}
