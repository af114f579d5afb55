//! CLI argument parsing using clap derive macros.
//!
//! This module defines the command-line interface for the gf CLI.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// gf - filter JSON row data from the command line
#[derive(Parser, Debug)]
#[command(name = "gf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "GRIDFILTER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Filter rows of a JSON data file
    #[command(alias = "f")]
    Filter {
        /// JSON file with an array of row objects ("-" for stdin)
        data: PathBuf,

        /// Filter model file (a model or an exported envelope)
        #[arg(short, long, conflicts_with = "filter")]
        model: Option<PathBuf>,

        /// Inline filter model as JSON
        #[arg(short, long)]
        filter: Option<String>,

        /// Free-text search across visible columns
        #[arg(long)]
        quick: Option<String>,

        /// Columns to display (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Maximum rows to print
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Manage saved filter presets
    #[command(alias = "p")]
    Presets {
        #[command(subcommand)]
        command: PresetsCommands,
    },

    /// Manage the persistent result cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Preset subcommands
#[derive(Subcommand, Debug)]
pub enum PresetsCommands {
    /// List saved presets
    #[command(alias = "ls")]
    List,

    /// Save a filter model as a preset
    Save {
        /// Preset name
        name: String,

        /// Filter model file (a model or an exported envelope)
        #[arg(short, long)]
        model: PathBuf,

        /// Preset description
        #[arg(short, long)]
        description: Option<String>,

        /// Add a tag (repeatable)
        #[arg(short, long = "tag", action = clap::ArgAction::Append)]
        tags: Vec<String>,
    },

    /// Apply a preset to a data file
    Apply {
        /// Preset ID or name
        preset: String,

        /// JSON file with an array of row objects ("-" for stdin)
        data: PathBuf,

        /// Columns to display (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Maximum rows to print
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Delete a preset
    #[command(alias = "rm")]
    Delete {
        /// Preset ID or name
        preset: String,
    },
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Delete the persistent result store
    Clear,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Print config file path
    Path,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Shell types for completions
#[derive(ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["gf", "--verbose", "presets", "list"]);
        assert!(cli.verbose);
        assert!(!cli.quiet);
        assert!(!cli.json);

        let cli = Cli::parse_from(["gf", "--quiet", "--json", "presets", "list"]);
        assert!(!cli.verbose);
        assert!(cli.quiet);
        assert!(cli.json);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["gf", "-v", "-q", "presets", "list"]).is_err());
    }

    #[test]
    fn test_config_flag() {
        let cli = Cli::parse_from(["gf", "--config", "/tmp/gf.toml", "config", "path"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/gf.toml")));
    }

    #[test]
    fn test_filter_command() {
        let cli = Cli::parse_from([
            "gf",
            "filter",
            "rows.json",
            "--filter",
            r#"{"age":{}}"#,
            "--quick",
            "oslo",
            "--columns",
            "name,age",
            "--limit",
            "5",
        ]);
        match cli.command {
            Some(Commands::Filter {
                data,
                model,
                filter,
                quick,
                columns,
                limit,
            }) => {
                assert_eq!(data, PathBuf::from("rows.json"));
                assert!(model.is_none());
                assert_eq!(filter.as_deref(), Some(r#"{"age":{}}"#));
                assert_eq!(quick.as_deref(), Some("oslo"));
                assert_eq!(columns, vec!["name", "age"]);
                assert_eq!(limit, Some(5));
            }
            other => panic!("Expected Filter command, got {other:?}"),
        }
    }

    #[test]
    fn test_filter_model_conflicts_with_inline_filter() {
        let result = Cli::try_parse_from([
            "gf", "filter", "rows.json", "--model", "m.json", "--filter", "{}",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_filter_alias() {
        let cli = Cli::parse_from(["gf", "f", "rows.json"]);
        assert!(matches!(cli.command, Some(Commands::Filter { .. })));
    }

    #[test]
    fn test_presets_save_with_tags() {
        let cli = Cli::parse_from([
            "gf", "presets", "save", "adults", "--model", "m.json", "--tag", "a", "--tag", "b",
        ]);
        if let Some(Commands::Presets {
            command: PresetsCommands::Save { name, tags, .. },
        }) = cli.command
        {
            assert_eq!(name, "adults");
            assert_eq!(tags, vec!["a", "b"]);
        } else {
            panic!("Expected Presets Save command");
        }
    }

    #[test]
    fn test_presets_aliases() {
        let cli = Cli::parse_from(["gf", "p", "ls"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Presets {
                command: PresetsCommands::List
            })
        ));

        let cli = Cli::parse_from(["gf", "presets", "rm", "adults"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Presets {
                command: PresetsCommands::Delete { .. }
            })
        ));
    }

    #[test]
    fn test_config_init_force() {
        let cli = Cli::parse_from(["gf", "config", "init", "--force"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                command: Some(ConfigCommands::Init { force: true })
            })
        ));
    }

    #[test]
    fn test_completions() {
        let cli = Cli::parse_from(["gf", "completions", "zsh"]);
        if let Some(Commands::Completions { shell }) = cli.command {
            assert!(matches!(shell, Shell::Zsh));
        } else {
            panic!("Expected Completions command");
        }
    }
}
