//! Shell completions command implementation.
//!
//! Generate shell completions for bash, zsh, fish, and powershell.

use std::io;

use clap::CommandFactory;
use clap_complete::{generate, Shell as ClapShell};

use crate::cli::{Cli, Shell};

impl From<&Shell> for ClapShell {
    fn from(shell: &Shell) -> Self {
        match shell {
            Shell::Bash => ClapShell::Bash,
            Shell::Zsh => ClapShell::Zsh,
            Shell::Fish => ClapShell::Fish,
            Shell::Powershell => ClapShell::PowerShell,
        }
    }
}

/// Generate shell completions for the given shell and write to `out`.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_completions(shell: &Shell, out: &mut dyn io::Write) -> io::Result<()> {
    let mut cmd = Cli::command();
    generate(ClapShell::from(shell), &mut cmd, "gf", out);
    Ok(())
}

/// Generate shell completions for the given shell and write to stdout.
///
/// # Errors
///
/// Returns an error if writing to stdout fails.
pub fn execute(shell: &Shell) -> io::Result<()> {
    write_completions(shell, &mut io::stdout())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completions_for(shell: Shell) -> String {
        let mut buf = Vec::new();
        write_completions(&shell, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_shell_mapping() {
        assert!(matches!(ClapShell::from(&Shell::Bash), ClapShell::Bash));
        assert!(matches!(ClapShell::from(&Shell::Powershell), ClapShell::PowerShell));
    }

    #[test]
    fn test_bash_completions_mention_subcommands() {
        let script = completions_for(Shell::Bash);
        assert!(script.contains("gf"));
        assert!(script.contains("presets"));
    }

    #[test]
    fn test_zsh_completions() {
        assert!(completions_for(Shell::Zsh).contains("#compdef gf"));
    }
}
