//! Cache command implementation.
//!
//! Deletes the persistent result store. The in-memory cache only lives as
//! long as one command, so there is nothing else to clear.

use gridfilter::store::ResultStore;
use serde_json::json;

use super::{CommandContext, Result};

/// Executes the cache clear command.
///
/// Clears the configured store path even when the persistent cache is
/// disabled, so stale files from an earlier setup are removed.
///
/// # Errors
///
/// Returns an error if the store file exists but cannot be deleted.
pub async fn execute_clear(ctx: &CommandContext) -> Result<()> {
    let config = ctx.load_config()?;
    let path = match &config.persistent.path {
        Some(path) => path.clone(),
        None => ResultStore::default_path()?,
    };
    let store = ResultStore::with_path(&path);
    let existed = store.exists();
    store.clear().await?;

    if ctx.json_output {
        let output = json!({
            "status": "success",
            "path": path.display().to_string(),
            "removed": existed,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !ctx.quiet {
        if existed {
            println!("Cleared result cache at {}", path.display());
        } else {
            println!("Result cache is already empty");
        }
    }
    Ok(())
}
