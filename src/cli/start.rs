use super::{commands, dispatch};
use anyhow::Result;

/// Main orchestrator: parse CLI arguments, dispatch them into a typed
/// action, and execute it.
///
/// # Errors
///
/// Returns an error if any step in the flow fails
pub async fn start() -> Result<()> {
    let matches = commands::new().get_matches();

    let action = dispatch::dispatch(&matches)?;

    action.execute().await?;

    Ok(())
}
