//! The `check` command: compile every template of a file.

use super::{load, CliError};

/// Compile every segment of `path`, returning how many there were.
pub fn check_file(path: &str) -> Result<usize, CliError> {
    let registry = load(path)?;
    tracing::debug!(path, templates = registry.len(), "check passed");
    Ok(registry.len())
}
