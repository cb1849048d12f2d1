//! The `dump` command: print instruction listings.

use super::{load, CliError};

/// Disassemble one template of `path`, or all of them in name order.
pub fn dump_file(path: &str, template: Option<&str>) -> Result<String, CliError> {
    let registry = load(path)?;
    let mut names: Vec<&str> = match template {
        Some(name) => {
            if !registry.contains(name) {
                return Err(CliError::UnknownTemplate {
                    path: path.to_string(),
                    name: name.to_string(),
                });
            }
            vec![name]
        }
        None => registry.names().collect(),
    };
    names.sort_unstable();

    let listings: Vec<String> = names
        .into_iter()
        .filter_map(|name| registry.resolve(name))
        .map(|t| t.disassemble())
        .collect();
    Ok(listings.join("\n"))
}
