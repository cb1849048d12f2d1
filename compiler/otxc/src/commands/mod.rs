//! Command implementations for the `otx` binary.
//!
//! Each command returns its result instead of exiting, so the driver decides
//! how to report and the integration tests can call them directly.

mod check;
mod dump;
mod render;

pub use check::check_file;
pub use dump::dump_file;
pub use render::{parse_binding, parse_param_value, render_file};

use std::io;
use std::sync::Arc;

use otx_eval::{ContextError, RunError};
use otx_ir::TemplateRegistry;
use otx_parse::{read_templates, MalformedTemplate, ReaderOptions};

use crate::report::render_malformed;

/// Why a command failed.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("cannot find file '{path}'")]
    NotFound { path: String },
    #[error("permission denied reading '{path}'")]
    PermissionDenied { path: String },
    #[error("'{path}' contains invalid UTF-8 data")]
    InvalidUtf8 { path: String },
    #[error("error reading '{path}': {source}")]
    Read { path: String, source: io::Error },
    #[error("{path}: {error}")]
    Malformed {
        path: String,
        text: String,
        error: MalformedTemplate,
    },
    #[error("'{path}' has no template named `{name}`")]
    UnknownTemplate { path: String, name: String },
    #[error("invalid parameter `{0}`: expected name=value")]
    InvalidBinding(String),
    #[error(transparent)]
    Bind(#[from] ContextError),
    #[error(transparent)]
    Run(#[from] RunError),
    #[error("error writing output: {0}")]
    Write(io::Error),
}

impl CliError {
    /// Text for stderr. Compile errors get a source snippet.
    pub fn report(&self, color: bool) -> String {
        match self {
            CliError::Malformed { path, text, error } => render_malformed(path, text, error, color),
            other => format!("error: {other}\n"),
        }
    }
}

pub(crate) fn read_file(path: &str) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| {
        let path = path.to_string();
        match e.kind() {
            io::ErrorKind::NotFound => CliError::NotFound { path },
            io::ErrorKind::PermissionDenied => CliError::PermissionDenied { path },
            io::ErrorKind::InvalidData => CliError::InvalidUtf8 { path },
            _ => CliError::Read { path, source: e },
        }
    })
}

/// Read and compile every template segment of `path`.
///
/// The registry must outlive any render: templates only hold weak references
/// to it.
pub(crate) fn load(path: &str) -> Result<Arc<TemplateRegistry>, CliError> {
    let text = read_file(path)?;
    read_templates(path, &text, &ReaderOptions::new()).map_err(|error| CliError::Malformed {
        path: path.to_string(),
        text,
        error,
    })
}

#[cfg(test)]
mod tests;
