use std::fmt;

use tabgrid_config::ConfigError;
use tabgrid_engine::GridError;

use crate::exit_codes::{config_exit_code, grid_exit_code, EXIT_IO, EXIT_USAGE};

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<GridError> for CliError {
    fn from(err: GridError) -> Self {
        let hint = match &err {
            GridError::DuplicateId { .. } => Some("omit --id to generate a fresh one".to_string()),
            GridError::InvalidPosition(_) => {
                Some("positions are first, last, an index, or up/down/+n/-n with --anchor".to_string())
            }
            _ => None,
        };
        Self { code: grid_exit_code(&err), message: err.to_string(), hint }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self { code: config_exit_code(&err), message: err.to_string(), hint: None }
    }
}
