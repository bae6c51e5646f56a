//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract — scripts rely on them.
//!
//! | Code | Meaning                                         |
//! |------|-------------------------------------------------|
//! | 0    | Success                                         |
//! | 1    | General error (unspecified)                     |
//! | 2    | Usage error (bad args, unknown row or column)   |
//! | 3    | IO error (missing file, unwritable output)      |
//! | 4    | Parse error (malformed descriptor or settings)  |
//! | 5    | Grid rejected the operation                     |

use tabgrid_config::ConfigError;
use tabgrid_engine::GridError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unknown row or column.
pub const EXIT_USAGE: u8 = 2;

/// File could not be read or written.
pub const EXIT_IO: u8 = 3;

/// Descriptor JSON or settings TOML could not be parsed.
pub const EXIT_PARSE: u8 = 4;

/// Duplicate id, bad position, or other rejected mutation.
pub const EXIT_GRID: u8 = 5;

/// Map a grid error to its exit code.
pub fn grid_exit_code(err: &GridError) -> u8 {
    match err {
        GridError::Json(_) | GridError::InvalidDescriptor(_) => EXIT_PARSE,
        GridError::DuplicateId { .. } | GridError::InvalidPosition(_) => EXIT_GRID,
        GridError::UseAfterDestroy => EXIT_ERROR,
    }
}

/// Map a config error to its exit code.
pub fn config_exit_code(err: &ConfigError) -> u8 {
    match err {
        ConfigError::Io(_) => EXIT_IO,
        ConfigError::Parse(_) | ConfigError::Validation(_) => EXIT_PARSE,
    }
}
