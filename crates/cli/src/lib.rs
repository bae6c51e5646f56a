// tabgrid CLI library: the command logic behind `tgrid`, kept free of IO so
// it can be tested directly.

pub mod commands;
pub mod error;
pub mod exit_codes;
pub mod render;

pub use error::CliError;
