//! Command handlers for the `introspect` catalog tool.
//!
//! Each handler takes its output streams as `&mut dyn Write` and returns
//! `Result<(), CliError>`; [`crate::run`] turns that into an exit code.

mod add_question;
mod cfg;
mod check;
mod list;

pub use add_question::handle_add_question_command;
pub use cfg::handle_cfg_command;
pub use check::handle_check_command;
pub use list::handle_list_command;

use crate::config;
use crate::error::CliError;
use std::path::PathBuf;

/// Resolves the catalog a command works on.
pub(crate) fn catalog_path(flag: Option<PathBuf>) -> Result<PathBuf, CliError> {
    let resolved = config::load_with_sources()
        .map_err(|e| CliError::Config(format!("Invalid configuration: {}", e)))?;
    Ok(resolved.catalog_path(flag).0)
}
