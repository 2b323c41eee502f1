//! Configuration command handler.
//!
//! Prints the catalog path the other commands would use and where it came
//! from:
//!
//! ```json
//! {
//!   "questions": {
//!     "value": "questions.json",
//!     "source": "default"
//!   }
//! }
//! ```

use crate::config;
use crate::error::CliError;
use std::io::Write;

pub fn handle_cfg_command(out: &mut dyn Write) -> Result<(), CliError> {
    let resolved = config::load_with_sources()
        .map_err(|e| CliError::Config(format!("Invalid configuration: {}", e)))?;

    let display = serde_json::json!({
        "questions": {
            "value": resolved.config.questions,
            "source": resolved.questions_source,
        }
    });
    let json_str = serde_json::to_string_pretty(&display).map_err(std::io::Error::other)?;
    writeln!(out, "{}", json_str)?;
    Ok(())
}
