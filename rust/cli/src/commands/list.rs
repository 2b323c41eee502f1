use super::catalog_path;
use crate::error::CliError;
use introspect_engine::Catalog;
use std::io::Write;
use std::path::PathBuf;

/// Prints the catalog, one question per line, or as JSON.
pub fn handle_list_command(
    file: Option<PathBuf>,
    json: bool,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let path = catalog_path(file)?;
    let catalog = Catalog::load(&path)?;

    if json {
        let json_str =
            serde_json::to_string_pretty(&catalog).map_err(std::io::Error::other)?;
        writeln!(out, "{}", json_str)?;
        return Ok(());
    }

    for question in &catalog.questions {
        writeln!(
            out,
            "{}\ten: {}\tno: {}",
            question.id, question.question.en, question.question.no
        )?;
    }
    writeln!(out, "{} question(s) in {}", catalog.questions.len(), path.display())?;
    Ok(())
}
