use super::catalog_path;
use crate::error::CliError;
use introspect_engine::Catalog;
use std::io::Write;
use std::path::PathBuf;

/// Appends a question under a fresh id. A missing catalog file is created.
pub fn handle_add_question_command(
    en: Option<String>,
    no: Option<String>,
    file: Option<PathBuf>,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let en = en.unwrap_or_default();
    let no = no.unwrap_or_default();
    if en.trim().is_empty() && no.trim().is_empty() {
        return Err(CliError::InvalidInput(
            "at least one of --en or --no is required".into(),
        ));
    }

    let path = catalog_path(file)?;
    let mut catalog = if path.exists() {
        Catalog::load(&path)?
    } else {
        Catalog::default()
    };

    let id = catalog.add(en.trim(), no.trim())?.id.clone();
    catalog.save(&path)?;
    writeln!(
        out,
        "Added question {} to {} ({} total)",
        id,
        path.display(),
        catalog.questions.len()
    )?;
    Ok(())
}
