use super::catalog_path;
use crate::error::CliError;
use crate::ui;
use introspect_engine::Catalog;
use std::io::Write;
use std::path::PathBuf;

/// Validates the catalog. Every problem is reported on `err`; any problem
/// makes the command fail.
pub fn handle_check_command(
    file: Option<PathBuf>,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<(), CliError> {
    let path = catalog_path(file)?;
    let catalog = Catalog::load(&path)?;

    let problems = catalog.problems();
    if !problems.is_empty() {
        for problem in &problems {
            ui::display_warning(err, problem)?;
        }
        return Err(CliError::Problems(problems.len()));
    }

    writeln!(
        out,
        "OK: {} question(s) in {}",
        catalog.questions.len(),
        path.display()
    )?;
    Ok(())
}
