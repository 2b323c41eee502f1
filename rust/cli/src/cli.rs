use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "introspect",
    version,
    about = "Manage the Introspect question catalog"
)]
pub struct IntrospectCli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Append a question with a freshly generated id
    AddQuestion {
        /// English text
        #[arg(long)]
        en: Option<String>,
        /// Norwegian text
        #[arg(long)]
        no: Option<String>,
        /// Catalog file (defaults to the configured catalog)
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print every question in the catalog
    List {
        #[arg(long)]
        file: Option<PathBuf>,
        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate the catalog: unique ids and non-empty texts
    Check {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Show which catalog path is configured and where it came from
    Cfg,
}
