//! Standalone game server binary
//!
//! Usage: cargo run -p introspect_web --bin introspect-server -- --questions questions.json

use clap::Parser;
use introspect_web::logging::LogFormat;
use introspect_web::settings::{self, SettingsOverrides};
use introspect_web::WebServer;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "introspect-server", about = "Introspect party game server")]
struct Args {
    /// Host to bind to
    #[arg(long)]
    host: Option<String>,
    /// Port to bind to
    #[arg(long, short)]
    port: Option<u16>,
    /// Question catalog (JSON)
    #[arg(long, short)]
    questions: Option<PathBuf>,
    /// Seed for the catalog shuffle
    #[arg(long)]
    seed: Option<u64>,
    /// Log output: text or json
    #[arg(long)]
    log_format: Option<LogFormat>,
}

impl From<Args> for SettingsOverrides {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            questions: args.questions,
            seed: args.seed,
            log_format: args.log_format,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let resolved = settings::load()?.apply(args.into())?;
    introspect_web::init_logging(resolved.settings.log_format)?;

    tracing::info!(
        host = %resolved.settings.host,
        port = resolved.settings.port,
        questions = %resolved.settings.questions.display(),
        sources = ?resolved.sources,
        "starting Introspect server"
    );

    let server = WebServer::new(resolved.settings)?;
    let handle = server.start().await?;
    println!("Server running at http://{}", handle.address());
    println!("Press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;

    tracing::info!("shutting down");
    handle.shutdown().await?;
    Ok(())
}
