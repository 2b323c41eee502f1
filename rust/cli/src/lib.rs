//! # Introspect CLI Library
//!
//! Command-line tooling for the question catalog the Introspect server loads
//! at startup.
//!
//! The entry point is [`run`], which parses the arguments, executes the
//! subcommand and returns the process exit code.
//!
//! ```no_run
//! use std::io;
//! let args = vec!["introspect", "check", "--file", "questions.json"];
//! let code = introspect_cli::run(args, &mut io::stdout(), &mut io::stderr());
//! assert_eq!(code, 0);
//! ```
//!
//! ## Available Subcommands
//!
//! - `add-question --en TEXT --no TEXT [--file PATH]`: append a question
//! - `list [--file PATH] [--json]`: print the catalog
//! - `check [--file PATH]`: validate ids and texts, exit `2` on problems
//! - `cfg`: show the configured catalog path and its source

use clap::Parser;
use std::io::Write;
pub mod cli;
mod commands;
pub mod config;
mod error;
pub mod exit_code;
pub mod ui;

use cli::{Commands, IntrospectCli};
use commands::{
    handle_add_question_command, handle_cfg_command, handle_check_command, handle_list_command,
};

pub use error::CliError;

/// Parses `args`, runs the subcommand and returns the exit code: `0` on
/// success, `2` on any error.
pub fn run<I, S>(args: I, out: &mut dyn Write, err: &mut dyn Write) -> i32
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    const COMMANDS: &[&str] = &["add-question", "list", "check", "cfg"];
    let argv: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();

    let cli = match IntrospectCli::try_parse_from(&argv) {
        Ok(cli) => cli,
        Err(e) => {
            use clap::error::ErrorKind;

            // Help and version go to stdout and succeed
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    if write!(out, "{}", e).is_err() {
                        return exit_code::ERROR;
                    }
                    exit_code::SUCCESS
                }
                _ => {
                    if print_usage(err, &e.to_string(), COMMANDS).is_err() {
                        return exit_code::ERROR;
                    }
                    exit_code::ERROR
                }
            };
        }
    };

    let result = match cli.cmd {
        Commands::AddQuestion { en, no, file } => handle_add_question_command(en, no, file, out),
        Commands::List { file, json } => handle_list_command(file, json, out),
        Commands::Check { file } => handle_check_command(file, out, err),
        Commands::Cfg => handle_cfg_command(out),
    };

    match result {
        Ok(()) => exit_code::SUCCESS,
        Err(e) => {
            let _ = ui::write_error(err, &e.to_string());
            exit_code::ERROR
        }
    }
}

fn print_usage(err: &mut dyn Write, message: &str, commands: &[&str]) -> std::io::Result<()> {
    writeln!(err, "{}", message)?;
    writeln!(err)?;
    writeln!(err, "Introspect catalog CLI")?;
    writeln!(err, "Usage: introspect <command> [options]\n")?;
    writeln!(err, "Commands:")?;
    for c in commands {
        writeln!(err, "  {}", c)?;
    }
    writeln!(err, "\nFor full help, run: introspect --help")
}
