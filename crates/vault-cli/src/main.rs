//! vault-sync CLI
//!
//! Keeps a local vault directory and its cloud-synced mirror in agreement,
//! using a private history tree as the common ancestor.

mod cli;
mod commands;
mod error;
mod logging;

use clap::{CommandFactory, Parser};
use colored::Colorize;

use cli::{Cli, Commands};
use error::{CliError, Result};
use vault_core::SettingsResolver;

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

/// Dispatch the command. The returned value is the process exit code.
fn run() -> Result<i32> {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        return Err(CliError::user(format!("could not set up logging: {e}")));
    }
    tracing::debug!("Verbose mode enabled");

    let resolver = SettingsResolver::new().with_explicit(cli.config.clone());

    match cli.command {
        Some(Commands::Run { passes }) => commands::run_loop(&resolver, passes),
        Some(Commands::Once { json }) => commands::run_once(&resolver, json),
        Some(Commands::Check) => commands::run_check(&resolver),
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "vault-sync",
                &mut std::io::stdout(),
            );
            Ok(0)
        }
        None => {
            println!("{} keeps a vault and its cloud copy in step", "vault-sync".green().bold());
            println!();
            println!("Run {} for available commands.", "vault-sync --help".cyan());
            Ok(0)
        }
    }
}
