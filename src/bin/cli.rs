//! dicto CLI - architecture rules for PHP codebases.
//!
//! Usage:
//!   dicto index                          # Index and show graph statistics
//!   dicto check --rules rules.toml       # Check rules, exit 1 on violations
//!   dicto select --type class --name '.*Controller'

use clap::Parser;
use dicto::cli::{run, Cli};

fn main() {
    // Logs go to stderr so stdout stays clean for --json
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut stdout = std::io::stdout().lock();

    match run(&cli, &mut stdout) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
