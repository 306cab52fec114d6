// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rafiq -- a bilingual personal-knowledge assistant.
//!
//! Binary entry point: CLI parsing, config loading, and the serve loop.

mod serve;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Rafiq -- a bilingual personal-knowledge assistant.
#[derive(Parser, Debug)]
#[command(name = "rafiq", version, about, long_about = None)]
struct Cli {
    /// Explicit config file (defaults to the rafiq.toml hierarchy).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the assistant server.
    Serve,
    /// Print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => rafiq_config::load_config_from_path(path),
        None => rafiq_config::load_config(),
    };
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Serve => {
            if let Err((code, e)) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(code);
            }
        }
        Commands::Config => match toml_render(&config) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        },
    }
}

fn toml_render(config: &rafiq_config::RafiqConfig) -> Result<String, String> {
    serde_json::to_value(config)
        .map_err(|e| e.to_string())
        .map(|v| serde_json::to_string_pretty(&v).unwrap_or_default())
}
