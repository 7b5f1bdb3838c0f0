// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! waguard - WhatsApp number health and warmup governor.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod scheduler;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use waguard_config::WaguardConfig;

/// WhatsApp number health and warmup governor.
#[derive(Parser, Debug)]
#[command(name = "waguard", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the scheduler and the admin gateway until SIGINT/SIGTERM.
    Serve,
    /// Recompute one connection, or all of them, and print the result.
    Recalculate {
        /// Connection id. Omit to recompute every active connection.
        #[arg(long)]
        connection_id: Option<i64>,
        /// Score window: 24h, 7d or 30d.
        #[arg(long)]
        window: Option<String>,
    },
    /// Print the current health summary.
    Summary,
}

fn load_config(path: Option<&std::path::Path>) -> WaguardConfig {
    let loaded = match path {
        Some(path) => waguard_config::load_and_validate_path(path),
        None => waguard_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            waguard_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Recalculate {
            connection_id,
            window,
        }) => commands::run_recalculate(config, connection_id, window.as_deref()).await,
        Some(Commands::Summary) => commands::run_summary(config).await,
        None => {
            println!("waguard: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
