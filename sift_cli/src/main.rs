use clap::Parser;
use owo_colors::OwoColorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose > 0 {
        "sift_cli=debug,sift_core=debug,sift=debug"
    } else {
        "sift_cli=info,sift_core=warn,sift=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if cli.no_color {
        owo_colors::set_override(false);
    }

    let result = match cli.command {
        Commands::Search(ref args) => commands::search::run(&cli, args).await,
        Commands::Kinds => commands::kinds::run(&cli),
        Commands::Config { ref action } => commands::config::run(&cli, action),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        process::exit(1);
    }
}
