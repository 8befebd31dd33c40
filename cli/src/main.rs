//! HealthRAG Entry Point
//!
//! Runs one pipeline stage per invocation:
//! - chunk: extracted text tree -> chunk store
//! - build: chunk store -> published index
//! - search: query -> top-k chunks
//! - run: chunk + build (+ search)
//! - info: describe the published index

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use healthrag_cli::Cli;

fn main() {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "healthrag=info,healthrag_cli=info,healthrag_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = healthrag_cli::execute(&cli, &mut out) {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}
