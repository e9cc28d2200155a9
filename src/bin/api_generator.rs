use std::io::stdout;

use atlas_api_generator::cli::{run, Cli};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout is reserved for the generated source.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(&cli, Utc::now().date_naive(), &mut stdout())
}
