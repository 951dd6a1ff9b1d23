//! immutable-collections CLI: fixed-arity struct generator.

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "immutable-collections",
    version,
    about = "Generate fixed-arity immutable struct types and check them for drift"
)]
struct Cli {
    #[command(subcommand)]
    command: immutable_collections::cli::Commands,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = immutable_collections::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
