//! Reindex inspection tool.
//!
//! Prints the dependency graph derived from a schema file, the dependent
//! queries planned for an entity, or dry-runs a walk against a JSON fixture.

mod args;
mod commands;
mod error;
mod formatter;
mod sink;

use clap::Parser;

use args::Args;

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout stays machine readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reindex=info,reindex_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match commands::run(args).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
