//! `coach`: command-line client for the coaching platform.

// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use clap::Parser;
use cli::Cli;

mod cli;
mod commands;
mod logging;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = run().await {
        tracing::error!("{}", e);
        // Logging may be filtered off; the user still needs the reason.
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init()?;

    let args = Cli::parse();
    commands::dispatch(args).await
}
