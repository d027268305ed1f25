mod application;
mod cli;
mod handlers;
mod report;
mod state;

#[cfg(test)]
mod tests;

use std::io;

use clap::Parser;
use tracing::error;

use crate::cli::Cli;

#[actix_web::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();
    if let Err(err) = application::run(cli).await {
        error!(%err, "pairwatch exited with an error");
        eprintln!("[pairwatch] bootstrap failed: {err}");
        return Err(io::Error::other(err.to_string()));
    }

    Ok(())
}
