mod backfill;
mod db;
mod engine;
mod generate;
mod prune;
mod report;
mod serve;

use clap::{Parser, Subcommand};

use crate::{
    cli::{
        backfill::BackfillArgs,
        generate::GenerateArgs,
        prune::PruneArgs,
        report::ReportArgs,
        serve::ServeArgs,
    },
    prelude::*,
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the hourly and daily schedule until interrupted.
    Serve(Box<ServeArgs>),

    /// Generate the reports on demand.
    Generate(Box<GenerateArgs>),

    /// Re-generate a range of past dates, one date at a time.
    Backfill(Box<BackfillArgs>),

    /// Read the stored reports.
    Report(Box<ReportArgs>),

    /// Delete the old hourly reports.
    Prune(Box<PruneArgs>),
}

impl Command {
    pub async fn run(self) -> Result {
        match self {
            Self::Serve(args) => args.run().await,
            Self::Generate(args) => args.run().await,
            Self::Backfill(args) => args.run().await,
            Self::Report(args) => args.run().await,
            Self::Prune(args) => args.run().await,
        }
    }
}

/// Wait for Ctrl+C or, on Unix, `SIGTERM`.
async fn shutdown_signal() -> Result {
    #[cfg(unix)]
    {
        let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .context("failed to install the `SIGTERM` handler")?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.context("failed to listen for Ctrl+C")?,
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await.context("failed to listen for Ctrl+C")?;

    info!("shutdown requested");
    Ok(())
}
