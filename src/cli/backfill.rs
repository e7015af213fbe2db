use std::sync::Arc;

use chrono::NaiveDate;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use crate::{
    cli::{engine::EngineArgs, shutdown_signal},
    core::date::parse_report_date,
    prelude::*,
    scheduler::Scheduler,
};

#[derive(Parser)]
pub struct BackfillArgs {
    #[clap(flatten)]
    engine: EngineArgs,

    /// First date to generate.
    #[clap(value_parser = parse_report_date)]
    start: NaiveDate,

    /// Last date to generate, inclusive.
    #[clap(value_parser = parse_report_date)]
    end: NaiveDate,
}

impl BackfillArgs {
    /// Run the backfill, cancelling it between the dates on Ctrl+C.
    pub async fn run(self) -> Result {
        let (db, generator) = self.engine.connect().await?;
        let scheduler = Scheduler::builder().generator(Arc::new(generator)).build();
        let token = CancellationToken::new();
        let watcher = {
            let token = token.clone();
            tokio::spawn(async move {
                match shutdown_signal().await {
                    Ok(()) => {
                        warn!("cancelling the backfill after the current date…");
                        token.cancel();
                    }
                    Err(error) => error!("{error:#}"),
                }
            })
        };
        let result = scheduler.backfill(self.start, self.end, &token).await;
        watcher.abort();
        db.shutdown().await;

        let outcome = result?;
        for (date, error) in &outcome.failed {
            println!("{date}: {error}");
        }
        info!(%outcome, "finished");
        outcome.ensure_complete()?;
        Ok(())
    }
}
