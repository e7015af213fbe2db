use std::sync::Arc;

use chrono::TimeDelta;
use clap::Parser;

use crate::{
    cli::{engine::EngineArgs, shutdown_signal},
    prelude::*,
    scheduler::Scheduler,
};

#[derive(Parser)]
pub struct ServeArgs {
    #[clap(flatten)]
    engine: EngineArgs,

    /// Delay after each local hour before aggregating it.
    ///
    /// The previous day is generated at this offset past local midnight.
    #[clap(long, env = "HOURLY_OFFSET", default_value = "5min")]
    hourly_offset: humantime::Duration,
}

impl ServeArgs {
    #[instrument(skip_all)]
    pub async fn run(self) -> Result {
        let hourly_offset =
            TimeDelta::from_std(self.hourly_offset.into()).context("the hourly offset is out of range")?;
        ensure!(
            (TimeDelta::zero()..TimeDelta::hours(1)).contains(&hourly_offset),
            "the hourly offset must be under an hour",
        );
        let (db, generator) = self.engine.connect().await?;
        let mut scheduler =
            Scheduler::builder().generator(Arc::new(generator)).hourly_offset(hourly_offset).build();
        scheduler.start()?;
        let result = shutdown_signal().await;
        scheduler.stop().await;
        db.shutdown().await;
        result
    }
}
