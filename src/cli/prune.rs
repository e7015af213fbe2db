use chrono::Utc;
use clap::Parser;

use crate::{cli::engine::EngineArgs, prelude::*};

#[derive(Parser)]
pub struct PruneArgs {
    #[clap(flatten)]
    engine: EngineArgs,

    /// Number of most recent days to keep the hourly reports for.
    #[clap(long, env = "HOURLY_RETENTION_DAYS", default_value = "90")]
    keep_days: u32,
}

impl PruneArgs {
    pub async fn run(self) -> Result {
        let (db, generator) = self.engine.connect().await?;
        let result = generator.prune_hourly(self.keep_days, Utc::now()).await;
        db.shutdown().await;
        info!(n_deleted = result?, "pruned the hourly reports");
        Ok(())
    }
}
