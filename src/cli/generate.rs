use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};

use crate::{
    cli::engine::EngineArgs,
    core::{date::parse_report_date, shift::Shift},
    prelude::*,
    tables::build_shift_table,
};

#[derive(Parser)]
pub struct GenerateArgs {
    #[clap(flatten)]
    engine: EngineArgs,

    #[command(subcommand)]
    command: GenerateCommand,
}

#[derive(Subcommand)]
enum GenerateCommand {
    /// Re-run the daily generation for every panel: the shifts, the hours, and the electrical summary.
    Day {
        #[clap(value_parser = parse_report_date)]
        date: NaiveDate,
    },

    /// Generate one shift for every panel.
    Shift {
        #[clap(value_parser = parse_report_date)]
        date: NaiveDate,

        /// Shift number: 1, 2, or 3.
        shift: Shift,
    },

    /// Refresh the in-progress shift for every panel.
    Current,

    /// Generate one hourly bucket for every panel.
    Hour {
        #[clap(value_parser = parse_report_date)]
        date: NaiveDate,

        /// Local hour, `0..=23`.
        hour: u32,
    },
}

impl GenerateArgs {
    pub async fn run(self) -> Result {
        let (db, generator) = self.engine.connect().await?;
        let result = async {
            match self.command {
                GenerateCommand::Day { date } => {
                    let succeeded = generator.generate_day_all(date).await.ensure_complete()?;
                    info!(n_panels = succeeded.len(), "done");
                }
                GenerateCommand::Shift { date, shift } => {
                    for panel in generator.panels() {
                        let stats = generator.generate_shift(&panel.id, date, shift).await?;
                        println!("{}", build_shift_table(&panel.id, date, shift, &stats));
                    }
                }
                GenerateCommand::Current => {
                    let outcome = generator.generate_current_shift_all(Utc::now()).await;
                    info!(%outcome, "done");
                    outcome.ensure_complete()?;
                }
                GenerateCommand::Hour { date, hour } => {
                    let outcome = generator.generate_hour_all(date, hour).await;
                    info!(%outcome, "done");
                    outcome.ensure_complete()?;
                }
            }
            Ok::<_, Error>(())
        }
        .await;
        db.shutdown().await;
        result
    }
}
