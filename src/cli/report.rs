use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::{
    cli::engine::EngineArgs,
    core::{date::parse_report_date, panel::PanelId},
    db::Db,
    prelude::*,
    report::{ReportGenerator, electrical::Period},
    tables::{build_daily_table, build_hourly_table, build_period_panels_table, build_period_summary_table},
};

#[derive(Parser)]
pub struct ReportArgs {
    #[clap(flatten)]
    engine: EngineArgs,

    /// Read the single panel instead of all the configured ones.
    #[clap(long, global = true)]
    panel: Option<PanelId>,

    /// Print JSON instead of the tables.
    #[clap(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: ReportCommand,
}

#[derive(Subcommand)]
enum ReportCommand {
    /// Shift report of the date, lazily filling the active shift.
    Daily {
        #[clap(value_parser = parse_report_date)]
        date: NaiveDate,
    },

    /// All 24 hours of the date.
    Hourly {
        #[clap(value_parser = parse_report_date)]
        date: NaiveDate,
    },

    /// Every stored daily report.
    All,

    /// Daily reports of the calendar month.
    Month { year: i32, month: u32 },

    /// Plant-wide electrical summary.
    #[command(subcommand)]
    Electrical(ElectricalCommand),
}

#[derive(Subcommand)]
enum ElectricalCommand {
    Day {
        #[clap(value_parser = parse_report_date)]
        date: NaiveDate,
    },

    /// Seven days starting from the date.
    Week {
        #[clap(value_parser = parse_report_date)]
        start: NaiveDate,
    },

    Month { year: i32, month: u32 },
}

impl ElectricalCommand {
    fn period(&self) -> Result<Period> {
        Ok(match *self {
            Self::Day { date } => Period::Day { date },
            Self::Week { start } => Period::Week { start },
            Self::Month { year, month } => Period::month(year, month)?,
        })
    }
}

impl ReportArgs {
    pub async fn run(self) -> Result {
        let (db, generator) = self.engine.connect().await?;
        let result = self.render(&generator).await;
        db.shutdown().await;
        result
    }

    async fn render(&self, generator: &ReportGenerator<Db, Db>) -> Result {
        let panel_ids: Vec<PanelId> = match &self.panel {
            Some(panel_id) => vec![panel_id.clone()],
            None => generator.panels().iter().map(|panel| panel.id.clone()).collect(),
        };
        match &self.command {
            ReportCommand::Daily { date } => {
                let mut reports = Vec::with_capacity(panel_ids.len());
                for panel_id in &panel_ids {
                    match generator.get_daily_report(panel_id, *date, Utc::now()).await {
                        Ok(report) => reports.push(report),
                        Err(error) if ReportError::is_no_data(&error) && self.panel.is_none() => {
                            warn!("{error:#}");
                        }
                        Err(error) => return Err(error),
                    }
                }
                self.print(&reports, || build_daily_table(&reports).to_string())
            }
            ReportCommand::Hourly { date } => {
                for panel_id in &panel_ids {
                    let reports = generator.get_hourly_report(panel_id, *date).await?;
                    self.print(&reports, || build_hourly_table(panel_id, *date, &reports).to_string())?;
                }
                Ok(())
            }
            ReportCommand::All => {
                for panel_id in &panel_ids {
                    let reports = generator.get_daily_reports_all(panel_id, Utc::now()).await?;
                    self.print(&reports, || build_daily_table(&reports).to_string())?;
                }
                Ok(())
            }
            ReportCommand::Month { year, month } => {
                for panel_id in &panel_ids {
                    let reports = generator.get_daily_reports_for_month(panel_id, *year, *month).await?;
                    self.print(&reports, || build_daily_table(&reports).to_string())?;
                }
                Ok(())
            }
            ReportCommand::Electrical(command) => {
                let report = generator.get_electrical_report(command.period()?).await?;
                self.print(&report, || {
                    format!(
                        "{}: {} … {}\n{}\n{}",
                        report.period,
                        report.start,
                        report.end,
                        build_period_summary_table(&report),
                        build_period_panels_table(&report),
                    )
                })
            }
        }
    }

    fn print<T: Serialize + ?Sized>(&self, value: &T, render_table: impl FnOnce() -> String) -> Result {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value).context("failed to serialize the report")?);
        } else {
            println!("{}", render_table());
        }
        Ok(())
    }
}
