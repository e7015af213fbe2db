use chrono::TimeDelta;
use chrono_tz::Tz;
use clap::Parser;

use crate::{
    cli::db::DbArgs,
    core::{
        clock::PlantClock,
        panel::{PanelConfig, PanelId},
    },
    db::Db,
    prelude::*,
    report::ReportGenerator,
    statistics::energy::{EnergyMethod, EnergyModel},
};

/// Deployment-wide engine settings, shared by every command.
#[derive(Parser)]
pub struct EngineArgs {
    #[clap(flatten)]
    pub db: DbArgs,

    /// Panels to generate the reports for.
    #[clap(
        long,
        env = "PANELS",
        value_delimiter = ',',
        default_value = "LVMDP_1,LVMDP_2,LVMDP_3,LVMDP_4"
    )]
    panels: Vec<PanelId>,

    #[clap(long, env = "ENERGY_METHOD", default_value = "fixed-interval")]
    energy_method: EnergyMethod,

    /// Nominal time between two raw samples.
    #[clap(long, env = "SAMPLING_INTERVAL", default_value = "3s")]
    sampling_interval: humantime::Duration,

    /// Plant time zone which the shift and hour windows are defined in.
    #[clap(long = "timezone", env = "PLANT_TIMEZONE", default_value = "Asia/Jakarta")]
    timezone: Tz,
}

impl EngineArgs {
    pub fn energy_model(&self) -> Result<EnergyModel> {
        let sampling_interval = TimeDelta::from_std(self.sampling_interval.into())
            .context("the sampling interval is out of range")?;
        ensure!(sampling_interval > TimeDelta::zero(), "the sampling interval must be positive");
        Ok(EnergyModel { method: self.energy_method, sampling_interval })
    }

    pub fn clock(&self) -> PlantClock {
        PlantClock::new(self.timezone)
    }

    /// Connect to the database and build the generator which uses it as both the source and the store.
    pub async fn connect(&self) -> Result<(Db, ReportGenerator<Db, Db>)> {
        let energy_model = self.energy_model()?;
        let db = self.db.connect().await?;
        let generator = ReportGenerator::builder()
            .source(db.clone())
            .store(db.clone())
            .panels(self.panels.iter().cloned().map(PanelConfig::with_known_capacity).collect())
            .clock(self.clock())
            .energy_model(energy_model)
            .build();
        info!(
            panels = ?self.panels,
            energy_method = %energy_model.method,
            sampling_interval = ?energy_model.sampling_interval,
            timezone = %self.timezone,
            "engine ready",
        );
        Ok((db, generator))
    }
}
