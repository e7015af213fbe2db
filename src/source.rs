use async_trait::async_trait;
use chrono::NaiveDate;
use itertools::Itertools;

use crate::{
    core::{clock::PlantClock, panel::PanelId, sample::Sample},
    ops::Interval,
    prelude::*,
    statistics::{WindowStats, aggregate, energy::EnergyModel},
};

/// Read-only view of the raw panel telemetry.
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Fetch the panel samples within the window, ordered by timestamp.
    async fn fetch_samples(&self, panel_id: &PanelId, window: Interval) -> Result<Vec<Sample>>;

    /// Aggregate the whole local day in one query, partitioned by the local hour.
    ///
    /// Hours without samples are zero.
    #[instrument(skip_all, fields(panel_id = %panel_id, report_date = %report_date))]
    async fn fetch_hourly(
        &self,
        panel_id: &PanelId,
        report_date: NaiveDate,
        clock: &PlantClock,
        model: &EnergyModel,
    ) -> Result<[WindowStats; 24]> {
        let samples = self.fetch_samples(panel_id, clock.day_window(report_date)?).await?;
        let mut hourly = [WindowStats::ZERO; 24];
        for (slot, samples) in samples
            .iter()
            .into_group_map_by(|sample| clock.classify_hour(sample.timestamp))
        {
            if slot.report_date != report_date {
                warn!(?slot, "sample falls outside of the requested day");
                continue;
            }
            hourly[usize::try_from(slot.hour)?] = aggregate(samples, model);
        }
        debug!(n_samples = samples.len(), "partitioned by hour");
        Ok(hourly)
    }
}
