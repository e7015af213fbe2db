use async_trait::async_trait;
use chrono::NaiveDate;
use futures_util::future::try_join_all;

use crate::{
    core::{
        date::DateRange,
        panel::PanelId,
        rollup::{DailyElectricalReport, DailyReport, HourlyReport},
        shift::Shift,
    },
    prelude::*,
    statistics::WindowStats,
};

/// Persistent rollups.
///
/// Writes are upserts on the natural keys. The store performs no retries on its own,
/// any failure goes back to the caller.
#[async_trait]
pub trait RollupStore: Send + Sync {
    /// Overwrite the single shift of the daily report, creating the report if needed.
    ///
    /// The other shifts must stay untouched, and a new report starts with zero shifts.
    /// Concurrent calls for different shifts of the same report must not lose each other's updates.
    async fn upsert_daily(
        &self,
        panel_id: &PanelId,
        report_date: NaiveDate,
        shift: Shift,
        stats: &WindowStats,
    ) -> Result;

    async fn upsert_hourly(&self, report: &HourlyReport) -> Result;

    /// Upsert a day worth of hourly reports.
    ///
    /// The rows are independent, so they are written concurrently.
    async fn upsert_hourly_batch(&self, reports: &[HourlyReport]) -> Result {
        try_join_all(reports.iter().map(|report| self.upsert_hourly(report))).await?;
        Ok(())
    }

    async fn upsert_electrical(&self, report: &DailyElectricalReport) -> Result;

    async fn get_daily(&self, panel_id: &PanelId, report_date: NaiveDate) -> Result<Option<DailyReport>>;

    /// Daily reports ordered by date.
    async fn get_daily_range(&self, panel_id: &PanelId, range: DateRange) -> Result<Vec<DailyReport>>;

    /// Every daily report of the panel, ordered by date.
    async fn get_daily_all(&self, panel_id: &PanelId) -> Result<Vec<DailyReport>>;

    /// Hourly reports ordered by date, then hour.
    async fn get_hourly_range(&self, panel_id: &PanelId, range: DateRange) -> Result<Vec<HourlyReport>>;

    /// Electrical reports of all panels, ordered by date, then panel.
    async fn get_electrical_range(&self, range: DateRange) -> Result<Vec<DailyElectricalReport>>;

    /// Delete hourly reports strictly before the date and return the number of deleted rows.
    async fn delete_hourly_before(&self, report_date: NaiveDate) -> Result<u64>;
}
