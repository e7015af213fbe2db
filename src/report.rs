pub mod electrical;
pub mod job;
pub mod outcome;

use std::time::Instant;

use bon::Builder;
use chrono::{DateTime, NaiveDate, Utc};
use derive_more::Display;
use futures_util::future::join_all;

use crate::{
    core::{
        clock::{PlantClock, ShiftSlot},
        date::{add_days, month_range},
        panel::{PanelConfig, PanelId},
        rollup::{DailyElectricalReport, DailyReport, HourlyReport},
        shift::Shift,
    },
    ops::RangeInclusive,
    prelude::*,
    report::{
        electrical::{Period, PeriodReport},
        job::{JobState, ReportJob},
        outcome::BatchOutcome,
    },
    source::SampleSource,
    statistics::{WindowStats, aggregate, energy::EnergyModel, summary::ElectricalSummary},
    store::RollupStore,
};

/// Part of the daily generation, failing independently of the others.
#[derive(Copy, Clone, Debug, Display, Eq, PartialEq)]
pub enum DayPart {
    #[display("{_0}")]
    Shift(Shift),

    #[display("hourly")]
    Hours,

    #[display("electrical")]
    Electrical,
}

/// Turns raw samples into persisted rollups, one generic engine for all the panels.
#[must_use]
#[derive(Builder)]
pub struct ReportGenerator<S, R> {
    source: S,
    store: R,
    panels: Vec<PanelConfig>,

    #[builder(default)]
    clock: PlantClock,

    #[builder(default)]
    energy_model: EnergyModel,
}

impl<S: SampleSource, R: RollupStore> ReportGenerator<S, R> {
    pub fn panels(&self) -> &[PanelConfig] {
        &self.panels
    }

    pub const fn clock(&self) -> &PlantClock {
        &self.clock
    }

    pub const fn store(&self) -> &R {
        &self.store
    }

    #[cfg(test)]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Aggregate the closed shift and overwrite only its part of the daily report.
    #[instrument(skip_all, fields(panel_id = %panel_id, report_date = %report_date, shift = shift.number()))]
    pub async fn generate_shift(
        &self,
        panel_id: &PanelId,
        report_date: NaiveDate,
        shift: Shift,
    ) -> Result<WindowStats> {
        self.generate_shift_as(panel_id, report_date, shift, JobState::Done).await
    }

    async fn generate_shift_as(
        &self,
        panel_id: &PanelId,
        report_date: NaiveDate,
        shift: Shift,
        terminal_state: JobState,
    ) -> Result<WindowStats> {
        let mut job = ReportJob::new(panel_id, report_date);
        let result = async {
            let window = self.clock.shift_window(report_date, shift)?;
            job.enter(JobState::FetchingSamples)?;
            let samples = self.source.fetch_samples(panel_id, window).await?;
            job.enter(JobState::Aggregating)?;
            let stats = aggregate(&samples, &self.energy_model);
            job.enter(JobState::Persisting)?;
            self.store.upsert_daily(panel_id, report_date, shift, &stats).await?;
            job.enter(terminal_state)?;
            info!(?window, count = stats.count, total = %stats.total_energy, "shift generated");
            Ok::<_, Error>(stats)
        }
        .await;
        job.finish(result)
    }

    /// Generate all 24 hourly reports of the day from a single grouped query.
    ///
    /// Hours without samples are persisted as zero placeholders.
    #[instrument(skip_all, fields(panel_id = %panel_id, report_date = %report_date))]
    pub async fn generate_all_hours(
        &self,
        panel_id: &PanelId,
        report_date: NaiveDate,
    ) -> Result<Vec<HourlyReport>> {
        let mut job = ReportJob::new(panel_id, report_date);
        let result = async {
            job.enter(JobState::FetchingSamples)?;
            let hourly = self
                .source
                .fetch_hourly(panel_id, report_date, &self.clock, &self.energy_model)
                .await?;
            job.enter(JobState::Aggregating)?;
            let reports: Vec<HourlyReport> = (0..24_u32)
                .zip(hourly)
                .map(|(hour, stats)| HourlyReport { panel_id: panel_id.clone(), report_date, hour, stats })
                .collect();
            job.enter(JobState::Persisting)?;
            self.store.upsert_hourly_batch(&reports).await?;
            job.enter(JobState::Done)?;
            let n_empty = reports.iter().filter(|report| report.stats.is_empty()).count();
            info!(n_empty, "hours generated");
            Ok::<_, Error>(reports)
        }
        .await;
        job.finish(result)
    }

    /// Generate the single hourly report.
    #[instrument(skip_all, fields(panel_id = %panel_id, report_date = %report_date, hour = hour))]
    pub async fn generate_hour(
        &self,
        panel_id: &PanelId,
        report_date: NaiveDate,
        hour: u32,
    ) -> Result<HourlyReport> {
        let mut job = ReportJob::new(panel_id, report_date);
        let result = async {
            let window = self.clock.hour_window(report_date, hour)?;
            job.enter(JobState::FetchingSamples)?;
            let samples = self.source.fetch_samples(panel_id, window).await?;
            job.enter(JobState::Aggregating)?;
            let report = HourlyReport {
                panel_id: panel_id.clone(),
                report_date,
                hour,
                stats: aggregate(&samples, &self.energy_model),
            };
            job.enter(JobState::Persisting)?;
            self.store.upsert_hourly(&report).await?;
            job.enter(JobState::Done)?;
            info!(count = report.stats.count, "hour generated");
            Ok::<_, Error>(report)
        }
        .await;
        job.finish(result)
    }

    /// Generate the daily electrical summary over the local calendar day.
    #[instrument(skip_all, fields(panel_id = %panel_id, report_date = %report_date))]
    pub async fn generate_electrical(
        &self,
        panel_id: &PanelId,
        report_date: NaiveDate,
    ) -> Result<DailyElectricalReport> {
        let mut job = ReportJob::new(panel_id, report_date);
        let result = async {
            let window = self.clock.day_window(report_date)?;
            job.enter(JobState::FetchingSamples)?;
            let samples = self.source.fetch_samples(panel_id, window).await?;
            job.enter(JobState::Aggregating)?;
            let report = DailyElectricalReport {
                panel_id: panel_id.clone(),
                report_date,
                summary: ElectricalSummary::from_samples(&samples, &self.energy_model, window.len()),
            };
            job.enter(JobState::Persisting)?;
            self.store.upsert_electrical(&report).await?;
            job.enter(JobState::Done)?;
            info!(
                energy = %report.summary.energy,
                peak = %report.summary.peak_demand,
                completeness = report.summary.data_completeness_percent,
                "electrical summary generated",
            );
            Ok::<_, Error>(report)
        }
        .await;
        job.finish(result)
    }

    /// Generate everything for the panel and date: the three shifts, the hours, and the electrical summary.
    ///
    /// The parts run concurrently, and a failed part does not affect the others.
    pub async fn generate_day(&self, panel_id: &PanelId, report_date: NaiveDate) -> BatchOutcome<DayPart> {
        self.generate_day_as_of(panel_id, report_date, Utc::now()).await
    }

    /// Generate the day as seen at the instant: the shifts which have not ended by then stay provisional.
    #[instrument(skip_all, fields(panel_id = %panel_id, report_date = %report_date))]
    pub async fn generate_day_as_of(
        &self,
        panel_id: &PanelId,
        report_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> BatchOutcome<DayPart> {
        let start_time = Instant::now();
        let shift_job =
            |shift| self.generate_shift_as(panel_id, report_date, shift, self.shift_state(report_date, shift, now));
        let (first, second, third, hours, electrical) = tokio::join!(
            shift_job(Shift::First),
            shift_job(Shift::Second),
            shift_job(Shift::Third),
            self.generate_all_hours(panel_id, report_date),
            self.generate_electrical(panel_id, report_date),
        );
        let mut outcome = BatchOutcome::default();
        outcome.record(DayPart::Shift(Shift::First), first);
        outcome.record(DayPart::Shift(Shift::Second), second);
        outcome.record(DayPart::Shift(Shift::Third), third);
        outcome.record(DayPart::Hours, hours);
        outcome.record(DayPart::Electrical, electrical);
        info!(%outcome, elapsed = ?start_time.elapsed(), "day generated");
        outcome
    }

    /// Generate the day for every panel concurrently.
    #[instrument(skip_all, fields(report_date = %report_date))]
    pub async fn generate_day_all(&self, report_date: NaiveDate) -> BatchOutcome<PanelId> {
        let outcomes = join_all(
            self.panels.iter().map(|panel| self.generate_day(&panel.id, report_date)),
        )
        .await;
        let mut outcome = BatchOutcome::default();
        for (panel, panel_outcome) in self.panels.iter().zip(outcomes) {
            outcome.record(panel.id.clone(), panel_outcome.ensure_complete());
        }
        outcome
    }

    /// Terminal state of the shift generation: provisional until the shift window has ended.
    fn shift_state(&self, report_date: NaiveDate, shift: Shift, now: DateTime<Utc>) -> JobState {
        match self.clock.shift_window(report_date, shift) {
            Ok(window) if window.end > now => JobState::Provisional,
            _ => JobState::Done,
        }
    }

    /// Generate the hour for every panel concurrently.
    #[instrument(skip_all, fields(report_date = %report_date, hour = hour))]
    pub async fn generate_hour_all(&self, report_date: NaiveDate, hour: u32) -> BatchOutcome<PanelId> {
        let results = join_all(
            self.panels.iter().map(|panel| self.generate_hour(&panel.id, report_date, hour)),
        )
        .await;
        let mut outcome = BatchOutcome::default();
        for (panel, result) in self.panels.iter().zip(results) {
            outcome.record(panel.id.clone(), result);
        }
        outcome
    }

    /// Refresh the in-progress shift.
    ///
    /// The result is provisional: the shift keeps accumulating samples until it ends.
    #[instrument(skip_all, fields(panel_id = %panel_id))]
    pub async fn generate_current_shift(&self, panel_id: &PanelId, now: DateTime<Utc>) -> Result<ShiftSlot> {
        let slot = self.clock.classify_shift(now);
        self.generate_shift_as(panel_id, slot.report_date, slot.shift, JobState::Provisional).await?;
        Ok(slot)
    }

    #[instrument(skip_all)]
    pub async fn generate_current_shift_all(&self, now: DateTime<Utc>) -> BatchOutcome<PanelId> {
        let results = join_all(
            self.panels.iter().map(|panel| self.generate_current_shift(&panel.id, now)),
        )
        .await;
        let mut outcome = BatchOutcome::default();
        for (panel, result) in self.panels.iter().zip(results) {
            outcome.record(panel.id.clone(), result);
        }
        outcome
    }

    /// Lazily materialize the active shift before reading the daily report.
    ///
    /// Generation is only attempted when the date holds the active shift, and the report is either
    /// missing or has nothing for that shift yet. A failed generation degrades to the stored report.
    #[instrument(skip_all, fields(panel_id = %panel_id, report_date = %report_date))]
    pub async fn auto_fill_if_missing(
        &self,
        panel_id: &PanelId,
        report_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Option<DailyReport>> {
        let stored = self.store.get_daily(panel_id, report_date).await?;
        let active = self.clock.classify_shift(now);
        if active.report_date != report_date {
            return Ok(stored);
        }
        let is_stale = stored.as_ref().is_none_or(|report| report.shift(active.shift).is_empty());
        if !is_stale {
            return Ok(stored);
        }
        info!(shift = active.shift.number(), "active shift is missing, generating…");
        match self.generate_current_shift(panel_id, now).await {
            Ok(_) => self.store.get_daily(panel_id, report_date).await,
            Err(error) => {
                warn!("falling back to the stored report: {error:#}");
                Ok(stored)
            }
        }
    }

    /// Read the daily report, lazily filling the active shift.
    pub async fn get_daily_report(
        &self,
        panel_id: &PanelId,
        report_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<DailyReport> {
        self.ensure_known(panel_id)?;
        self.auto_fill_if_missing(panel_id, report_date, now)
            .await?
            .ok_or_else(|| ReportError::NoData { panel: panel_id.clone(), date: report_date }.into())
    }

    /// Read every stored daily report, lazily filling today's active shift first.
    pub async fn get_daily_reports_all(&self, panel_id: &PanelId, now: DateTime<Utc>) -> Result<Vec<DailyReport>> {
        self.ensure_known(panel_id)?;
        let active = self.clock.classify_shift(now);
        self.auto_fill_if_missing(panel_id, active.report_date, now).await?;
        self.store.get_daily_all(panel_id).await
    }

    pub async fn get_daily_reports_for_month(
        &self,
        panel_id: &PanelId,
        year: i32,
        month: u32,
    ) -> Result<Vec<DailyReport>> {
        let range = month_range(year, month)?;
        self.ensure_known(panel_id)?;
        self.store.get_daily_range(panel_id, range).await
    }

    /// Read the dense 24-hour report of the day.
    ///
    /// Missing hours are zero placeholders, unless nothing has been generated for the day at all.
    pub async fn get_hourly_report(&self, panel_id: &PanelId, report_date: NaiveDate) -> Result<Vec<HourlyReport>> {
        self.ensure_known(panel_id)?;
        let stored = self.store.get_hourly_range(panel_id, RangeInclusive::point(report_date)).await?;
        if stored.is_empty() {
            bail!(ReportError::NoData { panel: panel_id.clone(), date: report_date });
        }
        let mut hourly: Vec<HourlyReport> = (0..24)
            .map(|hour| HourlyReport::placeholder(panel_id.clone(), report_date, hour))
            .collect();
        for report in stored {
            let index = usize::try_from(report.hour)?;
            ensure!(index < hourly.len(), ReportError::InvalidHour(report.hour));
            hourly[index] = report;
        }
        Ok(hourly)
    }

    /// Summarize the stored electrical reports over the period, comparing with the previous one.
    #[instrument(skip_all, fields(%period))]
    pub async fn get_electrical_report(&self, period: Period) -> Result<PeriodReport> {
        let (reports, previous_reports) = tokio::try_join!(
            self.store.get_electrical_range(period.dates()?),
            self.store.get_electrical_range(period.previous()?.dates()?),
        )?;
        PeriodReport::build(period, &reports, &previous_reports, &self.panels, &self.energy_model)
    }

    /// Delete hourly reports older than the number of days.
    #[instrument(skip_all, fields(keep_days = keep_days))]
    pub async fn prune_hourly(&self, keep_days: u32, now: DateTime<Utc>) -> Result<u64> {
        let before = add_days(self.clock.today(now), -i64::from(keep_days))?;
        self.store.delete_hourly_before(before).await
    }

    fn ensure_known(&self, panel_id: &PanelId) -> Result {
        ensure!(
            self.panels.iter().any(|panel| &panel.id == panel_id),
            ReportError::UnknownPanel(panel_id.clone()),
        );
        Ok(())
    }
}
