//! In-memory source and store for the engine tests.

use std::{
    collections::BTreeMap,
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    core::{
        date::DateRange,
        panel::PanelId,
        rollup::{DailyElectricalReport, DailyReport, HourlyReport},
        sample::{PhaseCurrents, Sample},
        shift::Shift,
    },
    ops::Interval,
    prelude::*,
    quantity::{current::Amperes, power::Kilowatts, voltage::Volts},
    source::SampleSource,
    statistics::WindowStats,
    store::RollupStore,
};

/// Complete sample with the typical plant readings.
pub fn sample_at(panel_id: &PanelId, timestamp: DateTime<Utc>, real_power: f64) -> Sample {
    Sample::builder()
        .panel_id(panel_id.clone())
        .timestamp(timestamp)
        .real_power(Kilowatts(real_power))
        .voltage(Volts(400.0))
        .phase_currents(PhaseCurrents::new(Amperes(90.0), Amperes(100.0), Amperes(110.0)))
        .average_current(Amperes(100.0))
        .power_factor(0.9)
        .frequency(50.0)
        .build()
}

#[derive(Default)]
pub struct MemorySource {
    samples: Vec<Sample>,

    /// Fetches of the panel fail when the window covers the instant.
    failures: Vec<(PanelId, DateTime<Utc>)>,

    /// Samples after the instant have not arrived yet.
    cutoff: Mutex<Option<DateTime<Utc>>>,

    n_fetches: AtomicUsize,
}

impl MemorySource {
    pub fn with_samples(samples: Vec<Sample>) -> Self {
        Self { samples, ..Self::default() }
    }

    pub fn failing_on(mut self, panel_id: PanelId, instant: DateTime<Utc>) -> Self {
        self.failures.push((panel_id, instant));
        self
    }

    pub fn n_fetches(&self) -> usize {
        self.n_fetches.load(Ordering::Relaxed)
    }

    /// Pretend that only the samples up to the instant have been ingested.
    pub fn hide_after(&self, instant: DateTime<Utc>) {
        if let Ok(mut cutoff) = self.cutoff.lock() {
            *cutoff = Some(instant);
        }
    }
}

#[async_trait]
impl SampleSource for MemorySource {
    async fn fetch_samples(&self, panel_id: &PanelId, window: Interval) -> Result<Vec<Sample>> {
        self.n_fetches.fetch_add(1, Ordering::Relaxed);
        if self.failures.iter().any(|(id, instant)| id == panel_id && window.contains(*instant)) {
            bail!("connection reset while fetching `{panel_id}`");
        }
        let cutoff = *lock(&self.cutoff)?;
        let mut samples: Vec<Sample> = self
            .samples
            .iter()
            .filter(|sample| &sample.panel_id == panel_id && window.contains(sample.timestamp))
            .filter(|sample| cutoff.is_none_or(|cutoff| sample.timestamp <= cutoff))
            .cloned()
            .collect();
        samples.sort_by_key(|sample| sample.timestamp);
        Ok(samples)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    daily: Mutex<BTreeMap<(PanelId, NaiveDate), DailyReport>>,
    hourly: Mutex<BTreeMap<(PanelId, NaiveDate, u32), HourlyReport>>,
    electrical: Mutex<BTreeMap<(NaiveDate, PanelId), DailyElectricalReport>>,
    n_writes: AtomicUsize,
    is_failing: AtomicBool,
}

impl MemoryStore {
    /// Make every subsequent write fail.
    pub fn fail_writes(&self, is_failing: bool) {
        self.is_failing.store(is_failing, Ordering::Relaxed);
    }

    pub fn n_writes(&self) -> usize {
        self.n_writes.load(Ordering::Relaxed)
    }

    fn write(&self) -> Result {
        ensure!(!self.is_failing.load(Ordering::Relaxed), "write concern timed out");
        self.n_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| anyhow::anyhow!("the store mutex is poisoned"))
}

#[async_trait]
impl RollupStore for MemoryStore {
    async fn upsert_daily(
        &self,
        panel_id: &PanelId,
        report_date: NaiveDate,
        shift: Shift,
        stats: &WindowStats,
    ) -> Result {
        self.write()?;
        let mut daily = lock(&self.daily)?;
        *daily
            .entry((panel_id.clone(), report_date))
            .or_insert_with(|| DailyReport::empty(panel_id.clone(), report_date))
            .shift_mut(shift) = *stats;
        Ok(())
    }

    async fn upsert_hourly(&self, report: &HourlyReport) -> Result {
        self.write()?;
        let mut hourly = lock(&self.hourly)?;
        hourly.insert((report.panel_id.clone(), report.report_date, report.hour), report.clone());
        Ok(())
    }

    async fn upsert_electrical(&self, report: &DailyElectricalReport) -> Result {
        self.write()?;
        let mut electrical = lock(&self.electrical)?;
        electrical.insert((report.report_date, report.panel_id.clone()), report.clone());
        Ok(())
    }

    async fn get_daily(&self, panel_id: &PanelId, report_date: NaiveDate) -> Result<Option<DailyReport>> {
        let daily = lock(&self.daily)?;
        Ok(daily.get(&(panel_id.clone(), report_date)).cloned())
    }

    async fn get_daily_range(&self, panel_id: &PanelId, range: DateRange) -> Result<Vec<DailyReport>> {
        let daily = lock(&self.daily)?;
        Ok(daily
            .values()
            .filter(|report| &report.panel_id == panel_id && range.contains(report.report_date))
            .cloned()
            .collect())
    }

    async fn get_daily_all(&self, panel_id: &PanelId) -> Result<Vec<DailyReport>> {
        let daily = lock(&self.daily)?;
        Ok(daily.values().filter(|report| &report.panel_id == panel_id).cloned().collect())
    }

    async fn get_hourly_range(&self, panel_id: &PanelId, range: DateRange) -> Result<Vec<HourlyReport>> {
        let hourly = lock(&self.hourly)?;
        Ok(hourly
            .values()
            .filter(|report| &report.panel_id == panel_id && range.contains(report.report_date))
            .cloned()
            .collect())
    }

    async fn get_electrical_range(&self, range: DateRange) -> Result<Vec<DailyElectricalReport>> {
        let electrical = lock(&self.electrical)?;
        Ok(electrical.values().filter(|report| range.contains(report.report_date)).cloned().collect())
    }

    async fn delete_hourly_before(&self, report_date: NaiveDate) -> Result<u64> {
        self.write()?;
        let mut hourly = lock(&self.hourly)?;
        let n_before = hourly.len();
        hourly.retain(|(_, date, _), _| *date >= report_date);
        Ok(u64::try_from(n_before - hourly.len())?)
    }
}
