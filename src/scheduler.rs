use std::{collections::HashMap, sync::Arc};

use bon::Builder;
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use futures_util::future::join_all;
use tokio::{task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        clock::PlantClock,
        date::{date_range, iter_dates},
        panel::PanelId,
    },
    prelude::*,
    report::{ReportGenerator, outcome::BatchOutcome},
    source::SampleSource,
    store::RollupStore,
};

/// Drives the report generator on the wall clock.
///
/// Every panel gets its own timer task, ticking at the offset past each local hour.
/// The tick right after the local day ends generates the whole previous day instead of the hour.
#[must_use]
#[derive(Builder)]
pub struct Scheduler<S, R> {
    generator: Arc<ReportGenerator<S, R>>,

    /// Delay after the hour to let the upstream ingestion catch up.
    #[builder(default = TimeDelta::minutes(5))]
    hourly_offset: TimeDelta,

    #[builder(skip)]
    state: Option<SchedulerState>,
}

/// Running timers, present only between [`Scheduler::start`] and [`Scheduler::stop`].
struct SchedulerState {
    token: CancellationToken,
    tasks: HashMap<PanelId, JoinHandle<()>>,
}

impl<S: SampleSource + 'static, R: RollupStore + 'static> Scheduler<S, R> {
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.state.is_some()
    }

    /// Spawn the panel timers.
    #[instrument(skip_all)]
    pub fn start(&mut self) -> Result {
        ensure!(self.state.is_none(), "the scheduler is already running");
        let token = CancellationToken::new();
        let tasks = self
            .generator
            .panels()
            .iter()
            .map(|panel| {
                let task = tokio::spawn(run_panel(
                    Arc::clone(&self.generator),
                    panel.id.clone(),
                    self.hourly_offset,
                    token.child_token(),
                ));
                (panel.id.clone(), task)
            })
            .collect::<HashMap<_, _>>();
        info!(n_panels = tasks.len(), hourly_offset = ?self.hourly_offset, "started");
        self.state = Some(SchedulerState { token, tasks });
        Ok(())
    }

    /// Cancel the timers and wait for the in-flight ticks to finish.
    #[instrument(skip_all)]
    pub async fn stop(&mut self) {
        let Some(state) = self.state.take() else {
            return;
        };
        info!("stopping…");
        state.token.cancel();
        let (panel_ids, tasks): (Vec<_>, Vec<_>) = state.tasks.into_iter().unzip();
        for (panel_id, result) in panel_ids.into_iter().zip(join_all(tasks).await) {
            if let Err(error) = result {
                error!(%panel_id, "timer task crashed: {error:#}");
            }
        }
        info!("stopped");
    }
}

impl<S: SampleSource, R: RollupStore> Scheduler<S, R> {
    /// Walk the dates one by one, generating every panel for each date.
    ///
    /// A failed date does not stop the walk. The token is checked between the dates.
    #[instrument(skip_all, fields(start = %start, end = %end))]
    pub async fn backfill(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        token: &CancellationToken,
    ) -> Result<BatchOutcome<NaiveDate>> {
        let range = date_range(start, end)?;
        let mut outcome = BatchOutcome::default();
        for report_date in iter_dates(range) {
            if token.is_cancelled() {
                warn!(%outcome, "cancelled");
                bail!(ReportError::Cancelled {
                    succeeded: outcome.succeeded.len(),
                    failed: outcome.failed.len(),
                });
            }
            let result = self.generator.generate_day_all(report_date).await.ensure_complete();
            outcome.record(report_date, result);
        }
        info!(%outcome, "backfill finished");
        Ok(outcome)
    }

    /// Re-run the daily generation for all the panels on demand.
    #[instrument(skip_all, fields(report_date = %report_date))]
    pub async fn manual_trigger(&self, report_date: NaiveDate) -> Result<Vec<PanelId>> {
        self.generator.generate_day_all(report_date).await.ensure_complete()
    }
}

/// Next instant for a panel timer to wake up at.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Wakeup {
    Tick(DateTime<Utc>),

    /// The tick could not be scheduled, try again at the instant.
    Retry(DateTime<Utc>),
}

impl Wakeup {
    const fn at(self) -> DateTime<Utc> {
        match self {
            Self::Tick(instant) | Self::Retry(instant) => instant,
        }
    }
}

fn next_wakeup(clock: &PlantClock, now: DateTime<Utc>, offset: TimeDelta) -> Wakeup {
    match next_tick(clock, now, offset) {
        Ok(tick) => Wakeup::Tick(tick),
        Err(error) => {
            warn!("failed to schedule the next tick, retrying: {error:#}");
            Wakeup::Retry(now + TimeDelta::minutes(1))
        }
    }
}

/// Instant of the next tick strictly after `now`.
pub fn next_tick(clock: &PlantClock, now: DateTime<Utc>, offset: TimeDelta) -> Result<DateTime<Utc>> {
    let slot = clock.classify_hour(now);
    let window = clock.hour_window(slot.report_date, slot.hour)?;
    let tick = window.start + offset;
    Ok(if tick > now { tick } else { window.end + offset })
}

#[instrument(skip_all, fields(panel_id = %panel_id))]
async fn run_panel<S: SampleSource, R: RollupStore>(
    generator: Arc<ReportGenerator<S, R>>,
    panel_id: PanelId,
    hourly_offset: TimeDelta,
    token: CancellationToken,
) {
    loop {
        let now = Utc::now();
        let wakeup = next_wakeup(generator.clock(), now, hourly_offset);
        debug!(?wakeup, "sleeping…");
        let duration = (wakeup.at() - now).to_std().unwrap_or_default();
        tokio::select! {
            () = token.cancelled() => break,
            () = sleep(duration) => {}
        }
        if let Wakeup::Tick(tick) = wakeup {
            run_tick(&generator, &panel_id, tick, hourly_offset).await;
        }
    }
    debug!("timer finished");
}

/// Generate the hour that has just completed, close the shift that has ended since the previous tick,
/// and refresh the in-progress shift.
async fn run_tick<S: SampleSource, R: RollupStore>(
    generator: &ReportGenerator<S, R>,
    panel_id: &PanelId,
    tick: DateTime<Utc>,
    hourly_offset: TimeDelta,
) {
    let clock = generator.clock();
    let completed = clock.classify_hour(tick - hourly_offset - TimeDelta::seconds(1));
    if completed.hour == 23 {
        if let Err(error) =
            generator.generate_day_as_of(panel_id, completed.report_date, tick).await.ensure_complete()
        {
            error!(?completed, "daily tick failed: {error:#}");
        }
    } else if let Err(error) =
        generator.generate_hour(panel_id, completed.report_date, completed.hour).await
    {
        error!(?completed, "hourly tick failed: {error:#}");
    }

    // The previous tick has only seen the shift provisionally, up to that tick.
    let closed = clock.classify_shift(tick - TimeDelta::hours(1));
    if closed != clock.classify_shift(tick) {
        if let Err(error) = generator.generate_shift(panel_id, closed.report_date, closed.shift).await {
            error!(?closed, "failed to close the shift: {error:#}");
        }
    }

    if let Err(error) = generator.generate_current_shift(panel_id, tick).await {
        error!("current shift refresh failed: {error:#}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{panel::PanelConfig, shift::Shift},
        ops::RangeInclusive,
        testing::{MemorySource, MemoryStore, sample_at},
    };

    fn panels() -> Result<Vec<PanelConfig>> {
        Ok(vec![
            PanelConfig::with_known_capacity("LVMDP_1".parse()?),
            PanelConfig::with_known_capacity("LVMDP_2".parse()?),
        ])
    }

    fn scheduler(source: MemorySource) -> Result<Scheduler<MemorySource, MemoryStore>> {
        let generator =
            ReportGenerator::builder().source(source).store(MemoryStore::default()).panels(panels()?).build();
        Ok(Scheduler::builder().generator(Arc::new(generator)).build())
    }

    #[test]
    fn next_tick_in_the_same_hour() -> Result {
        let clock = PlantClock::default();
        let now = "2025-12-18T10:03:00+07:00".parse::<DateTime<Utc>>()?;
        assert_eq!(
            next_tick(&clock, now, TimeDelta::minutes(5))?,
            "2025-12-18T10:05:00+07:00".parse::<DateTime<Utc>>()?,
        );
        Ok(())
    }

    #[test]
    fn next_tick_is_strictly_after_now() -> Result {
        let clock = PlantClock::default();
        let now = "2025-12-18T10:05:00+07:00".parse::<DateTime<Utc>>()?;
        assert_eq!(
            next_tick(&clock, now, TimeDelta::minutes(5))?,
            "2025-12-18T11:05:00+07:00".parse::<DateTime<Utc>>()?,
        );
        Ok(())
    }

    #[test]
    fn next_tick_rolls_over_midnight() -> Result {
        let clock = PlantClock::default();
        let now = "2025-12-18T23:30:00+07:00".parse::<DateTime<Utc>>()?;
        assert_eq!(
            next_tick(&clock, now, TimeDelta::minutes(5))?,
            "2025-12-19T00:05:00+07:00".parse::<DateTime<Utc>>()?,
        );
        Ok(())
    }

    #[test]
    fn unschedulable_tick_is_retried() -> Result {
        let clock = PlantClock::new(chrono_tz::Europe::Amsterdam);
        let offset = TimeDelta::minutes(5);

        // The local hour ends at 02:00, which is skipped on this date.
        let now = "2025-03-30T01:30:00+01:00".parse::<DateTime<Utc>>()?;
        assert!(next_tick(&clock, now, offset).is_err());
        assert_eq!(next_wakeup(&clock, now, offset), Wakeup::Retry(now + TimeDelta::minutes(1)));

        let now = "2025-03-30T03:00:00+02:00".parse::<DateTime<Utc>>()?;
        assert_eq!(
            next_wakeup(&clock, now, offset),
            Wakeup::Tick("2025-03-30T03:05:00+02:00".parse::<DateTime<Utc>>()?),
        );
        Ok(())
    }

    #[tokio::test]
    async fn backfill_continues_past_failed_dates() -> Result {
        let source = MemorySource::default()
            .failing_on("LVMDP_2".parse()?, "2025-12-02T12:00:00+07:00".parse()?);
        let scheduler = scheduler(source)?;
        let outcome = scheduler
            .backfill("2025-12-01".parse()?, "2025-12-03".parse()?, &CancellationToken::new())
            .await?;
        assert_eq!(outcome.succeeded, ["2025-12-01".parse::<NaiveDate>()?, "2025-12-03".parse()?]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, "2025-12-02".parse::<NaiveDate>()?);

        // The healthy panel is still generated on the failed date.
        let store = scheduler.generator.store();
        assert!(store.get_daily(&"LVMDP_1".parse()?, "2025-12-02".parse()?).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn backfill_rejects_reversed_range() -> Result {
        let scheduler = scheduler(MemorySource::default())?;
        let error = scheduler
            .backfill("2025-12-03".parse()?, "2025-12-01".parse()?, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(error.downcast_ref::<ReportError>(), Some(ReportError::InvalidDateRange { .. })));
        assert_eq!(scheduler.generator.store().n_writes(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn cancelled_backfill_stops_between_dates() -> Result {
        let scheduler = scheduler(MemorySource::default())?;
        let token = CancellationToken::new();
        token.cancel();
        let error = scheduler.backfill("2025-12-01".parse()?, "2025-12-31".parse()?, &token).await.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<ReportError>(),
            Some(ReportError::Cancelled { succeeded: 0, failed: 0 })
        ));
        assert_eq!(scheduler.generator.store().n_writes(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn manual_trigger_reports_failed_panels() -> Result {
        let source = MemorySource::default()
            .failing_on("LVMDP_1".parse()?, "2025-12-18T08:00:00+07:00".parse()?);
        let scheduler = scheduler(source)?;
        let error = scheduler.manual_trigger("2025-12-18".parse()?).await.unwrap_err();
        match error.downcast_ref::<ReportError>() {
            Some(ReportError::PartialBatchFailure { succeeded, failed }) => {
                assert_eq!(succeeded, &["LVMDP_2"]);
                assert_eq!(failed.len(), 1);
                assert!(failed[0].starts_with("LVMDP_1"));
            }
            _ => panic!("unexpected error: {error:#}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn midnight_tick_generates_the_previous_day() -> Result {
        let panel_id: PanelId = "LVMDP_1".parse()?;
        let source = MemorySource::with_samples(vec![
            sample_at(&panel_id, "2025-12-18T09:00:00+07:00".parse()?, 100.0),
            sample_at(&panel_id, "2025-12-18T23:59:00+07:00".parse()?, 100.0),
        ]);
        let scheduler = scheduler(source)?;
        let tick = "2025-12-19T00:05:00+07:00".parse::<DateTime<Utc>>()?;
        run_tick(&scheduler.generator, &panel_id, tick, scheduler.hourly_offset).await;

        let store = scheduler.generator.store();
        let report = store.get_daily(&panel_id, "2025-12-18".parse()?).await?.unwrap();
        assert_eq!(report.shift(Shift::First).count, 1);
        assert_eq!(report.shift(Shift::Third).count, 1);
        let hourly = store.get_hourly_range(&panel_id, RangeInclusive::point("2025-12-18".parse()?)).await?;
        assert_eq!(hourly.len(), 24);
        Ok(())
    }

    #[tokio::test]
    async fn hourly_tick_generates_the_completed_hour() -> Result {
        let panel_id: PanelId = "LVMDP_1".parse()?;
        let source = MemorySource::with_samples(vec![
            sample_at(&panel_id, "2025-12-18T09:10:00+07:00".parse()?, 100.0),
            sample_at(&panel_id, "2025-12-18T10:01:00+07:00".parse()?, 100.0),
        ]);
        let scheduler = scheduler(source)?;
        let tick = "2025-12-18T10:05:00+07:00".parse::<DateTime<Utc>>()?;
        run_tick(&scheduler.generator, &panel_id, tick, scheduler.hourly_offset).await;

        let store = scheduler.generator.store();
        let hourly = store.get_hourly_range(&panel_id, RangeInclusive::point("2025-12-18".parse()?)).await?;
        assert_eq!(hourly.len(), 1);
        assert_eq!(hourly[0].hour, 9);
        assert_eq!(hourly[0].stats.count, 1);

        // The in-progress first shift is refreshed with both samples.
        let report = store.get_daily(&panel_id, "2025-12-18".parse()?).await?.unwrap();
        assert_eq!(report.shift(Shift::First).count, 2);
        Ok(())
    }

    #[tokio::test]
    async fn ticks_close_the_ended_shifts() -> Result {
        let panel_id: PanelId = "LVMDP_1".parse()?;
        let source = MemorySource::with_samples(vec![
            sample_at(&panel_id, "2025-12-18T23:00:00+07:00".parse()?, 100.0),
            sample_at(&panel_id, "2025-12-19T06:30:00+07:00".parse()?, 100.0),
            sample_at(&panel_id, "2025-12-19T14:20:00+07:00".parse()?, 100.0),
        ]);
        let scheduler = scheduler(source)?;
        let first_tick = "2025-12-19T00:05:00+07:00".parse::<DateTime<Utc>>()?;
        for n_hours in 0..=15 {
            let tick = first_tick + TimeDelta::hours(n_hours);
            scheduler.generator.source().hide_after(tick);
            run_tick(&scheduler.generator, &panel_id, tick, scheduler.hourly_offset).await;
        }

        let store = scheduler.generator.store();
        let report = store.get_daily(&panel_id, "2025-12-18".parse()?).await?.unwrap();
        assert_eq!(report.shift(Shift::Third).count, 2);
        let report = store.get_daily(&panel_id, "2025-12-19".parse()?).await?.unwrap();
        assert_eq!(report.shift(Shift::First).count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn start_and_stop_ok() -> Result {
        let mut scheduler = scheduler(MemorySource::default())?;
        scheduler.start()?;
        assert!(scheduler.is_running());
        assert!(scheduler.start().is_err());
        scheduler.stop().await;
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.generator.store().n_writes(), 0);
        Ok(())
    }
}
