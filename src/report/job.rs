use std::time::Instant;

use chrono::NaiveDate;
use derive_more::Display;

use crate::{core::panel::PanelId, prelude::*};

/// Progress of a single report generation.
#[derive(Copy, Clone, Debug, Display, Eq, PartialEq)]
pub enum JobState {
    #[display("not started")]
    NotStarted,

    #[display("fetching samples")]
    FetchingSamples,

    #[display("aggregating")]
    Aggregating,

    #[display("persisting")]
    Persisting,

    /// Final data for a closed window.
    #[display("done")]
    Done,

    /// Persisted, but the window is still accumulating samples.
    #[display("provisional")]
    Provisional,

    #[display("failed")]
    Failed,
}

impl JobState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Provisional | Self::Failed)
    }

    #[must_use]
    pub const fn can_enter(self, next: Self) -> bool {
        match next {
            Self::Failed => !self.is_terminal(),
            Self::FetchingSamples => matches!(self, Self::NotStarted),
            Self::Aggregating => matches!(self, Self::FetchingSamples),
            Self::Persisting => matches!(self, Self::Aggregating),
            Self::Done | Self::Provisional => matches!(self, Self::Persisting),
            Self::NotStarted => false,
        }
    }
}

/// Generation of one report for a panel and date.
#[must_use]
pub struct ReportJob<'a> {
    pub panel_id: &'a PanelId,
    pub report_date: NaiveDate,
    state: JobState,
    start_time: Instant,
}

impl<'a> ReportJob<'a> {
    pub fn new(panel_id: &'a PanelId, report_date: NaiveDate) -> Self {
        Self { panel_id, report_date, state: JobState::NotStarted, start_time: Instant::now() }
    }

    #[cfg(test)]
    #[must_use]
    pub const fn state(&self) -> JobState {
        self.state
    }

    pub fn enter(&mut self, next: JobState) -> Result {
        ensure!(
            self.state.can_enter(next),
            "`{}` on {}: invalid transition from `{}` to `{next}`",
            self.panel_id,
            self.report_date,
            self.state,
        );
        trace!(from = %self.state, to = %next, "transition");
        self.state = next;
        Ok(())
    }

    /// Close the job with the result, moving it into [`JobState::Failed`] on error.
    pub fn finish<T>(mut self, result: Result<T>) -> Result<T> {
        let elapsed = self.start_time.elapsed();
        match &result {
            Ok(_) => debug!(state = %self.state, ?elapsed, "finished"),
            Err(error) => {
                if self.state.can_enter(JobState::Failed) {
                    self.state = JobState::Failed;
                }
                warn!(state = %self.state, ?elapsed, "failed: {error:#}");
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_ok() -> Result {
        let panel_id: PanelId = "LVMDP_1".parse()?;
        let mut job = ReportJob::new(&panel_id, NaiveDate::MIN);
        for state in [JobState::FetchingSamples, JobState::Aggregating, JobState::Persisting, JobState::Done] {
            job.enter(state)?;
        }
        assert_eq!(job.state(), JobState::Done);
        assert!(job.enter(JobState::Failed).is_err());
        Ok(())
    }

    #[test]
    fn skipping_states_fails() -> Result {
        let panel_id: PanelId = "LVMDP_1".parse()?;
        let mut job = ReportJob::new(&panel_id, NaiveDate::MIN);
        assert!(job.enter(JobState::Persisting).is_err());
        assert_eq!(job.state(), JobState::NotStarted);
        Ok(())
    }

    #[test]
    fn failed_is_reachable_from_any_non_terminal_state() {
        for state in [
            JobState::NotStarted,
            JobState::FetchingSamples,
            JobState::Aggregating,
            JobState::Persisting,
        ] {
            assert!(state.can_enter(JobState::Failed), "{state}");
        }
        assert!(!JobState::Provisional.can_enter(JobState::Failed));
    }
}
