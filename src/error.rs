use chrono::NaiveDate;
use thiserror::Error;

use crate::core::panel::PanelId;

/// Conditions that callers need to tell apart from a plain I/O failure.
///
/// These travel inside [`anyhow::Error`] and are recovered with `downcast_ref`.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("invalid date `{0}`, expected `YYYY-MM-DD`")]
    InvalidDate(String),

    #[error("invalid date range: `{start}` is after `{end}`")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("invalid shift `{0}`, expected 1, 2, or 3")]
    InvalidShift(String),

    #[error("invalid hour `{0}`, expected `0..=23`")]
    InvalidHour(u32),

    #[error("invalid period: year {year}, month {month}")]
    InvalidPeriod { year: i32, month: u32 },

    #[error("unknown panel `{0}`")]
    UnknownPanel(PanelId),

    /// The report has never been aggregated, as opposed to aggregated with zero activity.
    #[error("no data available for `{panel}` on {date}")]
    NoData { panel: PanelId, date: NaiveDate },

    #[error("no electrical data available for {start}..={end}")]
    NoElectricalData { start: NaiveDate, end: NaiveDate },

    #[error("{} succeeded, {} failed: {}", succeeded.len(), failed.len(), failed.join(", "))]
    PartialBatchFailure { succeeded: Vec<String>, failed: Vec<String> },

    #[error("cancelled after {succeeded} succeeded and {failed} failed")]
    Cancelled { succeeded: usize, failed: usize },
}

impl ReportError {
    /// Check whether the error is a [`ReportError::NoData`] or [`ReportError::NoElectricalData`].
    #[must_use]
    pub fn is_no_data(error: &anyhow::Error) -> bool {
        matches!(
            error.downcast_ref::<Self>(),
            Some(Self::NoData { .. } | Self::NoElectricalData { .. })
        )
    }
}
