use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::{core::shift::Shift, ops::Interval, prelude::*};

/// Maps instants onto the plant's local-time shift and hour windows.
///
/// Raw timestamps are instants, while the windows are defined in local wall-clock time:
/// the time zone is always explicit and never taken from the host.
#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct PlantClock {
    timezone: Tz,
}

impl Default for PlantClock {
    fn default() -> Self {
        Self::new(chrono_tz::Asia::Jakarta)
    }
}

#[must_use]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftSlot {
    pub shift: Shift,
    pub report_date: NaiveDate,
}

#[must_use]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourSlot {
    pub hour: u32,
    pub report_date: NaiveDate,
}

impl PlantClock {
    pub const fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    #[cfg(test)]
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn local(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        instant.with_timezone(&self.timezone)
    }

    #[must_use]
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local(now).date_naive()
    }

    /// Classify the instant into its shift and report date.
    ///
    /// Instants between local midnight and 07:01 belong to the *previous* date's third shift.
    pub fn classify_shift(&self, instant: DateTime<Utc>) -> ShiftSlot {
        let local = self.local(instant);
        let (shift, is_previous_day) = Shift::of_minute(local.hour() * 60 + local.minute());
        let report_date = if is_previous_day {
            local.date_naive().pred_opt().unwrap_or(NaiveDate::MIN)
        } else {
            local.date_naive()
        };
        ShiftSlot { shift, report_date }
    }

    /// Truncate the instant to its local calendar hour.
    pub fn classify_hour(&self, instant: DateTime<Utc>) -> HourSlot {
        let local = self.local(instant);
        HourSlot { hour: local.hour(), report_date: local.date_naive() }
    }

    /// Absolute window of the shift on the report date.
    pub fn shift_window(&self, report_date: NaiveDate, shift: Shift) -> Result<Interval> {
        Ok(Interval::new(
            self.at_minute(report_date, shift.start_minute())?,
            self.at_minute(report_date, shift.end_minute())?,
        ))
    }

    /// Absolute window of the local calendar day.
    pub fn day_window(&self, report_date: NaiveDate) -> Result<Interval> {
        let next_date = report_date
            .checked_add_days(Days::new(1))
            .with_context(|| format!("{report_date} has no next day"))?;
        Ok(Interval::new(self.start_of(report_date)?, self.start_of(next_date)?))
    }

    /// Absolute window of the local calendar hour.
    pub fn hour_window(&self, report_date: NaiveDate, hour: u32) -> Result<Interval> {
        if hour > 23 {
            bail!(ReportError::InvalidHour(hour));
        }
        let start = self.at_minute(report_date, hour * 60)?;
        let end = self.at_minute(report_date, (hour + 1) * 60)?;
        Ok(Interval::new(start, end))
    }

    pub fn start_of(&self, date: NaiveDate) -> Result<DateTime<Utc>> {
        self.resolve(date.and_time(NaiveTime::MIN))
    }

    /// Local date plus an offset in minutes, which may overflow into the next day.
    fn at_minute(&self, date: NaiveDate, minutes: u32) -> Result<DateTime<Utc>> {
        let local = date
            .and_time(NaiveTime::MIN)
            .checked_add_signed(TimeDelta::minutes(i64::from(minutes)))
            .with_context(|| format!("{date} + {minutes} minutes is out of range"))?;
        self.resolve(local)
    }

    /// Resolve the local wall-clock time into an instant.
    ///
    /// Ambiguous times resolve to the earliest instant, and skipped times are an error.
    fn resolve(&self, local: NaiveDateTime) -> Result<DateTime<Utc>> {
        self.timezone
            .from_local_datetime(&local)
            .earliest()
            .map(|instant| instant.with_timezone(&Utc))
            .with_context(|| format!("`{local}` does not exist in `{}`", self.timezone))
    }
}
