use chrono::{Days, Months, NaiveDate};

use crate::{ops::RangeInclusive, prelude::*};

/// Inclusive range of report dates.
pub type DateRange = RangeInclusive<NaiveDate>;

/// Parse the report date, strictly `YYYY-MM-DD`.
pub fn parse_report_date(s: &str) -> Result<NaiveDate, ReportError> {
    let s = s.trim();
    let is_well_formed = s.len() == 10
        && s.char_indices().all(|(i, c)| if i == 4 || i == 7 { c == '-' } else { c.is_ascii_digit() });
    if !is_well_formed {
        return Err(ReportError::InvalidDate(s.to_owned()));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| ReportError::InvalidDate(s.to_owned()))
}

/// Validate the range and make sure it is not reversed.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Result<DateRange, ReportError> {
    if start > end {
        return Err(ReportError::InvalidDateRange { start, end });
    }
    Ok(DateRange { min: start, max: end })
}

/// Dates of the calendar month.
pub fn month_range(year: i32, month: u32) -> Result<DateRange, ReportError> {
    let invalid = || ReportError::InvalidPeriod { year, month };
    if year < 1900 || !(1..=12).contains(&month) {
        return Err(invalid());
    }
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(invalid)?;
    Ok(DateRange { min: first, max: last })
}

/// Iterate every date of the range in ascending order.
pub fn iter_dates(range: DateRange) -> impl Iterator<Item = NaiveDate> {
    range.min.iter_days().take_while(move |date| *date <= range.max)
}

/// Shift the date by signed number of days.
pub fn add_days(date: NaiveDate, days: i64) -> Result<NaiveDate> {
    let shifted = if days >= 0 {
        date.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted.with_context(|| format!("{date} shifted by {days} days is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_strict_ok() -> Result {
        assert_eq!(parse_report_date("2025-12-19")?, NaiveDate::from_ymd_opt(2025, 12, 19).unwrap());
        Ok(())
    }

    #[test]
    fn parse_rejects_malformed() {
        for s in ["2025-2-19", "19-12-2025", "2025/12/19", "2025-13-01", "2025-02-30", "", "2025-12-19T00:00"] {
            assert!(
                matches!(parse_report_date(s), Err(ReportError::InvalidDate(_))),
                "`{s}` should be rejected",
            );
        }
    }

    #[test]
    fn reversed_range_fails() {
        let start = NaiveDate::from_ymd_opt(2025, 12, 19).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 12, 18).unwrap();
        assert!(matches!(date_range(start, end), Err(ReportError::InvalidDateRange { .. })));
    }

    #[test]
    fn iter_dates_inclusive() -> Result {
        let range = date_range(parse_report_date("2025-12-30")?, parse_report_date("2026-01-02")?)?;
        let dates: Vec<_> = iter_dates(range).map(|date| date.to_string()).collect();
        assert_eq!(dates, ["2025-12-30", "2025-12-31", "2026-01-01", "2026-01-02"]);
        Ok(())
    }

    #[test]
    fn month_range_ok() -> Result {
        let range = month_range(2024, 2)?;
        assert_eq!(range.max, parse_report_date("2024-02-29")?);
        let range = month_range(2025, 12)?;
        assert_eq!(range.min, parse_report_date("2025-12-01")?);
        assert_eq!(range.max, parse_report_date("2025-12-31")?);
        Ok(())
    }

    #[test]
    fn month_range_rejects_invalid() {
        assert!(month_range(2025, 0).is_err());
        assert!(month_range(2025, 13).is_err());
        assert!(month_range(1899, 12).is_err());
    }

    #[test]
    fn add_days_ok() -> Result {
        assert_eq!(add_days(parse_report_date("2025-03-01")?, -1)?, parse_report_date("2025-02-28")?);
        assert_eq!(add_days(parse_report_date("2025-12-31")?, 7)?, parse_report_date("2026-01-07")?);
        Ok(())
    }
}
