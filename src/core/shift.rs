use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::prelude::*;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// One of the three fixed daily work periods.
///
/// Local wall-clock windows, relative to the report date:
///
/// - first: `07:01..14:31`
/// - second: `14:31..22:01`
/// - third: `22:01..07:01` of the next calendar day
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Shift {
    First,
    Second,
    Third,
}

impl Shift {
    pub const ALL: [Self; 3] = [Self::First, Self::Second, Self::Third];

    /// Start of the first shift, minutes since local midnight.
    const DAY_START_MINUTE: u32 = 7 * 60 + 1;

    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
            Self::Third => 3,
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.number() as usize - 1
    }

    /// Stored sub-document key, the only place where the shift becomes a string.
    #[must_use]
    pub const fn document_key(self) -> &'static str {
        match self {
            Self::First => "shift1",
            Self::Second => "shift2",
            Self::Third => "shift3",
        }
    }

    /// Window start in minutes since the report date's local midnight.
    #[must_use]
    pub const fn start_minute(self) -> u32 {
        match self {
            Self::First => Self::DAY_START_MINUTE,
            Self::Second => 14 * 60 + 31,
            Self::Third => 22 * 60 + 1,
        }
    }

    /// Window end (exclusive) in minutes since the report date's local midnight.
    ///
    /// The third shift ends on the next calendar day, hence the value above [`MINUTES_PER_DAY`].
    #[must_use]
    pub const fn end_minute(self) -> u32 {
        match self {
            Self::First => Self::Second.start_minute(),
            Self::Second => Self::Third.start_minute(),
            Self::Third => MINUTES_PER_DAY + Self::DAY_START_MINUTE,
        }
    }

    /// Classify minutes since local midnight.
    ///
    /// Returns the shift and whether it belongs to the previous calendar date,
    /// which is the case for the third shift's after-midnight part.
    #[must_use]
    pub const fn of_minute(minute_of_day: u32) -> (Self, bool) {
        if minute_of_day < Self::DAY_START_MINUTE {
            (Self::Third, true)
        } else if minute_of_day < Self::Second.start_minute() {
            (Self::First, false)
        } else if minute_of_day < Self::Third.start_minute() {
            (Self::Second, false)
        } else {
            (Self::Third, false)
        }
    }
}

impl Display for Shift {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "shift {}", self.number())
    }
}

impl From<Shift> for u8 {
    fn from(shift: Shift) -> Self {
        shift.number()
    }
}

impl TryFrom<u8> for Shift {
    type Error = ReportError;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        match number {
            1 => Ok(Self::First),
            2 => Ok(Self::Second),
            3 => Ok(Self::Third),
            _ => Err(ReportError::InvalidShift(number.to_string())),
        }
    }
}

impl FromStr for Shift {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .map_err(|_| ReportError::InvalidShift(s.to_owned()))
            .and_then(Self::try_from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_are_contiguous() {
        assert_eq!(Shift::First.end_minute(), Shift::Second.start_minute());
        assert_eq!(Shift::Second.end_minute(), Shift::Third.start_minute());
        assert_eq!(Shift::Third.end_minute(), Shift::First.start_minute() + MINUTES_PER_DAY);
        let total: u32 = Shift::ALL.iter().map(|shift| shift.end_minute() - shift.start_minute()).sum();
        assert_eq!(total, MINUTES_PER_DAY);
    }

    #[test]
    fn of_minute_boundaries_ok() {
        assert_eq!(Shift::of_minute(0), (Shift::Third, true));
        assert_eq!(Shift::of_minute(7 * 60), (Shift::Third, true));
        assert_eq!(Shift::of_minute(7 * 60 + 1), (Shift::First, false));
        assert_eq!(Shift::of_minute(14 * 60 + 30), (Shift::First, false));
        assert_eq!(Shift::of_minute(14 * 60 + 31), (Shift::Second, false));
        assert_eq!(Shift::of_minute(22 * 60), (Shift::Second, false));
        assert_eq!(Shift::of_minute(22 * 60 + 1), (Shift::Third, false));
        assert_eq!(Shift::of_minute(MINUTES_PER_DAY - 1), (Shift::Third, false));
    }

    #[test]
    fn every_minute_falls_into_its_own_window() {
        for minute in 0..MINUTES_PER_DAY {
            let (shift, is_previous_day) = Shift::of_minute(minute);
            let relative = if is_previous_day { minute + MINUTES_PER_DAY } else { minute };
            assert!(
                (shift.start_minute()..shift.end_minute()).contains(&relative),
                "minute {minute} classified as {shift}",
            );
        }
    }

    #[test]
    fn parse_ok() {
        assert_eq!("2".parse::<Shift>().ok(), Some(Shift::Second));
        assert!("4".parse::<Shift>().is_err());
        assert!("x".parse::<Shift>().is_err());
    }

    #[test]
    fn serde_as_number_ok() -> Result {
        assert_eq!(serde_json::to_string(&Shift::Third)?, "3");
        assert_eq!(serde_json::from_str::<Shift>("1")?, Shift::First);
        assert!(serde_json::from_str::<Shift>("0").is_err());
        Ok(())
    }
}
