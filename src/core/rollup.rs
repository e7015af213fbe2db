use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    core::{panel::PanelId, shift::Shift},
    statistics::{WindowStats, summary::ElectricalSummary},
};

/// Per-shift rollups of one panel on one report date.
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    pub panel_id: PanelId,
    pub report_date: NaiveDate,

    /// Indexed by [`Shift::index`].
    pub shifts: [WindowStats; 3],
}

impl DailyReport {
    pub const fn empty(panel_id: PanelId, report_date: NaiveDate) -> Self {
        Self { panel_id, report_date, shifts: [WindowStats::ZERO; 3] }
    }

    pub const fn shift(&self, shift: Shift) -> &WindowStats {
        &self.shifts[shift.index()]
    }

    pub const fn shift_mut(&mut self, shift: Shift) -> &mut WindowStats {
        &mut self.shifts[shift.index()]
    }

    /// Sum over all shifts.
    #[must_use]
    pub fn total_count(&self) -> u32 {
        self.shifts.iter().map(|stats| stats.count).sum()
    }
}

/// Rollup of one local calendar hour.
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyReport {
    pub panel_id: PanelId,
    pub report_date: NaiveDate,
    pub hour: u32,

    #[serde(flatten)]
    pub stats: WindowStats,
}

impl HourlyReport {
    pub const fn placeholder(panel_id: PanelId, report_date: NaiveDate, hour: u32) -> Self {
        Self { panel_id, report_date, hour, stats: WindowStats::ZERO }
    }
}

/// Daily electrical summary of one panel.
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyElectricalReport {
    pub panel_id: PanelId,
    pub report_date: NaiveDate,

    #[serde(flatten)]
    pub summary: ElectricalSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn shift_mut_touches_only_its_shift() -> Result {
        let mut report = DailyReport::empty("LVMDP_1".parse()?, NaiveDate::MIN);
        report.shift_mut(Shift::Second).count = 42;
        assert_eq!(report.shift(Shift::First).count, 0);
        assert_eq!(report.shift(Shift::Second).count, 42);
        assert_eq!(report.shift(Shift::Third).count, 0);
        assert_eq!(report.total_count(), 42);
        Ok(())
    }

    #[test]
    fn hourly_report_is_flat() -> Result {
        let report = HourlyReport::placeholder("LVMDP_1".parse()?, NaiveDate::MIN, 7);
        let json = serde_json::to_value(&report)?;
        assert_eq!(json["hour"], 7);
        assert_eq!(json["count"], 0);
        assert!(json.get("stats").is_none());
        Ok(())
    }
}
