use std::fmt::{Display, Formatter};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use itertools::Itertools;
use serde::Serialize;

use crate::{
    core::{
        date::{DateRange, add_days, month_range},
        panel::{PanelConfig, PanelId},
        rollup::DailyElectricalReport,
    },
    ops::{RangeInclusive, include},
    prelude::*,
    quantity::{current::Amperes, energy::KilowattHours, power::Kilowatts, voltage::Volts},
    statistics::energy::EnergyModel,
};

/// Panels below this completeness are reported offline.
const ONLINE_COMPLETENESS_PERCENT: f64 = 50.0;

/// Reporting period of the electrical summary.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "period", rename_all = "camelCase")]
pub enum Period {
    Day { date: NaiveDate },

    /// Seven days starting from the date.
    Week { start: NaiveDate },

    Month { year: i32, month: u32 },
}

impl Period {
    /// Validate the month period.
    pub fn month(year: i32, month: u32) -> Result<Self, ReportError> {
        month_range(year, month)?;
        Ok(Self::Month { year, month })
    }

    pub fn dates(self) -> Result<DateRange> {
        match self {
            Self::Day { date } => Ok(RangeInclusive::point(date)),
            Self::Week { start } => Ok(DateRange { min: start, max: add_days(start, 6)? }),
            Self::Month { year, month } => Ok(month_range(year, month)?),
        }
    }

    /// Preceding period of the same kind.
    pub fn previous(self) -> Result<Self> {
        match self {
            Self::Day { date } => Ok(Self::Day { date: add_days(date, -1)? }),
            Self::Week { start } => Ok(Self::Week { start: add_days(start, -7)? }),
            Self::Month { year, month } => {
                let first = month_range(year, month)?.min;
                let previous = add_days(first, -1)?;
                Ok(Self::Month { year: previous.year(), month: previous.month() })
            }
        }
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Day { date } => write!(f, "{date}"),
            Self::Week { start } => write!(f, "week of {start}"),
            Self::Month { year, month } => write!(f, "{year}-{month:02}"),
        }
    }
}

#[derive(Copy, Clone, Debug, derive_more::Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelStatus {
    #[display("online")]
    Online,

    #[display("offline")]
    Offline,
}

#[must_use]
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelSummary {
    pub panel_id: PanelId,
    pub panel_name: String,
    pub energy: KilowattHours,
    pub average_load: Kilowatts,
    pub peak_demand: Kilowatts,
    pub peak_demand_time: Option<DateTime<Utc>>,
    pub average_voltage: Volts,
    pub average_current: Amperes,
    pub average_power_factor: f64,
    pub contribution_percent: f64,
    pub data_completeness_percent: f64,
    pub status: PanelStatus,
}

#[must_use]
#[derive(Copy, Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoltageEnvelope {
    pub average: Volts,
    pub min: Volts,
    pub max: Volts,
}

#[must_use]
#[derive(Copy, Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    pub total_energy: KilowattHours,

    /// Sum of the panel average loads.
    pub average_load: Kilowatts,

    pub peak_demand: Kilowatts,
    pub peak_demand_time: Option<DateTime<Utc>>,
    pub installed_capacity: Kilowatts,
    pub utilization_percent: f64,
    pub load_factor_percent: f64,
    pub average_power_factor: f64,
    pub voltage: VoltageEnvelope,
}

#[must_use]
#[derive(Copy, Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub previous_total_energy: KilowattHours,
    pub previous_peak_demand: Kilowatts,
    pub energy_change_percent: f64,
    pub peak_demand_change_percent: f64,
}

#[must_use]
#[derive(Copy, Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub data_points: u64,
    pub sampling_interval_seconds: f64,
    pub data_completeness_percent: f64,
}

/// Electrical summary of all panels over a period.
#[must_use]
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodReport {
    #[serde(flatten)]
    pub period: Period,

    pub start: NaiveDate,
    pub end: NaiveDate,
    pub summary: PeriodSummary,
    pub panels: Vec<PanelSummary>,
    pub comparison: Comparison,
    pub metadata: Metadata,
}

impl PeriodReport {
    /// Summarize the stored daily reports of the period and compare against the previous one.
    pub fn build(
        period: Period,
        reports: &[DailyElectricalReport],
        previous_reports: &[DailyElectricalReport],
        panels: &[PanelConfig],
        model: &EnergyModel,
    ) -> Result<Self> {
        let dates = period.dates()?;
        if reports.is_empty() {
            bail!(ReportError::NoElectricalData { start: dates.min, end: dates.max });
        }

        let mut panel_summaries = summarize_panels(reports);
        let total_energy: KilowattHours = panel_summaries.iter().map(|panel| panel.energy).sum();
        for panel in &mut panel_summaries {
            panel.contribution_percent = percent(panel.energy.0, total_energy.0);
        }

        let average_load: Kilowatts = panel_summaries.iter().map(|panel| panel.average_load).sum();
        let (peak_demand, peak_demand_time) = peak_of(
            panel_summaries.iter().map(|panel| (panel.peak_demand, panel.peak_demand_time)),
        );
        let installed_capacity: Kilowatts = panels
            .iter()
            .filter(|panel| panel_summaries.iter().any(|summary| summary.panel_id == panel.id))
            .map(|panel| panel.capacity)
            .sum();
        let (previous_total_energy, previous_peak_demand) = totals_of(previous_reports);

        let summary = PeriodSummary {
            total_energy,
            average_load,
            peak_demand,
            peak_demand_time,
            installed_capacity,
            utilization_percent: percent(average_load.0, installed_capacity.0),
            load_factor_percent: percent(average_load.0, peak_demand.0),
            average_power_factor: load_weighted_power_factor(
                panel_summaries.iter().map(|panel| (panel.average_power_factor, panel.average_load)),
            ),
            voltage: voltage_envelope(reports),
        };
        let comparison = Comparison {
            previous_total_energy,
            previous_peak_demand,
            energy_change_percent: change_percent(total_energy.0, previous_total_energy.0),
            peak_demand_change_percent: change_percent(peak_demand.0, previous_peak_demand.0),
        };
        let metadata = Metadata {
            data_points: reports.iter().map(|report| u64::from(report.summary.sample_count)).sum(),
            sampling_interval_seconds: model.sampling_interval.as_seconds_f64(),
            data_completeness_percent: mean(
                reports.iter().map(|report| report.summary.data_completeness_percent),
            ),
        };
        Ok(Self {
            period,
            start: dates.min,
            end: dates.max,
            summary,
            panels: panel_summaries,
            comparison,
            metadata,
        })
    }
}

fn summarize_panels(reports: &[DailyElectricalReport]) -> Vec<PanelSummary> {
    reports
        .iter()
        .into_group_map_by(|report| &report.panel_id)
        .into_iter()
        .sorted_by(|(lhs, _), (rhs, _)| lhs.cmp(rhs))
        .map(|(panel_id, reports)| {
            let (peak_demand, peak_demand_time) = peak_of(
                reports.iter().map(|report| (report.summary.peak_demand, report.summary.peak_demand_time)),
            );
            let data_completeness_percent =
                mean(reports.iter().map(|report| report.summary.data_completeness_percent));
            PanelSummary {
                panel_id: panel_id.clone(),
                panel_name: panel_id.display_name(),
                energy: reports.iter().map(|report| report.summary.energy).sum(),
                average_load: Kilowatts(mean(reports.iter().map(|report| report.summary.average_load.0))),
                peak_demand,
                peak_demand_time,
                average_voltage: Volts(mean(reports.iter().map(|report| report.summary.average_voltage.0))),
                average_current: Amperes(mean(
                    reports.iter().map(|report| report.summary.average_current.0),
                )),
                average_power_factor: load_weighted_power_factor(reports.iter().map(|report| {
                    (report.summary.average_power_factor, report.summary.average_load)
                })),
                contribution_percent: 0.0,
                data_completeness_percent,
                status: if data_completeness_percent >= ONLINE_COMPLETENESS_PERCENT {
                    PanelStatus::Online
                } else {
                    PanelStatus::Offline
                },
            }
        })
        .collect()
}

/// Highest peak, the first one wins on ties.
fn peak_of(
    peaks: impl IntoIterator<Item = (Kilowatts, Option<DateTime<Utc>>)>,
) -> (Kilowatts, Option<DateTime<Utc>>) {
    peaks.into_iter().fold((Kilowatts::ZERO, None), |peak, candidate| {
        if candidate.0 > peak.0 { candidate } else { peak }
    })
}

fn totals_of(reports: &[DailyElectricalReport]) -> (KilowattHours, Kilowatts) {
    let energy = reports.iter().map(|report| report.summary.energy).sum();
    let (peak, _) = peak_of(reports.iter().map(|report| (report.summary.peak_demand, None)));
    (energy, peak)
}

fn voltage_envelope(reports: &[DailyElectricalReport]) -> VoltageEnvelope {
    // Days without samples carry zero voltages, which must not drag the envelope down.
    let measured = reports.iter().filter(|report| report.summary.sample_count != 0).collect_vec();
    let range = measured.iter().fold(None, |range, report| {
        Some(include(Some(include(range, report.summary.min_voltage)), report.summary.max_voltage))
    });
    let range = range.unwrap_or(RangeInclusive::point(Volts::ZERO));
    VoltageEnvelope {
        average: Volts(mean(measured.iter().map(|report| report.summary.average_voltage.0))),
        min: range.min,
        max: range.max,
    }
}

fn load_weighted_power_factor(items: impl IntoIterator<Item = (f64, Kilowatts)>) -> f64 {
    let (weighted, total_load) = items
        .into_iter()
        .fold((0.0, 0.0), |(weighted, total), (power_factor, load)| {
            (weighted + power_factor * load.0, total + load.0)
        });
    if total_load == 0.0 { 0.0 } else { weighted / total_load }
}

fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values.into_iter().fold((0.0, 0_u32), |(sum, count), value| (sum + value, count + 1));
    if count == 0 { 0.0 } else { sum / f64::from(count) }
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole == 0.0 { 0.0 } else { part / whole * 100.0 }
}

fn change_percent(current: f64, previous: f64) -> f64 {
    if previous > 0.0 { (current - previous) / previous * 100.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::statistics::summary::ElectricalSummary;

    fn report(panel_id: &str, date: &str, energy: f64, load: f64, peak: f64) -> DailyElectricalReport {
        DailyElectricalReport {
            panel_id: panel_id.parse().unwrap(),
            report_date: date.parse().unwrap(),
            summary: ElectricalSummary {
                sample_count: 1000,
                energy: KilowattHours(energy),
                average_load: Kilowatts(load),
                peak_demand: Kilowatts(peak),
                peak_demand_time: Some(DateTime::<Utc>::UNIX_EPOCH),
                average_voltage: Volts(400.0),
                min_voltage: Volts(390.0),
                max_voltage: Volts(410.0),
                average_current: Amperes(100.0),
                max_current: Amperes(150.0),
                average_power_factor: 0.9,
                data_completeness_percent: 80.0,
            },
        }
    }

    fn panels() -> Vec<PanelConfig> {
        ["LVMDP_1", "LVMDP_2"]
            .into_iter()
            .map(|id| PanelConfig::with_known_capacity(id.parse().unwrap()))
            .collect()
    }

    #[test]
    fn day_summary_ok() -> Result {
        let period = Period::Day { date: "2025-12-19".parse()? };
        let reports = [
            report("LVMDP_1", "2025-12-19", 300.0, 100.0, 200.0),
            report("LVMDP_2", "2025-12-19", 100.0, 50.0, 250.0),
        ];
        let previous = [report("LVMDP_1", "2025-12-18", 200.0, 100.0, 125.0)];
        let report = PeriodReport::build(period, &reports, &previous, &panels(), &EnergyModel::default())?;

        assert_abs_diff_eq!(report.summary.total_energy.0, 400.0);
        assert_abs_diff_eq!(report.summary.average_load.0, 150.0);
        assert_abs_diff_eq!(report.summary.peak_demand.0, 250.0);
        assert_abs_diff_eq!(report.summary.installed_capacity.0, 2000.0);
        assert_abs_diff_eq!(report.summary.utilization_percent, 7.5);
        assert_abs_diff_eq!(report.summary.load_factor_percent, 60.0);
        assert_abs_diff_eq!(report.panels[0].contribution_percent, 75.0);
        assert_eq!(report.panels[1].status, PanelStatus::Online);
        assert_abs_diff_eq!(report.comparison.energy_change_percent, 100.0);
        assert_abs_diff_eq!(report.comparison.peak_demand_change_percent, 100.0);
        assert_eq!(report.metadata.data_points, 2000);
        Ok(())
    }

    #[test]
    fn week_averages_daily_loads() -> Result {
        let period = Period::Week { start: "2025-12-15".parse()? };
        let reports = [
            report("LVMDP_1", "2025-12-15", 100.0, 100.0, 200.0),
            report("LVMDP_1", "2025-12-16", 100.0, 300.0, 400.0),
        ];
        let report = PeriodReport::build(period, &reports, &[], &panels(), &EnergyModel::default())?;
        assert_eq!(report.end, "2025-12-21".parse::<NaiveDate>()?);
        assert_abs_diff_eq!(report.panels[0].average_load.0, 200.0);
        assert_abs_diff_eq!(report.panels[0].energy.0, 200.0);
        assert_abs_diff_eq!(report.comparison.energy_change_percent, 0.0);
        Ok(())
    }

    #[test]
    fn empty_period_is_no_data() -> Result {
        let error = PeriodReport::build(
            Period::Day { date: "2025-12-19".parse()? },
            &[],
            &[],
            &panels(),
            &EnergyModel::default(),
        )
        .unwrap_err();
        assert!(ReportError::is_no_data(&error));
        Ok(())
    }

    #[test]
    fn previous_month_wraps_year() -> Result {
        assert_eq!(Period::month(2026, 1)?.previous()?, Period::Month { year: 2025, month: 12 });
        assert!(Period::month(2026, 13).is_err());
        Ok(())
    }

    #[test]
    fn peak_first_occurrence_wins() {
        let first = DateTime::<Utc>::UNIX_EPOCH;
        let second = first + chrono::TimeDelta::hours(1);
        let (peak, time) = peak_of([(Kilowatts(5.0), Some(first)), (Kilowatts(5.0), Some(second))]);
        assert_eq!(peak, Kilowatts(5.0));
        assert_eq!(time, Some(first));
    }
}
