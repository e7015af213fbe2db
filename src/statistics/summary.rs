use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    core::sample::{Reading, Sample},
    ops::{RangeInclusive, include},
    quantity::{current::Amperes, energy::KilowattHours, power::Kilowatts, voltage::Volts},
    statistics::{accumulator::Accumulator, energy::EnergyModel},
};

/// Daily electrical summary of one panel.
#[must_use]
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectricalSummary {
    pub sample_count: u32,

    #[serde(rename = "energyKwh")]
    pub energy: KilowattHours,

    #[serde(rename = "avgLoadKw")]
    pub average_load: Kilowatts,

    #[serde(rename = "peakDemandKw")]
    pub peak_demand: Kilowatts,

    /// First moment the peak demand was reached.
    pub peak_demand_time: Option<DateTime<Utc>>,

    #[serde(rename = "avgVoltage")]
    pub average_voltage: Volts,

    pub min_voltage: Volts,

    pub max_voltage: Volts,

    #[serde(rename = "avgCurrent")]
    pub average_current: Amperes,

    pub max_current: Amperes,

    #[serde(rename = "avgPowerFactor")]
    pub average_power_factor: f64,

    /// Qualifying samples relative to the expected number, in percent.
    pub data_completeness_percent: f64,
}

impl ElectricalSummary {
    /// Summarize the samples of the window of the given length.
    pub fn from_samples<'a>(
        samples: impl IntoIterator<Item = &'a Sample>,
        model: &EnergyModel,
        window: TimeDelta,
    ) -> Self {
        let mut accumulator = ElectricalAccumulator::new(*model);
        for reading in samples.into_iter().filter_map(Sample::reading) {
            accumulator.push(&reading);
        }
        accumulator.finish(model.expected_samples(window))
    }
}

struct ElectricalAccumulator {
    window: Accumulator,
    peak: Option<(Kilowatts, DateTime<Utc>)>,
    total_voltage: Volts,
    voltage_range: Option<RangeInclusive<Volts>>,
}

impl ElectricalAccumulator {
    const fn new(model: EnergyModel) -> Self {
        Self { window: Accumulator::new(model), peak: None, total_voltage: Volts::ZERO, voltage_range: None }
    }

    fn push(&mut self, reading: &Reading) {
        self.window.push(reading);
        self.total_voltage += reading.voltage;
        self.voltage_range = Some(include(self.voltage_range, reading.voltage));
        // Strict comparison keeps the first occurrence.
        if self.peak.is_none_or(|(peak, _)| reading.real_power > peak) {
            self.peak = Some((reading.real_power, reading.timestamp));
        }
    }

    fn finish(&self, expected_samples: f64) -> ElectricalSummary {
        let stats = self.window.finish();
        let count = self.window.count();
        let voltage_range = self.voltage_range.unwrap_or(RangeInclusive::point(Volts::ZERO));
        let average_voltage =
            if count == 0 { Volts::ZERO } else { self.total_voltage / f64::from(count) };
        let data_completeness_percent = if expected_samples > 0.0 {
            (f64::from(count) / expected_samples * 100.0).min(100.0)
        } else {
            0.0
        };
        ElectricalSummary {
            sample_count: count,
            energy: stats.total_energy,
            average_load: self.window.average_power().finite_or_zero(),
            peak_demand: self.peak.map_or(Kilowatts::ZERO, |(peak, _)| peak.finite_or_zero()),
            peak_demand_time: self.peak.map(|(_, timestamp)| timestamp),
            average_voltage: average_voltage.finite_or_zero(),
            min_voltage: voltage_range.min.finite_or_zero(),
            max_voltage: voltage_range.max.finite_or_zero(),
            average_current: stats.average_current,
            max_current: stats.max_current,
            average_power_factor: stats.average_power_factor,
            data_completeness_percent,
        }
    }
}
