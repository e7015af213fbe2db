use chrono::{DateTime, TimeDelta, Utc};
use clap::ValueEnum;
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::quantity::{energy::KilowattHours, power::Kilowatts, time::Hours};

/// Energy integration method, chosen once per deployment so that totals stay comparable across panels.
#[derive(Copy, Clone, Debug, Default, Display, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum EnergyMethod {
    /// Every sample stands for exactly one sampling interval.
    #[default]
    #[display("fixed-interval")]
    FixedInterval,

    /// Integrate over the actual time between consecutive samples.
    #[display("trapezoidal")]
    Trapezoidal,
}

#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct EnergyModel {
    pub method: EnergyMethod,

    /// Nominal time between two samples.
    pub sampling_interval: TimeDelta,
}

impl Default for EnergyModel {
    fn default() -> Self {
        Self { method: EnergyMethod::default(), sampling_interval: TimeDelta::seconds(3) }
    }
}

impl EnergyModel {
    #[must_use]
    pub fn interval_hours(&self) -> Hours {
        Hours::from(self.sampling_interval)
    }

    /// Number of samples expected over the window, used for data completeness.
    #[must_use]
    pub fn expected_samples(&self, window: TimeDelta) -> f64 {
        if self.sampling_interval <= TimeDelta::zero() {
            0.0
        } else {
            window.as_seconds_f64() / self.sampling_interval.as_seconds_f64()
        }
    }

    pub const fn integrator(&self) -> EnergyIntegrator {
        EnergyIntegrator { model: *self, previous: None, total: KilowattHours::ZERO }
    }
}

/// Running energy integral over qualifying samples of one window.
#[must_use]
pub struct EnergyIntegrator {
    model: EnergyModel,
    previous: Option<(DateTime<Utc>, Kilowatts)>,
    total: KilowattHours,
}

impl EnergyIntegrator {
    pub fn push(&mut self, timestamp: DateTime<Utc>, power: Kilowatts) {
        match self.model.method {
            EnergyMethod::FixedInterval => {
                self.total += power * self.model.interval_hours();
            }
            EnergyMethod::Trapezoidal => {
                // The first sample has no predecessor inside the window and contributes nothing.
                if let Some((previous_timestamp, previous_power)) = self.previous {
                    let time_delta = Hours::from(timestamp - previous_timestamp);
                    self.total += (power + previous_power) / 2.0 * time_delta;
                }
            }
        }
        self.previous = Some((timestamp, power));
    }

    pub const fn total(&self) -> KilowattHours {
        self.total
    }
}
