use crate::{
    core::sample::Reading,
    ops::{RangeInclusive, include},
    quantity::{current::Amperes, power::Kilowatts},
    statistics::{
        WindowStats,
        energy::{EnergyIntegrator, EnergyModel},
    },
};

/// Running shift or hourly statistics.
#[must_use]
pub struct Accumulator {
    model: EnergyModel,
    count: u32,
    total_power: Kilowatts,
    total_current: Amperes,

    /// `Σ(cos φ × P)`, divided by `ΣP` at the end.
    weighted_power_factor: f64,

    current_range: Option<RangeInclusive<Amperes>>,
    energy: EnergyIntegrator,
}

impl Accumulator {
    pub const fn new(model: EnergyModel) -> Self {
        Self {
            model,
            count: 0,
            total_power: Kilowatts::ZERO,
            total_current: Amperes::ZERO,
            weighted_power_factor: 0.0,
            current_range: None,
            energy: model.integrator(),
        }
    }

    pub fn push(&mut self, reading: &Reading) {
        self.count += 1;
        self.total_power += reading.real_power;
        self.total_current += reading.average_current;
        self.weighted_power_factor += reading.power_factor * reading.real_power.0;
        self.energy.push(reading.timestamp, reading.real_power);

        if reading.phase_currents.is_available() {
            for current in reading.phase_currents.significant() {
                self.current_range = Some(include(self.current_range, current));
            }
        } else {
            self.current_range = Some(include(self.current_range, reading.average_current));
        }
    }

    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    pub fn average_power(&self) -> Kilowatts {
        if self.count == 0 { Kilowatts::ZERO } else { self.total_power / f64::from(self.count) }
    }

    pub fn average_current(&self) -> Amperes {
        if self.count == 0 { Amperes::ZERO } else { self.total_current / f64::from(self.count) }
    }

    #[must_use]
    pub fn average_power_factor(&self) -> f64 {
        if self.total_power.0 == 0.0 {
            0.0
        } else {
            self.weighted_power_factor / self.total_power.0
        }
    }

    pub fn finish(&self) -> WindowStats {
        let current_range = self.current_range.unwrap_or(RangeInclusive::point(Amperes::ZERO));
        WindowStats {
            count: self.count,
            total_energy: self.energy.total().finite_or_zero(),
            average_energy: (self.average_power() * self.model.interval_hours()).finite_or_zero(),
            average_current: self.average_current().finite_or_zero(),
            min_current: current_range.min.finite_or_zero(),
            max_current: current_range.max.finite_or_zero(),
            average_power_factor: finite_or_zero(self.average_power_factor()),
        }
    }
}

const fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
