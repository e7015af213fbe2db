use bon::Builder;
use chrono::{DateTime, Utc};

use crate::{
    core::panel::PanelId,
    quantity::{current::Amperes, power::Kilowatts, voltage::Volts},
};

/// Raw telemetry reading as produced by the panel poller.
///
/// Any electrical field may be missing: the poller stores whatever the meter returned.
#[must_use]
#[derive(Clone, Debug, PartialEq, Builder)]
pub struct Sample {
    #[builder(into)]
    pub panel_id: PanelId,

    pub timestamp: DateTime<Utc>,

    pub real_power: Option<Kilowatts>,

    /// Average line-to-line voltage.
    pub voltage: Option<Volts>,

    #[builder(default)]
    pub phase_currents: PhaseCurrents,

    pub average_current: Option<Amperes>,

    /// Power factor, also known as `cos φ`.
    pub power_factor: Option<f64>,

    pub frequency: Option<f64>,
}

#[must_use]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PhaseCurrents {
    pub r: Option<Amperes>,
    pub s: Option<Amperes>,
    pub t: Option<Amperes>,
}

impl PhaseCurrents {
    pub const fn new(r: Amperes, s: Amperes, t: Amperes) -> Self {
        Self { r: Some(r), s: Some(s), t: Some(t) }
    }

    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.r.is_some() || self.s.is_some() || self.t.is_some()
    }

    /// Phase readings above zero.
    pub fn significant(&self) -> impl Iterator<Item = Amperes> {
        [self.r, self.s, self.t].into_iter().flatten().filter(|current| current.is_significant())
    }
}

/// Sample with all the required fields present.
#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub real_power: Kilowatts,
    pub voltage: Volts,
    pub average_current: Amperes,
    pub phase_currents: PhaseCurrents,
    pub power_factor: f64,
}

impl Sample {
    /// Get the reading, if all the required fields are present.
    ///
    /// Samples without a reading are excluded from every statistic.
    pub fn reading(&self) -> Option<Reading> {
        Some(Reading {
            timestamp: self.timestamp,
            real_power: self.real_power.filter(|power| power.0.is_finite())?,
            voltage: self.voltage.filter(|voltage| voltage.0.is_finite())?,
            average_current: self.average_current.filter(|current| current.0.is_finite())?,
            phase_currents: self.phase_currents,
            power_factor: self.power_factor.filter(|power_factor| power_factor.is_finite())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(real_power: Option<Kilowatts>) -> Sample {
        Sample::builder()
            .panel_id("LVMDP_1".parse::<PanelId>().unwrap())
            .timestamp(Utc::now())
            .maybe_real_power(real_power)
            .voltage(Volts(400.0))
            .average_current(Amperes(100.0))
            .power_factor(0.9)
            .build()
    }

    #[test]
    fn reading_requires_real_power() {
        assert!(sample(None).reading().is_none());
        assert!(sample(Some(Kilowatts(1.0))).reading().is_some());
        assert!(sample(Some(Kilowatts(f64::NAN))).reading().is_none());
    }

    #[test]
    fn significant_phases_skip_zeros() {
        let phases = PhaseCurrents { r: Some(Amperes(0.0)), s: Some(Amperes(5.0)), t: None };
        assert!(phases.is_available());
        assert_eq!(phases.significant().collect::<Vec<_>>(), vec![Amperes(5.0)]);
    }
}
