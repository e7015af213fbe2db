pub mod accumulator;
pub mod energy;
pub mod summary;

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::{
    core::sample::Sample,
    prelude::*,
    quantity::{current::Amperes, energy::KilowattHours},
    statistics::{accumulator::Accumulator, energy::EnergyModel},
};

/// Rollup over a single shift or hour.
///
/// Always fully populated: an empty window yields all zeros rather than missing values.
#[must_use]
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowStats {
    /// Number of qualifying samples.
    pub count: u32,

    #[serde(rename = "totalKwh")]
    pub total_energy: KilowattHours,

    /// Mean power over one sampling interval, not `total_energy / count`.
    #[serde(rename = "avgKwh")]
    pub average_energy: KilowattHours,

    #[serde(rename = "avgCurrent")]
    pub average_current: Amperes,

    pub min_current: Amperes,

    pub max_current: Amperes,

    /// Power-weighted power factor.
    #[serde(rename = "avgCosPhi")]
    pub average_power_factor: f64,
}

impl WindowStats {
    pub const ZERO: Self = Self {
        count: 0,
        total_energy: KilowattHours::ZERO,
        average_energy: KilowattHours::ZERO,
        average_current: Amperes::ZERO,
        min_current: Amperes::ZERO,
        max_current: Amperes::ZERO,
        average_power_factor: 0.0,
    };

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Aggregate the time-ordered samples of one window.
///
/// Samples missing any of the required fields are skipped.
pub fn aggregate<'a>(samples: impl IntoIterator<Item = &'a Sample>, model: &EnergyModel) -> WindowStats {
    let start_time = Instant::now();
    let mut accumulator = Accumulator::new(*model);
    let mut n_skipped = 0_usize;
    for sample in samples {
        match sample.reading() {
            Some(reading) => accumulator.push(&reading),
            None => n_skipped += 1,
        }
    }
    let stats = accumulator.finish();
    trace!(count = stats.count, n_skipped, elapsed = ?start_time.elapsed(), "aggregated");
    stats
}
