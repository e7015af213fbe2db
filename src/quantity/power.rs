use std::ops::Mul;

use chrono::TimeDelta;

use crate::quantity::{energy::KilowattHours, time::Hours};

quantity!(Kilowatts, "kW", 3);

impl Mul<Hours> for Kilowatts {
    type Output = KilowattHours;

    fn mul(self, hours: Hours) -> Self::Output {
        KilowattHours(self.0 * hours.0)
    }
}

impl Mul<TimeDelta> for Kilowatts {
    type Output = KilowattHours;

    fn mul(self, time_delta: TimeDelta) -> Self::Output {
        self * Hours::from(time_delta)
    }
}
