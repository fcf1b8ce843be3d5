//! Fare computation.
//!
//! [`compute_fare`] is a pure function over the entry time, the exit time,
//! the spot type and the visitor's recurrence status. It performs no I/O and
//! touches no shared state, so identical inputs always produce identical
//! prices.
//!
//! Durations are measured in whole seconds and converted to fractional
//! hours. The final price is rounded to three decimal places, which keeps
//! the reference rates (1.5/hr for cars, 1.0/hr for bikes) and the 5%
//! recurring discount exact.

use chrono::{DateTime, TimeDelta, Utc};

use crate::construct::SpotType;
use crate::error::{LotError, Result};

/// The first half hour of parking is free, for every vehicle type.
pub const FREE_PARKING_HOURS: f64 = 0.5;

/// Multiplier applied to the price of a recurring visitor (a flat 5% off).
pub const RECURRENT_DISCOUNT: f64 = 0.95;

/// Hourly rates per spot type. Deployment parameters, passed in explicitly
/// at construction time rather than read from anywhere global.
#[derive(Clone, Copy, Debug)]
pub struct FareSchedule {
    pub car_rate_per_hour: f64,
    pub bike_rate_per_hour: f64,
}

impl Default for FareSchedule {
    fn default() -> Self {
        Self {
            car_rate_per_hour: 1.5,
            bike_rate_per_hour: 1.0,
        }
    }
}

impl FareSchedule {
    pub fn rate_per_hour(&self, spot_type: SpotType) -> f64 {
        match spot_type {
            SpotType::Car => self.car_rate_per_hour,
            SpotType::Bike => self.bike_rate_per_hour,
        }
    }
    /// A misconfigured rate must abort loading, never default to zero or a
    /// guessed value.
    pub fn validate(&self) -> Result<()> {
        for spot_type in SpotType::ALL {
            let rate = self.rate_per_hour(spot_type);
            if !rate.is_finite() || rate < 0.0 {
                return Err(LotError::Config(format!(
                    "invalid {spot_type} rate per hour: {rate}"
                )));
            }
        }
        Ok(())
    }
}

/// Computes the price of a stay from `in_time` to `out_time`.
///
/// Fails with [`LotError::InvalidInterval`] when the exit time precedes the
/// entry time. Stays within the grace period are free; the recurring
/// discount never applies to a free stay. The result is never negative.
pub fn compute_fare(
    in_time: DateTime<Utc>,
    out_time: DateTime<Utc>,
    spot_type: SpotType,
    recurrent: bool,
    schedule: &FareSchedule,
) -> Result<f64> {
    let elapsed = out_time.signed_duration_since(in_time);
    if elapsed < TimeDelta::zero() {
        return Err(LotError::InvalidInterval { in_time, out_time });
    }
    let hours = elapsed.num_seconds() as f64 / 3600.0;
    if hours <= FREE_PARKING_HOURS {
        return Ok(0.0);
    }
    let mut price = hours * schedule.rate_per_hour(spot_type);
    if recurrent {
        price *= RECURRENT_DISCOUNT;
    }
    Ok(round_to_mills(price))
}

fn round_to_mills(price: f64) -> f64 {
    (price * 1000.0).round() / 1000.0
}
