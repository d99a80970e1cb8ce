use crate::error::{Result, StatusError};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl FromStr for GeoPoint {
    type Err = String;

    /// Parses `"lat,lon"`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| format!("expected `lat,lon`, got {s:?}"))?;
        let lat: f64 = lat.trim().parse().map_err(|e| format!("bad latitude: {e}"))?;
        let lon: f64 = lon.trim().parse().map_err(|e| format!("bad longitude: {e}"))?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(format!("coordinate out of range: {lat},{lon}"));
        }
        Ok(Self { lat, lon })
    }
}

/// Great-circle distance between two points, in kilometres.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    // Rounding can push `h` just past 1 for antipodal points.
    let h = ((d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2))
    .clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Flat fee plus a per-kilometre rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryFeeSchedule {
    pub base_fee: Decimal,
    pub per_km: Decimal,
}

impl Default for DeliveryFeeSchedule {
    fn default() -> Self {
        Self {
            base_fee: Decimal::new(5, 0),
            per_km: Decimal::new(1, 0),
        }
    }
}

impl DeliveryFeeSchedule {
    /// Quotes the fee for a trip, rounded half-up to exactly 2 decimal places.
    ///
    /// Fails with [`StatusError::InvalidDistance`] when the points do not give
    /// a finite distance, e.g. a `NaN` coordinate built with [`GeoPoint::new`].
    pub fn quote(&self, from: GeoPoint, to: GeoPoint) -> Result<Decimal> {
        let distance = haversine_km(from, to);
        let km = Decimal::from_f64(distance).ok_or(StatusError::InvalidDistance(distance))?;
        let mut fee = (self.base_fee + self.per_km * km)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        fee.rescale(2);
        Ok(fee)
    }
}
