//! Domain types produced by the stream.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Satoshis per bitcoin.
pub const SATOSHIS_PER_BTC: f64 = 100_000_000.0;

/// A point on the globe in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in [-90, 90]
    pub lat: f64,
    /// Longitude in [-180, 180]
    pub lng: f64,
}

impl GeoPoint {
    /// Create a point, clamping into the valid latitude/longitude ranges.
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat: lat.clamp(-90.0, 90.0),
            lng: lng.clamp(-180.0, 180.0),
        }
    }

    /// Draw a point uniformly over the lat/lng rectangle.
    ///
    /// The upstream feed carries no location, so every transaction gets a
    /// synthetic one.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            lat: rng.gen_range(-90.0..=90.0),
            lng: rng.gen_range(-180.0..=180.0),
        }
    }
}

/// A single unconfirmed transaction as seen by the globe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction hash (not deduplicated)
    pub hash: String,
    /// Sum of all output values, in satoshis
    pub value: u64,
    /// Local receipt time
    pub received_at: SystemTime,
    /// Where the arc starts
    pub origin: GeoPoint,
    /// Where the arc ends
    pub destination: GeoPoint,
}

impl Transaction {
    /// Value in BTC.
    pub fn value_btc(&self) -> f64 {
        self.value as f64 / SATOSHIS_PER_BTC
    }

    /// Receipt time as milliseconds since the Unix epoch.
    pub fn received_at_ms(&self) -> u64 {
        self.received_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn random_points_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let p = GeoPoint::random(&mut rng);
            assert!((-90.0..=90.0).contains(&p.lat));
            assert!((-180.0..=180.0).contains(&p.lng));
        }
    }

    #[test]
    fn new_clamps_out_of_range() {
        let p = GeoPoint::new(120.0, -400.0);
        assert_eq!(p, GeoPoint { lat: 90.0, lng: -180.0 });
    }

    #[test]
    fn value_in_btc() {
        let tx = Transaction {
            hash: "abc".into(),
            value: 150_000_000,
            received_at: SystemTime::now(),
            origin: GeoPoint::new(0.0, 0.0),
            destination: GeoPoint::new(0.0, 0.0),
        };
        assert!((tx.value_btc() - 1.5).abs() < 1e-12);
        assert!(tx.received_at_ms() > 0);
    }
}
