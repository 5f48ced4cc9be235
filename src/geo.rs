//! Approximate-radius geospatial filtering.
//!
//! A radius query is answered with a rectangular latitude/longitude inclusion
//! box built from the ~111 km-per-degree-of-latitude approximation. The box is
//! deliberately not geodesic; its east-west width widens with latitude to
//! compensate for longitude compression.

use crate::core::db::DamageReport;

/// Kilometers per degree of latitude, the standard approximation.
pub const KM_PER_DEGREE_LAT: f64 = 111.0;

/// Keeps the longitude range finite when `cos(lat)` vanishes at the poles.
const LON_COMPRESSION_EPSILON: f64 = 1e-6;

/// A nearby-damage query: center point plus radius in kilometers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

impl ProximityQuery {
    pub const DEFAULT_RADIUS_KM: f64 = 1.0;

    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            radius_km: Self::DEFAULT_RADIUS_KM,
        }
    }

    pub fn with_radius_km(mut self, radius_km: f64) -> Self {
        self.radius_km = radius_km;
        self
    }

    pub fn bounding_box(&self) -> ProximityBox {
        ProximityBox::around(self.latitude, self.longitude, self.radius_km)
    }
}

/// Rectangular lat/lon inclusion region approximating a radius-km circle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl ProximityBox {
    pub fn around(center_lat: f64, center_lon: f64, radius_km: f64) -> Self {
        let lat_range = radius_km / KM_PER_DEGREE_LAT;
        let lon_range = radius_km
            / (KM_PER_DEGREE_LAT * center_lat.to_radians().cos().abs() + LON_COMPRESSION_EPSILON);
        Self {
            min_lat: center_lat - lat_range,
            max_lat: center_lat + lat_range,
            min_lon: center_lon - lon_range,
            max_lon: center_lon + lon_range,
        }
    }

    /// Inclusive containment on both axes.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    /// Records without coordinates never match.
    pub fn contains_report(&self, report: &DamageReport) -> bool {
        match (report.latitude, report.longitude) {
            (Some(lat), Some(lon)) => self.contains(lat, lon),
            _ => false,
        }
    }
}

/// Pure in-memory form of the nearby query, used where records are already
/// loaded. The store-side query in `core::db` applies the same box in SQL.
pub fn filter_nearby<'a>(reports: &'a [DamageReport], query: &ProximityQuery) -> Vec<&'a DamageReport> {
    let bbox = query.bounding_box();
    reports.iter().filter(|r| bbox.contains_report(r)).collect()
}
