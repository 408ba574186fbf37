//! Coordinates, distances and search radii.
//!
//! Distances use a spherical Earth with the mean radius (IUGG), which is what
//! the haversine formula assumes. The bounding box encloses the whole circle
//! and is meant as a cheap pre-filter before [`haversine`] ranking.

pub mod query;

pub use query::{bounding_box_predicate, filter_by_radius};

use std::f64::consts::PI;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLon {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Unit a distance is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceUnit {
    #[default]
    Kilometers,
    Meters,
    Miles,
    NauticalMiles,
}

impl DistanceUnit {
    /// How many of this unit make one kilometer.
    pub fn per_kilometer(self) -> f64 {
        match self {
            DistanceUnit::Kilometers => 1.0,
            DistanceUnit::Meters => 1000.0,
            DistanceUnit::Miles => 0.621_371_192,
            DistanceUnit::NauticalMiles => 0.539_956_803,
        }
    }

    /// Earth radius in this unit.
    pub fn earth_radius(self) -> f64 {
        EARTH_RADIUS_KM * self.per_kilometer()
    }
}

impl FromStr for DistanceUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "km" | "kilometers" | "kilometres" => Ok(DistanceUnit::Kilometers),
            "m" | "meters" | "metres" => Ok(DistanceUnit::Meters),
            "mi" | "miles" => Ok(DistanceUnit::Miles),
            "nmi" | "nm" | "nautical_miles" => Ok(DistanceUnit::NauticalMiles),
            other => Err(Error::InvalidQuery(format!("unknown distance unit: {other}"))),
        }
    }
}

/// A circular search area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Radius {
    pub origin: LatLon,
    pub distance: f64,
    #[serde(default)]
    pub unit: DistanceUnit,
}

impl Radius {
    pub fn new(origin: LatLon, distance: f64, unit: DistanceUnit) -> Self {
        Self { origin, distance, unit }
    }

    /// Radius in kilometers.
    pub fn km(origin: LatLon, distance: f64) -> Self {
        Self::new(origin, distance, DistanceUnit::Kilometers)
    }

    /// Reject radii that cannot describe a search area.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.distance.is_finite() || self.distance < 0.0 {
            return Err(Error::InvalidQuery(format!("radius must be a non-negative number, got {}", self.distance)));
        }
        if !(-90.0..=90.0).contains(&self.origin.latitude) || !(-180.0..=180.0).contains(&self.origin.longitude) {
            return Err(Error::InvalidQuery(format!(
                "origin out of range: ({}, {})",
                self.origin.latitude, self.origin.longitude
            )));
        }
        Ok(())
    }
}

/// An axis-aligned latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    pub fn contains(&self, point: LatLon) -> bool {
        (self.south..=self.north).contains(&point.latitude) && (self.west..=self.east).contains(&point.longitude)
    }
}

/// Bounding box around `radius`.
///
/// Latitude offset is `(d / R) * (180 / π)`. Longitude offset is the larger
/// of that value divided by `cos(latitude)` and the exact half-width
/// `asin(sin(d / R) / cos(latitude))`, which matters for large radii at high
/// latitude. When the box reaches a pole, latitude is clamped to it and
/// longitude spans the whole globe; when it crosses the antimeridian,
/// longitude spans the whole globe.
pub fn bounding_box(radius: &Radius) -> BoundingBox {
    let angular = radius.distance / radius.unit.earth_radius();
    let lat_offset = angular * (180.0 / PI);
    let cos_lat = radius.origin.latitude.to_radians().cos().abs();
    let lon_offset = if cos_lat < f64::EPSILON || angular >= PI / 2.0 || angular.sin() >= cos_lat {
        360.0
    } else {
        (lat_offset / cos_lat).max((angular.sin() / cos_lat).asin().to_degrees())
    };

    let mut north = radius.origin.latitude + lat_offset;
    let mut south = radius.origin.latitude - lat_offset;
    let mut east = radius.origin.longitude + lon_offset;
    let mut west = radius.origin.longitude - lon_offset;

    let crosses_pole = north > 90.0 || south < -90.0;
    north = north.min(90.0);
    south = south.max(-90.0);

    if crosses_pole || east > 180.0 || west < -180.0 {
        east = 180.0;
        west = -180.0;
    }

    BoundingBox { north, south, east, west }
}

/// Great-circle distance between two points, in `unit`.
pub fn haversine(a: LatLon, b: LatLon, unit: DistanceUnit) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().min(1.0).asin();

    unit.earth_radius() * c
}
