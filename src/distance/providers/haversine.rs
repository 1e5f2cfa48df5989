use geo::{Distance, Euclidean, Geodesic, Haversine, Point};
use serde::{Deserialize, Serialize};

use crate::domain::types::Coordinate;

/// How the application shell measures the distance between two coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMethod {
    /// Ellipsoidal (WGS84) distance; the most accurate of the three.
    Geodesic,
    Haversine,
    Euclidean,
}

impl DistanceMethod {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "geodesic" => Some(DistanceMethod::Geodesic),
            "haversine" => Some(DistanceMethod::Haversine),
            "euclidean" => Some(DistanceMethod::Euclidean),
            _ => None,
        }
    }

    pub fn distance(&self, a: &Coordinate, b: &Coordinate) -> f64 {
        match self {
            DistanceMethod::Geodesic => geodesic_distance(a, b),
            DistanceMethod::Haversine => haversine_distance(a, b),
            DistanceMethod::Euclidean => euclidean_distance(a, b),
        }
    }
}

fn to_point(c: &Coordinate) -> Point<f64> {
    Point::new(c.lon, c.lat)
}

/// Distance in meters on the WGS84 ellipsoid.
pub fn geodesic_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let geodesic = &Geodesic;
    geodesic.distance(to_point(a), to_point(b))
}

/// Great-circle distance in meters.
pub fn haversine_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let haversine = Haversine;
    haversine.distance(to_point(a), to_point(b))
}

/// Planar distance, treating `lon` as x and `lat` as y.
pub fn euclidean_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let euclidean = Euclidean;
    euclidean.distance(&to_point(a), &to_point(b))
}
