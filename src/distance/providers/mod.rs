pub mod haversine;

pub use haversine::{euclidean_distance, geodesic_distance, haversine_distance, DistanceMethod};
