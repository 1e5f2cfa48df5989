use std::error::Error;
use std::fs;
use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use tracing::{debug, info};

use crate::domain::types::Coordinate;

/// Either `[lat, lon]` or `{ "lat": .., "lon": .. }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCoordinate {
    Pair([f64; 2]),
    Object { lat: f64, lon: f64 },
}

impl From<RawCoordinate> for Coordinate {
    fn from(raw: RawCoordinate) -> Self {
        match raw {
            RawCoordinate::Pair([lat, lon]) => Coordinate::new(lat, lon),
            RawCoordinate::Object { lat, lon } => Coordinate::new(lat, lon),
        }
    }
}

#[derive(Debug, Deserialize)]
struct InputFile {
    depot: RawCoordinate,
    deliveries: Vec<RawCoordinate>,
}

fn random_coordinate(rng: &mut ChaCha8Rng, centre: &Coordinate, spread: f64) -> Coordinate {
    Coordinate::new(
        centre.lat + rng.gen_range(-spread..=spread),
        centre.lon + rng.gen_range(-spread..=spread),
    )
}

/// Depot and `no_of_locations` deliveries scattered within `spread` degrees
/// of `centre`. The same seed always yields the same inputs.
pub fn generate_random_inputs(
    no_of_locations: usize,
    seed: u64,
    centre: &Coordinate,
    spread: f64,
) -> (Coordinate, Vec<Coordinate>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let depot = random_coordinate(&mut rng, centre, spread);
    let deliveries: Vec<Coordinate> = (0..no_of_locations)
        .map(|_| random_coordinate(&mut rng, centre, spread))
        .collect();

    info!(
        "Generated {} random deliveries around ({:.4}, {:.4})",
        deliveries.len(),
        centre.lat,
        centre.lon
    );
    debug!("Depot at ({:.5}, {:.5})", depot.lat, depot.lon);
    (depot, deliveries)
}

/// Parse a depot and its deliveries from JSON text.
pub fn parse_inputs_json(text: &str) -> Result<(Coordinate, Vec<Coordinate>), Box<dyn Error>> {
    let file: InputFile = serde_json::from_str(text)?;
    let deliveries = file.deliveries.into_iter().map(Coordinate::from).collect();
    Ok((file.depot.into(), deliveries))
}

pub fn load_inputs_json(path: &Path) -> Result<(Coordinate, Vec<Coordinate>), Box<dyn Error>> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("Could not read {}: {}", path.display(), e))?;
    let (depot, deliveries) = parse_inputs_json(&text)?;
    info!("Loaded {} deliveries from {}", deliveries.len(), path.display());
    Ok((depot, deliveries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_inputs_are_seeded_and_within_spread() {
        let centre = Coordinate::new(12.97, 77.59);
        let (depot, deliveries) = generate_random_inputs(20, 64, &centre, 0.1);
        let (depot_again, deliveries_again) = generate_random_inputs(20, 64, &centre, 0.1);

        assert_eq!(deliveries.len(), 20);
        assert_eq!(depot, depot_again);
        assert_eq!(deliveries, deliveries_again);
        for c in std::iter::once(&depot).chain(deliveries.iter()) {
            assert!((c.lat - centre.lat).abs() <= 0.1 + 1e-12);
            assert!((c.lon - centre.lon).abs() <= 0.1 + 1e-12);
        }
    }

    #[test]
    fn parses_both_coordinate_shapes() {
        let text = r#"{
            "depot": [12.97, 77.59],
            "deliveries": [[12.98, 77.60], { "lat": 12.95, "lon": 77.58 }]
        }"#;
        let (depot, deliveries) = parse_inputs_json(text).unwrap();

        assert_eq!(depot, Coordinate::new(12.97, 77.59));
        assert_eq!(
            deliveries,
            vec![Coordinate::new(12.98, 77.60), Coordinate::new(12.95, 77.58)]
        );
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_inputs_json(r#"{ "depot": [1.0] }"#).is_err());
    }
}
