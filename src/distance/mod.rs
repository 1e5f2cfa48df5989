pub mod matrix;
pub mod providers;

pub use matrix::{CostModel, DistanceCache};

use crate::domain::types::Coordinate;

/// Adapts a coordinate distance function to the index-based [`CostModel`]
/// the optimizer speaks. Index `i` refers to `locations[i]`.
pub struct CoordinateCost<'a, D> {
    locations: &'a [Coordinate],
    distance: D,
}

impl<'a, D> CoordinateCost<'a, D>
where
    D: Fn(&Coordinate, &Coordinate) -> f64,
{
    pub fn new(locations: &'a [Coordinate], distance: D) -> Self {
        CoordinateCost {
            locations,
            distance,
        }
    }
}

impl<D> CostModel for CoordinateCost<'_, D>
where
    D: Fn(&Coordinate, &Coordinate) -> f64,
{
    fn cost(&self, from: usize, to: usize) -> f64 {
        (self.distance)(&self.locations[from], &self.locations[to])
    }
}
