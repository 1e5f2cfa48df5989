use itertools::Itertools;

use crate::distance::CostModel;
use crate::domain::types::DEPOT;
use crate::evaluation::penalty::{span_penalty, span_penalty_after};

/// Total cost of a set of routes: the summed distance plus the span penalty.
pub fn find_fitness(distances: &[f64], span_weight: f64) -> f64 {
    find_total_distance(distances) + span_penalty(distances, span_weight)
}

/// Cost the routes would have if each `(route, distance)` in `changes`
/// replaced the current distance of that route.
pub fn find_fitness_after(distances: &[f64], changes: &[(usize, f64)], span_weight: f64) -> f64 {
    let mut total = find_total_distance(distances);
    for &(route, distance) in changes {
        total += distance - distances[route];
    }
    total + span_penalty_after(distances, changes, span_weight)
}

pub fn find_total_distance(distances: &[f64]) -> f64 {
    distances.iter().sum()
}

/// Depot -> stops... -> depot. An empty route has distance 0.
pub fn find_distance<M: CostModel + ?Sized>(stops: &[usize], dm: &M) -> f64 {
    if stops.is_empty() {
        return 0.0;
    }

    let warehouse_to_first_loc = dist_between(DEPOT, stops[0], dm);
    let last_loc_to_warehouse = dist_between(stops[stops.len() - 1], DEPOT, dm);

    let total_dist: f64 = stops
        .iter()
        .tuple_windows()
        .map(|(&a, &b)| dist_between(a, b, dm))
        .sum();

    warehouse_to_first_loc + total_dist + last_loc_to_warehouse
}

/// Whether a route stays within `max`. `predicted` comes from arc deltas;
/// close to the limit the decision is left to the re-summed `exact` value,
/// which is what the finished solution reports.
pub fn fits_within<F: FnOnce() -> f64>(predicted: f64, max: f64, exact: F) -> bool {
    let margin = 1e-9 * max.abs().max(1.0);
    if predicted > max + margin {
        false
    } else if predicted < max - margin {
        true
    } else {
        exact() <= max
    }
}

pub fn dist_between<M: CostModel + ?Sized>(from_loc: usize, to_loc: usize, dm: &M) -> f64 {
    dm.cost(from_loc, to_loc)
}
