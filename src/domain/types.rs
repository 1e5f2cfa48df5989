use serde::{Deserialize, Serialize};

/// Index of the shared start/end location of every route.
pub const DEPOT: usize = 0;

/// A geographic point. Only the distance collaborator looks inside it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Coordinate { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// Read-only description of one solve. Location `0` is the depot, locations
/// `1..location_count` are deliveries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemInstance {
    pub depot: usize,
    pub location_count: usize,
    pub agent_count: usize,
    pub max_route_distance: f64,
    pub span_weight: f64,
}

impl ProblemInstance {
    pub fn new(
        delivery_count: usize,
        agent_count: usize,
        max_route_distance: f64,
        span_weight: f64,
    ) -> Self {
        ProblemInstance {
            depot: DEPOT,
            location_count: delivery_count + 1,
            agent_count,
            max_route_distance,
            span_weight,
        }
    }

    pub fn delivery_count(&self) -> usize {
        self.location_count.saturating_sub(1)
    }

    pub fn deliveries(&self) -> impl Iterator<Item = usize> {
        1..self.location_count
    }
}

/// One agent's visit sequence, depot to depot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub agent: usize,
    pub stops: Vec<usize>,
    pub distance: f64,
}

impl Route {
    /// Deliveries only, without the depot at either end.
    pub fn deliveries(&self) -> &[usize] {
        let len = self.stops.len();
        if len <= 2 {
            &[]
        } else {
            &self.stops[1..len - 1]
        }
    }

    pub fn is_depot_only(&self) -> bool {
        self.deliveries().is_empty()
    }

    pub fn coordinates(&self, locations: &[Coordinate]) -> Vec<Coordinate> {
        self.stops.iter().map(|&stop| locations[stop]).collect()
    }
}

/// Why a search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// No improving move remained.
    LocalOptimum,
    /// The iteration or time budget ran out first.
    BudgetExhausted,
    /// The caller asked to stop; the routes are feasible but not optimized.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub routes: Vec<Route>,
    pub total_distance: f64,
    pub cost: f64,
    pub status: SolveStatus,
}

impl Solution {
    pub fn route_distances(&self) -> Vec<f64> {
        self.routes.iter().map(|r| r.distance).collect()
    }

    pub fn longest_route(&self) -> f64 {
        self.routes.iter().map(|r| r.distance).fold(0.0, f64::max)
    }

    pub fn used_agents(&self) -> usize {
        self.routes.iter().filter(|r| !r.is_depot_only()).count()
    }

    /// Routes as coordinate sequences, for map rendering.
    pub fn route_coordinates(&self, locations: &[Coordinate]) -> Vec<Vec<Coordinate>> {
        self.routes.iter().map(|r| r.coordinates(locations)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Infeasibility {
    /// The round trip depot -> location -> depot alone exceeds the maximum.
    UnreachableLocation { location: usize, round_trip: f64 },
    /// Construction ran out of insertions that keep every route within the maximum.
    NoFeasibleInsertion { unassigned: Vec<usize> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlanOutcome {
    Planned(Solution),
    Infeasible(Infeasibility),
    /// Cancelled before every delivery had a route; no feasible solution exists yet.
    CancelledDuringConstruction { assigned: usize, total: usize },
}

impl PlanOutcome {
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            PlanOutcome::Planned(solution) => Some(solution),
            _ => None,
        }
    }

    pub fn into_solution(self) -> Option<Solution> {
        match self {
            PlanOutcome::Planned(solution) => Some(solution),
            _ => None,
        }
    }

    pub fn is_infeasible(&self) -> bool {
        matches!(self, PlanOutcome::Infeasible(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_deliveries_strip_depot() {
        let route = Route {
            agent: 0,
            stops: vec![0, 3, 1, 0],
            distance: 4.0,
        };
        assert_eq!(route.deliveries(), &[3, 1]);
        assert!(!route.is_depot_only());

        let idle = Route {
            agent: 1,
            stops: vec![0, 0],
            distance: 0.0,
        };
        assert!(idle.deliveries().is_empty());
        assert!(idle.is_depot_only());
    }

    #[test]
    fn instance_counts_depot_separately() {
        let pi = ProblemInstance::new(3, 2, 100.0, 1.0);
        assert_eq!(pi.location_count, 4);
        assert_eq!(pi.delivery_count(), 3);
        assert_eq!(pi.deliveries().collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
