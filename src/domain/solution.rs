use crate::distance::CostModel;
use crate::domain::types::{ProblemInstance, Route, Solution, SolveStatus, DEPOT};
use crate::evaluation::fitness::{find_distance, find_fitness, find_total_distance};

/// Mutable route set the solver works on.
///
/// `routes[agent]` holds only the deliveries; the depot at both ends is
/// implicit. `distances` and `cost` are kept in sync by every mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingSolution {
    pub routes: Vec<Vec<usize>>,
    pub distances: Vec<f64>,
    pub cost: f64,
}

impl WorkingSolution {
    pub fn empty(agent_count: usize) -> Self {
        WorkingSolution {
            routes: vec![vec![]; agent_count],
            distances: vec![0.0; agent_count],
            cost: 0.0,
        }
    }

    pub fn from_routes<M: CostModel + ?Sized>(
        routes: Vec<Vec<usize>>,
        dm: &M,
        span_weight: f64,
    ) -> Self {
        let distances: Vec<f64> = routes.iter().map(|r| find_distance(r, dm)).collect();
        let cost = find_fitness(&distances, span_weight);
        WorkingSolution {
            routes,
            distances,
            cost,
        }
    }

    pub fn total_distance(&self) -> f64 {
        find_total_distance(&self.distances)
    }

    pub fn assigned(&self) -> usize {
        self.routes.iter().map(Vec::len).sum()
    }

    /// Set the distance of `route` after it was changed in place.
    pub fn set_distance(&mut self, route: usize, distance: f64, span_weight: f64) {
        self.distances[route] = distance;
        self.cost = find_fitness(&self.distances, span_weight);
    }

    pub fn insert(&mut self, route: usize, position: usize, location: usize, new_distance: f64, span_weight: f64) {
        self.routes[route].insert(position, location);
        self.set_distance(route, new_distance, span_weight);
    }

    /// Recompute every route distance and the cost from scratch.
    pub fn recompute<M: CostModel + ?Sized>(&mut self, dm: &M, span_weight: f64) {
        self.distances = self.routes.iter().map(|r| find_distance(r, dm)).collect();
        self.cost = find_fitness(&self.distances, span_weight);
    }

    /// Everything that breaks the route invariants, as readable messages.
    pub fn violations<M: CostModel + ?Sized>(&self, instance: &ProblemInstance, dm: &M) -> Vec<String> {
        let mut problems = vec![];
        let mut seen = vec![0usize; instance.location_count];

        if self.routes.len() != instance.agent_count {
            problems.push(format!(
                "{} routes for {} agents",
                self.routes.len(),
                instance.agent_count
            ));
        }

        for (agent, route) in self.routes.iter().enumerate() {
            for &loc in route {
                if loc == DEPOT || loc >= instance.location_count {
                    problems.push(format!("agent {agent} visits invalid location {loc}"));
                } else {
                    seen[loc] += 1;
                }
            }

            let distance = find_distance(route, dm);
            if (distance - self.distances[agent]).abs() > 1e-6 * distance.max(1.0) {
                problems.push(format!(
                    "agent {agent} distance {:.3} is stale, actual {:.3}",
                    self.distances[agent], distance
                ));
            }
            if distance > instance.max_route_distance {
                problems.push(format!(
                    "agent {agent} travels {:.3}, above maximum {:.3}",
                    distance, instance.max_route_distance
                ));
            }
        }

        for loc in instance.deliveries() {
            match seen[loc] {
                1 => {}
                0 => problems.push(format!("location {loc} is not visited")),
                n => problems.push(format!("location {loc} is visited {n} times")),
            }
        }

        problems
    }

    pub fn into_solution(self, status: SolveStatus) -> Solution {
        let total_distance = self.total_distance();
        let routes = self
            .routes
            .into_iter()
            .zip(self.distances)
            .enumerate()
            .map(|(agent, (stops, distance))| {
                let mut full = Vec::with_capacity(stops.len() + 2);
                full.push(DEPOT);
                full.extend(stops);
                full.push(DEPOT);
                Route {
                    agent,
                    stops: full,
                    distance,
                }
            })
            .collect();

        Solution {
            routes,
            total_distance,
            cost: self.cost,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(a: usize, b: usize) -> f64 {
        (a as f64 - b as f64).abs()
    }

    #[test]
    fn from_routes_computes_cost() {
        let ws = WorkingSolution::from_routes(vec![vec![1, 2], vec![3]], &line, 1.0);
        assert_eq!(ws.distances, vec![4.0, 6.0]);
        assert_eq!(ws.cost, 12.0);
        assert_eq!(ws.assigned(), 3);
    }

    #[test]
    fn into_solution_wraps_routes_in_depot() {
        let ws = WorkingSolution::from_routes(vec![vec![2, 1], vec![]], &line, 0.0);
        let solution = ws.into_solution(SolveStatus::LocalOptimum);

        assert_eq!(solution.routes[0].stops, vec![0, 2, 1, 0]);
        assert_eq!(solution.routes[1].stops, vec![0, 0]);
        assert!(solution.routes[1].is_depot_only());
        assert_eq!(solution.total_distance, 4.0);
        assert_eq!(solution.used_agents(), 1);
    }

    #[test]
    fn violations_report_missing_and_duplicate_locations() {
        let instance = ProblemInstance::new(3, 2, 100.0, 0.0);
        let ws = WorkingSolution::from_routes(vec![vec![1, 1], vec![2]], &line, 0.0);
        let problems = ws.violations(&instance, &line);

        assert!(problems.iter().any(|p| p.contains("location 1 is visited 2 times")));
        assert!(problems.iter().any(|p| p.contains("location 3 is not visited")));
    }

    #[test]
    fn violations_report_overlong_route() {
        let instance = ProblemInstance::new(3, 1, 5.0, 0.0);
        let ws = WorkingSolution::from_routes(vec![vec![1, 2, 3]], &line, 0.0);
        let problems = ws.violations(&instance, &line);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("above maximum"));
    }
}
