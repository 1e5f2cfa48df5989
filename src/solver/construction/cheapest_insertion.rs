use tracing::{debug, span, trace, Level};

use crate::distance::CostModel;
use crate::domain::solution::WorkingSolution;
use crate::domain::types::{Infeasibility, ProblemInstance, DEPOT};
use crate::evaluation::fitness::{dist_between, find_distance, fits_within};
use crate::solver::monitor::{SearchCommand, SearchMonitor};
use crate::solver::{Construction, ConstructionOutcome, COST_EPSILON};

/// Greedy construction: repeatedly insert the unassigned delivery with the
/// globally cheapest feasible insertion over every agent's partial route.
///
/// Ties go to the lowest agent, then the lowest location index, then the
/// latest position in the route.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheapestInsertion;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsertionCandidate {
    pub location: usize,
    pub route: usize,
    pub position: usize,
    pub delta: f64,
    pub new_distance: f64,
}

impl InsertionCandidate {
    fn beats(&self, incumbent: &InsertionCandidate) -> bool {
        if self.delta < incumbent.delta - COST_EPSILON {
            return true;
        }
        // Candidates arrive ordered by route, location, position; on a tie
        // only a later position of the same (route, location) may win.
        (self.delta - incumbent.delta).abs() <= COST_EPSILON
            && self.route == incumbent.route
            && self.location == incumbent.location
            && self.position > incumbent.position
    }
}

/// Marginal distance of putting `location` at `position` in `route`:
/// `d(a, x) + d(x, b) - d(a, b)` where `a`, `b` are the neighbours.
pub fn insertion_delta<M: CostModel + ?Sized>(route: &[usize], position: usize, location: usize, dm: &M) -> f64 {
    let before = if position == 0 { DEPOT } else { route[position - 1] };
    let after = route.get(position).copied().unwrap_or(DEPOT);

    dist_between(before, location, dm) + dist_between(location, after, dm)
        - dist_between(before, after, dm)
}

/// Cheapest insertion of any `unassigned` location that keeps its route
/// within the maximum distance.
pub fn find_cheapest_insertion<M: CostModel + ?Sized>(
    solution: &WorkingSolution,
    unassigned: &[usize],
    instance: &ProblemInstance,
    dm: &M,
) -> Option<InsertionCandidate> {
    let mut best: Option<InsertionCandidate> = None;
    let mut seen_empty_route = false;

    for (route_idx, route) in solution.routes.iter().enumerate() {
        // Empty routes are interchangeable; the first one wins every tie.
        if route.is_empty() {
            if seen_empty_route {
                continue;
            }
            seen_empty_route = true;
        }

        let current = solution.distances[route_idx];
        for &location in unassigned {
            for position in 0..=route.len() {
                let delta = insertion_delta(route, position, location, dm);
                let new_distance = current + delta;
                let fits = fits_within(new_distance, instance.max_route_distance, || {
                    let mut trial = route.clone();
                    trial.insert(position, location);
                    find_distance(&trial, dm)
                });
                if !fits {
                    continue;
                }

                let candidate = InsertionCandidate {
                    location,
                    route: route_idx,
                    position,
                    delta,
                    new_distance,
                };

                if best.map_or(true, |b| candidate.beats(&b)) {
                    best = Some(candidate);
                }
            }
        }
    }

    best
}

impl Construction for CheapestInsertion {
    fn construct<M: CostModel + ?Sized>(
        &self,
        instance: &ProblemInstance,
        dm: &M,
        monitor: &mut SearchMonitor<'_>,
    ) -> ConstructionOutcome {
        let construction_span = span!(Level::DEBUG, "construction");
        let _guard = construction_span.enter();

        let mut solution = WorkingSolution::empty(instance.agent_count);
        let mut unassigned: Vec<usize> = instance.deliveries().collect();
        let total = unassigned.len();

        while !unassigned.is_empty() {
            if monitor.search_command() == SearchCommand::Cancel {
                return ConstructionOutcome::Cancelled {
                    assigned: solution.assigned(),
                };
            }

            let Some(chosen) = find_cheapest_insertion(&solution, &unassigned, instance, dm) else {
                debug!(
                    "No feasible insertion left for {} locations: {:?}",
                    unassigned.len(),
                    unassigned
                );
                return ConstructionOutcome::Infeasible(Infeasibility::NoFeasibleInsertion {
                    unassigned,
                });
            };

            trace!(
                "Insert location {} into agent {} at {} (+{:.2})",
                chosen.location,
                chosen.route,
                chosen.position,
                chosen.delta
            );

            solution.insert(
                chosen.route,
                chosen.position,
                chosen.location,
                chosen.new_distance,
                instance.span_weight,
            );
            unassigned.retain(|&loc| loc != chosen.location);
            monitor.construction_progress(total - unassigned.len(), total);
        }

        // Re-sum route distances so the search starts without accumulated drift.
        solution.recompute(dm, instance.span_weight);
        debug!(
            "Constructed {} routes, distance {:.2}",
            solution.routes.iter().filter(|r| !r.is_empty()).count(),
            solution.total_distance()
        );

        ConstructionOutcome::Built(solution)
    }
}
