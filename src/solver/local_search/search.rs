use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info, span, trace, Level};

use crate::distance::CostModel;
use crate::domain::solution::WorkingSolution;
use crate::domain::types::{ProblemInstance, SolveStatus};
use crate::solver::local_search::diversification::{perturb, perturbation_strength};
use crate::solver::local_search::neighborhood::{apply_move, find_neighbours, Move};
use crate::solver::monitor::{SearchCommand, SearchMonitor};
use crate::solver::{ImprovementOutcome, Improvement, SolverParams, COST_EPSILON};

/// Best-improvement descent over relocate and 2-opt moves, optionally
/// followed by perturb-and-descend restarts.
#[derive(Debug, Clone, Default)]
pub struct LocalSearch {
    params: SolverParams,
}

/// What the improvement phase did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchStats {
    pub iterations: usize,
    pub relocations: usize,
    pub two_opt_moves: usize,
    pub restarts: usize,
    pub restarts_improved: usize,
    pub construction_cost: f64,
    pub construction_distance: f64,
    pub best_cost: f64,
    /// `(iteration, cost)` each time the best cost dropped.
    pub best_so_far_updates: Vec<(usize, f64)>,
}

impl SearchStats {
    fn new(initial: &WorkingSolution) -> Self {
        SearchStats {
            construction_cost: initial.cost,
            construction_distance: initial.total_distance(),
            best_cost: initial.cost,
            ..Default::default()
        }
    }

    fn record_if_best(&mut self, cost: f64) {
        if cost < self.best_cost - COST_EPSILON {
            self.best_cost = cost;
            self.best_so_far_updates.push((self.iterations, cost));
        }
    }
}

impl LocalSearch {
    pub fn new(params: SolverParams) -> Self {
        LocalSearch { params }
    }

    /// Apply the best improving move until none is left or the budget runs out.
    fn descend<M: CostModel + ?Sized>(
        &self,
        solution: &mut WorkingSolution,
        instance: &ProblemInstance,
        dm: &M,
        monitor: &mut SearchMonitor<'_>,
        stats: &mut SearchStats,
    ) -> SolveStatus {
        loop {
            match monitor.search_command() {
                SearchCommand::Cancel => return SolveStatus::Cancelled,
                SearchCommand::OutOfTime => return SolveStatus::BudgetExhausted,
                SearchCommand::Continue => {}
            }
            if stats.iterations >= self.params.max_iterations {
                debug!("Iteration budget of {} spent", self.params.max_iterations);
                return SolveStatus::BudgetExhausted;
            }

            stats.iterations += 1;
            let iter_span = span!(Level::TRACE, "iteration", iter = stats.iterations);
            let _iter_guard = iter_span.enter();

            let neighbours = find_neighbours(solution, instance, dm);
            let Some(&(cost, chosen)) = neighbours.first() else {
                return SolveStatus::LocalOptimum;
            };

            trace!("chosen move: {:.2}, {:?}", cost, chosen);
            apply_move(solution, &chosen, dm, instance.span_weight);
            match chosen {
                Move::Relocate { .. } => stats.relocations += 1,
                Move::TwoOpt { .. } => stats.two_opt_moves += 1,
            }

            stats.record_if_best(solution.cost);
            monitor.improvement_progress(stats.iterations, self.params.max_iterations);
        }
    }
}

impl Improvement for LocalSearch {
    fn improve<M: CostModel + ?Sized>(
        &self,
        instance: &ProblemInstance,
        dm: &M,
        solution: WorkingSolution,
        monitor: &mut SearchMonitor<'_>,
    ) -> ImprovementOutcome {
        let search_span = span!(
            Level::DEBUG,
            "local_search",
            max_iterations = self.params.max_iterations
        );
        let _guard = search_span.enter();
        monitor.arm(self.params.time_limit);

        let mut stats = SearchStats::new(&solution);
        let mut best = solution;
        let mut status = self.descend(&mut best, instance, dm, monitor, &mut stats);
        debug!(
            "First descent: cost {:.2} after {} iterations ({:?})",
            best.cost, stats.iterations, status
        );

        if status == SolveStatus::LocalOptimum && self.params.restarts > 0 {
            let mut rng = ChaCha8Rng::seed_from_u64(self.params.seed);
            let strength = perturbation_strength(instance.delivery_count());

            for restart in 1..=self.params.restarts {
                let mut candidate = perturb(&best, instance, dm, &mut rng, strength);
                let restart_status = self.descend(&mut candidate, instance, dm, monitor, &mut stats);
                stats.restarts += 1;

                if candidate.cost < best.cost - COST_EPSILON {
                    info!(
                        "Restart {} improved cost {:.2} -> {:.2}",
                        restart, best.cost, candidate.cost
                    );
                    best = candidate;
                    stats.restarts_improved += 1;
                }

                if restart_status != SolveStatus::LocalOptimum {
                    status = restart_status;
                    break;
                }
            }
        }

        stats.best_cost = best.cost;
        report_final_stats(&stats, best.total_distance(), status);

        ImprovementOutcome {
            solution: best,
            status,
            stats,
        }
    }
}

fn report_final_stats(stats: &SearchStats, distance: f64, status: SolveStatus) {
    info!(
        "Local search finished ({:?}) after {} iterations: cost {:.2} -> {:.2}, distance {:.2} -> {:.2}",
        status,
        stats.iterations,
        stats.construction_cost,
        stats.best_cost,
        stats.construction_distance,
        distance
    );
    debug!(
        "Moves applied - relocate: {}, two_opt: {}, restarts: {} ({} improved)",
        stats.relocations, stats.two_opt_moves, stats.restarts, stats.restarts_improved
    );
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    use super::*;

    fn line(a: usize, b: usize) -> f64 {
        (a as f64 - b as f64).abs()
    }

    fn search(params: SolverParams) -> LocalSearch {
        LocalSearch::new(params)
    }

    #[test]
    fn untangles_a_single_route() {
        let instance = ProblemInstance::new(4, 1, 100.0, 0.0);
        let start = WorkingSolution::from_routes(vec![vec![3, 1, 4, 2]], &line, 0.0);
        let mut monitor = SearchMonitor::new();

        let outcome = search(SolverParams::default()).improve(&instance, &line, start, &mut monitor);

        assert_eq!(outcome.status, SolveStatus::LocalOptimum);
        assert_eq!(outcome.solution.distances, vec![8.0]);
        assert_eq!(outcome.stats.construction_cost, 12.0);
        assert_eq!(outcome.stats.construction_distance, 12.0);
        assert_eq!(outcome.stats.best_cost, 8.0);
        assert!(!outcome.stats.best_so_far_updates.is_empty());
    }

    #[test]
    fn balances_routes_under_span_weight() {
        let instance = ProblemInstance::new(3, 2, 100.0, 100.0);
        let start = WorkingSolution::from_routes(vec![vec![1, 2, 3], vec![]], &line, 100.0);
        let mut monitor = SearchMonitor::new();

        let outcome = search(SolverParams::default()).improve(&instance, &line, start, &mut monitor);

        let mut distances = outcome.solution.distances.clone();
        distances.sort_by(f64::total_cmp);
        assert_eq!(distances, vec![4.0, 6.0]);
        assert_eq!(outcome.solution.cost, 210.0);
        assert!(outcome.stats.relocations >= 1);
    }

    /// The span term may buy balance with extra distance; cost still drops.
    #[test]
    fn span_weight_trades_distance_for_balance() {
        let instance = ProblemInstance::new(3, 2, 100.0, 100.0);
        let start = WorkingSolution::from_routes(vec![vec![1, 2, 3], vec![]], &line, 100.0);
        let mut monitor = SearchMonitor::new();

        let outcome = search(SolverParams::default()).improve(&instance, &line, start, &mut monitor);

        assert_eq!(outcome.stats.construction_distance, 6.0);
        assert_eq!(outcome.stats.construction_cost, 606.0);
        assert_eq!(outcome.solution.total_distance(), 10.0);
        assert!(outcome.solution.cost < outcome.stats.construction_cost);
    }

    #[test]
    fn without_span_weight_distance_never_grows() {
        let instance = ProblemInstance::new(6, 2, 100.0, 0.0);
        let start = WorkingSolution::from_routes(vec![vec![6, 1, 5], vec![2, 4, 3]], &line, 0.0);
        let mut monitor = SearchMonitor::new();

        let outcome = search(SolverParams::default()).improve(&instance, &line, start, &mut monitor);

        assert!(outcome.solution.total_distance() <= outcome.stats.construction_distance);
        assert_eq!(outcome.solution.cost, outcome.solution.total_distance());
    }

    #[test]
    fn zero_iteration_budget_keeps_the_start() {
        let instance = ProblemInstance::new(4, 1, 100.0, 0.0);
        let start = WorkingSolution::from_routes(vec![vec![3, 1, 4, 2]], &line, 0.0);
        let params = SolverParams {
            max_iterations: 0,
            ..Default::default()
        };
        let mut monitor = SearchMonitor::new();

        let outcome = search(params).improve(&instance, &line, start.clone(), &mut monitor);
        assert_eq!(outcome.status, SolveStatus::BudgetExhausted);
        assert_eq!(outcome.solution, start);
    }

    #[test]
    fn time_limit_stops_the_search() {
        let instance = ProblemInstance::new(4, 1, 100.0, 0.0);
        let start = WorkingSolution::from_routes(vec![vec![3, 1, 4, 2]], &line, 0.0);
        let params = SolverParams {
            time_limit: Some(Duration::ZERO),
            ..Default::default()
        };
        let mut monitor = SearchMonitor::new();

        let outcome = search(params).improve(&instance, &line, start, &mut monitor);
        assert_eq!(outcome.status, SolveStatus::BudgetExhausted);
        assert_eq!(outcome.stats.iterations, 0);
    }

    #[test]
    fn cancellation_returns_the_feasible_start() {
        let flag = AtomicBool::new(true);
        let instance = ProblemInstance::new(4, 1, 100.0, 0.0);
        let start = WorkingSolution::from_routes(vec![vec![3, 1, 4, 2]], &line, 0.0);
        let mut monitor = SearchMonitor::new().with_stop_flag(&flag);

        let outcome = search(SolverParams::default()).improve(&instance, &line, start.clone(), &mut monitor);
        assert_eq!(outcome.status, SolveStatus::Cancelled);
        assert_eq!(outcome.solution, start);
        assert!(outcome.solution.violations(&instance, &line).is_empty());
    }

    #[test]
    fn restarts_never_worsen_the_result() {
        let instance = ProblemInstance::new(6, 2, 100.0, 1.0);
        let start = WorkingSolution::from_routes(vec![vec![6, 1, 5], vec![2, 4, 3]], &line, 1.0);
        let mut monitor = SearchMonitor::new();

        let plain = search(SolverParams::default()).improve(&instance, &line, start.clone(), &mut monitor);
        let params = SolverParams {
            restarts: 5,
            ..Default::default()
        };
        let mut monitor = SearchMonitor::new();
        let restarted = search(params).improve(&instance, &line, start, &mut monitor);

        assert!(restarted.solution.cost <= plain.solution.cost + 1e-9);
        assert_eq!(restarted.stats.restarts, 5);
        assert!(restarted.solution.violations(&instance, &line).is_empty());
    }
}
