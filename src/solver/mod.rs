pub mod construction;
pub mod local_search;
pub mod monitor;

use std::time::Duration;

use tracing::{debug, info, span, warn, Level};

use crate::distance::{CostModel, DistanceCache};
use crate::domain::solution::WorkingSolution;
use crate::domain::types::{Infeasibility, PlanOutcome, ProblemInstance, SolveStatus, DEPOT};
use crate::error::PlanError;
use crate::evaluation::fitness::dist_between;

pub use construction::CheapestInsertion;
pub use local_search::{LocalSearch, SearchStats};
pub use monitor::{ProgressObserver, SearchCommand, SearchMonitor};

/// Cost differences at or below this are treated as ties.
pub const COST_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct SolverParams {
    /// Upper bound on local-search iterations, restarts included.
    pub max_iterations: usize,
    /// Wall-clock budget for the improvement phase.
    pub time_limit: Option<Duration>,
    /// Perturb-and-descend rounds after the first local optimum.
    pub restarts: usize,
    pub seed: u64,
}

impl Default for SolverParams {
    fn default() -> Self {
        SolverParams {
            max_iterations: 10_000,
            time_limit: None,
            restarts: 0,
            seed: 12345,
        }
    }
}

pub enum ConstructionOutcome {
    Built(WorkingSolution),
    Infeasible(Infeasibility),
    Cancelled { assigned: usize },
}

pub struct ImprovementOutcome {
    pub solution: WorkingSolution,
    pub status: SolveStatus,
    pub stats: SearchStats,
}

/// Builds a first feasible assignment of every delivery.
pub trait Construction {
    fn construct<M: CostModel + ?Sized>(
        &self,
        instance: &ProblemInstance,
        dm: &M,
        monitor: &mut SearchMonitor<'_>,
    ) -> ConstructionOutcome;
}

/// Improves a feasible assignment without ever leaving the feasible region.
pub trait Improvement {
    fn improve<M: CostModel + ?Sized>(
        &self,
        instance: &ProblemInstance,
        dm: &M,
        solution: WorkingSolution,
        monitor: &mut SearchMonitor<'_>,
    ) -> ImprovementOutcome;
}

/// Outcome of a solve together with what the search did to get there.
#[derive(Debug, Clone)]
pub struct SolveReport {
    pub outcome: PlanOutcome,
    pub stats: Option<SearchStats>,
}

/// Construction followed by improvement over one cached cost model.
#[derive(Debug, Clone)]
pub struct Optimizer<C = CheapestInsertion, I = LocalSearch> {
    construction: C,
    improvement: I,
}

impl Default for Optimizer {
    fn default() -> Self {
        Optimizer::with_params(SolverParams::default())
    }
}

impl Optimizer {
    pub fn with_params(params: SolverParams) -> Self {
        Optimizer {
            construction: CheapestInsertion,
            improvement: LocalSearch::new(params),
        }
    }
}

impl<C: Construction, I: Improvement> Optimizer<C, I> {
    pub fn new(construction: C, improvement: I) -> Self {
        Optimizer {
            construction,
            improvement,
        }
    }

    pub fn solve<M: CostModel + ?Sized>(
        &self,
        instance: &ProblemInstance,
        model: &M,
        monitor: &mut SearchMonitor<'_>,
    ) -> Result<PlanOutcome, PlanError> {
        self.solve_with_stats(instance, model, monitor)
            .map(|report| report.outcome)
    }

    pub fn solve_with_stats<M: CostModel + ?Sized>(
        &self,
        instance: &ProblemInstance,
        model: &M,
        monitor: &mut SearchMonitor<'_>,
    ) -> Result<SolveReport, PlanError> {
        validate_instance(instance)?;

        let solve_span = span!(
            Level::INFO,
            "solve",
            deliveries = instance.delivery_count(),
            agents = instance.agent_count
        );
        let _guard = solve_span.enter();

        let dm = DistanceCache::new(model, instance.location_count);
        dm.warm()?;

        if let Some(infeasible) = find_unreachable(instance, &dm) {
            warn!("Instance infeasible before construction: {:?}", infeasible);
            return Ok(SolveReport {
                outcome: PlanOutcome::Infeasible(infeasible),
                stats: None,
            });
        }

        let initial = match self.construction.construct(instance, &dm, monitor) {
            ConstructionOutcome::Built(solution) => solution,
            ConstructionOutcome::Infeasible(infeasible) => {
                warn!("Construction failed: {:?}", infeasible);
                return Ok(SolveReport {
                    outcome: PlanOutcome::Infeasible(infeasible),
                    stats: None,
                });
            }
            ConstructionOutcome::Cancelled { assigned } => {
                info!(
                    "Cancelled during construction with {} of {} deliveries assigned",
                    assigned,
                    instance.delivery_count()
                );
                return Ok(SolveReport {
                    outcome: PlanOutcome::CancelledDuringConstruction {
                        assigned,
                        total: instance.delivery_count(),
                    },
                    stats: None,
                });
            }
        };

        info!(
            "Initial solution: distance {:.2}, cost {:.2}",
            initial.total_distance(),
            initial.cost
        );

        let improved = self.improvement.improve(instance, &dm, initial, monitor);

        debug_assert!(
            improved.solution.violations(instance, &dm).is_empty(),
            "solver produced an invalid solution: {:?}",
            improved.solution.violations(instance, &dm)
        );

        info!(
            "Final solution: distance {:.2}, cost {:.2}, status {:?}",
            improved.solution.total_distance(),
            improved.solution.cost,
            improved.status
        );
        debug!("Distance model queried {} times", dm.misses());

        if improved.status != SolveStatus::Cancelled {
            monitor.finish();
        }

        Ok(SolveReport {
            outcome: PlanOutcome::Planned(improved.solution.into_solution(improved.status)),
            stats: Some(improved.stats),
        })
    }
}

pub fn validate_instance(instance: &ProblemInstance) -> Result<(), PlanError> {
    if instance.agent_count == 0 {
        return Err(PlanError::NoAgents);
    }
    if instance.delivery_count() == 0 {
        return Err(PlanError::NoDeliveries);
    }
    if !instance.max_route_distance.is_finite() || instance.max_route_distance <= 0.0 {
        return Err(PlanError::InvalidMaxDistance(instance.max_route_distance));
    }
    if !instance.span_weight.is_finite() || instance.span_weight < 0.0 {
        return Err(PlanError::InvalidSpanWeight(instance.span_weight));
    }
    Ok(())
}

/// First delivery whose round trip from the depot alone exceeds the maximum.
fn find_unreachable<M: CostModel + ?Sized>(instance: &ProblemInstance, dm: &M) -> Option<Infeasibility> {
    instance.deliveries().find_map(|location| {
        let round_trip = dist_between(DEPOT, location, dm) + dist_between(location, DEPOT, dm);
        (round_trip > instance.max_route_distance).then_some(Infeasibility::UnreachableLocation {
            location,
            round_trip,
        })
    })
}
