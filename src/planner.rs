use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, span, Level};

use crate::distance::providers::{haversine_distance, DistanceMethod};
use crate::distance::CoordinateCost;
use crate::domain::types::{Coordinate, PlanOutcome, ProblemInstance};
use crate::error::PlanError;
use crate::solver::{Optimizer, ProgressObserver, SearchMonitor, SolveReport, SolverParams};

/// One coordinate-level planning job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub depot: Coordinate,
    pub deliveries: Vec<Coordinate>,
    pub agent_count: usize,
    pub max_route_distance: f64,
    pub span_weight: f64,
    pub distance: DistanceMethod,
    #[serde(skip)]
    pub params: SolverParams,
}

impl PlanRequest {
    pub fn new(
        depot: Coordinate,
        deliveries: Vec<Coordinate>,
        agent_count: usize,
        max_route_distance: f64,
        span_weight: f64,
    ) -> Self {
        PlanRequest {
            depot,
            deliveries,
            agent_count,
            max_route_distance,
            span_weight,
            distance: DistanceMethod::Haversine,
            params: SolverParams::default(),
        }
    }

    pub fn with_distance(mut self, distance: DistanceMethod) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_params(mut self, params: SolverParams) -> Self {
        self.params = params;
        self
    }

    /// Depot first, then deliveries; route indices point into this.
    pub fn locations(&self) -> Vec<Coordinate> {
        locations(&self.depot, &self.deliveries)
    }

    pub fn instance(&self) -> ProblemInstance {
        ProblemInstance::new(
            self.deliveries.len(),
            self.agent_count,
            self.max_route_distance,
            self.span_weight,
        )
    }

    pub fn solve(&self, monitor: &mut SearchMonitor<'_>) -> Result<SolveReport, PlanError> {
        let method = self.distance;
        solve_coordinates(
            &self.locations(),
            &self.instance(),
            &self.params,
            |a: &Coordinate, b: &Coordinate| method.distance(a, b),
            monitor,
        )
    }
}

pub fn locations(depot: &Coordinate, deliveries: &[Coordinate]) -> Vec<Coordinate> {
    std::iter::once(*depot)
        .chain(deliveries.iter().copied())
        .collect()
}

fn validate_coordinates(locations: &[Coordinate]) -> Result<(), PlanError> {
    match locations.iter().position(|c| !c.is_finite()) {
        Some(index) => Err(PlanError::InvalidCoordinate { index }),
        None => Ok(()),
    }
}

fn solve_coordinates<D>(
    locations: &[Coordinate],
    instance: &ProblemInstance,
    params: &SolverParams,
    distance: D,
    monitor: &mut SearchMonitor<'_>,
) -> Result<SolveReport, PlanError>
where
    D: Fn(&Coordinate, &Coordinate) -> f64,
{
    validate_coordinates(locations)?;
    let model = CoordinateCost::new(locations, distance);
    let optimizer: Optimizer = Optimizer::with_params(params.clone());
    optimizer.solve_with_stats(instance, &model, monitor)
}

/// Plan routes for `agent_count` agents leaving `depot` using great-circle
/// distances in meters.
pub fn plan_routes(
    depot: Coordinate,
    deliveries: &[Coordinate],
    agent_count: usize,
    max_route_distance: f64,
    span_weight: f64,
    progress: Option<&mut dyn ProgressObserver>,
) -> Result<PlanOutcome, PlanError> {
    plan_routes_with(
        depot,
        deliveries,
        agent_count,
        max_route_distance,
        span_weight,
        haversine_distance,
        progress,
    )
}

/// [`plan_routes`] with a caller-supplied `distance(a, b)`.
pub fn plan_routes_with<D>(
    depot: Coordinate,
    deliveries: &[Coordinate],
    agent_count: usize,
    max_route_distance: f64,
    span_weight: f64,
    distance: D,
    progress: Option<&mut dyn ProgressObserver>,
) -> Result<PlanOutcome, PlanError>
where
    D: Fn(&Coordinate, &Coordinate) -> f64,
{
    let mut monitor = SearchMonitor::new();
    if let Some(observer) = progress {
        monitor = monitor.with_progress(observer);
    }

    let instance = ProblemInstance::new(deliveries.len(), agent_count, max_route_distance, span_weight);
    solve_coordinates(
        &locations(&depot, deliveries),
        &instance,
        &SolverParams::default(),
        distance,
        &mut monitor,
    )
    .map(|report| report.outcome)
}

/// Solve independent requests in parallel, one distance cache per request.
/// Results come back in request order.
pub fn plan_many(requests: &[PlanRequest]) -> Vec<Result<PlanOutcome, PlanError>> {
    let batch_span = span!(Level::INFO, "plan_many", requests = requests.len());
    let _guard = batch_span.enter();

    let results: Vec<Result<PlanOutcome, PlanError>> = requests
        .par_iter()
        .map(|request| {
            let mut monitor = SearchMonitor::new();
            request.solve(&mut monitor).map(|report| report.outcome)
        })
        .collect();

    info!(
        "Solved {} requests, {} planned",
        results.len(),
        results
            .iter()
            .filter(|r| matches!(r, Ok(PlanOutcome::Planned(_))))
            .count()
    );
    results
}
