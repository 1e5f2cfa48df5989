use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use dotenv::dotenv;
use tracing::{debug, info};

use crate::distance::providers::DistanceMethod;
use crate::domain::types::Coordinate;
use crate::solver::SolverParams;

pub mod constant {
    pub(crate) const LOCATION_COUNT: usize = 5;
    pub(crate) const AGENT_COUNT: usize = 2;
    pub(crate) const MAX_LOCATIONS: usize = 100;
    pub(crate) const MAX_AGENTS: usize = 10;
    pub(crate) const SEED: usize = 64;
    pub(crate) const MAX_ROUTE_DISTANCE: f64 = 50_000.0;
    pub(crate) const SPAN_COST_COEFFICIENT: f64 = 100.0;
    pub(crate) const MAX_ITERATIONS: usize = 10_000;
    pub(crate) const RESTARTS: usize = 5;
    pub(crate) const CITY_CENTRE: (f64, f64) = (12.97, 77.59);
    pub(crate) const SPREAD_DEGREES: f64 = 0.1;
    pub(crate) const OUTPUT_DIR: &str = ".";
}

/// Settings of one planner run: the compile-time defaults in [`constant`]
/// overlaid with `PLANNER_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    pub location_count: usize,
    pub agent_count: usize,
    pub seed: u64,
    pub max_route_distance: f64,
    pub span_weight: f64,
    pub max_iterations: usize,
    pub time_limit: Option<Duration>,
    pub restarts: usize,
    pub distance: DistanceMethod,
    pub centre: Coordinate,
    pub deliveries_json: Option<PathBuf>,
    pub output_dir: PathBuf,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            location_count: constant::LOCATION_COUNT,
            agent_count: constant::AGENT_COUNT,
            seed: constant::SEED as u64,
            max_route_distance: constant::MAX_ROUTE_DISTANCE,
            span_weight: constant::SPAN_COST_COEFFICIENT,
            max_iterations: constant::MAX_ITERATIONS,
            time_limit: None,
            restarts: constant::RESTARTS,
            distance: DistanceMethod::Geodesic,
            centre: Coordinate::new(constant::CITY_CENTRE.0, constant::CITY_CENTRE.1),
            deliveries_json: None,
            output_dir: PathBuf::from(constant::OUTPUT_DIR),
        }
    }
}

impl PlannerConfig {
    /// Load `.env` (if any) and read the `PLANNER_*` variables.
    pub fn from_env() -> Result<Self, Box<dyn Error>> {
        dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = PlannerConfig::default();

        let get = |name: &str| lookup(name).map(|v| v.trim().to_string());
        fn parse<T: FromStr>(name: &str, raw: Option<String>) -> Result<Option<T>, Box<dyn Error>> {
            match raw {
                Some(raw) => raw
                    .parse::<T>()
                    .map(Some)
                    .map_err(|_| format!("{name} has an invalid value: {raw}").into()),
                None => Ok(None),
            }
        }

        if let Some(v) = parse("PLANNER_LOCATIONS", get("PLANNER_LOCATIONS"))? {
            config.location_count = v;
        }
        if let Some(v) = parse("PLANNER_AGENTS", get("PLANNER_AGENTS"))? {
            config.agent_count = v;
        }
        if let Some(v) = parse("PLANNER_SEED", get("PLANNER_SEED"))? {
            config.seed = v;
        }
        if let Some(v) = parse("PLANNER_MAX_ROUTE_DISTANCE", get("PLANNER_MAX_ROUTE_DISTANCE"))? {
            config.max_route_distance = v;
        }
        if let Some(v) = parse("PLANNER_SPAN_WEIGHT", get("PLANNER_SPAN_WEIGHT"))? {
            config.span_weight = v;
        }
        if let Some(v) = parse("PLANNER_MAX_ITERATIONS", get("PLANNER_MAX_ITERATIONS"))? {
            config.max_iterations = v;
        }
        if let Some(ms) = parse::<u64>("PLANNER_TIME_LIMIT_MS", get("PLANNER_TIME_LIMIT_MS"))? {
            config.time_limit = Some(Duration::from_millis(ms));
        }
        if let Some(v) = parse("PLANNER_RESTARTS", get("PLANNER_RESTARTS"))? {
            config.restarts = v;
        }
        if let Some(raw) = get("PLANNER_DISTANCE") {
            config.distance = DistanceMethod::parse(&raw)
                .ok_or_else(|| format!("PLANNER_DISTANCE must be geodesic, haversine or euclidean, got {raw}"))?;
        }
        if let Some(path) = get("PLANNER_DELIVERIES_JSON").filter(|p| !p.is_empty()) {
            config.deliveries_json = Some(PathBuf::from(path));
        }
        if let Some(dir) = get("PLANNER_OUTPUT_DIR").filter(|p| !p.is_empty()) {
            config.output_dir = PathBuf::from(dir);
        }

        config.check_bounds()?;
        debug!("Planner config: {:?}", config);
        Ok(config)
    }

    fn check_bounds(&self) -> Result<(), Box<dyn Error>> {
        if !(1..=constant::MAX_LOCATIONS).contains(&self.location_count) {
            return Err(format!(
                "PLANNER_LOCATIONS must be between 1 and {}, got {}",
                constant::MAX_LOCATIONS,
                self.location_count
            )
            .into());
        }
        if !(1..=constant::MAX_AGENTS).contains(&self.agent_count) {
            return Err(format!(
                "PLANNER_AGENTS must be between 1 and {}, got {}",
                constant::MAX_AGENTS,
                self.agent_count
            )
            .into());
        }
        Ok(())
    }

    pub fn solver_params(&self) -> SolverParams {
        SolverParams {
            max_iterations: self.max_iterations,
            time_limit: self.time_limit,
            restarts: self.restarts,
            seed: self.seed,
        }
    }

    pub fn log_summary(&self) {
        info!(
            "{} deliveries, {} agents, max route {:.0} m, span weight {}, {:?} distance",
            self.location_count,
            self.agent_count,
            self.max_route_distance,
            self.span_weight,
            self.distance
        );
    }
}
