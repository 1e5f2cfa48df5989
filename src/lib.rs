pub mod config;
pub mod distance;
pub mod domain;
pub mod error;
pub mod evaluation;
pub mod fixtures;
pub mod planner;
pub mod report;
pub mod runner;
pub mod solver;

pub use distance::providers::DistanceMethod;
pub use domain::types::{Coordinate, Infeasibility, PlanOutcome, Route, Solution, SolveStatus};
pub use error::PlanError;
pub use planner::{plan_many, plan_routes, plan_routes_with, PlanRequest};
pub use solver::{ProgressObserver, SolverParams};
