use thiserror::Error;

/// Input rejected before any solving begins.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("at least one delivery location is required")]
    NoDeliveries,
    #[error("agent count must be at least 1")]
    NoAgents,
    #[error("maximum route distance must be positive and finite, got {0}")]
    InvalidMaxDistance(f64),
    #[error("span weight must be non-negative and finite, got {0}")]
    InvalidSpanWeight(f64),
    #[error("cost function returned {value} for locations {from} -> {to}")]
    InvalidCost { from: usize, to: usize, value: f64 },
    #[error("coordinate {index} is not finite")]
    InvalidCoordinate { index: usize },
}
