use std::cell::Cell;

use tracing::{debug, trace};

use crate::error::PlanError;

/// Travel cost in meters between two location indices.
///
/// Implementations must be deterministic, symmetric and return finite,
/// non-negative values for every pair of valid indices.
pub trait CostModel {
    fn cost(&self, from: usize, to: usize) -> f64;
}

impl<F> CostModel for F
where
    F: Fn(usize, usize) -> f64,
{
    fn cost(&self, from: usize, to: usize) -> f64 {
        self(from, to)
    }
}

/// Memoizes a [`CostModel`] for the lifetime of one solve.
///
/// Entries are keyed by the unordered index pair and stored in a packed
/// lower-triangular table. Lookups take `&self`; the table is not `Sync`,
/// so every solve owns its own cache.
pub struct DistanceCache<'a, C: CostModel + ?Sized> {
    model: &'a C,
    size: usize,
    table: Vec<Cell<Option<f64>>>,
    misses: Cell<usize>,
}

impl<'a, C: CostModel + ?Sized> DistanceCache<'a, C> {
    pub fn new(model: &'a C, size: usize) -> Self {
        DistanceCache {
            model,
            size,
            table: vec![Cell::new(None); size * (size + 1) / 2],
            misses: Cell::new(0),
        }
    }

    /// Number of times the underlying model was queried.
    pub fn misses(&self) -> usize {
        self.misses.get()
    }

    fn slot(from: usize, to: usize) -> usize {
        let (hi, lo) = if from >= to { (from, to) } else { (to, from) };
        hi * (hi + 1) / 2 + lo
    }

    pub fn dist(&self, from: usize, to: usize) -> f64 {
        if from == to {
            return 0.0;
        }

        let cell = &self.table[Self::slot(from, to)];
        if let Some(value) = cell.get() {
            return value;
        }

        let value = self.model.cost(from, to);
        self.misses.set(self.misses.get() + 1);
        cell.set(Some(value));
        value
    }

    /// Evaluate every pair once, rejecting NaN, infinite or negative costs.
    pub fn warm(&self) -> Result<(), PlanError> {
        debug!("Warming distance cache for {} locations", self.size);
        for from in 0..self.size {
            for to in 0..from {
                let value = self.dist(from, to);
                if !value.is_finite() || value < 0.0 {
                    return Err(PlanError::InvalidCost { from, to, value });
                }
            }
        }
        trace!("Distance cache warm, {} model queries", self.misses());
        Ok(())
    }
}

impl<C: CostModel + ?Sized> CostModel for DistanceCache<'_, C> {
    fn cost(&self, from: usize, to: usize) -> f64 {
        self.dist(from, to)
    }
}
