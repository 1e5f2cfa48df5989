use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info};

/// Receives the advisory progress fraction of a solve.
pub trait ProgressObserver {
    fn on_progress(&mut self, fraction: f64);
}

impl<F> ProgressObserver for F
where
    F: FnMut(f64),
{
    fn on_progress(&mut self, fraction: f64) {
        self(fraction)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchCommand {
    Continue,
    Cancel,
    OutOfTime,
}

/// Share of the progress bar that construction fills; improvement fills the rest.
const CONSTRUCTION_SHARE: f64 = 0.5;

/// Observes one solve: forwards progress, polls the cancellation flag and
/// watches the wall-clock budget.
///
/// Reported progress never decreases and stays within `[0, 1]`.
pub struct SearchMonitor<'a> {
    observer: Option<&'a mut dyn ProgressObserver>,
    stop_flag: Option<&'a AtomicBool>,
    reported: f64,
    started: Instant,
    time_limit: Option<Duration>,
}

impl Default for SearchMonitor<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> SearchMonitor<'a> {
    pub fn new() -> Self {
        SearchMonitor {
            observer: None,
            stop_flag: None,
            reported: 0.0,
            started: Instant::now(),
            time_limit: None,
        }
    }

    pub fn with_progress(mut self, observer: &'a mut dyn ProgressObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The search stops at the next insertion or iteration once `flag` is `true`.
    pub fn with_stop_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.stop_flag = Some(flag);
        self
    }

    /// Restart the clock and set the wall-clock budget of the improvement phase.
    pub fn arm(&mut self, time_limit: Option<Duration>) {
        self.started = Instant::now();
        self.time_limit = time_limit;
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn progress(&self) -> f64 {
        self.reported
    }

    pub fn is_cancelled(&self) -> bool {
        self.stop_flag
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    pub fn search_command(&self) -> SearchCommand {
        if self.is_cancelled() {
            info!("Interrupt signal received after {:?}", self.elapsed());
            return SearchCommand::Cancel;
        }

        match self.time_limit {
            Some(limit) if self.elapsed() >= limit => {
                debug!("Time limit of {:?} reached", limit);
                SearchCommand::OutOfTime
            }
            _ => SearchCommand::Continue,
        }
    }

    pub fn report(&mut self, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        if fraction <= self.reported {
            return;
        }

        self.reported = fraction;
        if let Some(observer) = self.observer.as_mut() {
            observer.on_progress(fraction);
        }
    }

    pub fn construction_progress(&mut self, assigned: usize, total: usize) {
        if total == 0 {
            return;
        }
        self.report(CONSTRUCTION_SHARE * assigned as f64 / total as f64);
    }

    pub fn improvement_progress(&mut self, iteration: usize, max_iterations: usize) {
        if max_iterations == 0 {
            return;
        }
        let share = iteration as f64 / max_iterations as f64;
        self.report(CONSTRUCTION_SHARE + (1.0 - CONSTRUCTION_SHARE) * share);
    }

    pub fn finish(&mut self) {
        self.report(1.0);
    }
}
