use std::error::Error;
use std::fs;

use dotenv::dotenv;
use tracing::{debug, info, span, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::PlannerConfig;
use crate::domain::types::{Coordinate, PlanOutcome};
use crate::fixtures::{generate_random_inputs, load_inputs_json};
use crate::planner::PlanRequest;
use crate::report::{print_outcome, save_routes_csv, save_solution_json, save_to_csv, LocationNames};
use crate::solver::SearchMonitor;

fn init_tracing_and_env() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(
            fmt::layer()
                .with_span_events(fmt::format::FmtSpan::NEW | fmt::format::FmtSpan::CLOSE)
                .pretty(),
        )
        .init();

    dotenv().ok();
    Ok(())
}

fn load_inputs(config: &PlannerConfig) -> Result<(Coordinate, Vec<Coordinate>), Box<dyn Error>> {
    match &config.deliveries_json {
        Some(path) => load_inputs_json(path),
        None => Ok(generate_random_inputs(
            config.location_count,
            config.seed,
            &config.centre,
            crate::config::constant::SPREAD_DEGREES,
        )),
    }
}

/// Logs every further tenth of the way.
struct ProgressLog {
    next_step: f64,
}

impl ProgressLog {
    fn on_progress(&mut self, fraction: f64) {
        if fraction + 1e-12 >= self.next_step {
            debug!("Progress {:.0}%", fraction * 100.0);
            while self.next_step <= fraction + 1e-12 {
                self.next_step += 0.1;
            }
        }
    }
}

pub fn run() -> Result<(), Box<dyn Error>> {
    init_tracing_and_env()?;
    let config = PlannerConfig::from_env()?;
    config.log_summary();

    let (depot, deliveries) = load_inputs(&config)?;
    let request = PlanRequest::new(
        depot,
        deliveries,
        config.agent_count,
        config.max_route_distance,
        config.span_weight,
    )
    .with_distance(config.distance)
    .with_params(config.solver_params());

    let names = LocationNames::numbered(request.deliveries.len() + 1);
    let locations = request.locations();

    let mut progress_log = ProgressLog { next_step: 0.1 };
    let mut observer = |fraction: f64| progress_log.on_progress(fraction);
    let report = {
        let span = span!(Level::INFO, "plan");
        let _guard = span.enter();
        let mut monitor = SearchMonitor::new().with_progress(&mut observer);
        request.solve(&mut monitor)?
    };

    print_outcome(&report.outcome, &names);

    if let PlanOutcome::Planned(solution) = &report.outcome {
        fs::create_dir_all(&config.output_dir)?;
        let routes_path = config.output_dir.join("routes.csv");
        save_routes_csv(solution, &names, &locations, &routes_path)?;
        save_solution_json(solution, &config.output_dir.join("solution.json"))?;
        info!("Routes written to {}", routes_path.display());

        if let Some(stats) = &report.stats {
            save_to_csv(stats, &config.output_dir.join("best_so_far.csv"))?;
        }
    }

    Ok(())
}
