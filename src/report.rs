use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use colored::*;
use csv::Writer;
use tracing::{info, warn};

use crate::domain::types::{Coordinate, Infeasibility, PlanOutcome, Route, Solution, SolveStatus};
use crate::solver::SearchStats;

/// Display names for location indices. The solver never sees these.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationNames {
    names: Vec<String>,
}

impl LocationNames {
    /// "Warehouse" for the depot, "Location i" for delivery `i`.
    pub fn numbered(location_count: usize) -> Self {
        let names = (0..location_count)
            .map(|i| {
                if i == 0 {
                    "Warehouse".to_string()
                } else {
                    format!("Location {i}")
                }
            })
            .collect();
        LocationNames { names }
    }

    pub fn name(&self, index: usize) -> String {
        self.names
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("#{index}"))
    }
}

pub fn format_route(route: &Route, names: &LocationNames) -> String {
    let stops: Vec<String> = route.stops.iter().map(|&s| names.name(s)).collect();
    format!(
        "Delivery Agent {}: {} ({:.1} m)",
        route.agent + 1,
        stops.join(" -> "),
        route.distance
    )
}

pub fn print_solution(solution: &Solution, names: &LocationNames) {
    let headline = format!(
        "Distance: {:.2}, Cost: {:.2}, Longest route: {:.2}",
        solution.total_distance,
        solution.cost,
        solution.longest_route()
    );
    match solution.status {
        SolveStatus::Cancelled => println!("{} ({})", headline, "cancelled".yellow()),
        SolveStatus::BudgetExhausted => println!("{} ({})", headline.green(), "budget exhausted".yellow()),
        SolveStatus::LocalOptimum => println!("{}", headline.green()),
    }

    for route in &solution.routes {
        let line = format_route(route, names);
        if route.is_depot_only() {
            println!("{}", line.dimmed());
        } else {
            println!("{line}");
        }
    }
    info!(
        "{} of {} agents used",
        solution.used_agents(),
        solution.routes.len()
    );
}

pub fn print_outcome(outcome: &PlanOutcome, names: &LocationNames) {
    match outcome {
        PlanOutcome::Planned(solution) => print_solution(solution, names),
        PlanOutcome::Infeasible(Infeasibility::UnreachableLocation { location, round_trip }) => {
            let message = format!(
                "Infeasible: {} needs a {:.1} m round trip from the depot",
                names.name(*location),
                round_trip
            );
            warn!("{}", message);
            println!("{}", message.red());
        }
        PlanOutcome::Infeasible(Infeasibility::NoFeasibleInsertion { unassigned }) => {
            let missing: Vec<String> = unassigned.iter().map(|&l| names.name(l)).collect();
            let message = format!("Infeasible: no agent can take {}", missing.join(", "));
            warn!("{}", message);
            println!("{}", message.red());
        }
        PlanOutcome::CancelledDuringConstruction { assigned, total } => {
            println!(
                "{}",
                format!("Cancelled after assigning {assigned} of {total} deliveries").yellow()
            );
        }
    }
}

/// One row per stop: agent, order, index, name, coordinate, route distance.
pub fn save_routes_csv(
    solution: &Solution,
    names: &LocationNames,
    locations: &[Coordinate],
    filename: &Path,
) -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_path(filename)?;
    wtr.write_record(["agent", "stop_order", "location", "name", "lat", "lon", "route_distance"])?;

    for route in &solution.routes {
        for (order, &stop) in route.stops.iter().enumerate() {
            let (lat, lon) = locations
                .get(stop)
                .map(|c| (c.lat.to_string(), c.lon.to_string()))
                .unwrap_or_default();
            wtr.write_record([
                route.agent.to_string(),
                order.to_string(),
                stop.to_string(),
                names.name(stop),
                lat,
                lon,
                route.distance.to_string(),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Improvement history, one row per new best cost.
pub fn save_to_csv(stats: &SearchStats, filename: &Path) -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_path(filename)?;

    wtr.write_record(["iteration", "new_best_so_far", "total_iterations"])?;
    wtr.write_record([
        "0".to_string(),
        stats.construction_cost.to_string(),
        stats.iterations.to_string(),
    ])?;
    for (iteration, value) in &stats.best_so_far_updates {
        wtr.write_record([
            iteration.to_string(),
            value.to_string(),
            stats.iterations.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn save_solution_json(solution: &Solution, filename: &Path) -> Result<(), Box<dyn Error>> {
    let file = File::create(filename)?;
    serde_json::to_writer_pretty(BufWriter::new(file), solution)?;
    Ok(())
}
