use std::collections::HashMap;
use std::sync::atomic::AtomicBool;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use delivery_planner::config::PlannerConfig;
use delivery_planner::distance::providers::euclidean_distance;
use delivery_planner::fixtures::generate_random_inputs;
use delivery_planner::solver::SearchMonitor;
use delivery_planner::{
    plan_routes, plan_routes_with, Coordinate, DistanceMethod, Infeasibility, PlanOutcome,
    PlanRequest, Solution, SolverParams,
};

/// Points on a plane where the euclidean distance is `|x1 - x2|`.
fn on_line(x: f64) -> Coordinate {
    Coordinate::new(x, 0.0)
}

fn planned(outcome: PlanOutcome) -> Solution {
    let description = format!("{:?}", outcome);
    outcome
        .into_solution()
        .unwrap_or_else(|| panic!("expected a plan, got {description}"))
}

fn bangalore_request(deliveries: usize, agents: usize) -> PlanRequest {
    let config = PlannerConfig::default();
    let (depot, deliveries) = generate_random_inputs(deliveries, 64, &config.centre, 0.1);
    PlanRequest::new(depot, deliveries, agents, 50_000.0, 100.0)
}

fn assert_valid(solution: &Solution, delivery_count: usize, max_route_distance: f64) {
    let mut visits: HashMap<usize, usize> = HashMap::new();
    for route in &solution.routes {
        assert_eq!(route.stops.first(), Some(&0));
        assert_eq!(route.stops.last(), Some(&0));
        assert!(route.distance <= max_route_distance);
        for &stop in route.deliveries() {
            *visits.entry(stop).or_default() += 1;
        }
    }
    for location in 1..=delivery_count {
        assert_eq!(visits.get(&location), Some(&1), "location {location}");
    }
    assert_eq!(visits.len(), delivery_count);
}

#[test]
fn single_agent_visits_collinear_points_in_order() {
    let solution = planned(
        plan_routes_with(
            on_line(0.0),
            &[on_line(1.0), on_line(2.0), on_line(3.0)],
            1,
            100.0,
            100.0,
            euclidean_distance,
            None,
        )
        .unwrap(),
    );

    assert_eq!(solution.routes.len(), 1);
    assert_eq!(solution.routes[0].stops, vec![0, 1, 2, 3, 0]);
    assert!((solution.total_distance - 6.0).abs() < 1e-9);
}

#[test]
fn two_agents_share_collinear_points() {
    let solution = planned(
        plan_routes_with(
            on_line(0.0),
            &[on_line(1.0), on_line(2.0), on_line(3.0)],
            2,
            100.0,
            100.0,
            euclidean_distance,
            None,
        )
        .unwrap(),
    );

    assert_eq!(solution.used_agents(), 2);
    let mut distances = solution.route_distances();
    distances.sort_by(f64::total_cmp);
    assert!((distances[0] - 4.0).abs() < 1e-9);
    assert!((distances[1] - 6.0).abs() < 1e-9);
    assert!((solution.cost - 210.0).abs() < 1e-9);

    // Balance costs distance: one agent alone would drive 6.
    let request = PlanRequest::new(
        on_line(0.0),
        vec![on_line(1.0), on_line(2.0), on_line(3.0)],
        2,
        100.0,
        100.0,
    )
    .with_distance(DistanceMethod::Euclidean);
    let stats = request.solve(&mut SearchMonitor::new()).unwrap().stats.unwrap();
    assert!((stats.construction_distance - 6.0).abs() < 1e-9);
    assert!((stats.construction_cost - 606.0).abs() < 1e-9);
    assert!(solution.cost < stats.construction_cost);
}

#[test]
fn far_delivery_is_infeasible() {
    let outcome = plan_routes_with(
        on_line(0.0),
        &[on_line(1000.0)],
        1,
        10.0,
        100.0,
        euclidean_distance,
        None,
    )
    .unwrap();

    assert!(outcome.is_infeasible());
    assert!(matches!(
        outcome,
        PlanOutcome::Infeasible(Infeasibility::UnreachableLocation { location: 1, .. })
    ));
}

#[test]
fn idle_agents_keep_depot_only_routes() {
    let solution = planned(
        plan_routes_with(
            on_line(0.0),
            &[on_line(1.0), on_line(-1.0)],
            5,
            100.0,
            100.0,
            euclidean_distance,
            None,
        )
        .unwrap(),
    );

    assert_eq!(solution.routes.len(), 5);
    assert_eq!(solution.used_agents(), 2);
    assert_eq!(
        solution.routes.iter().filter(|r| r.is_depot_only()).count(),
        3
    );
    // idle agents count as zero-length routes in the span
    assert!((solution.cost - 204.0).abs() < 1e-9);
}

#[test]
fn city_instance_covers_every_delivery_within_the_cap() {
    let request = bangalore_request(12, 3);
    let solution = planned(
        plan_routes(
            request.depot,
            &request.deliveries,
            3,
            50_000.0,
            100.0,
            None,
        )
        .unwrap(),
    );

    assert_valid(&solution, 12, 50_000.0);
    assert_eq!(solution.route_coordinates(&request.locations()).len(), 3);
}

#[test]
fn optimizing_never_costs_more_than_construction() {
    let request = bangalore_request(12, 3);
    let construction_only = request.clone().with_params(SolverParams {
        max_iterations: 0,
        ..Default::default()
    });

    let built = construction_only.solve(&mut SearchMonitor::new()).unwrap();
    let optimized = request.solve(&mut SearchMonitor::new()).unwrap();

    let built = planned(built.outcome);
    let stats = optimized.stats.expect("improvement ran");
    let optimized = planned(optimized.outcome);

    assert!(optimized.cost <= built.cost + 1e-6);
    assert!((stats.construction_cost - built.cost).abs() < 1e-6);
}

#[test]
fn unweighted_optimizing_never_adds_distance() {
    for seed in 0..10 {
        let config = PlannerConfig::default();
        let (depot, deliveries) = generate_random_inputs(12, seed, &config.centre, 0.1);
        let request = PlanRequest::new(depot, deliveries, 3, 50_000.0, 0.0);
        let construction_only = request.clone().with_params(SolverParams {
            max_iterations: 0,
            ..Default::default()
        });

        let built = planned(construction_only.solve(&mut SearchMonitor::new()).unwrap().outcome);
        let optimized = planned(request.solve(&mut SearchMonitor::new()).unwrap().outcome);

        assert!(
            optimized.total_distance <= built.total_distance + 1e-6,
            "seed {seed}: {} -> {}",
            built.total_distance,
            optimized.total_distance
        );
    }
}

#[test]
fn tight_caps_hold_across_random_instances() {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let mut planned_count = 0;

    for _ in 0..200 {
        let deliveries: Vec<Coordinate> = (0..8)
            .map(|_| Coordinate::new(rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0)))
            .collect();
        let cap: f64 = rng.gen_range(15.0..30.0);
        let agents = rng.gen_range(1..=4);
        let span_weight = rng.gen_range(0.0..20.0);

        let outcome = plan_routes_with(
            on_line(0.0),
            &deliveries,
            agents,
            cap,
            span_weight,
            euclidean_distance,
            None,
        )
        .unwrap();

        match outcome {
            PlanOutcome::Planned(solution) => {
                assert_eq!(solution.routes.len(), agents);
                assert_valid(&solution, deliveries.len(), cap);
                planned_count += 1;
            }
            PlanOutcome::Infeasible(_) => {}
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    assert!(planned_count > 0);
}

#[test]
fn solving_twice_gives_the_same_cost() {
    let request = bangalore_request(10, 2).with_distance(DistanceMethod::Haversine);
    let first = planned(request.solve(&mut SearchMonitor::new()).unwrap().outcome);
    let second = planned(request.solve(&mut SearchMonitor::new()).unwrap().outcome);

    assert_eq!(first.cost, second.cost);
    assert_eq!(first.routes, second.routes);
}

#[test]
fn cancelled_before_construction_has_no_plan() {
    let stop = AtomicBool::new(true);
    let request = bangalore_request(5, 2);
    let mut monitor = SearchMonitor::new().with_stop_flag(&stop);

    let report = request.solve(&mut monitor).unwrap();
    assert_eq!(
        report.outcome,
        PlanOutcome::CancelledDuringConstruction {
            assigned: 0,
            total: 5
        }
    );
    assert!(report.stats.is_none());
}
