use crate::distance::CostModel;
use crate::domain::solution::WorkingSolution;
use crate::domain::types::{ProblemInstance, DEPOT};
use crate::evaluation::fitness::{
    dist_between, find_distance, find_fitness, find_fitness_after, fits_within,
};
use crate::solver::COST_EPSILON;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// Take the delivery at `from_pos` of `from_route` and insert it at
    /// `to_pos` of `to_route`. For an intra-route move `to_pos` indexes the
    /// route after the removal.
    Relocate {
        from_route: usize,
        from_pos: usize,
        to_route: usize,
        to_pos: usize,
    },
    /// Reverse the deliveries `from..=to` of `route`.
    TwoOpt { route: usize, from: usize, to: usize },
}

impl Move {
    pub fn touched_routes(&self) -> (usize, Option<usize>) {
        match *self {
            Move::Relocate {
                from_route,
                to_route,
                ..
            } if from_route != to_route => (from_route, Some(to_route)),
            Move::Relocate { from_route, .. } => (from_route, None),
            Move::TwoOpt { route, .. } => (route, None),
        }
    }
}

fn at_or_depot(route: &[usize], idx: Option<usize>) -> usize {
    idx.and_then(|i| route.get(i).copied()).unwrap_or(DEPOT)
}

/// Location at index `k` of `route` once the element at `removed` is gone.
fn at_without(route: &[usize], removed: usize, k: usize) -> usize {
    let k = if k < removed { k } else { k + 1 };
    route.get(k).copied().unwrap_or(DEPOT)
}

/// Distance change of dropping the delivery at `pos`.
fn removal_delta<M: CostModel + ?Sized>(route: &[usize], pos: usize, dm: &M) -> f64 {
    let prev = at_or_depot(route, pos.checked_sub(1));
    let node = route[pos];
    let next = at_or_depot(route, Some(pos + 1));

    dist_between(prev, next, dm) - dist_between(prev, node, dm) - dist_between(node, next, dm)
}

fn arc_insert_delta<M: CostModel + ?Sized>(before: usize, node: usize, after: usize, dm: &M) -> f64 {
    dist_between(before, node, dm) + dist_between(node, after, dm) - dist_between(before, after, dm)
}

/// Distance change of reversing `from..=to` within `route`.
pub fn two_opt_delta<M: CostModel + ?Sized>(route: &[usize], from: usize, to: usize, dm: &M) -> f64 {
    let prev = at_or_depot(route, from.checked_sub(1));
    let next = at_or_depot(route, Some(to + 1));
    let (first, last) = (route[from], route[to]);

    dist_between(prev, last, dm) + dist_between(first, next, dm)
        - dist_between(prev, first, dm)
        - dist_between(last, next, dm)
}

/// New distances of the routes a move touches, without applying it.
pub fn evaluate_move<M: CostModel + ?Sized>(
    solution: &WorkingSolution,
    mv: &Move,
    dm: &M,
) -> (f64, Option<f64>) {
    match *mv {
        Move::Relocate {
            from_route,
            from_pos,
            to_route,
            to_pos,
        } => {
            let source = &solution.routes[from_route];
            let node = source[from_pos];
            let removed = solution.distances[from_route] + removal_delta(source, from_pos, dm);

            if from_route == to_route {
                let before = if to_pos == 0 {
                    DEPOT
                } else {
                    at_without(source, from_pos, to_pos - 1)
                };
                let after = if to_pos + 1 == source.len() {
                    DEPOT
                } else {
                    at_without(source, from_pos, to_pos)
                };
                (removed + arc_insert_delta(before, node, after, dm), None)
            } else {
                let target = &solution.routes[to_route];
                let before = at_or_depot(target, to_pos.checked_sub(1));
                let after = at_or_depot(target, Some(to_pos));
                let inserted =
                    solution.distances[to_route] + arc_insert_delta(before, node, after, dm);
                (removed, Some(inserted))
            }
        }
        Move::TwoOpt { route, from, to } => {
            let r = &solution.routes[route];
            (solution.distances[route] + two_opt_delta(r, from, to, dm), None)
        }
    }
}

/// Cost after `mv`, or `None` when a touched route would exceed the maximum.
pub fn feasible_cost<M: CostModel + ?Sized>(
    solution: &WorkingSolution,
    mv: &Move,
    instance: &ProblemInstance,
    dm: &M,
) -> Option<f64> {
    let (first, second) = mv.touched_routes();
    let (first_distance, second_distance) = evaluate_move(solution, mv, dm);
    let max = instance.max_route_distance;
    let exact = |route: usize| {
        let mut trial = solution.clone();
        apply_move(&mut trial, mv, dm, instance.span_weight);
        trial.distances[route]
    };

    if !fits_within(first_distance, max, || exact(first)) {
        return None;
    }

    let cost = match (second, second_distance) {
        (Some(route), Some(distance)) => {
            if !fits_within(distance, max, || exact(route)) {
                return None;
            }
            find_fitness_after(
                &solution.distances,
                &[(first, first_distance), (route, distance)],
                instance.span_weight,
            )
        }
        _ => find_fitness_after(
            &solution.distances,
            &[(first, first_distance)],
            instance.span_weight,
        ),
    };

    Some(cost)
}

/// Every relocate and 2-opt move, in a fixed order.
pub fn generate_moves(solution: &WorkingSolution) -> Vec<Move> {
    let mut moves = vec![];
    let agent_count = solution.routes.len();

    for (from_route, source) in solution.routes.iter().enumerate() {
        for from_pos in 0..source.len() {
            let mut seen_empty_target = false;
            for to_route in 0..agent_count {
                if to_route == from_route {
                    // positions in the route after removal, skipping the no-op
                    for to_pos in 0..source.len() {
                        if to_pos != from_pos {
                            moves.push(Move::Relocate {
                                from_route,
                                from_pos,
                                to_route,
                                to_pos,
                            });
                        }
                    }
                    continue;
                }

                let target = &solution.routes[to_route];
                if target.is_empty() {
                    if seen_empty_target {
                        continue;
                    }
                    seen_empty_target = true;
                }

                for to_pos in 0..=target.len() {
                    moves.push(Move::Relocate {
                        from_route,
                        from_pos,
                        to_route,
                        to_pos,
                    });
                }
            }
        }

        for from in 0..source.len() {
            for to in (from + 1)..source.len() {
                moves.push(Move::TwoOpt {
                    route: from_route,
                    from,
                    to,
                });
            }
        }
    }

    moves
}

/// Feasible moves that strictly lower the cost, cheapest first. Equal
/// costs keep generation order.
pub fn find_neighbours<M: CostModel + ?Sized>(
    solution: &WorkingSolution,
    instance: &ProblemInstance,
    dm: &M,
) -> Vec<(f64, Move)> {
    let mut candidates: Vec<(f64, Move)> = generate_moves(solution)
        .into_iter()
        .filter_map(|mv| {
            feasible_cost(solution, &mv, instance, dm)
                .filter(|&cost| cost < solution.cost - COST_EPSILON)
                .map(|cost| (cost, mv))
        })
        .collect();

    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));
    candidates
}

/// Apply `mv` in place and re-sum the touched routes.
pub fn apply_move<M: CostModel + ?Sized>(
    solution: &mut WorkingSolution,
    mv: &Move,
    dm: &M,
    span_weight: f64,
) {
    match *mv {
        Move::Relocate {
            from_route,
            from_pos,
            to_route,
            to_pos,
        } => {
            let node = solution.routes[from_route].remove(from_pos);
            solution.routes[to_route].insert(to_pos, node);
        }
        Move::TwoOpt { route, from, to } => {
            solution.routes[route][from..=to].reverse();
        }
    }

    let (first, second) = mv.touched_routes();
    for route in std::iter::once(first).chain(second) {
        solution.distances[route] = find_distance(&solution.routes[route], dm);
    }
    solution.cost = find_fitness(&solution.distances, span_weight);
}
