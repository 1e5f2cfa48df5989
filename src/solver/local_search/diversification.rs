use rand::seq::IteratorRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use crate::distance::CostModel;
use crate::domain::solution::WorkingSolution;
use crate::domain::types::ProblemInstance;
use crate::evaluation::fitness::find_distance;

/// Number of random moves a perturbation applies, scaled with the instance.
pub fn perturbation_strength(delivery_count: usize) -> usize {
    std::cmp::max(2, delivery_count / 10)
}

/// Shake `solution` with `strength` random feasible relocations and segment
/// reversals. Moves that would push a route over the maximum are undone.
pub fn perturb<M: CostModel + ?Sized>(
    solution: &WorkingSolution,
    instance: &ProblemInstance,
    dm: &M,
    rng: &mut ChaCha8Rng,
    strength: usize,
) -> WorkingSolution {
    let mut next = solution.clone();
    let mut applied = 0;
    let mut attempts = 0;

    while applied < strength && attempts < strength * 10 {
        attempts += 1;
        let moved = if rng.gen_bool(0.5) {
            random_relocation(&mut next, instance, dm, rng)
        } else {
            random_reversal(&mut next, instance, dm, rng)
        };
        if moved {
            applied += 1;
        }
    }

    trace!("Perturbation applied {} of {} moves", applied, strength);
    next.recompute(dm, instance.span_weight);
    next
}

fn random_relocation<M: CostModel + ?Sized>(
    solution: &mut WorkingSolution,
    instance: &ProblemInstance,
    dm: &M,
    rng: &mut ChaCha8Rng,
) -> bool {
    let Some(from_route) = (0..solution.routes.len())
        .filter(|&r| !solution.routes[r].is_empty())
        .choose(rng)
    else {
        return false;
    };

    let from_pos = rng.gen_range(0..solution.routes[from_route].len());
    let to_route = rng.gen_range(0..solution.routes.len());

    let node = solution.routes[from_route].remove(from_pos);
    let to_pos = rng.gen_range(0..=solution.routes[to_route].len());
    solution.routes[to_route].insert(to_pos, node);

    let within_limit = [from_route, to_route]
        .iter()
        .all(|&r| find_distance(&solution.routes[r], dm) <= instance.max_route_distance);

    if !within_limit {
        let node = solution.routes[to_route].remove(to_pos);
        solution.routes[from_route].insert(from_pos, node);
    }
    within_limit
}

/// Reverse a random segment of one route.
fn random_reversal<M: CostModel + ?Sized>(
    solution: &mut WorkingSolution,
    instance: &ProblemInstance,
    dm: &M,
    rng: &mut ChaCha8Rng,
) -> bool {
    let Some(route) = (0..solution.routes.len())
        .filter(|&r| solution.routes[r].len() >= 2)
        .choose(rng)
    else {
        return false;
    };

    let n = solution.routes[route].len();
    let mut pair: Vec<usize> = (0..n).choose_multiple(rng, 2);
    pair.sort_unstable();
    let (a, b) = (pair[0], pair[1]);
    solution.routes[route][a..=b].reverse();

    if find_distance(&solution.routes[route], dm) > instance.max_route_distance {
        solution.routes[route][a..=b].reverse();
        return false;
    }
    true
}
