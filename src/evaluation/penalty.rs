/// Longest minus shortest route distance. Unused agents count as 0.
pub fn find_span(distances: &[f64]) -> f64 {
    span_of(distances.iter().copied())
}

pub fn span_penalty(distances: &[f64], span_weight: f64) -> f64 {
    if span_weight == 0.0 {
        return 0.0;
    }
    span_weight * find_span(distances)
}

/// Span penalty with some route distances overridden by `changes`.
pub fn span_penalty_after(distances: &[f64], changes: &[(usize, f64)], span_weight: f64) -> f64 {
    if span_weight == 0.0 {
        return 0.0;
    }

    let overridden = distances.iter().enumerate().map(|(route, &distance)| {
        changes
            .iter()
            .find(|(changed, _)| *changed == route)
            .map_or(distance, |&(_, d)| d)
    });

    span_weight * span_of(overridden)
}

fn span_of(distances: impl Iterator<Item = f64>) -> f64 {
    let mut longest = f64::NEG_INFINITY;
    let mut shortest = f64::INFINITY;
    for d in distances {
        longest = longest.max(d);
        shortest = shortest.min(d);
    }

    if longest < shortest {
        0.0
    } else {
        longest - shortest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_of_no_routes_is_zero() {
        assert_eq!(find_span(&[]), 0.0);
    }

    #[test]
    fn span_counts_idle_agents() {
        assert_eq!(find_span(&[4.0, 6.0]), 2.0);
        assert_eq!(find_span(&[4.0, 6.0, 0.0]), 6.0);
    }

    #[test]
    fn penalty_after_uses_overrides() {
        let distances = [4.0, 6.0, 1.0];
        assert_eq!(span_penalty_after(&distances, &[(2, 5.0)], 3.0), 6.0);
        assert_eq!(span_penalty_after(&distances, &[], 3.0), 15.0);
        assert_eq!(span_penalty_after(&distances, &[(2, 5.0)], 0.0), 0.0);
    }
}
