//! Density-based grouping of the matched users, reported on the result page only.

use crate::geo::{haversine_km, Coordinates};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    /// Group label per input point, `None` for noise.
    pub labels: Vec<Option<usize>>,
    pub groups: usize,
    pub noise: usize,
}

/// DBSCAN over haversine distance. Returns `None` for fewer than two points.
pub fn density_groups(
    points: &[Coordinates],
    eps_km: f64,
    min_points: usize,
) -> Option<GroupSummary> {
    if points.len() < 2 {
        return None;
    }

    let neighbours = |i: usize| -> Vec<usize> {
        (0..points.len())
            .filter(|&j| haversine_km(points[i], points[j]) <= eps_km)
            .collect()
    };

    let mut labels: Vec<Option<usize>> = vec![None; points.len()];
    let mut visited = vec![false; points.len()];
    let mut groups = 0;

    for i in 0..points.len() {
        if visited[i] {
            continue;
        }
        visited[i] = true;
        let seed = neighbours(i);
        if seed.len() < min_points {
            continue;
        }

        let group = groups;
        groups += 1;
        labels[i] = Some(group);

        let mut queue = seed;
        while let Some(j) = queue.pop() {
            if labels[j].is_none() {
                labels[j] = Some(group);
            }
            if visited[j] {
                continue;
            }
            visited[j] = true;
            let next = neighbours(j);
            if next.len() >= min_points {
                queue.extend(next);
            }
        }
    }

    let noise = labels.iter().filter(|l| l.is_none()).count();
    Some(GroupSummary {
        labels,
        groups,
        noise,
    })
}
