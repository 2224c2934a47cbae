//! Broad phase collision detection using sweep and prune

use super::AABB;
use crate::physics::components::BodyId;
use glam::Vec3;
use std::cmp::Ordering;

/// Entry for broad phase collision detection
#[derive(Debug, Clone, Copy)]
pub struct BroadPhaseEntry {
    pub body: BodyId,
    pub aabb: AABB,
}

/// Interval bound on the sweep axis
#[derive(Debug, Clone, Copy)]
struct Bound {
    value: f32,
    index: usize,
    opens: bool,
}

/// Candidate pairs `(i, j)` with `i < j` whose boxes overlap, via sweep and prune
pub fn sweep_and_prune(entries: &[BroadPhaseEntry]) -> Vec<(usize, usize)> {
    if entries.len() < 2 {
        return Vec::new();
    }

    let axis = widest_spread_axis(entries);
    let mut bounds: Vec<Bound> = entries
        .iter()
        .enumerate()
        .flat_map(|(index, entry)| {
            [
                Bound {
                    value: entry.aabb.min[axis],
                    index,
                    opens: true,
                },
                Bound {
                    value: entry.aabb.max[axis],
                    index,
                    opens: false,
                },
            ]
        })
        .collect();

    // Openings sort before closings at equal values so touching boxes still pair up
    bounds.sort_by(|a, b| {
        a.value
            .partial_cmp(&b.value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.opens.cmp(&a.opens))
    });

    let mut pairs = Vec::new();
    let mut open: Vec<usize> = Vec::new();

    for bound in bounds {
        if !bound.opens {
            open.retain(|&index| index != bound.index);
            continue;
        }
        let entering = &entries[bound.index];
        for &other in &open {
            if entries[other].aabb.overlaps(&entering.aabb) {
                pairs.push((other.min(bound.index), other.max(bound.index)));
            }
        }
        open.push(bound.index);
    }

    pairs.sort_unstable();
    pairs.dedup();
    pairs
}

/// Axis along which the box centres vary the most
fn widest_spread_axis(entries: &[BroadPhaseEntry]) -> usize {
    let count = entries.len() as f32;
    let mean = entries
        .iter()
        .fold(Vec3::ZERO, |sum, entry| sum + entry.aabb.center())
        / count;
    let variance = entries.iter().fold(Vec3::ZERO, |sum, entry| {
        let diff = entry.aabb.center() - mean;
        sum + diff * diff
    });

    if variance.x > variance.y && variance.x > variance.z {
        0
    } else if variance.y > variance.z {
        1
    } else {
        2
    }
}

/// Reference O(n^2) pair search
pub fn brute_force_pairs(entries: &[BroadPhaseEntry]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();

    for i in 0..entries.len() {
        for j in (i + 1)..entries.len() {
            if entries[i].aabb.overlaps(&entries[j].aabb) {
                pairs.push((i, j));
            }
        }
    }

    pairs
}
