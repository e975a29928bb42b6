//! Selection algorithm implementations
//!
//! One function per algorithm. Each receives the already-filtered candidate
//! statistics and returns the index of its pick, or `None` for an empty set.

use dashmap::DashMap;
use rand::Rng;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};
use std::time::Duration;

/// Minimum weight a candidate keeps in weighted selection
pub const MIN_SELECTION_WEIGHT: f64 = 0.1;

/// Monitor-derived inputs for one filtered candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateStats {
    pub health_score: f64,
    pub avg_response_time: Option<Duration>,
    /// Outstanding requests as reported by the load source
    pub outstanding: usize,
}

/// Higher score first, then lower average latency (no samples counts as zero)
fn compare_health(a: &CandidateStats, b: &CandidateStats) -> Ordering {
    b.health_score
        .partial_cmp(&a.health_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            a.avg_response_time
                .unwrap_or_default()
                .cmp(&b.avg_response_time.unwrap_or_default())
        })
}

/// Highest composite health score (HealthBased)
///
/// Ties go to the lowest average response time, then to the earliest candidate.
pub fn health_based(candidates: &[CandidateStats]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        match best {
            Some(current) if compare_health(candidate, &candidates[current]) != Ordering::Less => {}
            _ => best = Some(index),
        }
    }
    best
}

/// Candidate indices ordered best-first by health (stable for equal entries)
pub fn rank_by_health(candidates: &[CandidateStats]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| compare_health(&candidates[a], &candidates[b]));
    order
}

/// Round-robin selection (RoundRobin)
///
/// Cycles through candidates using a per-key counter.
pub fn round_robin(
    key: &str,
    candidate_count: usize,
    round_robin_counters: &DashMap<String, AtomicUsize>,
) -> Option<usize> {
    if candidate_count == 0 {
        return None;
    }

    let index = match round_robin_counters.get(key) {
        Some(counter) => counter.fetch_add(1, Relaxed),
        None => round_robin_counters
            .entry(key.to_string())
            .or_insert_with(|| AtomicUsize::new(0))
            .fetch_add(1, Relaxed),
    };

    Some(index % candidate_count)
}

/// Weighted random selection (Weighted)
///
/// Each candidate's health score, clamped to at least
/// [`MIN_SELECTION_WEIGHT`], is its weight. A point is drawn uniformly from
/// `[0, total)` and the candidate whose cumulative interval contains it wins.
pub fn weighted(candidates: &[CandidateStats]) -> Option<usize> {
    if candidates.len() <= 1 {
        return if candidates.is_empty() { None } else { Some(0) };
    }

    let weights: Vec<f64> = candidates
        .iter()
        .map(|c| {
            if c.health_score.is_finite() {
                c.health_score.max(MIN_SELECTION_WEIGHT)
            } else {
                MIN_SELECTION_WEIGHT
            }
        })
        .collect();
    let total: f64 = weights.iter().sum();

    let mut point = rand::thread_rng().gen_range(0.0..total);
    for (index, weight) in weights.iter().enumerate() {
        if point < *weight {
            return Some(index);
        }
        point -= weight;
    }

    // Floating point remainder lands on the last candidate
    Some(candidates.len() - 1)
}

/// Uniform random selection (Random)
pub fn random(candidate_count: usize) -> Option<usize> {
    if candidate_count == 0 {
        return None;
    }
    Some(rand::thread_rng().gen_range(0..candidate_count))
}

/// Fewest outstanding requests (LeastLoad)
///
/// Ties go to the earliest candidate.
pub fn least_load(candidates: &[CandidateStats]) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .min_by_key(|(_, c)| c.outstanding)
        .map(|(index, _)| index)
}
