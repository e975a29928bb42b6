//! Composite health score
//!
//! `score = 0.7 * success_rate + 0.3 * response_time_score`, where the
//! success rate is on a 0-100 scale and the response time score is the
//! banded latency points normalized to 0-100. The latency term therefore
//! contributes at most 30 points and the score stays within 0..=100.

use std::time::Duration;

/// Weight of the success rate component
pub const SUCCESS_RATE_WEIGHT: f64 = 0.7;

/// Weight of the response time component
pub const RESPONSE_TIME_WEIGHT: f64 = 0.3;

/// Points awarded by the best latency band
pub const MAX_RESPONSE_TIME_POINTS: f64 = 30.0;

/// Upper bound (inclusive, milliseconds) and points of each latency band
const RESPONSE_TIME_BANDS: [(f64, f64); 5] = [
    (100.0, 30.0),
    (500.0, 25.0),
    (1000.0, 20.0),
    (2000.0, 15.0),
    (5000.0, 10.0),
];

/// Points for anything slower than the last band
const SLOWEST_BAND_POINTS: f64 = 5.0;

/// Latency band points (5..=30) for an average response time
///
/// A provider with no successful samples yet falls in the best band.
pub fn response_time_points(avg_response_time: Option<Duration>) -> f64 {
    let Some(avg) = avg_response_time else {
        return MAX_RESPONSE_TIME_POINTS;
    };

    let avg_ms = avg.as_secs_f64() * 1000.0;
    RESPONSE_TIME_BANDS
        .iter()
        .find(|(limit_ms, _)| avg_ms <= *limit_ms)
        .map(|(_, points)| *points)
        .unwrap_or(SLOWEST_BAND_POINTS)
}

/// Composite health score in 0..=100
pub fn health_score(success_rate: f64, avg_response_time: Option<Duration>) -> f64 {
    let success_rate = success_rate.clamp(0.0, 100.0);
    let response_time_score =
        response_time_points(avg_response_time) / MAX_RESPONSE_TIME_POINTS * 100.0;

    SUCCESS_RATE_WEIGHT * success_rate + RESPONSE_TIME_WEIGHT * response_time_score
}
