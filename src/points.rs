// src/points.rs
//! Reward points: 1 point for the first $2 of volume, +1 for each doubling.

use serde::Serialize;

/// Points earned for a cumulative USD volume. Non-decreasing in `volume`.
pub fn calculate_points(volume: f64) -> u32 {
    if !(volume > 0.0) {
        return 0;
    }
    let doublings = (volume / 2.0).log2().floor();
    // `as` saturates for infinite volume
    let points = (doublings as i64).saturating_add(1);
    points.clamp(1, u32::MAX as i64) as u32
}

/// Volume at which `points + 1` points are earned: `2^points * 2`.
pub fn next_threshold(points: u32) -> f64 {
    2f64.powi(points as i32) * 2.0
}

/// Volume at which the current point count started; 0 for the first point.
pub fn previous_threshold(points: u32) -> f64 {
    if points > 1 {
        next_threshold(points - 1)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub volume: f64,
    pub points: u32,
    pub next_threshold: f64,
    pub previous_threshold: f64,
    /// Position inside the current band, `(volume - previous) / (next - previous)`,
    /// 0..=100. Measured from the previous threshold so the bar restarts at
    /// every new point.
    pub progress_percent: f64,
}

pub fn progress(volume: f64) -> Progress {
    let points = calculate_points(volume);
    let next = next_threshold(points);
    let previous = previous_threshold(points);
    let span = next - previous;
    let percent = if span > 0.0 && volume.is_finite() {
        ((volume.max(0.0) - previous) / span * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };

    Progress {
        volume,
        points,
        next_threshold: next,
        previous_threshold: previous,
        progress_percent: percent,
    }
}
