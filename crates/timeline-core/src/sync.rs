//! Match time to recording time synchronization.
//!
//! A correspondence point pins one match tick to one offset in the
//! recording. With a single point the mapping is that offset plus the
//! elapsed ticks at the record's tick rate. With more points a
//! least-squares line is fitted; a line that runs backwards or misses a
//! point by more than the residual tolerance means the points contradict
//! each other and the fit is rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use povtrim_common::clock::{wall_clock_offset_secs, DriftMeasurement};
use povtrim_common::error::{PovError, PovResult};
use povtrim_match_model::event::Tick;

use crate::intervals::{AliveInterval, IntervalEnd};

/// Default residual tolerance for multi-point fits (seconds).
pub const DEFAULT_RESIDUAL_TOLERANCE_SECS: f64 = 0.5;

/// One observed alignment between match time and recording time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrespondencePoint {
    pub match_tick: Tick,
    /// Offset into the recording, in seconds.
    pub recording_secs: f64,
}

impl CorrespondencePoint {
    pub fn new(match_tick: Tick, recording_secs: f64) -> Self {
        Self {
            match_tick,
            recording_secs,
        }
    }

    /// Build a point from the wall-clock instant the tick was observed,
    /// relative to when the recording started.
    pub fn from_wall_clock(
        match_tick: Tick,
        recording_start: DateTime<Utc>,
        observed: DateTime<Utc>,
    ) -> Self {
        Self::new(match_tick, wall_clock_offset_secs(recording_start, observed))
    }
}

/// Alive interval expressed in recording seconds, before padding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncedInterval {
    pub start_secs: f64,
    pub end_secs: f64,
}

impl SyncedInterval {
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

/// Fitted `tick -> seconds` mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct ClockSync {
    /// Reference tick the line is anchored at.
    anchor_tick: f64,
    /// Recording seconds at `anchor_tick`.
    anchor_secs: f64,
    /// Seconds per tick.
    slope: f64,
    points: usize,
}

impl ClockSync {
    /// Fit a mapping for `tick_rate` ticks per second.
    pub fn new(
        tick_rate: f64,
        points: &[CorrespondencePoint],
        residual_tolerance_secs: f64,
    ) -> PovResult<Self> {
        if !tick_rate.is_finite() || tick_rate <= 0.0 {
            return Err(PovError::malformed(format!(
                "Tick rate must be positive, got {tick_rate}"
            )));
        }
        if points.is_empty() {
            return Err(PovError::non_monotonic(
                "At least one correspondence point is required",
            ));
        }
        if let Some(bad) = points.iter().find(|p| !p.recording_secs.is_finite()) {
            return Err(PovError::non_monotonic(format!(
                "Correspondence point at tick {} has a non-finite offset",
                bad.match_tick
            )));
        }

        let points = dedup_points(points)?;

        if let [only] = points.as_slice() {
            tracing::debug!(
                tick = only.match_tick,
                secs = only.recording_secs,
                tick_rate,
                "Single-point clock sync"
            );
            return Ok(Self {
                anchor_tick: only.match_tick as f64,
                anchor_secs: only.recording_secs,
                slope: 1.0 / tick_rate,
                points: 1,
            });
        }

        // Centered least squares keeps large tick values from swamping the sums.
        let n = points.len() as f64;
        let mean_tick = points.iter().map(|p| p.match_tick as f64).sum::<f64>() / n;
        let mean_secs = points.iter().map(|p| p.recording_secs).sum::<f64>() / n;
        let (sxy, sxx) = points.iter().fold((0.0, 0.0), |(sxy, sxx), p| {
            let dx = p.match_tick as f64 - mean_tick;
            let dy = p.recording_secs - mean_secs;
            (sxy + dx * dy, sxx + dx * dx)
        });
        let slope = sxy / sxx;

        if !slope.is_finite() || slope <= 0.0 {
            return Err(PovError::non_monotonic(format!(
                "Correspondence points imply a non-increasing clock (slope {slope:.6} s/tick)"
            )));
        }

        let sync = Self {
            anchor_tick: mean_tick,
            anchor_secs: mean_secs,
            slope,
            points: points.len(),
        };

        for point in &points {
            let drift = DriftMeasurement {
                predicted_secs: sync.to_recording_secs(point.match_tick),
                observed_secs: point.recording_secs,
            };
            if drift.exceeds_threshold_secs(residual_tolerance_secs) {
                return Err(PovError::non_monotonic(format!(
                    "Correspondence point ({}, {:.3}s) is {:.3}s off the fitted clock \
                     (tolerance {residual_tolerance_secs}s)",
                    point.match_tick,
                    point.recording_secs,
                    drift.drift_secs().abs()
                )));
            }
            tracing::trace!(
                tick = point.match_tick,
                drift_ms = drift.drift_ms(),
                "Correspondence residual"
            );
        }

        let nominal = 1.0 / tick_rate;
        tracing::debug!(
            points = sync.points,
            slope,
            rate_ratio = slope / nominal,
            "Fitted clock sync"
        );

        Ok(sync)
    }

    /// Convenience for the common single-point case.
    pub fn single(tick_rate: f64, point: CorrespondencePoint) -> PovResult<Self> {
        Self::new(tick_rate, &[point], DEFAULT_RESIDUAL_TOLERANCE_SECS)
    }

    /// Recording offset of `tick`, in seconds.
    pub fn to_recording_secs(&self, tick: Tick) -> f64 {
        self.anchor_secs + (tick as f64 - self.anchor_tick) * self.slope
    }

    /// Fitted seconds per tick.
    pub fn seconds_per_tick(&self) -> f64 {
        self.slope
    }

    /// Number of distinct points the mapping was built from.
    pub fn point_count(&self) -> usize {
        self.points
    }

    /// Map an alive interval into recording seconds. An open end maps to
    /// the measured recording duration, not to tick arithmetic.
    pub fn map_interval(
        &self,
        interval: &AliveInterval,
        recording_duration_secs: f64,
    ) -> SyncedInterval {
        let start_secs = self.to_recording_secs(interval.start_tick);
        let end_secs = match interval.end {
            IntervalEnd::At(tick) => self.to_recording_secs(tick),
            IntervalEnd::Open => recording_duration_secs.max(start_secs),
        };
        SyncedInterval {
            start_secs,
            end_secs,
        }
    }

    pub fn map_intervals(
        &self,
        intervals: &[AliveInterval],
        recording_duration_secs: f64,
    ) -> Vec<SyncedInterval> {
        intervals
            .iter()
            .map(|i| self.map_interval(i, recording_duration_secs))
            .collect()
    }
}

/// Sort by tick, collapse exact duplicates, reject same-tick conflicts
/// and offsets that run backwards.
fn dedup_points(points: &[CorrespondencePoint]) -> PovResult<Vec<CorrespondencePoint>> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| {
        a.match_tick
            .cmp(&b.match_tick)
            .then(a.recording_secs.total_cmp(&b.recording_secs))
    });

    let mut unique: Vec<CorrespondencePoint> = Vec::with_capacity(sorted.len());
    for point in sorted {
        match unique.last() {
            Some(prev) if prev.match_tick == point.match_tick => {
                if (prev.recording_secs - point.recording_secs).abs() > f64::EPSILON {
                    return Err(PovError::non_monotonic(format!(
                        "Tick {} is mapped to both {:.3}s and {:.3}s",
                        point.match_tick, prev.recording_secs, point.recording_secs
                    )));
                }
            }
            Some(prev) if point.recording_secs < prev.recording_secs => {
                return Err(PovError::non_monotonic(format!(
                    "Tick {} maps to {:.3}s, before tick {} at {:.3}s",
                    point.match_tick, point.recording_secs, prev.match_tick, prev.recording_secs
                )));
            }
            _ => unique.push(point),
        }
    }
    Ok(unique)
}
