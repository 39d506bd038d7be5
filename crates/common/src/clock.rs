//! Clock and timing utilities for recording synchronization.
//!
//! A screen recording is anchored to the wall-clock instant at which the
//! capture process started. Anything the automation layer observes while
//! the recording runs (a spawn, a camera lock) is expressed as an offset
//! from that anchor. This module provides utilities for:
//! - Converting observed wall-clock instants into recording offsets
//! - Parsing recording start timestamps
//! - Measuring drift between predicted and observed offsets

use chrono::{DateTime, TimeZone, Utc};

use crate::error::{PovError, PovResult};

/// Seconds between `start` and `observed` (negative if `observed` is earlier).
pub fn wall_clock_offset_secs(start: DateTime<Utc>, observed: DateTime<Utc>) -> f64 {
    let delta = observed.signed_duration_since(start);
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}

/// Parse a wall-clock instant given either as unix seconds (fractional
/// allowed) or as an RFC 3339 timestamp.
pub fn parse_wall_clock(raw: &str) -> PovResult<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(unix) = trimmed.parse::<f64>() {
        if !unix.is_finite() || unix < 0.0 {
            return Err(PovError::config(format!("Invalid unix timestamp: {raw}")));
        }
        let secs = unix.trunc() as i64;
        let nanos = ((unix - unix.trunc()) * 1e9).round() as u32;
        return Utc
            .timestamp_opt(secs, nanos.min(999_999_999))
            .single()
            .ok_or_else(|| PovError::config(format!("Unix timestamp out of range: {raw}")));
    }

    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PovError::config(format!("Invalid timestamp '{raw}': {e}")))
}

/// Drift between a predicted recording offset and an observed one.
#[derive(Debug, Clone, Copy)]
pub struct DriftMeasurement {
    /// Offset predicted from match time (seconds).
    pub predicted_secs: f64,
    /// Offset actually observed in the recording (seconds).
    pub observed_secs: f64,
}

impl DriftMeasurement {
    /// Drift in seconds (positive = observed is later than predicted).
    pub fn drift_secs(&self) -> f64 {
        self.observed_secs - self.predicted_secs
    }

    /// Drift in milliseconds.
    pub fn drift_ms(&self) -> f64 {
        self.drift_secs() * 1_000.0
    }

    /// Whether drift exceeds an acceptable threshold.
    pub fn exceeds_threshold_secs(&self, threshold_secs: f64) -> bool {
        self.drift_secs().abs() > threshold_secs
    }
}
