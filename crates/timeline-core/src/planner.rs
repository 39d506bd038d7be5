//! Keep-segment planning.
//!
//! Synchronized alive intervals are padded, clamped to the recording,
//! merged across short gaps and filtered by minimum length. The output
//! is sorted, pairwise disjoint, and every segment is at least the
//! minimum length.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use povtrim_common::config::{EmptyPolicy, TrimDefaults};
use povtrim_common::error::{PovError, PovResult};

use crate::sync::SyncedInterval;

/// Planner parameters. Defaults come from [`TrimDefaults`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimPolicy {
    /// Seconds added before and after every interval.
    pub padding_secs: f64,
    /// Gaps strictly shorter than this are bridged.
    pub merge_gap_secs: f64,
    /// Segments strictly shorter than this are dropped.
    pub min_segment_secs: f64,
    pub empty_policy: EmptyPolicy,
}

impl Default for TrimPolicy {
    fn default() -> Self {
        Self::from(&TrimDefaults::default())
    }
}

impl From<&TrimDefaults> for TrimPolicy {
    fn from(defaults: &TrimDefaults) -> Self {
        Self {
            padding_secs: defaults.padding_secs,
            merge_gap_secs: defaults.merge_gap_secs,
            min_segment_secs: defaults.min_segment_secs,
            empty_policy: defaults.empty_policy,
        }
    }
}

impl TrimPolicy {
    /// Reject negative or non-finite parameters.
    pub fn validate(&self) -> PovResult<()> {
        for (name, value) in [
            ("padding", self.padding_secs),
            ("merge gap", self.merge_gap_secs),
            ("minimum segment length", self.min_segment_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PovError::config(format!(
                    "Trim {name} must be a non-negative number of seconds, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// `[start_secs, end_secs)` range of the recording to keep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeepSegment {
    pub start_secs: f64,
    pub end_secs: f64,
}

impl KeepSegment {
    pub fn new(start_secs: f64, end_secs: f64) -> Self {
        Self {
            start_secs,
            end_secs,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

/// Final planner output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentPlan {
    pub segments: Vec<KeepSegment>,
    pub recording_duration_secs: f64,
}

impl SegmentPlan {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Seconds of footage kept.
    pub fn kept_secs(&self) -> f64 {
        self.segments.iter().map(KeepSegment::duration_secs).sum()
    }

    /// Seconds of footage cut away.
    pub fn removed_secs(&self) -> f64 {
        (self.recording_duration_secs - self.kept_secs()).max(0.0)
    }

    /// One `[start, end]` pair per line, in seconds.
    pub fn to_listing(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            let _ = writeln!(out, "[{:.3}, {:.3}]", segment.start_secs, segment.end_secs);
        }
        out
    }
}

/// Turn synchronized intervals into keep segments.
pub fn plan_segments(
    intervals: &[SyncedInterval],
    recording_duration_secs: f64,
    policy: &TrimPolicy,
) -> PovResult<SegmentPlan> {
    policy.validate()?;
    if !recording_duration_secs.is_finite() || recording_duration_secs <= 0.0 {
        return Err(PovError::config(format!(
            "Recording duration must be positive, got {recording_duration_secs}"
        )));
    }

    // 1. Pad and clamp.
    let mut padded: Vec<KeepSegment> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        if !interval.start_secs.is_finite() || !interval.end_secs.is_finite() {
            tracing::warn!(?interval, "Skipping interval with non-finite bounds");
            continue;
        }
        let start = (interval.start_secs - policy.padding_secs).max(0.0);
        let end = (interval.end_secs + policy.padding_secs).min(recording_duration_secs);
        if end <= start {
            tracing::debug!(
                start_secs = interval.start_secs,
                end_secs = interval.end_secs,
                "Interval lies outside the recording; discarded"
            );
            continue;
        }
        padded.push(KeepSegment::new(start, end));
    }
    padded.sort_by(|a, b| a.start_secs.total_cmp(&b.start_secs));

    // 2. Merge across short gaps.
    let mut merged: Vec<KeepSegment> = Vec::with_capacity(padded.len());
    for segment in padded {
        match merged.last_mut() {
            Some(last) if segment.start_secs - last.end_secs < policy.merge_gap_secs => {
                last.end_secs = last.end_secs.max(segment.end_secs);
            }
            _ => merged.push(segment),
        }
    }

    // 3. Drop short segments.
    let before = merged.len();
    merged.retain(|s| s.duration_secs() >= policy.min_segment_secs);
    if merged.len() < before {
        tracing::debug!(
            dropped = before - merged.len(),
            min_segment_secs = policy.min_segment_secs,
            "Dropped short segments"
        );
    }

    // 4. Empty result.
    if merged.is_empty() && policy.empty_policy == EmptyPolicy::Fail {
        return Err(PovError::NothingToKeep);
    }

    let plan = SegmentPlan {
        segments: merged,
        recording_duration_secs,
    };
    tracing::info!(
        segments = plan.segments.len(),
        kept_secs = plan.kept_secs(),
        removed_secs = plan.removed_secs(),
        "Segment plan ready"
    );
    Ok(plan)
}
