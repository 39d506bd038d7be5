//! Argument groups shared by `plan` and `trim`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Local, TimeZone, Timelike, Utc};
use clap::Args;

use povtrim_common::config::EmptyPolicy;
use povtrim_common::parse_wall_clock;
use povtrim_match_model::Tick;
use povtrim_timeline_core::{CorrespondencePoint, TrimPolicy};

use crate::console_log;

/// Trim policy overrides. Unset flags keep the configured value.
#[derive(Debug, Clone, Default, Args)]
pub struct PolicyArgs {
    /// Seconds added before and after every alive interval
    #[arg(long)]
    pub padding: Option<f64>,

    /// Gaps shorter than this many seconds are merged
    #[arg(long)]
    pub merge_gap: Option<f64>,

    /// Segments shorter than this many seconds are dropped
    #[arg(long)]
    pub min_segment: Option<f64>,

    /// Produce an empty plan instead of failing when nothing is kept
    #[arg(long)]
    pub allow_empty: bool,
}

impl PolicyArgs {
    pub fn apply(&self, mut policy: TrimPolicy) -> TrimPolicy {
        if let Some(padding) = self.padding {
            policy.padding_secs = padding;
        }
        if let Some(gap) = self.merge_gap {
            policy.merge_gap_secs = gap;
        }
        if let Some(min) = self.min_segment {
            policy.min_segment_secs = min;
        }
        if self.allow_empty {
            policy.empty_policy = EmptyPolicy::EmptyOutput;
        }
        policy
    }
}

/// Sources of correspondence points between match ticks and the recording.
#[derive(Debug, Clone, Default, Args)]
pub struct SyncArgs {
    /// Match tick observed at a recording offset, as TICK:SECONDS (repeatable)
    #[arg(long = "sync", value_name = "TICK:SECS", value_parser = parse_sync_point)]
    pub points: Vec<CorrespondencePoint>,

    /// Game console log used to locate the player's first spawn in the recording
    #[arg(long, requires_all = ["player_slot", "recording_start"])]
    pub console_log: Option<PathBuf>,

    /// Player slot shown in the console log prediction lines
    #[arg(long)]
    pub player_slot: Option<u32>,

    /// When the recording started (unix seconds or RFC 3339)
    #[arg(long, value_parser = parse_recording_start)]
    pub recording_start: Option<DateTime<Utc>>,

    /// Largest accepted clock fit residual (seconds)
    #[arg(long)]
    pub sync_tolerance: Option<f64>,
}

/// Console log timestamps have whole-second resolution.
const CONSOLE_LOG_MIN_TOLERANCE_SECS: f64 = 1.0;

impl SyncArgs {
    /// Collect every correspondence point. `life_starts` are the ticks at
    /// which the player came back to life, matched in order with the
    /// console log's spawn sightings. Without any source the recording is
    /// assumed to start at tick 0.
    pub fn correspondence(&self, life_starts: &[Tick]) -> anyhow::Result<Vec<CorrespondencePoint>> {
        let mut points = self.points.clone();

        if let (Some(log), Some(slot), Some(start)) =
            (&self.console_log, self.player_slot, self.recording_start)
        {
            if life_starts.is_empty() {
                tracing::warn!(
                    log = %log.display(),
                    "Player never spawns; console log not used for sync"
                );
            } else {
                points.extend(console_points(log, slot, start, life_starts)?);
            }
        }

        if points.is_empty() {
            tracing::warn!("No correspondence given; assuming the recording starts at tick 0");
            points.push(CorrespondencePoint::new(0, 0.0));
        }
        Ok(points)
    }

    /// Residual tolerance override. Console log points cannot fit tighter
    /// than their one-second resolution, so an unset tolerance is raised.
    pub fn tolerance(&self, configured: f64) -> f64 {
        match self.sync_tolerance {
            Some(tolerance) => tolerance,
            None if self.console_log.is_some() => configured.max(CONSOLE_LOG_MIN_TOLERANCE_SECS),
            None => configured,
        }
    }
}

/// Pair each spawn sighting in the console log after `recording_start`
/// with the matching life start.
fn console_points(
    log: &Path,
    slot: u32,
    recording_start: DateTime<Utc>,
    life_starts: &[Tick],
) -> anyhow::Result<Vec<CorrespondencePoint>> {
    let content = std::fs::read_to_string(log)
        .with_context(|| format!("Failed to read console log {}", log.display()))?;
    let local_start = recording_start.with_timezone(&Local).naive_local();
    let events = console_log::parse_pov_events(&content, slot, console_log::reference_year(&local_start));
    // The log has no sub-second part; a recording starting mid-second
    // still owns the line stamped with that second.
    let since = local_start.with_nanosecond(0).unwrap_or(local_start);
    let sightings = console_log::spawn_sightings(&events, since);
    if sightings.is_empty() {
        anyhow::bail!(
            "No TrueView prediction for player slot {slot} at or after {local_start} in {}",
            log.display()
        );
    }
    if sightings.len() != life_starts.len() {
        tracing::warn!(
            sightings = sightings.len(),
            life_starts = life_starts.len(),
            "Console log and match record disagree on the number of lives; pairing the leading ones"
        );
    }

    let mut points = Vec::with_capacity(sightings.len().min(life_starts.len()));
    for (seen, &tick) in sightings.iter().zip(life_starts) {
        let observed = Local
            .from_local_datetime(seen)
            .earliest()
            .with_context(|| format!("Console log time {seen} does not exist locally"))?
            .with_timezone(&Utc);
        points.push(CorrespondencePoint::from_wall_clock(tick, recording_start, observed));
    }
    tracing::info!(
        points = points.len(),
        first_tick = points[0].match_tick,
        first_recording_secs = points[0].recording_secs,
        pov_events = events.len(),
        "Console log correspondence"
    );
    Ok(points)
}

fn parse_sync_point(raw: &str) -> Result<CorrespondencePoint, String> {
    let (tick, secs) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected TICK:SECONDS, got '{raw}'"))?;
    let tick: Tick = tick
        .trim()
        .parse()
        .map_err(|e| format!("invalid tick '{tick}': {e}"))?;
    let secs: f64 = secs
        .trim()
        .parse()
        .map_err(|e| format!("invalid seconds '{secs}': {e}"))?;
    if !secs.is_finite() {
        return Err(format!("seconds must be finite, got '{secs}'"));
    }
    Ok(CorrespondencePoint::new(tick, secs))
}

fn parse_recording_start(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_wall_clock(raw).map_err(|e| e.to_string())
}
