//! Engine facade: record + player token + correspondence points + policy
//! in, keep segments out.

use std::path::Path;

use serde::Serialize;

use povtrim_common::config::{AppConfig, EmptyPolicy};
use povtrim_common::error::{PovError, PovResult};
use povtrim_match_model::player::PlayerIdentity;
use povtrim_match_model::record::{MatchRecord, RecordError};

use crate::builder::{build_player_timeline, PlayerTimeline};
use crate::identity::resolve_player;
use crate::intervals::{derive_alive_intervals, AliveInterval, Anomaly, Derivation};
use crate::planner::{plan_segments, SegmentPlan, TrimPolicy};
use crate::sync::{ClockSync, CorrespondencePoint, SyncedInterval, DEFAULT_RESIDUAL_TOLERANCE_SECS};

/// Load a match record, mapping file errors onto the engine taxonomy.
pub fn load_record(path: &Path) -> PovResult<MatchRecord> {
    MatchRecord::load(path).map_err(|e| match e {
        RecordError::IoError { path, source } if source.kind() == std::io::ErrorKind::NotFound => {
            PovError::FileNotFound { path }
        }
        other => PovError::malformed(other.to_string()),
    })
}

/// Timeline and alive intervals for one resolved player.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub timeline: PlayerTimeline,
    pub derivation: Derivation,
}

impl Analysis {
    pub fn player(&self) -> &PlayerIdentity {
        &self.timeline.player
    }

    pub fn intervals(&self) -> &[AliveInterval] {
        &self.derivation.intervals
    }
}

/// Everything needed to plan one trim.
#[derive(Debug, Clone)]
pub struct TrimRequest<'a> {
    pub record: &'a MatchRecord,
    pub player_token: &'a str,
    pub correspondence: Vec<CorrespondencePoint>,
    /// Measured length of the recording (seconds).
    pub recording_duration_secs: f64,
}

/// Result of a full planning pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrimPlan {
    pub player: PlayerIdentity,
    pub intervals: Vec<AliveInterval>,
    pub anomalies: Vec<Anomaly>,
    pub synced: Vec<SyncedInterval>,
    pub policy: TrimPolicy,
    pub segments: SegmentPlan,
}

/// Stateless engine holding the policy parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimEngine {
    pub policy: TrimPolicy,
    pub sync_tolerance_secs: f64,
}

impl Default for TrimEngine {
    fn default() -> Self {
        Self::new(TrimPolicy::default(), DEFAULT_RESIDUAL_TOLERANCE_SECS)
    }
}

impl TrimEngine {
    pub fn new(policy: TrimPolicy, sync_tolerance_secs: f64) -> Self {
        Self {
            policy,
            sync_tolerance_secs,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            TrimPolicy::from(&config.trim),
            config.sync.residual_tolerance_secs,
        )
    }

    /// Resolve the player and derive their alive intervals. No clock
    /// sync or recording is involved.
    pub fn analyze(&self, record: &MatchRecord, player_token: &str) -> PovResult<Analysis> {
        if !record.tick_rate.is_finite() || record.tick_rate <= 0.0 {
            return Err(PovError::malformed(format!(
                "Tick rate must be positive, got {}",
                record.tick_rate
            )));
        }

        let player = resolve_player(&record.players, player_token)?;
        let timeline = build_player_timeline(record, player)?;
        let derivation = derive_alive_intervals(&timeline.events);

        tracing::info!(
            player = %player,
            intervals = derivation.intervals.len(),
            anomalies = derivation.anomalies.len(),
            "Derived alive intervals"
        );

        Ok(Analysis {
            timeline,
            derivation,
        })
    }

    /// Run the whole pipeline up to the keep-segment plan.
    pub fn plan(&self, request: &TrimRequest<'_>) -> PovResult<TrimPlan> {
        self.policy.validate()?;
        let analysis = self.analyze(request.record, request.player_token)?;

        if analysis.derivation.intervals.is_empty() && self.policy.empty_policy == EmptyPolicy::Fail
        {
            return Err(PovError::NoAliveTime {
                player: analysis.player().to_string(),
            });
        }

        let sync = ClockSync::new(
            request.record.tick_rate,
            &request.correspondence,
            self.sync_tolerance_secs,
        )?;
        let synced = sync.map_intervals(
            &analysis.derivation.intervals,
            request.recording_duration_secs,
        );
        let segments = plan_segments(&synced, request.recording_duration_secs, &self.policy)?;

        let Analysis {
            timeline,
            derivation,
        } = analysis;

        Ok(TrimPlan {
            player: timeline.player,
            intervals: derivation.intervals,
            anomalies: derivation.anomalies,
            synced,
            policy: self.policy,
            segments,
        })
    }
}
