//! Compute keep segments for a player.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;

use povtrim_common::config::AppConfig;
use povtrim_cut_engine::probe::probe_duration;
use povtrim_cut_engine::Deadline;
use povtrim_timeline_core::{load_record, TrimEngine, TrimPlan, TrimRequest};

use crate::args::{PolicyArgs, SyncArgs};

/// Budget for a lone duration probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// Everything `plan` and `trim` share.
pub struct PlanInputs {
    pub record: PathBuf,
    pub player: String,
    pub sync: SyncArgs,
    pub policy: PolicyArgs,
}

/// Load the record, gather correspondence and run the engine.
pub fn build_plan(
    config: &AppConfig,
    inputs: &PlanInputs,
    recording_duration_secs: f64,
) -> anyhow::Result<TrimPlan> {
    let record = load_record(&inputs.record)?;

    let mut engine = TrimEngine::from_config(config);
    engine.policy = inputs.policy.apply(engine.policy);
    engine.sync_tolerance_secs = inputs.sync.tolerance(engine.sync_tolerance_secs);

    let life_starts = engine
        .analyze(&record, &inputs.player)?
        .timeline
        .life_start_ticks();
    let correspondence = inputs.sync.correspondence(&life_starts)?;

    let plan = engine.plan(&TrimRequest {
        record: &record,
        player_token: &inputs.player,
        correspondence,
        recording_duration_secs,
    })?;
    Ok(plan)
}

/// Recording length from `--duration`, or probed from the file.
pub async fn recording_duration(
    config: &AppConfig,
    duration: Option<f64>,
    recording: Option<&Path>,
) -> anyhow::Result<f64> {
    match (duration, recording) {
        (Some(secs), _) => Ok(secs),
        (None, Some(path)) => {
            let deadline = Deadline::new(PROBE_TIMEOUT);
            let secs = probe_duration(&config.cut.ffprobe_path, path, &deadline)
                .await
                .with_context(|| format!("Failed to probe duration of {}", path.display()))?;
            tracing::info!(recording = %path.display(), duration_secs = secs, "Probed recording");
            Ok(secs)
        }
        (None, None) => anyhow::bail!("Either --duration or --recording is required"),
    }
}

/// Print the segment summary and listing.
pub fn print_plan(plan: &TrimPlan) {
    let segments = &plan.segments;
    println!("Player: {}", plan.player);
    println!(
        "  Alive intervals: {}   Anomalies: {}",
        plan.intervals.len(),
        plan.anomalies.len()
    );
    println!(
        "  Policy: padding {:.2}s, merge gap {:.2}s, min segment {:.2}s",
        plan.policy.padding_secs, plan.policy.merge_gap_secs, plan.policy.min_segment_secs
    );
    println!(
        "  Keep {:.1}s of {:.1}s ({:.1}s removed) in {} segment(s)",
        segments.kept_secs(),
        segments.recording_duration_secs,
        segments.removed_secs(),
        segments.segments.len()
    );
    println!();
    print!("{}", segments.to_listing());
}

pub async fn run(
    config: &AppConfig,
    inputs: PlanInputs,
    duration: Option<f64>,
    recording: Option<PathBuf>,
    json: bool,
    export: Option<PathBuf>,
) -> anyhow::Result<()> {
    let duration_secs = recording_duration(config, duration, recording.as_deref()).await?;
    let plan = build_plan(config, &inputs, duration_secs)?;

    if let Some(path) = &export {
        std::fs::write(path, serde_json::to_string_pretty(&plan)?)
            .with_context(|| format!("Failed to write plan to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Exported plan");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
        if plan.segments.is_empty() {
            println!("(nothing to keep)");
        }
    }
    Ok(())
}
