//! Cut planning and execution.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use povtrim_common::config::CutDefaults;
use povtrim_common::error::{PovError, PovResult};
use povtrim_timeline_core::planner::KeepSegment;

use crate::process::Deadline;
use crate::workspace::{move_into_place, SegmentWorkspace};

/// Slack when comparing boundaries against keyframes and the source end.
const BOUNDARY_EPSILON_SECS: f64 = 1e-3;

/// How one segment is extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutMode {
    /// Packets copied between two keyframes; no quality loss.
    StreamCopy,
    /// Decoded and encoded again; exact boundaries.
    Reencode,
}

/// A keep segment after keyframe alignment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnappedSegment {
    pub start_secs: f64,
    pub end_secs: f64,
    pub mode: CutMode,
}

impl SnappedSegment {
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

/// Executor settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CutSettings {
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    /// Furthest a boundary may move to reach a keyframe (seconds).
    pub keyframe_search_window_secs: f64,
    /// Budget for every process of one cut together.
    pub timeout: Duration,
    pub reencode_codec: String,
    /// Leave the segment workspace on disk after the cut.
    pub keep_workspace: bool,
}

impl Default for CutSettings {
    fn default() -> Self {
        Self::from(&CutDefaults::default())
    }
}

impl From<&CutDefaults> for CutSettings {
    fn from(defaults: &CutDefaults) -> Self {
        Self {
            ffmpeg_path: defaults.ffmpeg_path.clone(),
            ffprobe_path: defaults.ffprobe_path.clone(),
            keyframe_search_window_secs: defaults.keyframe_search_window_secs,
            timeout: Duration::from_secs(defaults.timeout_secs),
            reencode_codec: defaults.reencode_codec.clone(),
            keep_workspace: false,
        }
    }
}

/// A cut ready to run.
#[derive(Debug, Clone)]
pub struct CutJob {
    /// Source recording.
    pub source: PathBuf,
    /// Output file path.
    pub output: PathBuf,
    /// Keep segments in recording seconds.
    pub segments: Vec<KeepSegment>,
    pub settings: CutSettings,
}

/// Stages of a cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutStage {
    Validating,
    Probing,
    Extracting,
    Concatenating,
    Complete,
}

/// Progress report.
#[derive(Debug, Clone)]
pub struct CutProgress {
    pub stage: CutStage,
    pub segments_done: usize,
    pub segments_total: usize,
}

/// Progress callback for cut execution.
pub type ProgressCallback = Box<dyn Fn(CutProgress) + Send + Sync>;

/// What a finished cut did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutReport {
    pub source: PathBuf,
    pub output: PathBuf,
    pub source_duration_secs: f64,
    pub segments: Vec<SnappedSegment>,
    pub reencoded_segments: usize,
    pub kept_secs: f64,
    pub elapsed_secs: f64,
}

impl CutReport {
    /// Write the report as JSON next to the output file.
    pub fn write_next_to_output(&self) -> PovResult<PathBuf> {
        let path = self.output.with_extension("cut.json");
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        tracing::info!(report = %path.display(), "Wrote cut report");
        Ok(path)
    }
}

/// Media tool operations the executor needs.
pub trait CutBackend: Send + Sync {
    /// Backend name.
    fn name(&self) -> &str;

    /// Check whether the backend's tools are installed.
    fn is_available(&self) -> bool;

    /// Length of `source` in seconds.
    fn source_duration(
        &self,
        source: &Path,
        deadline: &Deadline,
    ) -> impl Future<Output = PovResult<f64>> + Send;

    /// Sorted keyframe times of the first video stream of `source`.
    fn keyframes(
        &self,
        source: &Path,
        deadline: &Deadline,
    ) -> impl Future<Output = PovResult<Vec<f64>>> + Send;

    /// Write `segment` of `source` into `output`.
    fn extract(
        &self,
        source: &Path,
        segment: &SnappedSegment,
        output: &Path,
        deadline: &Deadline,
    ) -> impl Future<Output = PovResult<()>> + Send;

    /// Join the files named in a concat list into `output`.
    fn concat(
        &self,
        list: &Path,
        output: &Path,
        deadline: &Deadline,
    ) -> impl Future<Output = PovResult<()>> + Send;
}

/// Check the ordering preconditions before any process is started.
pub fn validate_segments(segments: &[KeepSegment]) -> PovResult<()> {
    for (index, segment) in segments.iter().enumerate() {
        if !segment.start_secs.is_finite() || !segment.end_secs.is_finite() {
            return Err(PovError::SegmentsUnsorted {
                index,
                message: "segment bounds must be finite".to_string(),
            });
        }
        if segment.start_secs < 0.0 {
            return Err(PovError::SegmentsUnsorted {
                index,
                message: format!("segment starts before zero ({:.3}s)", segment.start_secs),
            });
        }
        if segment.end_secs <= segment.start_secs {
            return Err(PovError::SegmentsUnsorted {
                index,
                message: format!(
                    "segment ends at {:.3}s, not after its start {:.3}s",
                    segment.end_secs, segment.start_secs
                ),
            });
        }
    }

    for (offset, pair) in segments.windows(2).enumerate() {
        let (prev, next) = (pair[0], pair[1]);
        let index = offset + 1;
        if next.start_secs < prev.start_secs {
            return Err(PovError::SegmentsUnsorted {
                index,
                message: format!(
                    "starts at {:.3}s, before the previous segment at {:.3}s",
                    next.start_secs, prev.start_secs
                ),
            });
        }
        if next.start_secs < prev.end_secs {
            return Err(PovError::SegmentsOverlap {
                index,
                prev_start: prev.start_secs,
                prev_end: prev.end_secs,
                start: next.start_secs,
                end: next.end_secs,
            });
        }
    }
    Ok(())
}

/// Clamp segments to the source length, dropping any that start past it.
pub fn clamp_to_source(segments: &[KeepSegment], source_duration_secs: f64) -> Vec<KeepSegment> {
    segments
        .iter()
        .filter_map(|segment| {
            if segment.start_secs >= source_duration_secs {
                tracing::warn!(
                    start_secs = segment.start_secs,
                    source_duration_secs,
                    "Segment starts after the end of the source; skipped"
                );
                return None;
            }
            if segment.end_secs > source_duration_secs + BOUNDARY_EPSILON_SECS {
                tracing::debug!(
                    end_secs = segment.end_secs,
                    source_duration_secs,
                    "Segment end clamped to source duration"
                );
            }
            Some(KeepSegment::new(
                segment.start_secs,
                segment.end_secs.min(source_duration_secs),
            ))
        })
        .collect()
}

/// Align each segment to keyframes.
///
/// Starts move back to the nearest preceding keyframe, ends forward to
/// the nearest following one (the source end also counts). A boundary
/// with no keyframe inside `window_secs` keeps its exact position and
/// the whole segment is re-encoded. Segments that overlap after
/// snapping are coalesced.
pub fn snap_segments(
    segments: &[KeepSegment],
    keyframes: &[f64],
    window_secs: f64,
    source_duration_secs: f64,
) -> Vec<SnappedSegment> {
    let mut snapped: Vec<SnappedSegment> = Vec::with_capacity(segments.len());

    for segment in segments {
        let start = preceding_keyframe(keyframes, segment.start_secs)
            .filter(|kf| segment.start_secs - kf <= window_secs);
        let end = if segment.end_secs >= source_duration_secs - BOUNDARY_EPSILON_SECS {
            Some(source_duration_secs)
        } else {
            following_keyframe(keyframes, segment.end_secs)
                .filter(|kf| kf - segment.end_secs <= window_secs)
                .map(|kf| kf.min(source_duration_secs))
        };

        let next = match (start, end) {
            (Some(start_secs), Some(end_secs)) => SnappedSegment {
                start_secs,
                end_secs,
                mode: CutMode::StreamCopy,
            },
            _ => {
                tracing::debug!(
                    start_secs = segment.start_secs,
                    end_secs = segment.end_secs,
                    start_keyframe = start.is_some(),
                    end_keyframe = end.is_some(),
                    "No keyframe within search window; segment will be re-encoded"
                );
                SnappedSegment {
                    start_secs: segment.start_secs,
                    end_secs: segment.end_secs,
                    mode: CutMode::Reencode,
                }
            }
        };

        match snapped.last_mut() {
            Some(last) if next.start_secs < last.end_secs => {
                last.end_secs = last.end_secs.max(next.end_secs);
                if next.mode == CutMode::Reencode {
                    last.mode = CutMode::Reencode;
                }
            }
            _ => snapped.push(next),
        }
    }

    snapped
}

fn preceding_keyframe(keyframes: &[f64], at: f64) -> Option<f64> {
    let idx = keyframes.partition_point(|kf| *kf <= at + BOUNDARY_EPSILON_SECS);
    idx.checked_sub(1).map(|i| keyframes[i].min(at))
}

fn following_keyframe(keyframes: &[f64], at: f64) -> Option<f64> {
    let idx = keyframes.partition_point(|kf| *kf < at - BOUNDARY_EPSILON_SECS);
    keyframes.get(idx).map(|kf| kf.max(at))
}

/// Validate, probe and snap without extracting anything.
pub async fn plan_cut<B: CutBackend>(
    backend: &B,
    job: &CutJob,
) -> PovResult<(f64, Vec<SnappedSegment>)> {
    let deadline = Deadline::new(job.settings.timeout);
    plan_with_deadline(backend, job, &deadline).await
}

async fn plan_with_deadline<B: CutBackend>(
    backend: &B,
    job: &CutJob,
    deadline: &Deadline,
) -> PovResult<(f64, Vec<SnappedSegment>)> {
    validate_segments(&job.segments)?;
    if job.segments.is_empty() {
        return Err(PovError::NothingToKeep);
    }
    if !job.source.exists() {
        return Err(PovError::FileNotFound {
            path: job.source.clone(),
        });
    }

    let duration = backend.source_duration(&job.source, deadline).await?;
    let segments = clamp_to_source(&job.segments, duration);
    if segments.is_empty() {
        return Err(PovError::NothingToKeep);
    }

    let keyframes = backend.keyframes(&job.source, deadline).await?;
    if keyframes.is_empty() {
        tracing::warn!(
            source = %job.source.display(),
            "No keyframes found; every segment will be re-encoded"
        );
    }

    let snapped = snap_segments(
        &segments,
        &keyframes,
        job.settings.keyframe_search_window_secs,
        duration,
    );
    Ok((duration, snapped))
}

/// Cut `job.source` down to `job.segments` and write `job.output`.
pub async fn execute_cut<B: CutBackend>(
    backend: &B,
    job: &CutJob,
    progress: Option<ProgressCallback>,
) -> PovResult<CutReport> {
    tracing::info!(
        source = %job.source.display(),
        output = %job.output.display(),
        segments = job.segments.len(),
        backend = backend.name(),
        "Starting cut"
    );
    let deadline = Deadline::new(job.settings.timeout);
    let report = |stage, done, total| {
        if let Some(cb) = &progress {
            cb(CutProgress {
                stage,
                segments_done: done,
                segments_total: total,
            });
        }
    };

    report(CutStage::Validating, 0, job.segments.len());
    validate_segments(&job.segments)?;

    if !backend.is_available() {
        return Err(PovError::unsupported(format!(
            "Cut backend '{}' is not available (expected ffmpeg and ffprobe)",
            backend.name()
        )));
    }

    report(CutStage::Probing, 0, job.segments.len());
    let (source_duration_secs, mut snapped) = plan_with_deadline(backend, job, &deadline).await?;
    let total = snapped.len();

    if let Some(parent) = job.output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut workspace = SegmentWorkspace::create(&job.output)?;
    if job.settings.keep_workspace {
        workspace.keep();
        tracing::info!(dir = %workspace.dir().display(), "Keeping segment workspace");
    }

    let mut parts = Vec::with_capacity(total);
    for (index, segment) in snapped.iter_mut().enumerate() {
        report(CutStage::Extracting, index, total);
        let part = workspace.segment_path(index);
        extract_with_fallback(backend, job, index, segment, &part, &deadline).await?;
        parts.push(part);
    }

    if let [only] = parts.as_slice() {
        move_into_place(only, &job.output)?;
    } else {
        report(CutStage::Concatenating, total, total);
        let list = workspace.write_concat_list(&parts)?;
        let joined = workspace.joined_path();
        backend.concat(&list, &joined, &deadline).await?;
        move_into_place(&joined, &job.output)?;
    }
    drop(workspace);

    report(CutStage::Complete, total, total);

    let cut = CutReport {
        source: job.source.clone(),
        output: job.output.clone(),
        source_duration_secs,
        reencoded_segments: snapped
            .iter()
            .filter(|s| s.mode == CutMode::Reencode)
            .count(),
        kept_secs: snapped.iter().map(SnappedSegment::duration_secs).sum(),
        segments: snapped,
        elapsed_secs: deadline.elapsed_secs(),
    };
    tracing::info!(
        output = %cut.output.display(),
        segments = cut.segments.len(),
        reencoded = cut.reencoded_segments,
        kept_secs = cut.kept_secs,
        elapsed_secs = cut.elapsed_secs,
        "Cut finished"
    );
    Ok(cut)
}

/// Extract one segment. A failed stream copy is retried once as a
/// re-encode of the same requested range; a failed re-encode is fatal.
async fn extract_with_fallback<B: CutBackend>(
    backend: &B,
    job: &CutJob,
    index: usize,
    segment: &mut SnappedSegment,
    part: &Path,
    deadline: &Deadline,
) -> PovResult<()> {
    if segment.mode == CutMode::StreamCopy {
        match backend.extract(&job.source, segment, part, deadline).await {
            Ok(()) => return Ok(()),
            Err(PovError::ProcessFailed { stderr, .. }) => {
                tracing::warn!(
                    index,
                    stderr = %stderr,
                    "Stream copy failed; re-encoding segment"
                );
                segment.mode = CutMode::Reencode;
            }
            Err(other) => return Err(other),
        }
    }

    match backend.extract(&job.source, segment, part, deadline).await {
        Ok(()) => Ok(()),
        Err(PovError::ProcessFailed { stderr, .. }) => Err(PovError::NoSafeCutPoint {
            index,
            start: segment.start_secs,
            end: segment.end_secs,
            message: stderr,
        }),
        Err(other) => Err(other),
    }
}
