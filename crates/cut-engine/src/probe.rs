//! ffprobe queries and output parsing.

use std::ffi::OsStr;
use std::path::Path;

use povtrim_common::error::{PovError, PovResult};

use crate::process::{run_tool, Deadline};

/// Container duration of `source` in seconds.
pub async fn probe_duration(ffprobe: &Path, source: &Path, deadline: &Deadline) -> PovResult<f64> {
    let output = run_tool(
        ffprobe,
        [
            OsStr::new("-v"),
            OsStr::new("error"),
            OsStr::new("-show_entries"),
            OsStr::new("format=duration"),
            OsStr::new("-of"),
            OsStr::new("default=noprint_wrappers=1:nokey=1"),
            source.as_os_str(),
        ],
        deadline,
    )
    .await?;

    parse_duration(&output.stdout).ok_or_else(|| {
        PovError::malformed(format!(
            "ffprobe reported no usable duration for {}: '{}'",
            source.display(),
            output.stdout.trim()
        ))
    })
}

/// Presentation times of every keyframe of the first video stream.
///
/// Reads packet flags only, so nothing is decoded.
pub async fn probe_keyframes(
    ffprobe: &Path,
    source: &Path,
    deadline: &Deadline,
) -> PovResult<Vec<f64>> {
    let output = run_tool(
        ffprobe,
        [
            OsStr::new("-v"),
            OsStr::new("error"),
            OsStr::new("-select_streams"),
            OsStr::new("v:0"),
            OsStr::new("-show_entries"),
            OsStr::new("packet=pts_time,flags"),
            OsStr::new("-of"),
            OsStr::new("csv=p=0"),
            source.as_os_str(),
        ],
        deadline,
    )
    .await?;

    let keyframes = parse_keyframe_times(&output.stdout);
    tracing::debug!(
        source = %source.display(),
        keyframes = keyframes.len(),
        "Probed keyframes"
    );
    Ok(keyframes)
}

/// Parse ffprobe's bare `format=duration` output.
pub fn parse_duration(raw: &str) -> Option<f64> {
    raw.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs > 0.0)
}

/// Parse `pts_time,flags` CSV lines, keeping keyframe packets only.
/// The result is sorted and free of duplicates.
pub fn parse_keyframe_times(raw: &str) -> Vec<f64> {
    let mut times: Vec<f64> = raw
        .lines()
        .filter_map(|line| {
            let mut fields = line.trim().split(',');
            let pts = fields.next()?.trim();
            let flags = fields.next()?.trim();
            if !flags.contains('K') {
                return None;
            }
            pts.parse::<f64>().ok().filter(|t| t.is_finite())
        })
        .collect();
    times.sort_by(f64::total_cmp);
    times.dedup();
    times
}
