//! Cut a recording down to a player's alive time.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use povtrim_common::config::AppConfig;
use povtrim_cut_engine::{
    execute_cut, plan_cut, CutBackend, CutJob, CutMode, CutProgress, CutSettings, CutStage,
    FfmpegBackend, ProgressCallback,
};

use super::plan::{build_plan, print_plan, recording_duration, PlanInputs};

/// Executor flags overriding the `cut` config section.
pub struct CutOverrides {
    pub timeout: Option<u64>,
    pub search_window: Option<f64>,
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
    pub keep_segments: bool,
}

impl CutOverrides {
    fn apply(self, mut settings: CutSettings) -> CutSettings {
        if let Some(secs) = self.timeout {
            settings.timeout = Duration::from_secs(secs);
        }
        if let Some(window) = self.search_window {
            settings.keyframe_search_window_secs = window;
        }
        if let Some(path) = self.ffmpeg {
            settings.ffmpeg_path = path;
        }
        if let Some(path) = self.ffprobe {
            settings.ffprobe_path = path;
        }
        settings.keep_workspace |= self.keep_segments;
        settings
    }
}

/// `<dir>/<stem>_trimmed.<ext>` next to the recording.
pub fn default_output_path(recording: &Path) -> PathBuf {
    let stem = recording
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("recording");
    let ext = recording
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("mp4");
    recording.with_file_name(format!("{stem}_trimmed.{ext}"))
}

pub async fn run(
    config: &AppConfig,
    inputs: PlanInputs,
    recording: PathBuf,
    output: Option<PathBuf>,
    overrides: CutOverrides,
    dry_run: bool,
) -> anyhow::Result<()> {
    let settings = overrides.apply(CutSettings::from(&config.cut));
    let mut probe_config = config.clone();
    probe_config.cut.ffprobe_path = settings.ffprobe_path.clone();

    let duration_secs = recording_duration(&probe_config, None, Some(&recording)).await?;
    let plan = build_plan(config, &inputs, duration_secs)?;
    print_plan(&plan);
    println!();

    if plan.segments.is_empty() {
        tracing::warn!(player = %plan.player, "Nothing to keep; no output written");
        println!("Nothing to keep; no output written.");
        return Ok(());
    }

    let output = output.unwrap_or_else(|| default_output_path(&recording));
    if output == recording {
        anyhow::bail!("Output would overwrite the source recording: {}", output.display());
    }

    let job = CutJob {
        source: recording,
        output,
        segments: plan.segments.segments.clone(),
        settings,
    };
    let backend = FfmpegBackend::new(job.settings.clone());

    if dry_run {
        let (source_secs, snapped) = plan_cut(&backend, &job).await?;
        println!("Cut plan for {} ({source_secs:.3}s):", job.source.display());
        for (i, segment) in snapped.iter().enumerate() {
            let mode = match segment.mode {
                CutMode::StreamCopy => "copy",
                CutMode::Reencode => "re-encode",
            };
            println!(
                "  {:>3}. [{:.3}, {:.3}]  {:.1}s  {mode}",
                i + 1,
                segment.start_secs,
                segment.end_secs,
                segment.duration_secs()
            );
        }
        return Ok(());
    }

    println!("Cutting: {}", job.source.display());
    println!("  Output: {}", job.output.display());

    let progress_cb: ProgressCallback = Box::new(|p: CutProgress| {
        let label = match p.stage {
            CutStage::Validating => "validating",
            CutStage::Probing => "probing",
            CutStage::Extracting => "extracting",
            CutStage::Concatenating => "joining",
            CutStage::Complete => "done",
        };
        print!(
            "\r  Progress: {label} ({}/{} segments)      ",
            p.segments_done, p.segments_total
        );
        std::io::stdout().flush().ok();
    });

    let report = match execute_cut(&backend, &job, Some(progress_cb)).await {
        Ok(report) => report,
        Err(e) => {
            println!();
            if e.is_process_failure() {
                println!("Cut failed in {}. Run `povtrim check` to verify the tools.", backend.name());
            }
            return Err(e.into());
        }
    };
    println!();

    let report_path = report.write_next_to_output()?;
    println!(
        "Cut complete: {} ({:.1}s kept from {:.1}s, {} re-encoded segment(s), {:.1}s elapsed)",
        report.output.display(),
        report.kept_secs,
        report.source_duration_secs,
        report.reencoded_segments,
        report.elapsed_secs
    );
    println!("  Report: {}", report_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/rec/match_pov.mp4")),
            PathBuf::from("/rec/match_pov_trimmed.mp4")
        );
        assert_eq!(
            default_output_path(Path::new("clip")),
            PathBuf::from("clip_trimmed.mp4")
        );
    }

    #[test]
    fn test_cut_overrides() {
        let settings = CutOverrides {
            timeout: Some(30),
            search_window: None,
            ffmpeg: Some(PathBuf::from("/opt/ffmpeg")),
            ffprobe: None,
            keep_segments: true,
        }
        .apply(CutSettings::default());
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.keyframe_search_window_secs, 5.0);
        assert_eq!(settings.ffmpeg_path, PathBuf::from("/opt/ffmpeg"));
        assert_eq!(settings.ffprobe_path, PathBuf::from("ffprobe"));
        assert!(settings.keep_workspace);
    }
}
