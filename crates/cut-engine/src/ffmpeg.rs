//! ffmpeg/ffprobe backend.

use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};

use povtrim_common::error::PovResult;

use crate::cut::{CutBackend, CutMode, CutSettings, SnappedSegment};
use crate::probe::{probe_duration, probe_keyframes};
use crate::process::{run_tool, Deadline};

/// Backend shelling out to the ffmpeg command-line tools.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    settings: CutSettings,
}

impl FfmpegBackend {
    pub fn new(settings: CutSettings) -> Self {
        Self { settings }
    }

    /// Arguments extracting `segment` of `source` into `output`.
    pub fn extract_args(&self, source: &Path, segment: &SnappedSegment, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-hide_banner",
            "-loglevel",
            "error",
            "-nostdin",
            "-y",
            "-ss",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.push(format!("{:.6}", segment.start_secs).into());
        args.push("-i".into());
        args.push(source.as_os_str().to_owned());
        args.push("-t".into());
        args.push(format!("{:.6}", segment.duration_secs()).into());
        for arg in ["-map", "0:v:0", "-map", "0:a?"] {
            args.push(arg.into());
        }

        match segment.mode {
            CutMode::StreamCopy => {
                for arg in ["-c", "copy", "-avoid_negative_ts", "make_zero"] {
                    args.push(arg.into());
                }
            }
            CutMode::Reencode => {
                args.push("-c:v".into());
                args.push(self.settings.reencode_codec.as_str().into());
                if self.settings.reencode_codec.starts_with("libx26") {
                    for arg in ["-preset", "veryfast", "-crf", "18"] {
                        args.push(arg.into());
                    }
                }
                for arg in ["-c:a", "aac", "-b:a", "192k"] {
                    args.push(arg.into());
                }
            }
        }

        args.push(output.as_os_str().to_owned());
        args
    }

    /// Arguments joining a concat list into `output` without re-encoding.
    pub fn concat_args(list: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-hide_banner",
            "-loglevel",
            "error",
            "-nostdin",
            "-y",
            "-f",
            "concat",
            "-safe",
            "0",
            "-i",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.push(list.as_os_str().to_owned());
        for arg in ["-c", "copy", "-movflags", "+faststart"] {
            args.push(arg.into());
        }
        args.push(output.as_os_str().to_owned());
        args
    }
}

impl CutBackend for FfmpegBackend {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn is_available(&self) -> bool {
        tool_version(&self.settings.ffmpeg_path).is_some()
            && tool_version(&self.settings.ffprobe_path).is_some()
    }

    async fn source_duration(&self, source: &Path, deadline: &Deadline) -> PovResult<f64> {
        probe_duration(&self.settings.ffprobe_path, source, deadline).await
    }

    async fn keyframes(&self, source: &Path, deadline: &Deadline) -> PovResult<Vec<f64>> {
        probe_keyframes(&self.settings.ffprobe_path, source, deadline).await
    }

    async fn extract(
        &self,
        source: &Path,
        segment: &SnappedSegment,
        output: &Path,
        deadline: &Deadline,
    ) -> PovResult<()> {
        let args = self.extract_args(source, segment, output);
        tracing::debug!(
            start_secs = segment.start_secs,
            end_secs = segment.end_secs,
            mode = ?segment.mode,
            "Extracting segment"
        );
        run_tool(&self.settings.ffmpeg_path, &args, deadline).await?;
        Ok(())
    }

    async fn concat(&self, list: &Path, output: &Path, deadline: &Deadline) -> PovResult<()> {
        let args = Self::concat_args(list, output);
        tracing::debug!(output = %output.display(), "Concatenating segments");
        run_tool(&self.settings.ffmpeg_path, &args, deadline).await?;
        Ok(())
    }
}

/// First line of `program -version`, or `None` if it does not run.
pub fn tool_version(program: &Path) -> Option<String> {
    let output = Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Some(stdout.lines().next().unwrap_or_default().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_stream_copy_args() {
        let backend = FfmpegBackend::new(CutSettings::default());
        let segment = SnappedSegment {
            start_secs: 22.0,
            end_secs: 142.0,
            mode: CutMode::StreamCopy,
        };
        let args = strings(&backend.extract_args(
            Path::new("/rec/match.mp4"),
            &segment,
            Path::new("/tmp/segment_0001.mp4"),
        ));

        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input, "seek must precede the input for keyframe seeking");
        assert_eq!(args[ss + 1], "22.000000");
        assert_eq!(args[input + 1], "/rec/match.mp4");
        assert!(args.windows(2).any(|w| w[0] == "-t" && w[1] == "120.000000"));
        assert!(args.windows(2).any(|w| w[0] == "-c" && w[1] == "copy"));
        assert_eq!(args.last().unwrap(), "/tmp/segment_0001.mp4");
    }

    #[test]
    fn test_reencode_args_use_configured_codec() {
        let backend = FfmpegBackend::new(CutSettings {
            reencode_codec: "libx265".to_string(),
            ..CutSettings::default()
        });
        let segment = SnappedSegment {
            start_secs: 1.5,
            end_secs: 4.0,
            mode: CutMode::Reencode,
        };
        let args = strings(&backend.extract_args(Path::new("in.mkv"), &segment, Path::new("out.mkv")));
        assert!(args.windows(2).any(|w| w[0] == "-c:v" && w[1] == "libx265"));
        assert!(args.iter().any(|a| a == "-preset"));
        assert!(!args.iter().any(|a| a == "copy"));
    }

    #[test]
    fn test_concat_args() {
        let args = strings(&FfmpegBackend::concat_args(
            Path::new("/tmp/ws/segments.txt"),
            Path::new("/out/pov.mp4"),
        ));
        assert!(args.windows(2).any(|w| w[0] == "-f" && w[1] == "concat"));
        assert!(args.windows(2).any(|w| w[0] == "-safe" && w[1] == "0"));
        assert_eq!(args.last().unwrap(), "/out/pov.mp4");
    }

    #[test]
    fn test_missing_tool_is_unavailable() {
        let backend = FfmpegBackend::new(CutSettings {
            ffmpeg_path: "/nonexistent/ffmpeg".into(),
            ..CutSettings::default()
        });
        assert!(!backend.is_available());
        assert_eq!(tool_version(Path::new("/nonexistent/ffprobe")), None);
    }
}
