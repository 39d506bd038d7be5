//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default trim policy.
    pub trim: TrimDefaults,

    /// Cut executor settings.
    pub cut: CutDefaults,

    /// Clock synchronization settings.
    pub sync: SyncDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// What to do when a player has no alive time at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmptyPolicy {
    /// Report an error instead of producing an empty video.
    #[default]
    Fail,
    /// Produce an empty segment plan.
    EmptyOutput,
}

/// Default trim policy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimDefaults {
    /// Padding applied on both sides of every alive interval (seconds).
    pub padding_secs: f64,

    /// Gaps shorter than this are merged into one segment (seconds).
    pub merge_gap_secs: f64,

    /// Segments shorter than this are dropped (seconds).
    pub min_segment_secs: f64,

    /// Behaviour for players that are never alive.
    pub empty_policy: EmptyPolicy,
}

/// Default cut executor parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutDefaults {
    /// ffmpeg binary (name on PATH or absolute path).
    pub ffmpeg_path: PathBuf,

    /// ffprobe binary (name on PATH or absolute path).
    pub ffprobe_path: PathBuf,

    /// How far a boundary may move to reach a keyframe (seconds).
    pub keyframe_search_window_secs: f64,

    /// Overall budget for all external processes of one cut (seconds).
    pub timeout_secs: u64,

    /// Video encoder used when a boundary has to be re-encoded.
    pub reencode_codec: String,
}

/// Clock synchronization parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncDefaults {
    /// Largest accepted distance between a correspondence point and the
    /// fitted line (seconds).
    pub residual_tolerance_secs: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "povtrim=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for TrimDefaults {
    fn default() -> Self {
        Self {
            padding_secs: 1.0,
            merge_gap_secs: 3.0,
            min_segment_secs: 2.0,
            empty_policy: EmptyPolicy::Fail,
        }
    }
}

impl Default for CutDefaults {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            keyframe_search_window_secs: 5.0,
            timeout_secs: 1800,
            reencode_codec: "libx264".to_string(),
        }
    }
}

impl Default for SyncDefaults {
    fn default() -> Self {
        Self {
            residual_tolerance_secs: 0.5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &std::path::Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("povtrim").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let raw = r#"{ "trim": { "padding_secs": 0.5 } }"#;
        let config: AppConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.trim.padding_secs, 0.5);
        assert_eq!(config.trim.merge_gap_secs, 3.0);
        assert_eq!(config.trim.empty_policy, EmptyPolicy::Fail);
        assert_eq!(config.cut, CutDefaults::default());
    }

    #[test]
    fn test_empty_policy_serializes_snake_case() {
        let json = serde_json::to_string(&EmptyPolicy::EmptyOutput).unwrap();
        assert_eq!(json, "\"empty_output\"");
    }

    #[test]
    fn test_save_and_load_roundtrip_through_file() {
        let dir = std::env::temp_dir().join(format!("povtrim_config_test_{}", std::process::id()));
        let path = dir.join("config.json");
        let mut config = AppConfig::default();
        config.cut.timeout_secs = 42;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.cut.timeout_secs, 42);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_invalid_config_falls_back_to_defaults() {
        let dir = std::env::temp_dir().join(format!("povtrim_bad_config_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, "not json").unwrap();

        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
        std::fs::remove_dir_all(dir).ok();
    }
}
