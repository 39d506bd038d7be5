//! Match record files.
//!
//! A match record is what the external demo parser produces: header data
//! (map, tick rate, length), the player list, and the event stream. It is
//! stored either as a single JSON file or as a directory holding
//! `match.json` plus an optional `events.jsonl` event stream.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::event::{parse_events, EventKind, RawEvent, Tick};
use crate::player::{PlayerIdentity, SteamId};

/// Current match record schema version.
pub const RECORD_SCHEMA_VERSION: &str = "1.0";

/// File name of the record inside a record directory.
pub const RECORD_FILE_NAME: &str = "match.json";

/// File name of the optional event stream inside a record directory.
pub const EVENTS_FILE_NAME: &str = "events.jsonl";

/// Parsed match record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Schema version.
    #[serde(default = "default_version")]
    pub version: String,

    /// Map the match was played on.
    #[serde(default)]
    pub map_name: String,

    /// Server tick rate (ticks per second).
    pub tick_rate: f64,

    /// Total number of ticks in the recording.
    #[serde(default)]
    pub total_ticks: Tick,

    /// Players present at match start.
    pub players: Vec<PlayerIdentity>,

    /// Event stream in tick order.
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

fn default_version() -> String {
    RECORD_SCHEMA_VERSION.to_string()
}

/// A round reconstructed from round start/end events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSpan {
    /// 1-based round number.
    pub number: u32,
    pub start_tick: Tick,
    /// `None` when the round never ended (match cut short).
    pub end_tick: Option<Tick>,
}

impl MatchRecord {
    /// Create an empty record.
    pub fn new(map_name: impl Into<String>, tick_rate: f64, total_ticks: Tick) -> Self {
        Self {
            version: default_version(),
            map_name: map_name.into(),
            tick_rate,
            total_ticks,
            players: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Load a record from a JSON file or a record directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RecordError> {
        let path = path.as_ref();
        if path.is_dir() {
            let mut record = Self::load_file(&path.join(RECORD_FILE_NAME))?;
            let events_path = path.join(EVENTS_FILE_NAME);
            if events_path.exists() {
                let content =
                    std::fs::read_to_string(&events_path).map_err(|e| RecordError::IoError {
                        path: events_path.clone(),
                        source: e,
                    })?;
                let events = parse_events(&content).map_err(|e| RecordError::ParseError {
                    path: events_path,
                    source: e,
                })?;
                record.events.extend(events);
            }
            Ok(record)
        } else {
            Self::load_file(path)
        }
    }

    fn load_file(path: &Path) -> Result<Self, RecordError> {
        let json = std::fs::read_to_string(path).map_err(|e| RecordError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| RecordError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Match length in seconds, derived from the header.
    pub fn duration_secs(&self) -> f64 {
        if self.tick_rate > 0.0 {
            self.total_ticks as f64 / self.tick_rate
        } else {
            0.0
        }
    }

    /// Look up a player by canonical id.
    pub fn player(&self, steamid: SteamId) -> Option<&PlayerIdentity> {
        self.players.iter().find(|p| p.steamid == steamid)
    }

    /// Events belonging to one player, in stream order.
    pub fn player_events(&self, steamid: SteamId) -> impl Iterator<Item = &RawEvent> + '_ {
        self.events
            .iter()
            .filter(move |e| e.kind.player() == Some(steamid))
    }

    /// Round/match boundary events, in stream order.
    pub fn global_events(&self) -> impl Iterator<Item = &RawEvent> + '_ {
        self.events.iter().filter(|e| e.kind.is_global())
    }

    /// Tick of the logical match end: the `MatchEnd` event if present,
    /// otherwise the header's total tick count.
    pub fn match_end_tick(&self) -> Tick {
        self.events
            .iter()
            .find_map(|e| matches!(e.kind, EventKind::MatchEnd).then_some(e.tick))
            .unwrap_or(self.total_ticks)
    }

    /// Pair each round start with the first round end that follows it and
    /// precedes the next round start.
    pub fn round_spans(&self) -> Vec<RoundSpan> {
        let mut starts: Vec<Tick> = Vec::new();
        let mut ends: Vec<Tick> = Vec::new();
        for event in &self.events {
            match event.kind {
                EventKind::RoundStart { .. } => starts.push(event.tick),
                EventKind::RoundEnd { .. } => ends.push(event.tick),
                _ => {}
            }
        }
        starts.sort_unstable();
        ends.sort_unstable();

        starts
            .iter()
            .enumerate()
            .map(|(i, &start_tick)| {
                let next_start = starts.get(i + 1).copied().unwrap_or(Tick::MAX);
                let end_tick = ends
                    .iter()
                    .copied()
                    .find(|&end| end > start_tick && end <= next_start);
                RoundSpan {
                    number: i as u32 + 1,
                    start_tick,
                    end_tick,
                }
            })
            .collect()
    }

    /// Report data-quality problems. An empty list means the record is
    /// consistent; problems are descriptive, not fatal.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !self.tick_rate.is_finite() || self.tick_rate <= 0.0 {
            issues.push(format!("Tick rate must be positive, got {}", self.tick_rate));
        }

        if self.players.is_empty() {
            issues.push("Record lists no players".to_string());
        }

        let mut seen = HashSet::new();
        for player in &self.players {
            if !seen.insert(player.steamid) {
                issues.push(format!("Duplicate player id {}", player.steamid));
            }
        }

        for pair in self.events.windows(2) {
            if pair[1].tick < pair[0].tick {
                issues.push(format!(
                    "Event ticks go backwards: {} at tick {} follows tick {}",
                    pair[1].kind.label(),
                    pair[1].tick,
                    pair[0].tick
                ));
            }
        }

        for event in &self.events {
            if let Some(steamid) = event.kind.player() {
                if self.player(steamid).is_none() {
                    issues.push(format!(
                        "{} at tick {} references unknown player {}",
                        event.kind.label(),
                        event.tick,
                        steamid
                    ));
                }
            }
        }

        issues
    }
}

/// Errors that can occur when reading or writing match records.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
}
