//! Raw match events.
//!
//! Events are produced once by the match-file parser, in tick order, and
//! are immutable afterwards. They can be embedded in the match record or
//! stored as JSONL (one event per line).

use serde::{Deserialize, Serialize};

use crate::player::{SteamId, Team};

/// Match-relative tick number.
pub type Tick = u64;

/// A single event with its tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Match-relative tick.
    pub tick: Tick,

    /// The event payload.
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Discriminated union of event types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Player became alive and spectatable.
    Spawn {
        /// Player who spawned.
        player: SteamId,
    },

    /// Player died.
    Death {
        /// Player who died.
        player: SteamId,
        /// Killer, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attacker: Option<SteamId>,
        /// Weapon name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weapon: Option<String>,
        #[serde(default)]
        headshot: bool,
    },

    /// Round began.
    RoundStart {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        round: Option<u32>,
    },

    /// Round ended.
    RoundEnd {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        round: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        winner: Option<Team>,
    },

    /// Logical end of the match.
    MatchEnd,
}

impl EventKind {
    /// Ordering of events that share a tick. A round ending is processed
    /// before a death on the same tick, a death before a respawn, and a
    /// respawn before the next round starts. The match end comes last.
    pub fn tick_priority(&self) -> u8 {
        match self {
            Self::RoundEnd { .. } => 0,
            Self::Death { .. } => 1,
            Self::Spawn { .. } => 2,
            Self::RoundStart { .. } => 3,
            Self::MatchEnd => 4,
        }
    }

    /// Player this event belongs to, for per-player events.
    pub fn player(&self) -> Option<SteamId> {
        match self {
            Self::Spawn { player } | Self::Death { player, .. } => Some(*player),
            _ => None,
        }
    }

    /// Whether this is a round/match boundary shared by all players.
    pub fn is_global(&self) -> bool {
        self.player().is_none()
    }

    /// Short lowercase label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Spawn { .. } => "spawn",
            Self::Death { .. } => "death",
            Self::RoundStart { .. } => "round_start",
            Self::RoundEnd { .. } => "round_end",
            Self::MatchEnd => "match_end",
        }
    }
}

impl RawEvent {
    /// Create a spawn event.
    pub fn spawn(tick: Tick, player: SteamId) -> Self {
        Self {
            tick,
            kind: EventKind::Spawn { player },
        }
    }

    /// Create a death event without attacker details.
    pub fn death(tick: Tick, player: SteamId) -> Self {
        Self {
            tick,
            kind: EventKind::Death {
                player,
                attacker: None,
                weapon: None,
                headshot: false,
            },
        }
    }

    /// Create a round start event.
    pub fn round_start(tick: Tick, round: u32) -> Self {
        Self {
            tick,
            kind: EventKind::RoundStart { round: Some(round) },
        }
    }

    /// Create a round end event.
    pub fn round_end(tick: Tick, round: u32) -> Self {
        Self {
            tick,
            kind: EventKind::RoundEnd {
                round: Some(round),
                winner: None,
            },
        }
    }

    /// Create a match end event.
    pub fn match_end(tick: Tick) -> Self {
        Self {
            tick,
            kind: EventKind::MatchEnd,
        }
    }

    /// Total ordering key: tick first, then same-tick priority.
    pub fn sort_key(&self) -> (Tick, u8) {
        (self.tick, self.kind.tick_priority())
    }
}

/// Parse events from JSONL content (one JSON object per line).
pub fn parse_events(jsonl: &str) -> Result<Vec<RawEvent>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYER: SteamId = SteamId::new(76_561_197_960_287_930);

    #[test]
    fn test_death_event_json_shape() {
        let event = RawEvent::death(1000, PLAYER);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"tick\":1000"));
        assert!(json.contains("\"type\":\"death\""));
        assert!(json.contains("\"player\":76561197960287930"));
        assert!(!json.contains("attacker"));
    }

    #[test]
    fn test_death_event_with_details_parses() {
        let raw = r#"{"tick":640,"type":"death","player":"76561197960287930","attacker":76561197960287931,"weapon":"ak47","headshot":true}"#;
        let event: RawEvent = serde_json::from_str(raw).unwrap();
        match event.kind {
            EventKind::Death {
                player,
                attacker,
                weapon,
                headshot,
            } => {
                assert_eq!(player, PLAYER);
                assert_eq!(attacker, Some(SteamId::new(76_561_197_960_287_931)));
                assert_eq!(weapon.as_deref(), Some("ak47"));
                assert!(headshot);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_match_end_parses_without_payload() {
        let event: RawEvent = serde_json::from_str(r#"{"tick":9000,"type":"match_end"}"#).unwrap();
        assert_eq!(event, RawEvent::match_end(9000));
        assert!(event.kind.is_global());
    }

    #[test]
    fn test_tick_priority_orders_same_tick_events() {
        let mut events = vec![
            RawEvent::match_end(10),
            RawEvent::round_start(10, 2),
            RawEvent::spawn(10, PLAYER),
            RawEvent::death(10, PLAYER),
            RawEvent::round_end(10, 1),
        ];
        events.sort_by_key(RawEvent::sort_key);
        let labels: Vec<_> = events.iter().map(|e| e.kind.label()).collect();
        assert_eq!(
            labels,
            vec!["round_end", "death", "spawn", "round_start", "match_end"]
        );
    }

    #[test]
    fn test_parse_events_skips_comments_and_blank_lines() {
        let jsonl = "# demo events\n\n{\"tick\":0,\"type\":\"spawn\",\"player\":76561197960287930}\n{\"tick\":5,\"type\":\"round_start\",\"round\":1}\n";
        let events = parse_events(jsonl).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], RawEvent::spawn(0, PLAYER));
        assert_eq!(events[1], RawEvent::round_start(5, 1));
    }

    #[test]
    fn test_player_accessor() {
        assert_eq!(RawEvent::spawn(0, PLAYER).kind.player(), Some(PLAYER));
        assert_eq!(RawEvent::round_end(0, 1).kind.player(), None);
    }
}
