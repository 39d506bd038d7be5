//! Alive interval derivation.
//!
//! # Algorithm
//!
//! Scan the player's events in tick order:
//! 1. **Spawn** opens an interval. A second spawn while one is already
//!    open is an anomaly; the interval restarts at the later spawn.
//! 2. **Death** closes the open interval at the death tick. A death with
//!    nothing open is an anomaly and is ignored.
//! 3. **MatchEnd** closes any open interval with the open-ended sentinel
//!    and stops the scan. A stream that simply runs out while an interval
//!    is open is treated the same way.
//! 4. Round boundaries never open or close intervals.
//!
//! Intervals of zero length (spawn and death on the same tick) carry no
//! footage and are dropped.

use std::fmt;

use serde::{Deserialize, Serialize};

use povtrim_match_model::event::{EventKind, RawEvent, Tick};

/// End of an alive interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalEnd {
    /// Exclusive end tick.
    At(Tick),
    /// Alive until the match (and the recording) ends.
    Open,
}

/// Half-open `[start_tick, end)` span during which the player is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AliveInterval {
    pub start_tick: Tick,
    pub end: IntervalEnd,
}

impl AliveInterval {
    /// Bounded end tick, if any.
    pub fn end_tick(&self) -> Option<Tick> {
        match self.end {
            IntervalEnd::At(tick) => Some(tick),
            IntervalEnd::Open => None,
        }
    }

    /// End tick with the open sentinel resolved to `match_end`.
    pub fn end_tick_or(&self, match_end: Tick) -> Tick {
        self.end_tick().unwrap_or(match_end.max(self.start_tick))
    }

    /// Length in ticks, resolving an open end to `match_end`.
    pub fn duration_ticks(&self, match_end: Tick) -> Tick {
        self.end_tick_or(match_end) - self.start_tick
    }

    /// Whether `tick` falls inside the interval.
    pub fn contains(&self, tick: Tick) -> bool {
        tick >= self.start_tick && self.end_tick().map_or(true, |end| tick < end)
    }
}

impl fmt::Display for AliveInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            IntervalEnd::At(end) => write!(f, "[{}, {})", self.start_tick, end),
            IntervalEnd::Open => write!(f, "[{}, end)", self.start_tick),
        }
    }
}

/// Data-quality problem found while deriving intervals. None of these
/// stop the derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// Spawn while already alive; the interval restarted here.
    DuplicateSpawn { tick: Tick, previous_start: Tick },
    /// Death while not alive; ignored.
    DeathWithoutSpawn { tick: Tick },
    /// Spawn and death on the same tick; the empty interval was dropped.
    ZeroLengthLife { tick: Tick },
    /// Events after the match end; ignored.
    EventsAfterMatchEnd { tick: Tick, count: usize },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateSpawn {
                tick,
                previous_start,
            } => write!(
                f,
                "spawn at tick {tick} while alive since tick {previous_start}"
            ),
            Self::DeathWithoutSpawn { tick } => write!(f, "death at tick {tick} while not alive"),
            Self::ZeroLengthLife { tick } => write!(f, "spawn and death both at tick {tick}"),
            Self::EventsAfterMatchEnd { tick, count } => {
                write!(f, "{count} event(s) after match end at tick {tick}")
            }
        }
    }
}

/// Result of one derivation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Derivation {
    /// Disjoint intervals in increasing start order.
    pub intervals: Vec<AliveInterval>,
    /// Anomalies encountered, in stream order.
    pub anomalies: Vec<Anomaly>,
}

impl Derivation {
    /// Total alive ticks, resolving an open end to `match_end`.
    pub fn alive_ticks(&self, match_end: Tick) -> Tick {
        self.intervals
            .iter()
            .map(|i| i.duration_ticks(match_end))
            .sum()
    }
}

/// Fold an ordered event sequence into alive intervals.
pub fn derive_alive_intervals(events: &[RawEvent]) -> Derivation {
    let mut derivation = Derivation::default();
    let mut open: Option<Tick> = None;

    for (index, event) in events.iter().enumerate() {
        match event.kind {
            EventKind::Spawn { .. } => {
                if let Some(previous_start) = open {
                    tracing::warn!(
                        tick = event.tick,
                        previous_start,
                        "Spawn without intervening death; restarting alive interval"
                    );
                    derivation.anomalies.push(Anomaly::DuplicateSpawn {
                        tick: event.tick,
                        previous_start,
                    });
                }
                open = Some(event.tick);
            }
            EventKind::Death { .. } => match open.take() {
                Some(start_tick) if event.tick > start_tick => {
                    derivation.intervals.push(AliveInterval {
                        start_tick,
                        end: IntervalEnd::At(event.tick),
                    });
                }
                Some(_) => {
                    tracing::warn!(tick = event.tick, "Zero-length life dropped");
                    derivation
                        .anomalies
                        .push(Anomaly::ZeroLengthLife { tick: event.tick });
                }
                None => {
                    tracing::warn!(tick = event.tick, "Death without a preceding spawn ignored");
                    derivation
                        .anomalies
                        .push(Anomaly::DeathWithoutSpawn { tick: event.tick });
                }
            },
            EventKind::MatchEnd => {
                if let Some(start_tick) = open.take() {
                    derivation.intervals.push(AliveInterval {
                        start_tick,
                        end: IntervalEnd::Open,
                    });
                }
                let trailing = events.len() - index - 1;
                if trailing > 0 {
                    tracing::warn!(
                        tick = event.tick,
                        trailing,
                        "Ignoring events after match end"
                    );
                    derivation.anomalies.push(Anomaly::EventsAfterMatchEnd {
                        tick: event.tick,
                        count: trailing,
                    });
                }
                return derivation;
            }
            EventKind::RoundStart { .. } | EventKind::RoundEnd { .. } => {}
        }
    }

    if let Some(start_tick) = open {
        tracing::debug!(start_tick, "Stream ended without match end; interval left open");
        derivation.intervals.push(AliveInterval {
            start_tick,
            end: IntervalEnd::Open,
        });
    }

    derivation
}

#[cfg(test)]
mod tests {
    use super::*;
    use povtrim_match_model::player::SteamId;

    const P: SteamId = SteamId::from_account_id(7);

    fn closed(start: Tick, end: Tick) -> AliveInterval {
        AliveInterval {
            start_tick: start,
            end: IntervalEnd::At(end),
        }
    }

    #[test]
    fn test_two_lives() {
        let events = vec![
            RawEvent::spawn(0, P),
            RawEvent::death(1000, P),
            RawEvent::spawn(1500, P),
            RawEvent::death(9000, P),
            RawEvent::match_end(9000),
        ];
        let derivation = derive_alive_intervals(&events);
        assert_eq!(
            derivation.intervals,
            vec![closed(0, 1000), closed(1500, 9000)]
        );
        assert!(derivation.anomalies.is_empty());
        assert_eq!(derivation.alive_ticks(9000), 8500);
    }

    #[test]
    fn test_alive_at_match_end_is_open() {
        let events = vec![
            RawEvent::spawn(100, P),
            RawEvent::round_end(5000, 1),
            RawEvent::match_end(6000),
        ];
        let derivation = derive_alive_intervals(&events);
        assert_eq!(
            derivation.intervals,
            vec![AliveInterval {
                start_tick: 100,
                end: IntervalEnd::Open
            }]
        );
        assert_eq!(derivation.alive_ticks(6000), 5900);
    }

    #[test]
    fn test_death_without_respawn_gives_single_bounded_interval() {
        let events = vec![
            RawEvent::spawn(0, P),
            RawEvent::death(400, P),
            RawEvent::match_end(8000),
        ];
        assert_eq!(derive_alive_intervals(&events).intervals, vec![closed(0, 400)]);
    }

    #[test]
    fn test_never_spawns_gives_empty_set() {
        let events = vec![RawEvent::round_start(0, 1), RawEvent::match_end(100)];
        let derivation = derive_alive_intervals(&events);
        assert!(derivation.intervals.is_empty());
        assert!(derivation.anomalies.is_empty());
    }

    #[test]
    fn test_duplicate_spawn_restarts_interval() {
        let events = vec![
            RawEvent::spawn(0, P),
            RawEvent::spawn(300, P),
            RawEvent::death(800, P),
        ];
        let derivation = derive_alive_intervals(&events);
        assert_eq!(derivation.intervals, vec![closed(300, 800)]);
        assert_eq!(
            derivation.anomalies,
            vec![Anomaly::DuplicateSpawn {
                tick: 300,
                previous_start: 0
            }]
        );
    }

    #[test]
    fn test_orphan_death_is_ignored() {
        let events = vec![RawEvent::death(50, P), RawEvent::spawn(100, P), RawEvent::death(200, P)];
        let derivation = derive_alive_intervals(&events);
        assert_eq!(derivation.intervals, vec![closed(100, 200)]);
        assert_eq!(
            derivation.anomalies,
            vec![Anomaly::DeathWithoutSpawn { tick: 50 }]
        );
    }

    #[test]
    fn test_zero_length_life_is_dropped() {
        let events = vec![RawEvent::spawn(100, P), RawEvent::death(100, P)];
        let derivation = derive_alive_intervals(&events);
        assert!(derivation.intervals.is_empty());
        assert_eq!(derivation.anomalies, vec![Anomaly::ZeroLengthLife { tick: 100 }]);
    }

    #[test]
    fn test_events_after_match_end_are_ignored() {
        let events = vec![
            RawEvent::spawn(0, P),
            RawEvent::match_end(500),
            RawEvent::spawn(600, P),
        ];
        let derivation = derive_alive_intervals(&events);
        assert_eq!(derivation.intervals.len(), 1);
        assert_eq!(
            derivation.anomalies,
            vec![Anomaly::EventsAfterMatchEnd {
                tick: 500,
                count: 1
            }]
        );
    }

    #[test]
    fn test_stream_without_match_end_leaves_interval_open() {
        let events = vec![RawEvent::spawn(10, P)];
        let derivation = derive_alive_intervals(&events);
        assert_eq!(derivation.intervals[0].end, IntervalEnd::Open);
    }

    #[test]
    fn test_interval_helpers() {
        let interval = closed(10, 20);
        assert!(interval.contains(10));
        assert!(!interval.contains(20));
        assert_eq!(interval.to_string(), "[10, 20)");

        let open = AliveInterval {
            start_tick: 10,
            end: IntervalEnd::Open,
        };
        assert!(open.contains(1_000_000));
        assert_eq!(open.end_tick_or(50), 50);
        assert_eq!(open.end_tick_or(5), 10);
        assert_eq!(open.to_string(), "[10, end)");
    }
}
