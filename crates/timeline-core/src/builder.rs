//! Event timeline construction for one player.

use povtrim_common::error::{PovError, PovResult};
use povtrim_match_model::event::{EventKind, RawEvent, Tick};
use povtrim_match_model::player::PlayerIdentity;
use povtrim_match_model::record::MatchRecord;

/// The ordered events relevant to one player: their own spawns and
/// deaths plus the round and match boundaries shared by everyone.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerTimeline {
    /// The player the timeline was built for.
    pub player: PlayerIdentity,

    /// Events sorted by tick, same-tick events by kind priority.
    pub events: Vec<RawEvent>,
}

impl PlayerTimeline {
    /// Tick of the player's first spawn.
    pub fn first_spawn_tick(&self) -> Option<Tick> {
        self.events
            .iter()
            .find_map(|e| matches!(e.kind, EventKind::Spawn { .. }).then_some(e.tick))
    }

    /// Ticks at which the player came back to life: the first spawn and
    /// every spawn that follows one of their deaths at a later tick. A
    /// spawn while already alive (a new round) does not start a life.
    pub fn life_start_ticks(&self) -> Vec<Tick> {
        let mut starts = Vec::new();
        let mut died_at: Option<Tick> = None;
        for event in &self.events {
            match event.kind {
                EventKind::Death { .. } if !starts.is_empty() => died_at = Some(event.tick),
                EventKind::Spawn { .. } if starts.is_empty() => starts.push(event.tick),
                EventKind::Spawn { .. } => {
                    if let Some(death) = died_at.take() {
                        if event.tick > death {
                            starts.push(event.tick);
                        }
                    }
                }
                _ => {}
            }
        }
        starts
    }

    /// Number of spawn events.
    pub fn spawn_count(&self) -> usize {
        self.count(|kind| matches!(kind, EventKind::Spawn { .. }))
    }

    /// Number of death events.
    pub fn death_count(&self) -> usize {
        self.count(|kind| matches!(kind, EventKind::Death { .. }))
    }

    /// Number of round starts.
    pub fn round_count(&self) -> usize {
        self.count(|kind| matches!(kind, EventKind::RoundStart { .. }))
    }

    fn count(&self, predicate: impl Fn(&EventKind) -> bool) -> usize {
        self.events.iter().filter(|e| predicate(&e.kind)).count()
    }
}

/// Collect and order the events for `player`.
///
/// Fails with `MalformedRecord` when the record holds no event at all for
/// the player. A player who has events but never spawns is not an error;
/// it simply produces no alive intervals later on.
pub fn build_player_timeline(
    record: &MatchRecord,
    player: &PlayerIdentity,
) -> PovResult<PlayerTimeline> {
    let own_events = record.player_events(player.steamid).count();
    if own_events == 0 {
        return Err(PovError::malformed(format!(
            "No spawn or death events found for {player}"
        )));
    }

    let mut events: Vec<RawEvent> = record
        .events
        .iter()
        .filter(|e| e.kind.is_global() || e.kind.player() == Some(player.steamid))
        .cloned()
        .collect();

    let out_of_order = events
        .windows(2)
        .filter(|pair| pair[1].tick < pair[0].tick)
        .count();
    if out_of_order > 0 {
        tracing::warn!(
            player = %player,
            out_of_order,
            "Event stream is not in tick order; sorting"
        );
    }

    // Stable sort keeps the record's order for identical keys.
    events.sort_by_key(RawEvent::sort_key);

    tracing::debug!(
        player = %player,
        own_events,
        total_events = events.len(),
        "Built player timeline"
    );

    Ok(PlayerTimeline {
        player: player.clone(),
        events,
    })
}
