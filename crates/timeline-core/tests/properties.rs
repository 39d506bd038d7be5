//! Property-based tests for the trim pipeline.
//!
//! Event streams are generated as arbitrary interleavings of spawns,
//! deaths and round boundaries so the deriver also sees anomalous input.

use povtrim_common::config::EmptyPolicy;
use povtrim_match_model::event::{RawEvent, Tick};
use povtrim_match_model::player::SteamId;
use povtrim_timeline_core::{
    derive_alive_intervals, plan_segments, ClockSync, CorrespondencePoint, IntervalEnd,
    SyncedInterval, TrimPolicy,
};
use proptest::prelude::*;

const PLAYER: SteamId = SteamId::from_account_id(42);

#[derive(Debug, Clone, Copy)]
enum Step {
    Spawn,
    Death,
    RoundStart,
    RoundEnd,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => Just(Step::Spawn),
        4 => Just(Step::Death),
        1 => Just(Step::RoundStart),
        1 => Just(Step::RoundEnd),
    ]
}

/// Ordered event stream ending in a match end.
fn event_stream() -> impl Strategy<Value = (Vec<RawEvent>, Tick)> {
    prop::collection::vec((step(), 0u64..500), 0..60).prop_map(|steps| {
        let mut tick: Tick = 0;
        let mut events: Vec<RawEvent> = steps
            .into_iter()
            .enumerate()
            .map(|(i, (step, delta))| {
                tick += delta;
                match step {
                    Step::Spawn => RawEvent::spawn(tick, PLAYER),
                    Step::Death => RawEvent::death(tick, PLAYER),
                    Step::RoundStart => RawEvent::round_start(tick, i as u32),
                    Step::RoundEnd => RawEvent::round_end(tick, i as u32),
                }
            })
            .collect();
        events.sort_by_key(RawEvent::sort_key);
        let match_end = tick + 1;
        events.push(RawEvent::match_end(match_end));
        (events, match_end)
    })
}

/// Strictly alternating spawn/death pairs with positive lifetimes.
fn alternating_lives() -> impl Strategy<Value = Vec<RawEvent>> {
    prop::collection::vec((0u64..300, 1u64..3000), 1..30).prop_map(|lives| {
        let mut tick: Tick = 0;
        let mut events = Vec::new();
        for (gap, life) in lives {
            tick += gap;
            events.push(RawEvent::spawn(tick, PLAYER));
            tick += life;
            events.push(RawEvent::death(tick, PLAYER));
        }
        events
    })
}

fn synced_intervals() -> impl Strategy<Value = Vec<SyncedInterval>> {
    prop::collection::vec((0.0f64..30.0, 0.1f64..60.0), 0..25).prop_map(|pairs| {
        let mut cursor = 0.0;
        pairs
            .into_iter()
            .map(|(gap, len)| {
                let start = cursor + gap;
                cursor = start + len;
                SyncedInterval {
                    start_secs: start,
                    end_secs: cursor,
                }
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn intervals_are_disjoint_and_increasing((events, match_end) in event_stream()) {
        let derivation = derive_alive_intervals(&events);
        for pair in derivation.intervals.windows(2) {
            let prev_end = pair[0].end_tick();
            prop_assert!(prev_end.is_some(), "only the last interval may be open");
            prop_assert!(prev_end.unwrap_or(Tick::MAX) <= pair[1].start_tick);
            prop_assert!(pair[0].start_tick < pair[1].start_tick);
        }
        for interval in &derivation.intervals {
            prop_assert!(interval.end_tick_or(match_end) > interval.start_tick);
        }
    }

    #[test]
    fn intervals_stay_within_first_spawn_and_match_end((events, match_end) in event_stream()) {
        let derivation = derive_alive_intervals(&events);
        let first_spawn = events
            .iter()
            .find(|e| matches!(e.kind, povtrim_match_model::event::EventKind::Spawn { .. }))
            .map(|e| e.tick);
        match first_spawn {
            None => prop_assert!(derivation.intervals.is_empty()),
            Some(first) => {
                for interval in &derivation.intervals {
                    prop_assert!(interval.start_tick >= first);
                    prop_assert!(interval.end_tick_or(match_end) <= match_end);
                }
            }
        }
    }

    #[test]
    fn derivation_is_idempotent((events, _) in event_stream()) {
        prop_assert_eq!(derive_alive_intervals(&events), derive_alive_intervals(&events));
    }

    #[test]
    fn n_alternating_lives_give_n_intervals(events in alternating_lives()) {
        let derivation = derive_alive_intervals(&events);
        prop_assert_eq!(derivation.intervals.len(), events.len() / 2);
        prop_assert!(derivation.anomalies.is_empty());
        prop_assert!(derivation.intervals.iter().all(|i| i.end != IntervalEnd::Open));
    }

    #[test]
    fn clock_sync_is_monotonic(
        tick_rate in prop::sample::select(vec![32.0, 64.0, 128.0]),
        anchor_tick in 0u64..100_000,
        anchor_secs in -60.0f64..600.0,
        drift in 0.98f64..1.02,
        ticks in prop::collection::vec(0u64..200_000, 2..50),
    ) {
        let points = [
            CorrespondencePoint::new(anchor_tick, anchor_secs),
            CorrespondencePoint::new(
                anchor_tick + 64_000,
                anchor_secs + drift * 64_000.0 / tick_rate,
            ),
        ];
        let sync = ClockSync::new(tick_rate, &points, 0.5).unwrap();
        let mut sorted = ticks;
        sorted.sort_unstable();
        for pair in sorted.windows(2) {
            prop_assert!(sync.to_recording_secs(pair[0]) <= sync.to_recording_secs(pair[1]));
        }
    }

    #[test]
    fn planner_output_is_sorted_disjoint_and_long_enough(
        intervals in synced_intervals(),
        padding in 0.0f64..3.0,
        gap in 0.0f64..6.0,
        min_len in 0.0f64..10.0,
    ) {
        let policy = TrimPolicy {
            padding_secs: padding,
            merge_gap_secs: gap,
            min_segment_secs: min_len,
            empty_policy: EmptyPolicy::EmptyOutput,
        };
        let duration = intervals.last().map_or(100.0, |i| i.end_secs * 0.9 + 1.0);
        let plan = plan_segments(&intervals, duration, &policy).unwrap();

        for segment in &plan.segments {
            prop_assert!(segment.start_secs >= 0.0);
            prop_assert!(segment.end_secs <= duration);
            prop_assert!(segment.duration_secs() >= min_len);
        }
        for pair in plan.segments.windows(2) {
            prop_assert!(pair[1].start_secs - pair[0].end_secs >= gap);
        }
    }

    #[test]
    fn merge_threshold_is_strict(gap in 0.5f64..10.0, eps in 0.01f64..0.4) {
        let policy = TrimPolicy {
            padding_secs: 0.0,
            merge_gap_secs: gap,
            min_segment_secs: 0.0,
            empty_policy: EmptyPolicy::Fail,
        };
        let pair = |separation: f64| {
            [
                SyncedInterval { start_secs: 10.0, end_secs: 20.0 },
                SyncedInterval { start_secs: 20.0 + separation, end_secs: 40.0 + separation },
            ]
        };

        let below = plan_segments(&pair(gap - eps), 100.0, &policy).unwrap();
        prop_assert_eq!(below.segments.len(), 1);

        let above = plan_segments(&pair(gap + eps), 100.0, &policy).unwrap();
        prop_assert_eq!(above.segments.len(), 2);
    }
}
