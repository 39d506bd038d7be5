//! povtrim Timeline Core: the trim engine
//!
//! Turns a match record into the list of recording segments worth keeping
//! for one player:
//! - **Identity:** Resolve a user-supplied token to one player
//! - **Builder:** Collect and order the player's events with round boundaries
//! - **Intervals:** Fold events into disjoint alive intervals (match ticks)
//! - **Sync:** Map match ticks to recording seconds from correspondence points
//! - **Planner:** Pad, merge, and filter intervals into keep segments
//!
//! Apart from [`load_record`], nothing here touches the filesystem or
//! spawns processes. The same inputs always produce the same plan.

pub mod builder;
pub mod engine;
pub mod identity;
pub mod intervals;
pub mod planner;
pub mod report;
pub mod sync;

pub use builder::{build_player_timeline, PlayerTimeline};
pub use engine::{load_record, Analysis, TrimEngine, TrimPlan, TrimRequest};
pub use identity::resolve_player;
pub use intervals::{derive_alive_intervals, AliveInterval, Anomaly, Derivation, IntervalEnd};
pub use planner::{plan_segments, KeepSegment, SegmentPlan, TrimPolicy};
pub use report::{InfoReport, IntervalRow};
pub use sync::{ClockSync, CorrespondencePoint, SyncedInterval, DEFAULT_RESIDUAL_TOLERANCE_SECS};
