//! povtrim Match Model
//!
//! Defines the data contracts produced by the external demo parser:
//! - **Players:** Canonical identities and the accepted SteamID encodings
//! - **Events:** Tick-stamped spawn, death, round, and match-end events
//! - **Record:** Header, player list, and event stream of one match
//!
//! All times are match-relative ticks; conversion to seconds uses the
//! record's tick rate.

pub mod event;
pub mod player;
pub mod record;

pub use event::*;
pub use player::*;
pub use record::*;
