//! Game console log parsing.
//!
//! While spectating, the client logs a line whenever first-person
//! prediction for a player slot starts or stops:
//!
//! ```text
//! 01/28 15:30:45 [Prediction] Added TrueView prediction for player slot 3. ...
//! 01/28 15:31:02 [Prediction] Shutdown prediction for player slot 3. ...
//! ```
//!
//! The first "Added" line for the recorded slot after the recording
//! started marks the player's first spawn. An "Added" line that follows a
//! "Shutdown" at a strictly later second marks a respawn, so every life
//! after the first can be pinned to a wall-clock instant too.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

const TIMESTAMP_LEN: usize = "MM/DD HH:MM:SS".len();
const ADDED_MARKER: &str = "[Prediction] Added TrueView prediction for player slot ";
const SHUTDOWN_MARKER: &str = "[Prediction] Shutdown prediction for player slot ";

/// Kind of prediction change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PovChange {
    /// POV became active for the slot.
    Selected,
    /// POV stopped (usually the player died).
    Lost,
}

/// One prediction line for the slot of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PovEvent {
    /// Local wall-clock time of the line.
    pub at: NaiveDateTime,
    pub change: PovChange,
}

/// Collect prediction changes for `slot`, in file order. Lines whose
/// timestamp cannot be parsed are skipped.
pub fn parse_pov_events(content: &str, slot: u32, year: i32) -> Vec<PovEvent> {
    content
        .lines()
        .filter_map(|line| {
            let change = if slot_matches(line, ADDED_MARKER, slot) {
                PovChange::Selected
            } else if slot_matches(line, SHUTDOWN_MARKER, slot) {
                PovChange::Lost
            } else {
                return None;
            };
            let at = parse_timestamp(line.get(..TIMESTAMP_LEN)?, year)?;
            Some(PovEvent { at, change })
        })
        .collect()
}

/// Wall-clock instants at which the slot's POV came alive, at or after
/// `since`. The first selection counts as the first spawn. Later entries
/// are selections that follow a shutdown at a strictly later time; a
/// selection in the same second as the shutdown is a camera switch.
pub fn spawn_sightings(events: &[PovEvent], since: NaiveDateTime) -> Vec<NaiveDateTime> {
    let mut sightings = Vec::new();
    let mut lost_at: Option<NaiveDateTime> = None;

    for event in events.iter().filter(|e| e.at >= since) {
        match event.change {
            PovChange::Lost => {
                if !sightings.is_empty() {
                    lost_at = Some(event.at);
                }
            }
            PovChange::Selected if sightings.is_empty() => sightings.push(event.at),
            PovChange::Selected => {
                if let Some(lost) = lost_at.take() {
                    if event.at > lost {
                        sightings.push(event.at);
                    }
                }
            }
        }
    }
    sightings
}

/// Parse `MM/DD HH:MM:SS` in the given year.
pub fn parse_timestamp(raw: &str, year: i32) -> Option<NaiveDateTime> {
    let (date, time) = raw.trim().split_once(' ')?;
    let (month, day) = date.split_once('/')?;
    let date = NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)?;
    let time = chrono::NaiveTime::parse_from_str(time, "%H:%M:%S").ok()?;
    Some(date.and_time(time))
}

/// Year to assume for log lines, taken from the recording start.
pub fn reference_year(start: &NaiveDateTime) -> i32 {
    start.year()
}

fn slot_matches(line: &str, marker: &str, slot: u32) -> bool {
    let Some(pos) = line.find(marker) else {
        return false;
    };
    let rest = &line[pos + marker.len()..];
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse::<u32>().ok() == Some(slot)
}
