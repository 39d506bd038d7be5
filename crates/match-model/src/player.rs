//! Player identities and SteamID encodings.
//!
//! The canonical identity of a player is the 64-bit SteamID. Two other
//! textual encodings are accepted on input and can be produced on output:
//!
//! | Encoding | Example |
//! |---|---|
//! | SteamID64 | `76561197960287930` |
//! | Steam2 | `STEAM_1:0:11101` |
//! | Steam3 | `[U:1:22202]` |
//!
//! All three describe the same individual account; the Steam2 universe
//! digit is accepted but not significant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// SteamID64 of account id 0 in the public universe.
pub const STEAMID64_BASE: u64 = 76_561_197_960_265_728;

/// Canonical 64-bit player identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawSteamId", into = "u64")]
pub struct SteamId(u64);

/// Match records store ids either as numbers or as decimal strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSteamId {
    Number(u64),
    Text(String),
}

impl TryFrom<RawSteamId> for SteamId {
    type Error = SteamIdError;

    fn try_from(raw: RawSteamId) -> Result<Self, Self::Error> {
        match raw {
            RawSteamId::Number(id) => Ok(Self(id)),
            RawSteamId::Text(text) => text.parse(),
        }
    }
}

impl From<SteamId> for u64 {
    fn from(id: SteamId) -> Self {
        id.0
    }
}

impl SteamId {
    /// Wrap a raw SteamID64.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Build an individual-account id from its 32-bit account number.
    pub const fn from_account_id(account_id: u32) -> Self {
        Self(STEAMID64_BASE + account_id as u64)
    }

    /// Raw SteamID64 value.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// 32-bit account number, if this id lies in the individual range.
    pub fn account_id(self) -> Option<u32> {
        self.0
            .checked_sub(STEAMID64_BASE)
            .and_then(|account| u32::try_from(account).ok())
    }

    /// `STEAM_1:Y:Z` form.
    pub fn to_steam2(self) -> Option<String> {
        let account = self.account_id()?;
        Some(format!("STEAM_1:{}:{}", account & 1, account >> 1))
    }

    /// `[U:1:Z]` form.
    pub fn to_steam3(self) -> Option<String> {
        let account = self.account_id()?;
        Some(format!("[U:1:{account}]"))
    }

    /// Parse one of the two alternate encodings (`STEAM_X:Y:Z` or
    /// `[U:1:Z]`), case-insensitively. Returns `None` for anything else,
    /// including plain SteamID64 digits.
    pub fn parse_alternate(raw: &str) -> Option<Self> {
        let upper = raw.trim().to_ascii_uppercase();
        parse_steam2(&upper).or_else(|| parse_steam3(&upper))
    }
}

fn parse_steam2(upper: &str) -> Option<SteamId> {
    let rest = upper.strip_prefix("STEAM_")?;
    let mut parts = rest.split(':');
    let universe: u8 = parse_digits(parts.next()?)?;
    let low_bit: u64 = parse_digits(parts.next()?)?;
    let high: u64 = parse_digits(parts.next()?)?;
    if parts.next().is_some() || universe > 5 || low_bit > 1 {
        return None;
    }
    let account = high.checked_mul(2)?.checked_add(low_bit)?;
    u32::try_from(account).ok().map(SteamId::from_account_id)
}

fn parse_steam3(upper: &str) -> Option<SteamId> {
    let inner = upper.strip_prefix("[U:1:")?.strip_suffix(']')?;
    let account: u32 = parse_digits(inner)?;
    Some(SteamId::from_account_id(account))
}

/// Parse ASCII digits only (no sign, no whitespace).
fn parse_digits<T: FromStr>(raw: &str) -> Option<T> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

impl fmt::Display for SteamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a string is not a recognised SteamID encoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a SteamID64, STEAM_X:Y:Z or [U:1:Z] identifier")]
pub struct SteamIdError(pub String);

impl FromStr for SteamId {
    type Err = SteamIdError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if let Some(id) = parse_digits::<u64>(trimmed) {
            return Ok(Self(id));
        }
        Self::parse_alternate(trimmed).ok_or_else(|| SteamIdError(raw.to_string()))
    }
}

/// Team affiliation at match start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    #[serde(rename = "T", alias = "t", alias = "terrorist")]
    Terrorist,
    #[serde(rename = "CT", alias = "ct", alias = "counter_terrorist")]
    CounterTerrorist,
    #[serde(rename = "spectator")]
    Spectator,
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Terrorist => "T",
            Self::CounterTerrorist => "CT",
            Self::Spectator => "SPEC",
        };
        f.write_str(label)
    }
}

/// A player present in the match record. Never mutated after parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerIdentity {
    /// Canonical SteamID64.
    pub steamid: SteamId,

    /// Display name at match start.
    pub name: String,

    /// Team at match start.
    #[serde(default)]
    pub team: Option<Team>,
}

impl PlayerIdentity {
    pub fn new(steamid: SteamId, name: impl Into<String>, team: Option<Team>) -> Self {
        Self {
            steamid,
            name: name.into(),
            team,
        }
    }
}

impl fmt::Display for PlayerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.steamid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_account_in_every_encoding() {
        let id = SteamId::new(76_561_197_960_287_930);
        assert_eq!(id.account_id(), Some(22_202));
        assert_eq!(id.to_steam2().as_deref(), Some("STEAM_1:0:11101"));
        assert_eq!(id.to_steam3().as_deref(), Some("[U:1:22202]"));
    }

    #[test]
    fn test_parse_alternate_is_case_insensitive() {
        let expected = SteamId::new(76_561_197_960_287_930);
        assert_eq!(SteamId::parse_alternate("steam_0:0:11101"), Some(expected));
        assert_eq!(SteamId::parse_alternate("[u:1:22202]"), Some(expected));
        assert_eq!(SteamId::parse_alternate(" STEAM_1:0:11101 "), Some(expected));
    }

    #[test]
    fn test_parse_alternate_rejects_malformed_input() {
        assert_eq!(SteamId::parse_alternate("STEAM_0:2:11101"), None);
        assert_eq!(SteamId::parse_alternate("STEAM_9:0:11101"), None);
        assert_eq!(SteamId::parse_alternate("STEAM_0:0"), None);
        assert_eq!(SteamId::parse_alternate("STEAM_0:0:1:2"), None);
        assert_eq!(SteamId::parse_alternate("[U:1:abc]"), None);
        assert_eq!(SteamId::parse_alternate("[G:1:22202]"), None);
        assert_eq!(SteamId::parse_alternate("76561197960287930"), None);
    }

    #[test]
    fn test_from_str_accepts_all_encodings() {
        let expected = SteamId::new(76_561_197_960_287_930);
        assert_eq!("76561197960287930".parse::<SteamId>().unwrap(), expected);
        assert_eq!("STEAM_1:0:11101".parse::<SteamId>().unwrap(), expected);
        assert_eq!("[U:1:22202]".parse::<SteamId>().unwrap(), expected);
        assert!("s1mple".parse::<SteamId>().is_err());
        assert!("-5".parse::<SteamId>().is_err());
    }

    #[test]
    fn test_ids_below_base_have_no_alternate_form() {
        let id = SteamId::new(42);
        assert_eq!(id.account_id(), None);
        assert_eq!(id.to_steam2(), None);
        assert_eq!(id.to_steam3(), None);
    }

    #[test]
    fn test_steamid_deserializes_from_number_or_string() {
        let from_number: SteamId = serde_json::from_str("76561197960287930").unwrap();
        let from_string: SteamId = serde_json::from_str("\"76561197960287930\"").unwrap();
        assert_eq!(from_number, from_string);
        assert_eq!(serde_json::to_string(&from_string).unwrap(), "76561197960287930");
    }

    #[test]
    fn test_team_serde_labels() {
        let ct: Team = serde_json::from_str("\"CT\"").unwrap();
        assert_eq!(ct, Team::CounterTerrorist);
        let t: Team = serde_json::from_str("\"t\"").unwrap();
        assert_eq!(t, Team::Terrorist);
        assert_eq!(serde_json::to_string(&Team::Terrorist).unwrap(), "\"T\"");
    }

    #[test]
    fn test_player_display() {
        let player = PlayerIdentity::new(SteamId::new(76_561_197_960_287_930), "Alpha", None);
        assert_eq!(player.to_string(), "Alpha (76561197960287930)");
    }
}
