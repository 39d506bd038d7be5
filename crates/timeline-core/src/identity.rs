//! Player identity resolution.
//!
//! Rules are tried in order and the first one that matches wins:
//! 1. Exact SteamID64.
//! 2. Steam2 / Steam3 encodings converted to SteamID64.
//! 3. Exact display name (case-insensitive).
//! 4. Display-name substring (case-insensitive). More than one hit is an
//!    error rather than a guess, so the wrong player is never recorded.

use povtrim_common::error::{PovError, PovResult};
use povtrim_match_model::player::{PlayerIdentity, SteamId};

/// Resolve `token` against the players of a match.
pub fn resolve_player<'a>(
    players: &'a [PlayerIdentity],
    token: &str,
) -> PovResult<&'a PlayerIdentity> {
    let token = token.trim();
    if token.is_empty() {
        return Err(not_found(players, token));
    }

    if let Ok(raw) = token.parse::<u64>() {
        if let Some(player) = find_by_id(players, SteamId::new(raw)) {
            tracing::debug!(player = %player, "Resolved player by SteamID64");
            return Ok(player);
        }
    }

    if let Some(id) = SteamId::parse_alternate(token) {
        if let Some(player) = find_by_id(players, id) {
            tracing::debug!(player = %player, "Resolved player by alternate SteamID encoding");
            return Ok(player);
        }
    }

    let needle = token.to_lowercase();

    let exact: Vec<&PlayerIdentity> = players
        .iter()
        .filter(|p| p.name.to_lowercase() == needle)
        .collect();
    match exact.as_slice() {
        [player] => {
            tracing::debug!(player = %player, "Resolved player by exact name");
            return Ok(*player);
        }
        [] => {}
        many => return Err(ambiguous(token, many)),
    }

    let partial: Vec<&PlayerIdentity> = players
        .iter()
        .filter(|p| p.name.to_lowercase().contains(&needle))
        .collect();
    match partial.as_slice() {
        [player] => {
            tracing::debug!(player = %player, "Resolved player by partial name");
            Ok(*player)
        }
        [] => Err(not_found(players, token)),
        many => Err(ambiguous(token, many)),
    }
}

fn find_by_id(players: &[PlayerIdentity], id: SteamId) -> Option<&PlayerIdentity> {
    players.iter().find(|p| p.steamid == id)
}

fn not_found(players: &[PlayerIdentity], token: &str) -> PovError {
    PovError::NotFound {
        token: token.to_string(),
        available: players.iter().map(ToString::to_string).collect(),
    }
}

fn ambiguous(token: &str, candidates: &[&PlayerIdentity]) -> PovError {
    PovError::Ambiguous {
        token: token.to_string(),
        candidates: candidates.iter().map(ToString::to_string).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<PlayerIdentity> {
        vec![
            PlayerIdentity::new(SteamId::from_account_id(22_202), "Alpha", None),
            PlayerIdentity::new(SteamId::from_account_id(1_000), "Adam", None),
            PlayerIdentity::new(SteamId::from_account_id(77), "zywOo", None),
            PlayerIdentity::new(SteamId::from_account_id(78), "1337", None),
        ]
    }

    #[test]
    fn test_resolves_steamid64() {
        let players = roster();
        let found = resolve_player(&players, "76561197960287930").unwrap();
        assert_eq!(found.name, "Alpha");
    }

    #[test]
    fn test_resolves_alternate_encodings() {
        let players = roster();
        assert_eq!(resolve_player(&players, "STEAM_1:0:11101").unwrap().name, "Alpha");
        assert_eq!(resolve_player(&players, "[U:1:1000]").unwrap().name, "Adam");
        assert_eq!(resolve_player(&players, "steam_0:1:38").unwrap().name, "zywOo");
    }

    #[test]
    fn test_exact_name_is_case_insensitive() {
        let players = roster();
        assert_eq!(resolve_player(&players, "ZYWOO").unwrap().name, "zywOo");
    }

    #[test]
    fn test_exact_name_beats_substring() {
        let mut players = roster();
        players.push(PlayerIdentity::new(SteamId::from_account_id(5), "Alphabet", None));
        assert_eq!(resolve_player(&players, "alpha").unwrap().name, "Alpha");
    }

    #[test]
    fn test_numeric_name_falls_through_to_name_rules() {
        let players = roster();
        assert_eq!(resolve_player(&players, "1337").unwrap().name, "1337");
    }

    #[test]
    fn test_unique_substring_resolves() {
        let players = roster();
        assert_eq!(resolve_player(&players, "wo").unwrap().name, "zywOo");
    }

    #[test]
    fn test_ambiguous_substring_names_both_candidates() {
        let players = roster();
        match resolve_player(&players, "a") {
            Err(PovError::Ambiguous { token, candidates }) => {
                assert_eq!(token, "a");
                assert_eq!(candidates.len(), 2);
                assert!(candidates.iter().any(|c| c.starts_with("Alpha")));
                assert!(candidates.iter().any(|c| c.starts_with("Adam")));
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_token_lists_available_players() {
        let players = roster();
        match resolve_player(&players, "s1mple") {
            Err(PovError::NotFound { available, .. }) => assert_eq!(available.len(), 4),
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_steamid_is_not_found() {
        let players = roster();
        assert!(matches!(
            resolve_player(&players, "[U:1:999999]"),
            Err(PovError::NotFound { .. })
        ));
    }

    #[test]
    fn test_blank_token_is_not_found() {
        let players = roster();
        assert!(matches!(
            resolve_player(&players, "   "),
            Err(PovError::NotFound { .. })
        ));
    }
}
