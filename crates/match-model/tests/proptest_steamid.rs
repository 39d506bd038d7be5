//! Property-based tests for SteamID encodings.
//!
//! Every individual account id must survive a trip through each textual
//! encoding and back.

use povtrim_match_model::player::SteamId;
use proptest::prelude::*;

proptest! {
    #[test]
    fn steam2_roundtrip(account in any::<u32>()) {
        let id = SteamId::from_account_id(account);
        let encoded = id.to_steam2().unwrap();
        prop_assert_eq!(SteamId::parse_alternate(&encoded), Some(id));
    }

    #[test]
    fn steam3_roundtrip(account in any::<u32>()) {
        let id = SteamId::from_account_id(account);
        let encoded = id.to_steam3().unwrap();
        prop_assert_eq!(SteamId::parse_alternate(&encoded), Some(id));
    }

    #[test]
    fn steamid64_roundtrip(account in any::<u32>()) {
        let id = SteamId::from_account_id(account);
        prop_assert_eq!(id.to_string().parse::<SteamId>().unwrap(), id);
    }

    #[test]
    fn lowercase_encodings_parse_to_same_id(account in any::<u32>()) {
        let id = SteamId::from_account_id(account);
        let steam2 = id.to_steam2().unwrap().to_lowercase();
        let steam3 = id.to_steam3().unwrap().to_lowercase();
        prop_assert_eq!(SteamId::parse_alternate(&steam2), Some(id));
        prop_assert_eq!(SteamId::parse_alternate(&steam3), Some(id));
    }

    #[test]
    fn steam2_universe_digit_is_not_significant(account in any::<u32>(), universe in 0u8..=5) {
        let id = SteamId::from_account_id(account);
        let encoded = format!("STEAM_{}:{}:{}", universe, account & 1, account >> 1);
        prop_assert_eq!(SteamId::parse_alternate(&encoded), Some(id));
    }
}
