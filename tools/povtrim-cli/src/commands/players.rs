//! List the players of a match record.

use std::path::PathBuf;

use serde::Serialize;

use povtrim_match_model::{PlayerIdentity, SteamId};
use povtrim_timeline_core::load_record;

#[derive(Serialize)]
struct PlayerRow<'a> {
    steamid: SteamId,
    steam2: Option<String>,
    steam3: Option<String>,
    name: &'a str,
    team: Option<String>,
}

impl<'a> From<&'a PlayerIdentity> for PlayerRow<'a> {
    fn from(player: &'a PlayerIdentity) -> Self {
        Self {
            steamid: player.steamid,
            steam2: player.steamid.to_steam2(),
            steam3: player.steamid.to_steam3(),
            name: &player.name,
            team: player.team.map(|team| team.to_string()),
        }
    }
}

pub fn run(path: PathBuf, json: bool) -> anyhow::Result<()> {
    let record = load_record(&path)?;
    let rows: Vec<PlayerRow<'_>> = record.players.iter().map(PlayerRow::from).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("Match: {}", record.map_name);
    println!(
        "  Ticks: {} @ {} tick/s ({:.1}s)",
        record.match_end_tick(),
        record.tick_rate,
        record.duration_secs()
    );
    println!("  Rounds: {}", record.round_spans().len());
    println!(
        "  Events: {} ({} round/match boundaries)",
        record.events.len(),
        record.global_events().count()
    );
    println!();

    println!("Players ({}):", rows.len());
    for row in &rows {
        println!(
            "  {:<20} {:<4} {}  {}",
            row.name,
            row.team.as_deref().unwrap_or("-"),
            row.steamid,
            row.steam2.as_deref().unwrap_or(""),
        );
    }

    let issues = record.validate();
    if !issues.is_empty() {
        println!();
        println!("Record issues ({}):", issues.len());
        for issue in &issues {
            println!("  [WARN] {issue}");
        }
    }

    Ok(())
}
