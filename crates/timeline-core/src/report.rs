//! Per-player statistics for the `info` command.

use std::fmt;

use serde::Serialize;

use povtrim_match_model::event::{EventKind, Tick};
use povtrim_match_model::player::PlayerIdentity;
use povtrim_match_model::record::MatchRecord;

use crate::engine::Analysis;
use crate::intervals::{Anomaly, IntervalEnd};

/// One alive interval in both ticks and match seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalRow {
    pub start_tick: Tick,
    /// `None` for an interval still open at match end.
    pub end_tick: Option<Tick>,
    pub start_secs: f64,
    pub end_secs: f64,
    pub duration_secs: f64,
}

/// Life statistics of one player. Times are match-relative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoReport {
    pub player: PlayerIdentity,
    pub map_name: String,
    pub tick_rate: f64,
    pub match_end_tick: Tick,
    pub match_secs: f64,
    pub rounds: usize,
    pub spawns: usize,
    pub deaths: usize,
    pub kills: usize,
    pub headshot_kills: usize,
    pub first_spawn_tick: Option<Tick>,
    pub intervals: Vec<IntervalRow>,
    pub alive_secs: f64,
    pub anomalies: Vec<Anomaly>,
}

impl InfoReport {
    pub fn new(record: &MatchRecord, analysis: &Analysis) -> Self {
        let tick_rate = record.tick_rate;
        let match_end_tick = record.match_end_tick();
        let to_secs = |tick: Tick| tick as f64 / tick_rate;
        let player = analysis.player();

        let intervals: Vec<IntervalRow> = analysis
            .intervals()
            .iter()
            .map(|interval| {
                let end_tick = match interval.end {
                    IntervalEnd::At(tick) => Some(tick),
                    IntervalEnd::Open => None,
                };
                let resolved_end = interval.end_tick_or(match_end_tick);
                IntervalRow {
                    start_tick: interval.start_tick,
                    end_tick,
                    start_secs: to_secs(interval.start_tick),
                    end_secs: to_secs(resolved_end),
                    duration_secs: to_secs(resolved_end - interval.start_tick),
                }
            })
            .collect();

        let (kills, headshot_kills) =
            record
                .events
                .iter()
                .fold((0, 0), |(kills, headshots), event| match &event.kind {
                    EventKind::Death {
                        attacker: Some(attacker),
                        player: victim,
                        headshot,
                        ..
                    } if *attacker == player.steamid && *victim != player.steamid => {
                        (kills + 1, headshots + usize::from(*headshot))
                    }
                    _ => (kills, headshots),
                });

        Self {
            player: player.clone(),
            map_name: record.map_name.clone(),
            tick_rate,
            match_end_tick,
            match_secs: to_secs(match_end_tick),
            rounds: record.round_spans().len(),
            spawns: analysis.timeline.spawn_count(),
            deaths: analysis.timeline.death_count(),
            kills,
            headshot_kills,
            first_spawn_tick: analysis.timeline.first_spawn_tick(),
            alive_secs: intervals.iter().map(|row| row.duration_secs).sum(),
            intervals,
            anomalies: analysis.derivation.anomalies.clone(),
        }
    }

    /// Share of the match the player spent alive, in `[0, 1]`.
    pub fn alive_ratio(&self) -> f64 {
        if self.match_secs > 0.0 {
            (self.alive_secs / self.match_secs).min(1.0)
        } else {
            0.0
        }
    }
}

impl fmt::Display for InfoReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Player:    {}", self.player)?;
        if let Some(team) = self.player.team {
            writeln!(f, "Team:      {team}")?;
        }
        writeln!(f, "Map:       {}", self.map_name)?;
        writeln!(
            f,
            "Match:     {} ticks @ {} tick/s ({:.1}s)",
            self.match_end_tick, self.tick_rate, self.match_secs
        )?;
        writeln!(f, "Rounds:    {}", self.rounds)?;
        writeln!(
            f,
            "Spawns:    {}   Deaths: {}   Kills: {} ({} headshots)",
            self.spawns, self.deaths, self.kills, self.headshot_kills
        )?;
        writeln!(
            f,
            "Alive:     {:.1}s of {:.1}s ({:.0}%)",
            self.alive_secs,
            self.match_secs,
            self.alive_ratio() * 100.0
        )?;

        writeln!(f, "Intervals: {}", self.intervals.len())?;
        for (i, row) in self.intervals.iter().enumerate() {
            let end = row
                .end_tick
                .map_or_else(|| "end".to_string(), |tick| tick.to_string());
            writeln!(
                f,
                "  {:>3}. ticks [{}, {})  {:.3}s - {:.3}s  ({:.1}s)",
                i + 1,
                row.start_tick,
                end,
                row.start_secs,
                row.end_secs,
                row.duration_secs
            )?;
        }

        if !self.anomalies.is_empty() {
            writeln!(f, "Anomalies: {}", self.anomalies.len())?;
            for anomaly in &self.anomalies {
                writeln!(f, "  - {anomaly}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TrimEngine;
    use povtrim_match_model::event::RawEvent;
    use povtrim_match_model::player::{SteamId, Team};

    #[test]
    fn test_report_counts_and_seconds() {
        let hero = SteamId::from_account_id(1);
        let villain = SteamId::from_account_id(2);
        let mut record = MatchRecord::new("de_ancient", 64.0, 6400);
        record.players = vec![
            PlayerIdentity::new(hero, "hero", Some(Team::Terrorist)),
            PlayerIdentity::new(villain, "villain", Some(Team::CounterTerrorist)),
        ];
        record.events = vec![
            RawEvent::round_start(0, 1),
            RawEvent::spawn(0, hero),
            RawEvent::spawn(0, villain),
            RawEvent {
                tick: 640,
                kind: EventKind::Death {
                    player: villain,
                    attacker: Some(hero),
                    weapon: Some("ak47".to_string()),
                    headshot: true,
                },
            },
            RawEvent::death(1280, hero),
            RawEvent::round_end(1920, 1),
            RawEvent::round_start(2560, 2),
            RawEvent::spawn(2560, hero),
            RawEvent::match_end(6400),
        ];

        let analysis = TrimEngine::default().analyze(&record, "hero").unwrap();
        let report = InfoReport::new(&record, &analysis);

        assert_eq!(report.rounds, 2);
        assert_eq!(report.spawns, 2);
        assert_eq!(report.deaths, 1);
        assert_eq!(report.kills, 1);
        assert_eq!(report.headshot_kills, 1);
        assert_eq!(report.intervals.len(), 2);
        assert_eq!(report.intervals[1].end_tick, None);
        assert!((report.intervals[0].duration_secs - 20.0).abs() < 1e-9);
        assert!((report.alive_secs - 80.0).abs() < 1e-9);
        assert!((report.alive_ratio() - 0.8).abs() < 1e-9);

        let text = report.to_string();
        assert!(text.contains("hero"));
        assert!(text.contains("[2560, end)"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["kills"], 1);
    }
}
