//! Show a player's alive timeline.

use std::path::PathBuf;

use povtrim_common::config::AppConfig;
use povtrim_timeline_core::{load_record, InfoReport, TrimEngine};

pub fn run(config: &AppConfig, path: PathBuf, player: String, json: bool) -> anyhow::Result<()> {
    let record = load_record(&path)?;
    let engine = TrimEngine::from_config(config);
    let analysis = engine.analyze(&record, &player)?;
    let report = InfoReport::new(&record, &analysis);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}
