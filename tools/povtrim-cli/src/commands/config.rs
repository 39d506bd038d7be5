//! Show or initialize the configuration file.

use std::path::Path;

use povtrim_common::config::AppConfig;

pub fn show(config: &AppConfig, config_path: &Path) -> anyhow::Result<()> {
    let state = if config_path.exists() { "loaded" } else { "defaults" };
    println!("# {} ({state})", config_path.display());
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

pub fn init(config_path: &Path, force: bool) -> anyhow::Result<()> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {} (use --force to overwrite)",
            config_path.display()
        );
    }
    AppConfig::default().save_to(config_path)?;
    println!("Wrote default config to {}", config_path.display());
    Ok(())
}
