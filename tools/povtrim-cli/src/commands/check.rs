//! Check external tool availability.

use std::path::Path;

use povtrim_common::config::AppConfig;
use povtrim_cut_engine::tool_version;

pub fn run(config: &AppConfig, config_path: &Path) -> anyhow::Result<()> {
    println!("povtrim System Check");
    println!("{}", "=".repeat(50));

    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!(
            "[--] Config: {} (not present, using defaults)",
            config_path.display()
        );
    }

    let mut all_ok = true;
    for (label, path) in [
        ("ffmpeg", &config.cut.ffmpeg_path),
        ("ffprobe", &config.cut.ffprobe_path),
    ] {
        match tool_version(path) {
            Some(version) => println!("[OK] {label}: {version}"),
            None => {
                all_ok = false;
                println!(
                    "[MISSING] {label}: {} (install ffmpeg or set cut.{label}_path)",
                    path.display()
                );
            }
        }
    }

    println!();
    if all_ok {
        println!("All required tools are available. povtrim is ready.");
    } else {
        println!("Some required tools are missing. Planning works; cutting does not.");
    }
    Ok(())
}
