//! povtrim CLI: inspect match records, plan and cut POV recordings.
//!
//! Usage:
//!   povtrim players <RECORD>                    List players in a match record
//!   povtrim info <RECORD> <PLAYER>              Show a player's alive timeline
//!   povtrim plan <RECORD> <PLAYER> [OPTIONS]    Compute keep segments
//!   povtrim trim <RECORD> <PLAYER> [OPTIONS]    Cut a recording down to alive time
//!   povtrim check                               Check ffmpeg/ffprobe availability
//!   povtrim config show|init                    Print or write the configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use povtrim_common::config::AppConfig;

mod args;
mod commands;
mod console_log;

use args::{PolicyArgs, SyncArgs};

#[derive(Parser)]
#[command(
    name = "povtrim",
    about = "Trim CS2 POV recordings down to the time a player is alive",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to $XDG_CONFIG_HOME/povtrim/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the players of a match record
    Players {
        /// Match record file or directory containing match.json
        record: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show a player's spawns, deaths and alive intervals
    Info {
        /// Match record file or directory containing match.json
        record: PathBuf,

        /// Player name, name fragment, SteamID64, Steam2 or Steam3 id
        player: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Compute the keep segments for a player without touching any video
    Plan {
        /// Match record file or directory containing match.json
        record: PathBuf,

        /// Player name, name fragment, SteamID64, Steam2 or Steam3 id
        player: String,

        /// Recording duration in seconds
        #[arg(long, conflicts_with = "recording")]
        duration: Option<f64>,

        /// Recording to probe for its duration
        #[arg(long)]
        recording: Option<PathBuf>,

        #[command(flatten)]
        sync: SyncArgs,

        #[command(flatten)]
        policy: PolicyArgs,

        /// Print the full plan as JSON
        #[arg(long)]
        json: bool,

        /// Write the full plan as JSON to this file
        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,
    },

    /// Cut a recording down to the player's alive time
    Trim {
        /// Match record file or directory containing match.json
        record: PathBuf,

        /// Player name, name fragment, SteamID64, Steam2 or Steam3 id
        player: String,

        /// Source recording
        #[arg(short, long)]
        recording: PathBuf,

        /// Output file (defaults to <recording>_trimmed.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        sync: SyncArgs,

        #[command(flatten)]
        policy: PolicyArgs,

        /// Overall budget for all ffmpeg/ffprobe processes (seconds)
        #[arg(long)]
        timeout: Option<u64>,

        /// How far a cut may move to reach a keyframe (seconds)
        #[arg(long)]
        search_window: Option<f64>,

        /// ffmpeg binary
        #[arg(long)]
        ffmpeg: Option<PathBuf>,

        /// ffprobe binary
        #[arg(long)]
        ffprobe: Option<PathBuf>,

        /// Leave the extracted segment files next to the output
        #[arg(long)]
        keep_segments: bool,

        /// Show the keyframe-aligned cut plan without extracting anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Check that the external media tools are available
    Check,

    /// Show or initialize the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(povtrim_common::config::config_file_path);
    let config = AppConfig::load_from(&config_path);

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    povtrim_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Players { record, json } => commands::players::run(record, json),
        Commands::Info {
            record,
            player,
            json,
        } => commands::info::run(&config, record, player, json),
        Commands::Plan {
            record,
            player,
            duration,
            recording,
            sync,
            policy,
            json,
            export,
        } => {
            let inputs = commands::plan::PlanInputs {
                record,
                player,
                sync,
                policy,
            };
            commands::plan::run(&config, inputs, duration, recording, json, export).await
        }
        Commands::Trim {
            record,
            player,
            recording,
            output,
            sync,
            policy,
            timeout,
            search_window,
            ffmpeg,
            ffprobe,
            keep_segments,
            dry_run,
        } => {
            let inputs = commands::plan::PlanInputs {
                record,
                player,
                sync,
                policy,
            };
            let overrides = commands::trim::CutOverrides {
                timeout,
                search_window,
                ffmpeg,
                ffprobe,
                keep_segments,
            };
            commands::trim::run(&config, inputs, recording, output, overrides, dry_run).await
        }
        Commands::Check => commands::check::run(&config, &config_path),
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&config, &config_path),
            ConfigAction::Init { force } => commands::config::init(&config_path, force),
        },
    }
}
