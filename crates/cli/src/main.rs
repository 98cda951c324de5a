// FILE: crates/cli/src/main.rs

use anyhow::{Context, Result};
use clap::{Arg, Command};
use std::path::PathBuf;
use storyplayer_config::{Config, ConfigManager};
use storyplayer_playback::PositionStore;

mod commands;
mod player;

fn build_cli() -> Command {
    Command::new("storyplayer")
        .version("0.1.0")
        .author("StoryPlayer Team")
        .about("Audiobook player that always resumes where you left off")
        .arg(
            Arg::new("config-dir")
                .short('c')
                .long("config-dir")
                .value_name("DIR")
                .help("Directory holding config.toml and the playback state")
                .global(true),
        )
        .subcommand(
            Command::new("add")
                .about("Remember a book as the one to play next")
                .arg(Arg::new("audio").required(true).value_name("AUDIO").help("Path or URI of the audio file"))
                .arg(Arg::new("title").short('t').long("title").value_name("TITLE").help("Book title (optional)"))
                .arg(Arg::new("author").short('a').long("author").value_name("AUTHOR").help("Book author (optional)"))
                .arg(Arg::new("description").short('d').long("description").value_name("TEXT").help("Short description (optional)"))
                .arg(Arg::new("cover").long("cover").value_name("IMAGE").help("Path or URI of the cover image (optional)")),
        )
        .subcommand(Command::new("status").about("Show the saved book and position"))
        .subcommand(
            Command::new("listen")
                .about("Open the saved book and control playback from stdin")
                .arg(
                    Arg::new("duration")
                        .long("duration")
                        .value_name("SECS")
                        .help("Length of the simulated audio in seconds")
                        .value_parser(clap::value_parser!(u64).range(1..))
                        .default_value("3600"),
                ),
        )
}

fn config_manager(config_dir: Option<&String>) -> Result<ConfigManager> {
    match config_dir {
        Some(dir) => ConfigManager::with_directory(PathBuf::from(dir)),
        None => ConfigManager::new(),
    }
    .context("Failed to locate config directory")
}

fn load_config(manager: &ConfigManager) -> Config {
    manager.load_with_env_overrides().unwrap_or_else(|e| {
        eprintln!("Warning: {}, using default settings", e);
        Config::default()
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    let manager = config_manager(matches.get_one::<String>("config-dir"))?;
    let config = load_config(&manager);

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.app.log_level.to_string()),
    )
    .init();

    let state_path = manager
        .state_path(&config)
        .context("Failed to prepare data directory")?;
    log::debug!("Playback state at {}", state_path.display());
    let store = PositionStore::file(state_path);

    match matches.subcommand() {
        Some(("add", sub_matches)) => commands::add_book(&store, sub_matches).await,
        Some(("status", _)) => commands::show_status(&store).await,
        Some(("listen", sub_matches)) => {
            let duration_secs = sub_matches
                .get_one::<u64>("duration")
                .copied()
                .unwrap_or(3600);
            player::listen(store, &config.player, duration_secs).await
        }
        _ => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}
