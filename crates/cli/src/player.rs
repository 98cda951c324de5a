use anyhow::{Context, Result};
use console::style;
use std::time::Duration;
use storyplayer_config::PlayerConfig;
use storyplayer_core::{format_clock, BookDescriptor, PlayerError};
use storyplayer_playback::{
    AppState, ControllerConfig, LifecycleMonitor, PlaybackController,
    PlaybackSnapshot, PositionStore, SimulatedEngine, TransportState,
};
use tokio::io::{AsyncBufReadExt, BufReader};

/// A line typed at the `listen` prompt
#[derive(Debug, Clone, PartialEq)]
enum ListenCommand {
    Play,
    Pause,
    Seek(i64),
    Back,
    Forward,
    Speed(f64),
    Background,
    Foreground,
    Status,
    Load,
    Help,
    Quit,
}

impl ListenCommand {
    fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();

        let command = match verb.to_ascii_lowercase().as_str() {
            "play" | "p" => Self::Play,
            "pause" => Self::Pause,
            "seek" => {
                let secs: f64 = arg
                    .ok_or("seek needs a position in seconds")?
                    .parse()
                    .map_err(|_| "seek position must be a number of seconds".to_string())?;
                if !secs.is_finite() {
                    return Err("seek position must be a number of seconds".to_string());
                }
                Self::Seek((secs * 1000.0).round() as i64)
            }
            "back" | "b" => Self::Back,
            "forward" | "f" => Self::Forward,
            "speed" => {
                let value = arg
                    .ok_or("speed needs a multiplier such as 1.5")?
                    .trim_end_matches('x')
                    .parse()
                    .map_err(|_| "speed must be a number such as 1.5".to_string())?;
                Self::Speed(value)
            }
            "background" | "bg" => Self::Background,
            "foreground" | "fg" => Self::Foreground,
            "status" | "s" => Self::Status,
            "load" => Self::Load,
            "help" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            other => return Err(format!("unknown command '{}', type 'help'", other)),
        };
        Ok(Some(command))
    }
}

/// Map the persisted player section onto controller tuning
///
/// Out-of-range values fall back to their defaults.
pub fn controller_config(player: &PlayerConfig) -> ControllerConfig {
    let player = player.sanitized();
    ControllerConfig {
        default_speed: player.speed(),
        status_interval: Duration::from_millis(player.status_interval_ms),
        save_throttle: Duration::from_millis(player.save_throttle_ms),
        resume_tolerance_ms: player.resume_tolerance_ms,
        engine_timeout: Duration::from_millis(player.engine_timeout_ms),
    }
}

/// Drive a controller over a simulated engine from stdin until `quit` or EOF
pub async fn listen(store: PositionStore, player: &PlayerConfig, duration_secs: u64) -> Result<()> {
    let player = &player.sanitized();
    let duration_ms = duration_secs.saturating_mul(1000);
    let engine = SimulatedEngine::new();

    if let Some(book) = saved_book(&store).await {
        engine.add_audio(book.audio_uri.as_str(), duration_ms);
    }

    let controller = PlaybackController::spawn(engine.clone(), store.clone(), controller_config(player));
    let monitor = LifecycleMonitor::new();
    let lifecycle_task = controller.attach_lifecycle(&monitor);

    if player.restore_on_start {
        match controller.restore_last_session().await {
            Some(book) => println!("{} Resumed {}", style("▶").green(), style(book.display_title()).bold()),
            None => println!("Nothing to resume. Use 'add' to choose a book."),
        }
    } else {
        println!("Type 'load' to open the saved book.");
    }
    print_snapshot(&controller.snapshot());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        let command = match ListenCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{}", style(message).yellow());
                continue;
            }
        };

        let result = match command {
            ListenCommand::Play => controller.play().await,
            ListenCommand::Pause => controller.pause().await,
            ListenCommand::Seek(target_ms) => controller.seek(target_ms).await,
            ListenCommand::Back => controller.jump(-(player.jump_back_secs as i64)).await,
            ListenCommand::Forward => controller.jump(player.jump_forward_secs as i64).await,
            ListenCommand::Speed(value) => controller.set_speed(value).await,
            ListenCommand::Background => {
                monitor.notify(AppState::Suspended);
                Ok(())
            }
            ListenCommand::Foreground => {
                monitor.notify(AppState::Active);
                Ok(())
            }
            ListenCommand::Status => Ok(()),
            ListenCommand::Load => match saved_book(&store).await {
                Some(book) => {
                    engine.add_audio(book.audio_uri.as_str(), duration_ms);
                    controller.load(book).await
                }
                None => {
                    println!("No book saved yet.");
                    continue;
                }
            },
            ListenCommand::Help => {
                print_help();
                continue;
            }
            ListenCommand::Quit => break,
        };

        if let Err(e) = result {
            print_error(&e);
        }
        print_snapshot(&controller.refresh().await);
    }

    controller.shutdown().await;
    lifecycle_task.abort();
    println!("{} Position saved", style("✓").green().bold());

    Ok(())
}

async fn saved_book(store: &PositionStore) -> Option<BookDescriptor> {
    match store.load().await {
        Ok(saved) => saved.map(|(book, _)| book),
        Err(e) => {
            log::warn!("Could not read saved book: {}", e);
            None
        }
    }
}

fn print_snapshot(snapshot: &PlaybackSnapshot) {
    let Some(book) = &snapshot.book else {
        println!("  {}", style("No book loaded").dim());
        return;
    };

    let state = match snapshot.transport_state {
        TransportState::Ready if snapshot.is_playing => style("Playing".to_string()).green(),
        TransportState::Ready => style("Paused".to_string()).yellow(),
        TransportState::Loading => style("Loading".to_string()).dim(),
        TransportState::Error => style("Error".to_string()).red(),
        TransportState::Idle => style("Idle".to_string()).dim(),
    };

    println!(
        "  {} [{}] {} / {}  {}  {} left",
        style(book.display_title()).bold().cyan(),
        state,
        format_clock(snapshot.position_ms),
        format_clock(snapshot.duration_ms),
        snapshot.speed,
        snapshot.remaining,
    );

    if let Some(error) = &snapshot.last_error {
        println!("  {} {}", style("!").red().bold(), error);
    }
}

fn print_error(error: &PlayerError) {
    println!("{} {}", style("✗").red().bold(), style(error.user_message()).red());
}

fn print_help() {
    println!("Commands:");
    println!("  play | pause          Start or stop playback");
    println!("  seek <SECS>           Jump to an absolute position");
    println!("  back | forward        Skip backwards or forwards");
    println!("  speed <X>             Set speed (0.75, 1, 1.25, 1.5, 2)");
    println!("  background | fg       Simulate the app leaving or returning");
    println!("  load                  Open the saved book");
    println!("  status                Show the current position");
    println!("  quit                  Save and exit");
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyplayer_playback::ControllerHandle;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(ListenCommand::parse("play"), Ok(Some(ListenCommand::Play)));
        assert_eq!(ListenCommand::parse("  PAUSE "), Ok(Some(ListenCommand::Pause)));
        assert_eq!(ListenCommand::parse("bg"), Ok(Some(ListenCommand::Background)));
        assert_eq!(ListenCommand::parse("q"), Ok(Some(ListenCommand::Quit)));
        assert_eq!(ListenCommand::parse(""), Ok(None));
    }

    #[test]
    fn test_parse_seek() {
        assert_eq!(ListenCommand::parse("seek 90"), Ok(Some(ListenCommand::Seek(90_000))));
        assert_eq!(ListenCommand::parse("seek 1.5"), Ok(Some(ListenCommand::Seek(1500))));
        assert_eq!(ListenCommand::parse("seek -5"), Ok(Some(ListenCommand::Seek(-5000))));
        assert!(ListenCommand::parse("seek").is_err());
        assert!(ListenCommand::parse("seek soon").is_err());
    }

    #[test]
    fn test_parse_speed() {
        assert_eq!(ListenCommand::parse("speed 1.5"), Ok(Some(ListenCommand::Speed(1.5))));
        assert_eq!(ListenCommand::parse("speed 2x"), Ok(Some(ListenCommand::Speed(2.0))));
        assert!(ListenCommand::parse("speed fast").is_err());
    }

    #[test]
    fn test_parse_unknown() {
        let err = ListenCommand::parse("rewind").unwrap_err();
        assert!(err.contains("rewind"));
    }

    #[test]
    fn test_controller_config_from_player_section() {
        let mut player = PlayerConfig::default();
        player.default_speed = 1.25;
        player.save_throttle_ms = 5000;

        let config = controller_config(&player);
        assert_eq!(config.default_speed.value(), 1.25);
        assert_eq!(config.save_throttle, Duration::from_secs(5));
        assert_eq!(config.status_interval, Duration::from_secs(1));
        assert_eq!(config.resume_tolerance_ms, 1500);
        assert_eq!(config.engine_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_controller_config_replaces_invalid_values() {
        let mut player = PlayerConfig::default();
        player.status_interval_ms = 0;
        player.engine_timeout_ms = 0;
        player.resume_tolerance_ms = 2500;

        let config = controller_config(&player);
        assert_eq!(config.status_interval, Duration::from_secs(1));
        assert_eq!(config.engine_timeout, Duration::from_secs(15));
        assert_eq!(config.resume_tolerance_ms, 2500);
    }

    #[tokio::test]
    async fn test_restore_over_simulated_engine() {
        let store = PositionStore::in_memory();
        let book = BookDescriptor::new("Dune", "/books/dune.mp3");
        store.save(&book, 42_000).await.unwrap();

        let engine = SimulatedEngine::manual().with_audio("/books/dune.mp3", 600_000);
        let controller: ControllerHandle =
            PlaybackController::spawn(engine, store, controller_config(&PlayerConfig::default()));

        let restored = controller.restore_last_session().await;
        assert_eq!(restored.map(|b| b.title), Some("Dune".to_string()));
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.position_ms, 42_000);
        assert_eq!(snapshot.duration_ms, 600_000);
        controller.shutdown().await;
    }
}
