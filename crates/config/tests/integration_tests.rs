//! Integration tests for the configuration system

use std::path::PathBuf;
use storyplayer_config::{
    AppConfig, Config, ConfigManager, ConfigSection, LogLevel, PlayerConfig, CONFIG_VERSION,
};
use tempfile::TempDir;

fn setup_test_manager() -> Result<(TempDir, ConfigManager), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let manager = ConfigManager::with_directory(temp_dir.path().to_path_buf())?;
    Ok((temp_dir, manager))
}

#[test]
fn test_full_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    let created = manager.initialize()?;
    assert!(created);

    let config = manager.load()?;
    assert_eq!(config.version, CONFIG_VERSION);

    let mut modified = config.clone();
    modified.player.default_speed = 1.25;
    modified.player.restore_on_start = false;
    manager.save(&modified)?;

    let reloaded = manager.load()?;
    assert_eq!(reloaded.player.default_speed, 1.25);
    assert!(!reloaded.player.restore_on_start);

    manager.reset()?;
    let after_reset = manager.load()?;
    assert_eq!(after_reset, Config::default());

    Ok(())
}

#[test]
fn test_config_validation_integration() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    manager.save(&Config::default())?;

    let errors = manager.validate()?;
    assert!(errors.is_empty());

    let mut invalid = Config::default();
    invalid.player.jump_back_secs = 0;
    let result = manager.save(&invalid);
    assert!(result.is_err());

    Ok(())
}

#[test]
fn test_validate_reports_hand_edited_values() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    std::fs::write(
        manager.config_path(),
        "version = 1\n\n[player]\ndefault_speed = 2.5\nsave_throttle_ms = 10\n",
    )?;

    let errors = manager.validate()?;
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().any(|e| e.contains("player.default_speed")));

    // The loaded config still reports a usable speed
    let config = manager.load()?;
    assert!(config.player.speed().is_normal());

    Ok(())
}

#[test]
fn test_save_leaves_no_temp_files() -> Result<(), Box<dyn std::error::Error>> {
    let (temp_dir, manager) = setup_test_manager()?;

    let config = Config::default();
    manager.save(&config)?;
    manager.save(&config)?;

    let entries: Vec<PathBuf> = std::fs::read_dir(temp_dir.path())?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();
    assert_eq!(entries, vec![manager.config_path()]);

    Ok(())
}

#[test]
fn test_merge_functionality() {
    let mut base = Config::default();
    let mut override_config = Config::default();

    override_config.player.jump_forward_secs = 45;
    override_config.app.log_level = LogLevel::Trace;

    base.merge(override_config);

    assert_eq!(base.player.jump_forward_secs, 45);
    assert_eq!(base.app.log_level, LogLevel::Trace);
}

#[test]
fn test_section_names() {
    assert_eq!(AppConfig::default().section_name(), "app");
    assert_eq!(PlayerConfig::default().section_name(), "player");
}

#[test]
fn test_unknown_fields_are_ignored() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    std::fs::write(
        manager.config_path(),
        "version = 7\n\n[app]\nlog_level = \"debug\"\ntheme = \"dark\"\n",
    )?;

    let config = manager.load()?;
    assert_eq!(config.version, 7);
    assert_eq!(config.app.log_level, LogLevel::Debug);
    assert_eq!(config.player, PlayerConfig::default());

    Ok(())
}

#[test]
fn test_state_path_follows_config() -> Result<(), Box<dyn std::error::Error>> {
    let (temp_dir, manager) = setup_test_manager()?;

    manager.update(|config| {
        config.app.state_file = "books.json".to_string();
    })?;

    let config = manager.load()?;
    assert_eq!(
        manager.state_path(&config)?,
        temp_dir.path().join("books.json")
    );

    Ok(())
}

#[test]
fn test_update_rejects_invalid_change() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    manager.initialize()?;

    let result = manager.update(|config| {
        config.player.status_interval_ms = 50;
    });
    assert!(result.is_err());

    let config = manager.load()?;
    assert_eq!(config.player.status_interval_ms, 1000);

    Ok(())
}
