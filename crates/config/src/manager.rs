//! Configuration manager - main API for config operations

use crate::app_config::LogLevel;
use crate::persistence::{ensure_directory_exists, ConfigPersistence};
use crate::{Config, ConfigError, ConfigResult};
use directories::ProjectDirs;
use std::path::PathBuf;

const CONFIG_FILE: &str = "config.toml";

/// Main configuration manager
///
/// This is the primary interface for loading, saving, and managing configuration.
/// It also resolves where the durable playback state lives.
pub struct ConfigManager {
    persistence: ConfigPersistence,
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a new config manager using the default config directory
    ///
    /// The default directory follows the platform convention:
    /// - Linux: `~/.config/storyplayer/`
    /// - macOS: `~/Library/Application Support/storyplayer/`
    /// - Windows: `%APPDATA%\storyplayer\`
    pub fn new() -> ConfigResult<Self> {
        let config_dir = Self::project_dirs()?.config_dir().to_path_buf();
        Self::with_directory(config_dir)
    }

    /// Creates a config manager with a custom config directory
    pub fn with_directory(config_dir: PathBuf) -> ConfigResult<Self> {
        let persistence = ConfigPersistence::new(config_dir.join(CONFIG_FILE));

        Ok(Self {
            persistence,
            config_dir,
        })
    }

    fn project_dirs() -> ConfigResult<ProjectDirs> {
        ProjectDirs::from("", "", "storyplayer").ok_or_else(|| {
            ConfigError::NoDirectory {
                reason: "Could not determine user home directory".to_string(),
            }
        })
    }

    /// Returns the config directory path
    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    /// Returns the full config file path
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Directory holding the durable playback state
    ///
    /// Uses `app.data_dir` when set. A manager created with a custom config
    /// directory keeps its data alongside the config; otherwise the platform
    /// data directory is used.
    pub fn data_dir(&self, config: &Config) -> ConfigResult<PathBuf> {
        if let Some(dir) = &config.app.data_dir {
            return Ok(dir.clone());
        }

        match Self::project_dirs() {
            Ok(dirs) if dirs.config_dir() == self.config_dir.as_path() => {
                Ok(dirs.data_dir().to_path_buf())
            }
            _ => Ok(self.config_dir.clone()),
        }
    }

    /// Full path of the playback state file, creating its directory
    pub fn state_path(&self, config: &Config) -> ConfigResult<PathBuf> {
        let dir = self.data_dir(config)?;
        ensure_directory_exists(&dir)?;
        Ok(dir.join(&config.app.state_file))
    }

    /// Loads the configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file is corrupted, returns an error.
    pub fn load(&self) -> ConfigResult<Config> {
        self.persistence.load()
    }

    /// Loads the configuration, falling back to defaults on any error
    pub fn load_or_default(&self) -> Config {
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config: {}, using defaults", e);
                Config::default()
            }
        }
    }

    /// Saves the configuration to file
    ///
    /// This performs validation before saving and uses atomic writes
    /// to prevent corruption.
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        self.persistence.save(config)
    }

    /// Updates the configuration using a closure
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use storyplayer_config::ConfigManager;
    /// # let manager = ConfigManager::new().unwrap();
    /// manager.update(|config| {
    ///     config.player.jump_forward_secs = 60;
    /// }).expect("Failed to update config");
    /// ```
    pub fn update<F>(&self, update_fn: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.load()?;
        update_fn(&mut config);
        self.save(&config)
    }

    /// Writes a default config file if one doesn't exist
    ///
    /// Returns Ok(true) if a new file was created, Ok(false) if one already exists.
    pub fn initialize(&self) -> ConfigResult<bool> {
        if self.config_path().exists() {
            log::info!(
                "Config file already exists at {}",
                self.config_path().display()
            );
            return Ok(false);
        }

        self.save(&Config::default())?;
        Ok(true)
    }

    /// Resets the configuration to defaults
    pub fn reset(&self) -> ConfigResult<()> {
        self.save(&Config::default())
    }

    /// Validates the current configuration file
    ///
    /// Returns all validation errors found, or an empty list if valid.
    pub fn validate(&self) -> ConfigResult<Vec<String>> {
        let config = self.load()?;

        match config.validate() {
            Ok(()) => Ok(Vec::new()),
            Err(errors) => Ok(errors.iter().map(|e| e.to_string()).collect()),
        }
    }

    /// Loads the config and applies environment variable overrides
    ///
    /// Variables follow the pattern `STORYPLAYER_SECTION_FIELD`, for example
    /// `STORYPLAYER_PLAYER_DEFAULT_SPEED=1.5`. Unparseable values are ignored
    /// with a warning.
    pub fn load_with_env_overrides(&self) -> ConfigResult<Config> {
        let mut config = self.load()?;
        apply_env_overrides(&mut config, |key| std::env::var(key).ok());

        if let Err(errors) = config.validate() {
            log::warn!(
                "Config validation warnings after env overrides: {:?}",
                errors
            );
        }

        Ok(config)
    }
}

fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("STORYPLAYER_APP_LOG_LEVEL") {
        match value.parse::<LogLevel>() {
            Ok(level) => config.app.log_level = level,
            Err(e) => log::warn!("Ignoring STORYPLAYER_APP_LOG_LEVEL: {}", e),
        }
    }

    if let Some(value) = lookup("STORYPLAYER_APP_DATA_DIR") {
        config.app.data_dir = Some(PathBuf::from(value));
    }

    if let Some(value) = lookup("STORYPLAYER_PLAYER_DEFAULT_SPEED") {
        match value.parse::<f64>() {
            Ok(speed) => config.player.default_speed = speed,
            Err(_) => log::warn!("Ignoring STORYPLAYER_PLAYER_DEFAULT_SPEED={}", value),
        }
    }

    if let Some(value) = lookup("STORYPLAYER_PLAYER_RESTORE_ON_START") {
        match value.parse::<bool>() {
            Ok(restore) => config.player.restore_on_start = restore,
            Err(_) => log::warn!("Ignoring STORYPLAYER_PLAYER_RESTORE_ON_START={}", value),
        }
    }
}
