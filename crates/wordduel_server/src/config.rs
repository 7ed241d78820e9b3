//! Server configuration.
//!
//! Loaded from an optional TOML file, then overlaid by environment
//! variables (`WORDDUEL_HOST`, `WORDDUEL_PORT`, `WORDDUEL_DB`, `JWT_SECRET`).

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use wordduel::{GameMode, MAX_GUESSES, MatchConfig, TimeToGuess};

/// Configuration for the game server.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_", into)]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    port: u16,

    /// SQLite database file for match results.
    #[serde(default = "default_database_path")]
    database_path: String,

    /// HMAC secret for identity tokens.
    #[serde(default)]
    jwt_secret: String,

    /// Time budget for public cooperative matches.
    #[serde(default)]
    coop_time_to_guess: TimeToGuess,

    /// Time budget for public race matches.
    #[serde(default)]
    race_time_to_guess: TimeToGuess,

    /// Initial guess cap.
    #[serde(default = "default_max_guesses")]
    max_guesses: usize,

    /// Extra accepted guesses, one word per line.
    #[serde(default)]
    word_list: Option<PathBuf>,

    /// Seconds a match may sit with nobody connected before it is closed.
    #[serde(default = "default_idle_timeout_secs")]
    idle_timeout_secs: u64,
}

#[instrument]
fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[instrument]
fn default_port() -> u16 {
    3000
}

#[instrument]
fn default_database_path() -> String {
    "wordduel.db".to_string()
}

#[instrument]
fn default_max_guesses() -> usize {
    MAX_GUESSES
}

#[instrument]
fn default_idle_timeout_secs() -> u64 {
    300
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_path: default_database_path(),
            jwt_secret: String::new(),
            coop_time_to_guess: TimeToGuess::default(),
            race_time_to_guess: TimeToGuess::default(),
            max_guesses: default_max_guesses(),
            word_list: None,
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(host = %config.host, port = config.port, "Config loaded successfully");
        Ok(config)
    }

    /// Loads the file if given (defaults otherwise) and applies the process
    /// environment on top.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.overlay(|key| std::env::var(key).ok())
    }

    /// Applies environment-style overrides read through `lookup`.
    #[instrument(skip(self, lookup))]
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(host) = lookup("WORDDUEL_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("WORDDUEL_PORT") {
            self.port = port
                .parse()
                .map_err(|e| ConfigError::new(format!("Invalid WORDDUEL_PORT '{}': {}", port, e)))?;
        }
        if let Some(db) = lookup("WORDDUEL_DB") {
            self.database_path = db;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.jwt_secret = secret;
        }
        Ok(self)
    }

    /// Checks settings that have no usable default.
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() {
            warn!("JWT_SECRET is not set");
            return Err(ConfigError::new("JWT_SECRET must be set".to_string()));
        }
        if self.max_guesses == 0 {
            return Err(ConfigError::new("max_guesses must be at least 1".to_string()));
        }
        if self.idle_timeout_secs == 0 {
            return Err(ConfigError::new("idle_timeout_secs must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Match defaults derived from this configuration.
    pub fn match_defaults(&self) -> MatchDefaults {
        MatchDefaults {
            coop_time_to_guess: self.coop_time_to_guess,
            race_time_to_guess: self.race_time_to_guess,
            max_guesses: self.max_guesses,
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
        }
    }
}

/// How new matches are configured when the creator does not say.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters)]
pub struct MatchDefaults {
    coop_time_to_guess: TimeToGuess,
    race_time_to_guess: TimeToGuess,
    max_guesses: usize,
    idle_timeout: Duration,
}

impl Default for MatchDefaults {
    fn default() -> Self {
        ServerConfig::default().match_defaults()
    }
}

impl MatchDefaults {
    /// The default time budget for `mode`.
    pub fn time_to_guess(&self, mode: GameMode) -> TimeToGuess {
        match mode {
            GameMode::Coop => self.coop_time_to_guess,
            GameMode::Race => self.race_time_to_guess,
        }
    }

    /// Builds a match config, using the mode default when `time_to_guess`
    /// is not given.
    pub fn config_for(
        &self,
        mode: GameMode,
        solution: impl Into<String>,
        time_to_guess: Option<TimeToGuess>,
    ) -> MatchConfig {
        MatchConfig::new(solution)
            .with_time_to_guess(time_to_guess.unwrap_or_else(|| self.time_to_guess(mode)))
            .with_max_guesses(self.max_guesses)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            port = 8080
            race_time_to_guess = 60
            "#,
        )
        .expect("parse");
        assert_eq!(*config.port(), 8080);
        assert_eq!(config.host(), "127.0.0.1");
        assert_eq!(*config.race_time_to_guess(), TimeToGuess::Seconds60);
        assert_eq!(*config.coop_time_to_guess(), TimeToGuess::Seconds30);
        assert_eq!(*config.max_guesses(), MAX_GUESSES);
        assert_eq!(*config.match_defaults().idle_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_environment_overrides_file() {
        let env: HashMap<&str, &str> =
            HashMap::from([("WORDDUEL_PORT", "4000"), ("JWT_SECRET", "hunter2")]);
        let config = ServerConfig::default()
            .overlay(|key| env.get(key).map(|v| v.to_string()))
            .expect("overlay");
        assert_eq!(*config.port(), 4000);
        assert_eq!(config.jwt_secret(), "hunter2");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_port_is_rejected() {
        let result = ServerConfig::default().overlay(|key| {
            (key == "WORDDUEL_PORT").then(|| "not-a-port".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_secret_fails_validation() {
        assert!(ServerConfig::default().validate().is_err());
    }

    #[test]
    fn test_zero_idle_timeout_fails_validation() {
        let config = ServerConfig::default()
            .with_jwt_secret("hunter2")
            .with_idle_timeout_secs(0u64);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_defaults_pick_time_per_mode() {
        let defaults = ServerConfig::default()
            .with_race_time_to_guess(TimeToGuess::Untimed)
            .match_defaults();
        let race = defaults.config_for(GameMode::Race, "stone", None);
        assert_eq!(*race.time_to_guess(), TimeToGuess::Untimed);
        let coop = defaults.config_for(GameMode::Coop, "stone", Some(TimeToGuess::Seconds60));
        assert_eq!(*coop.time_to_guess(), TimeToGuess::Seconds60);
    }
}
