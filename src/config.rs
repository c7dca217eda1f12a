//! Application-level configuration loading: phase timings, scoring and shutdown budget.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::game::{Scoring, Timings};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "FIBBING_ROUNDS_CONFIG_PATH";
/// Time granted to running drivers to exit once shutdown starts.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(25);

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// How long each phase stays on screen.
    pub timings: Timings,
    /// Points awarded when scoring a round.
    pub scoring: Scoring,
    /// Upper bound on draining drivers during shutdown.
    pub shutdown_timeout: Duration,
    /// Games seeded into the in-memory store at startup.
    pub demo_games: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        demo_games = app_config.demo_games,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a configuration document; absent keys keep their default value.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timings: Timings::default(),
            scoring: Scoring::default(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            demo_games: 0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    timings: RawTimings,
    scoring: Option<Scoring>,
    shutdown_timeout_ms: Option<u64>,
    demo_games: usize,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            timings: value.timings.into(),
            scoring: value.scoring.unwrap_or(defaults.scoring),
            shutdown_timeout: value
                .shutdown_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.shutdown_timeout),
            demo_games: value.demo_games,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
/// Phase durations in milliseconds.
struct RawTimings {
    question_ms: Option<u64>,
    voting_ms: Option<u64>,
    reveal_ms: Option<u64>,
    scoring_ms: Option<u64>,
    winner_ms: Option<u64>,
}

impl From<RawTimings> for Timings {
    fn from(value: RawTimings) -> Self {
        let defaults = Timings::default();
        let or = |ms: Option<u64>, fallback: Duration| ms.map(Duration::from_millis).unwrap_or(fallback);
        Self {
            show_question_screen_for: or(value.question_ms, defaults.show_question_screen_for),
            show_voting_screen_for: or(value.voting_ms, defaults.show_voting_screen_for),
            show_reveal_screen_for: or(value.reveal_ms, defaults.show_reveal_screen_for),
            show_score_screen_for: or(value.scoring_ms, defaults.show_score_screen_for),
            show_winner_screen_for: or(value.winner_ms, defaults.show_winner_screen_for),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
