use crate::error::{config_error, env_error, DashResult};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

/// Optional configuration file, relative to the working directory
pub const CONFIG_FILE: &str = "config/dashboard.toml";

/// Seconds between data refreshes
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 180;
/// Longest accepted refresh interval, one day
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 24 * 60 * 60;
/// Seconds each page stays on screen
pub const DEFAULT_DISPLAY_INTERVAL_SECS: u32 = 60;
/// Upper bound on events requested per refresh
pub const DEFAULT_MAX_EVENTS: u32 = 15;
/// Primary items shown per page before the "+N more..." line
pub const DEFAULT_ITEM_DISPLAY_CAP: usize = 5;
/// Task count above which the "+N more tasks..." line appears
pub const DEFAULT_TASK_OVERFLOW_THRESHOLD: usize = 3;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CPU_SAMPLE_WINDOW_MS: u64 = 1000;
pub const DEFAULT_THERMAL_ZONE_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";

/// Main configuration structure for the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Google Calendar ID to read events from
    pub google_calendar_id: String,
    /// JSON file holding the OAuth access token
    pub token_file: PathBuf,
    /// Seconds between data refreshes
    pub refresh_interval_secs: u64,
    /// Seconds each page is displayed
    pub display_interval_secs: u32,
    /// Maximum number of events fetched per refresh
    pub max_events: u32,
    /// Maximum number of primary items (and tasks) listed on a page
    pub item_display_cap: usize,
    /// Task count that triggers the overflow line
    pub task_overflow_threshold: usize,
    /// Timeout for a single HTTP request
    pub request_timeout_secs: u64,
    /// Window used for the very first CPU usage sample
    pub cpu_sample_window_ms: u64,
    /// Thermal zone file reporting millidegrees Celsius
    pub thermal_zone_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            google_calendar_id: "primary".to_string(),
            token_file: PathBuf::from("token.json"),
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            display_interval_secs: DEFAULT_DISPLAY_INTERVAL_SECS,
            max_events: DEFAULT_MAX_EVENTS,
            item_display_cap: DEFAULT_ITEM_DISPLAY_CAP,
            task_overflow_threshold: DEFAULT_TASK_OVERFLOW_THRESHOLD,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            cpu_sample_window_ms: DEFAULT_CPU_SAMPLE_WINDOW_MS,
            thermal_zone_path: PathBuf::from(DEFAULT_THERMAL_ZONE_PATH),
        }
    }
}

impl Config {
    /// Load configuration from the config file and environment
    pub fn load() -> DashResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let file_contents = fs::read_to_string(CONFIG_FILE).ok();
        Self::from_sources(file_contents.as_deref(), |key| env::var(key).ok())
    }

    /// Build a configuration from optional TOML contents and an environment lookup.
    ///
    /// Values from the environment win over the file, which wins over defaults.
    pub fn from_sources<F>(file_contents: Option<&str>, lookup: F) -> DashResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match file_contents {
            Some(content) => toml::from_str::<Config>(content)?,
            None => Config::default(),
        };

        if let Some(id) = lookup("GOOGLE_CALENDAR_ID") {
            config.google_calendar_id = id;
        }
        if let Some(path) = lookup("GOOGLE_TOKEN_FILE") {
            config.token_file = PathBuf::from(path);
        }
        if let Some(path) = lookup("THERMAL_ZONE_PATH") {
            config.thermal_zone_path = PathBuf::from(path);
        }
        override_parsed(&lookup, "REFRESH_INTERVAL_SECS", &mut config.refresh_interval_secs)?;
        override_parsed(&lookup, "DISPLAY_INTERVAL_SECS", &mut config.display_interval_secs)?;
        override_parsed(&lookup, "MAX_EVENTS", &mut config.max_events)?;
        override_parsed(&lookup, "ITEM_DISPLAY_CAP", &mut config.item_display_cap)?;
        override_parsed(&lookup, "TASK_OVERFLOW_THRESHOLD", &mut config.task_overflow_threshold)?;
        override_parsed(&lookup, "REQUEST_TIMEOUT_SECS", &mut config.request_timeout_secs)?;
        override_parsed(&lookup, "CPU_SAMPLE_WINDOW_MS", &mut config.cpu_sample_window_ms)?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the scheduler cannot run with
    pub fn validate(&self) -> DashResult<()> {
        if self.refresh_interval_secs == 0 {
            return Err(config_error("refresh_interval_secs must be at least 1"));
        }
        if self.refresh_interval_secs > MAX_REFRESH_INTERVAL_SECS {
            return Err(config_error(&format!(
                "refresh_interval_secs must be at most {}",
                MAX_REFRESH_INTERVAL_SECS
            )));
        }
        if self.display_interval_secs == 0 {
            return Err(config_error("display_interval_secs must be at least 1"));
        }
        if self.max_events == 0 {
            return Err(config_error("max_events must be at least 1"));
        }
        if self.item_display_cap == 0 {
            return Err(config_error("item_display_cap must be at least 1"));
        }
        if self.google_calendar_id.trim().is_empty() {
            return Err(config_error("google_calendar_id must not be empty"));
        }
        Ok(())
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T) -> DashResult<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse::<T>()
            .map_err(|_| env_error(&format!("Invalid {} value: {}", key, raw)))?;
    }
    Ok(())
}
