use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::error::{Result, SubweaveError};

fn default_seek_delay_ms() -> u64 {
    300
}

fn default_seek_epsilon() -> f64 {
    0.001
}

fn default_region_alpha() -> f64 {
    0.5
}

fn default_log_file() -> String {
    "subweave.log".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of undo snapshots kept
    pub capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Fallback wait before a click-to-seek fires when no ready signal arrives
    #[serde(default = "default_seek_delay_ms")]
    pub seek_delay_ms: u64,
    /// Offset added to a cue start so the seek lands inside the cue
    #[serde(default = "default_seek_epsilon")]
    pub seek_epsilon: f64,
    /// Alpha channel of randomized region colors
    #[serde(default = "default_region_alpha")]
    pub region_alpha: f64,
    /// Start playback once a click-to-seek lands
    #[serde(default)]
    pub play_after_seek: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Name of the JSON object holding persisted values
    pub name: String,
    /// Key under which the cue list is mirrored
    pub key: String,
    /// Directory for the file-backed store
    pub dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Base name of the saved file when nothing was uploaded
    pub default_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Debug level instead of info
    pub verbose: bool,
    /// Directory for the daily rolling log file; console only when unset
    pub log_dir: Option<PathBuf>,
    #[serde(default = "default_log_file")]
    pub file_name: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: crate::history::DEFAULT_CAPACITY,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            seek_delay_ms: default_seek_delay_ms(),
            seek_epsilon: default_seek_epsilon(),
            region_alpha: default_region_alpha(),
            play_after_seek: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            name: "subplayer_settings".to_string(),
            key: "subtitles".to_string(),
            dir: PathBuf::from(".subweave"),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_name: "defaultName".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_dir: None,
            file_name: default_log_file(),
        }
    }
}

impl SyncConfig {
    pub fn seek_delay(&self) -> Duration {
        Duration::from_millis(self.seek_delay_ms)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubweaveError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| SubweaveError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubweaveError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SubweaveError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.history.capacity == 0 {
            return Err(SubweaveError::Config("history.capacity must be at least 1".to_string()));
        }
        if !self.sync.seek_epsilon.is_finite() || self.sync.seek_epsilon < 0.0 {
            return Err(SubweaveError::Config(format!(
                "sync.seek_epsilon must be a non-negative number, got {}",
                self.sync.seek_epsilon
            )));
        }
        if !(0.0..=1.0).contains(&self.sync.region_alpha) {
            return Err(SubweaveError::Config(format!(
                "sync.region_alpha must be between 0 and 1, got {}",
                self.sync.region_alpha
            )));
        }
        if self.storage.key.is_empty() || self.storage.name.is_empty() {
            return Err(SubweaveError::Config("storage.name and storage.key must not be empty".to_string()));
        }
        Ok(())
    }
}
