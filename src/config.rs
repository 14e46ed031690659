use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding `backend.base_url`.
pub const API_URL_ENV: &str = "THERMAL_INSPECTOR_API_URL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("could not determine the config directory")]
    NoConfigDir,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub user: UserConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_analysis_timeout")]
    pub analysis_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Percent, 0..=100.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default = "default_false")]
    pub show_low_confidence: bool,
    #[serde(default = "default_true")]
    pub show_bounding_boxes: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default = "default_user_name")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub dir: Option<PathBuf>,
}

// Default value functions
fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_analysis_timeout() -> u64 {
    30
}

fn default_confidence_threshold() -> f64 {
    50.0
}

fn default_user_name() -> String {
    "Unknown User".to_string()
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            analysis_timeout_secs: default_analysis_timeout(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            show_low_confidence: false,
            show_bounding_boxes: true,
        }
    }
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            name: default_user_name(),
        }
    }
}

impl AppConfig {
    pub fn analysis_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.backend.analysis_timeout_secs.max(1))
    }

    /// Apply environment overrides and clamp out-of-range values.
    pub fn apply_overrides(&mut self, api_url: Option<String>) {
        if let Some(url) = api_url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) {
            self.backend.base_url = url;
        }
        let threshold = self.detection.confidence_threshold;
        self.detection.confidence_threshold = if threshold.is_finite() {
            threshold.clamp(0.0, 100.0)
        } else {
            default_confidence_threshold()
        };
    }
}

/// Get the path to the config file
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dirs = directories::ProjectDirs::from("", "", "thermal-inspector").ok_or(ConfigError::NoConfigDir)?;
    Ok(dirs.config_dir().join("config.toml"))
}

/// Load configuration from the default location with environment overrides,
/// or defaults if it is missing or unreadable.
pub fn load_config() -> AppConfig {
    let mut config = match config_path() {
        Ok(path) => load_config_from(&path),
        Err(e) => {
            log::warn!("{e}. Using defaults.");
            AppConfig::default()
        }
    };
    config.apply_overrides(std::env::var(API_URL_ENV).ok());
    config
}

/// Load configuration from `path`, falling back to defaults.
pub fn load_config_from(path: &Path) -> AppConfig {
    if !path.exists() {
        return AppConfig::default();
    }
    match read_config(path) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("{e}. Using defaults.");
            AppConfig::default()
        }
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Save configuration to the default location
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(config, &config_path()?)
}

pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml = toml::to_string_pretty(config)?;
    std::fs::write(path, toml)?;
    Ok(())
}
