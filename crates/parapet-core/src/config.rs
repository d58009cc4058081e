use etcetera::BaseStrategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::report::Severity;

/// Try both `.yaml` and `.yml` extensions in a directory.
fn find_config_in_dir(dir: &Path) -> Option<PathBuf> {
    let yaml = dir.join("parapet.yaml");
    if yaml.exists() {
        return Some(yaml);
    }
    let yml = dir.join("parapet.yml");
    if yml.exists() {
        return Some(yml);
    }
    None
}

/// Sensor configuration loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Path this config was loaded from.
    #[serde(skip)]
    pub path: Option<String>,

    /// The third-party origin the message-channel detector accepts.
    pub expected_thirdparty_origin: String,

    /// Collector endpoint for best-effort report forwarding. Unset means
    /// no forwarding.
    pub collector_url: Option<String>,

    /// Bounded threat-log capacity.
    pub log_capacity: usize,

    /// Severities retained in the persisted threat log.
    pub retained_severities: Vec<Severity>,

    /// Ruleset document path; unset falls back to the bundled ruleset.
    pub ruleset_path: Option<String>,

    /// Messages resource path for the catalog; unset falls back to the
    /// resource bundled next to the ruleset.
    pub messages_path: Option<String>,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            path: None,
            expected_thirdparty_origin: "http://localhost:4000".to_string(),
            collector_url: None,
            log_capacity: 50,
            retained_severities: vec![Severity::High, Severity::Medium],
            ruleset_path: None,
            messages_path: None,
        }
    }
}

impl SensorConfig {
    /// Discover and load the config: `PARAPET_CONFIG` env path first, then
    /// the platform config dir. Missing or malformed config fails open to
    /// defaults with a console diagnostic; env overrides apply last.
    pub fn discover() -> Self {
        let mut config = Self::load_from_disk();

        if let Ok(url) = std::env::var("PARAPET_COLLECTOR_URL") {
            if !url.is_empty() {
                config.collector_url = Some(url);
            }
        }
        if let Ok(origin) = std::env::var("PARAPET_EXPECTED_ORIGIN") {
            if !origin.is_empty() {
                config.expected_thirdparty_origin = origin;
            }
        }

        config
    }

    fn load_from_disk() -> Self {
        let path = std::env::var("PARAPET_CONFIG")
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .or_else(|| config_dir().and_then(|d| find_config_in_dir(&d)));

        let Some(path) = path else {
            return Self::default();
        };

        Self::load_path(&path)
    }

    /// Load from an explicit path; parse failure falls back to defaults.
    pub fn load_path(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str::<SensorConfig>(&content) {
                Ok(mut config) => {
                    config.path = Some(path.display().to_string());
                    config
                }
                Err(e) => {
                    eprintln!("parapet: cannot parse config {}: {e}", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("parapet: cannot read config {}: {e}", path.display());
                Self::default()
            }
        }
    }
}

/// Platform config directory for parapet.
pub fn config_dir() -> Option<PathBuf> {
    let strategy = etcetera::choose_base_strategy().ok()?;
    Some(strategy.config_dir().join("parapet"))
}

/// Platform data directory for parapet (persisted threat log lives here).
pub fn data_dir() -> Option<PathBuf> {
    let strategy = etcetera::choose_base_strategy().ok()?;
    Some(strategy.data_dir().join("parapet"))
}
