//! Configuration for veritrack.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (VERITRACK_HOME, VERITRACK_MODEL, VERITRACK_API_BASE)
//! 2. Config file (.veritrack/config.yaml)
//! 3. Defaults (~/.veritrack)
//!
//! Config file discovery:
//! - Searches current directory and parents for .veritrack/config.yaml
//! - `home` in the config file is relative to the .veritrack/ directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Settings key under which the verifier credential is stored
pub const API_KEY_SETTING: &str = "verifier_api_key";

/// Errors in configuration the user has to fix
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("API key missing. Set it with `veritrack key set <KEY>` (setting '{key}')")]
    MissingCredential { key: String },

    #[error("Please enter a valid API key")]
    EmptyCredential,

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub home: Option<String>,
    #[serde(default)]
    pub verifier: Option<VerifierConfig>,
    #[serde(default)]
    pub sync: Option<SyncConfig>,
    #[serde(default)]
    pub captions: Option<CaptionConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifierConfig {
    pub model: Option<String>,
    pub api_base: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_transcript_chars: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    pub lookahead_seconds: Option<f64>,
    pub identity_poll_ms: Option<u64>,
    pub clock_tick_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptionConfig {
    #[serde(default)]
    pub preferred_languages: Vec<String>,
    pub watch_url_base: Option<String>,
}

/// Resolved configuration with defaults applied
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to veritrack home (settings file lives here)
    pub home: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub verifier: VerifierSettings,
    pub sync: SyncSettings,
    pub captions: CaptionSettings,
}

impl ResolvedConfig {
    /// Path of the JSON settings store
    pub fn settings_path(&self) -> PathBuf {
        self.home.join("settings.json")
    }
}

#[derive(Debug, Clone)]
pub struct VerifierSettings {
    pub model: String,
    pub api_base: String,
    /// Transport timeout for one verifier request
    pub timeout_seconds: u64,
    /// Prompt budget for the rendered transcript; `None` sends everything
    pub max_transcript_chars: Option<usize>,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_seconds: 120,
            max_transcript_chars: None,
        }
    }
}

impl VerifierSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Tolerance added to the playback position when picking the active claim
    pub lookahead_seconds: f64,
    /// How often the video identity and surface presence are checked
    pub identity_poll_ms: u64,
    /// Cadence of simulated clock notifications
    pub clock_tick_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            lookahead_seconds: 2.0,
            identity_poll_ms: 1000,
            clock_tick_ms: 250,
        }
    }
}

impl SyncSettings {
    pub fn identity_poll_interval(&self) -> Duration {
        Duration::from_millis(self.identity_poll_ms)
    }

    pub fn clock_tick_interval(&self) -> Duration {
        Duration::from_millis(self.clock_tick_ms)
    }
}

#[derive(Debug, Clone)]
pub struct CaptionSettings {
    /// Language codes tried in order; first track wins when none match
    pub preferred_languages: Vec<String>,
    /// Watch page URL; the video id is appended as the `v` parameter
    pub watch_url_base: String,
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            preferred_languages: Vec::new(),
            watch_url_base: "https://www.youtube.com/watch".to_string(),
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".veritrack").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Apply a parsed config file over the defaults
fn apply_config_file(
    config: ConfigFile,
    config_dir: &Path,
    default_home: PathBuf,
) -> Result<(PathBuf, VerifierSettings, SyncSettings, CaptionSettings), ConfigurationError> {
    let home = config
        .home
        .as_deref()
        .map(|h| resolve_path(config_dir, h))
        .unwrap_or(default_home);

    let defaults = VerifierSettings::default();
    let verifier = match config.verifier {
        Some(v) => VerifierSettings {
            model: v.model.unwrap_or(defaults.model),
            api_base: v.api_base.unwrap_or(defaults.api_base),
            timeout_seconds: v.timeout_seconds.unwrap_or(defaults.timeout_seconds),
            max_transcript_chars: v.max_transcript_chars,
        },
        None => defaults,
    };

    let defaults = SyncSettings::default();
    let sync = match config.sync {
        Some(s) => SyncSettings {
            lookahead_seconds: s.lookahead_seconds.unwrap_or(defaults.lookahead_seconds),
            identity_poll_ms: s.identity_poll_ms.unwrap_or(defaults.identity_poll_ms),
            clock_tick_ms: s.clock_tick_ms.unwrap_or(defaults.clock_tick_ms),
        },
        None => defaults,
    };

    if !sync.lookahead_seconds.is_finite() || sync.lookahead_seconds < 0.0 {
        return Err(ConfigurationError::Invalid(format!(
            "sync.lookahead_seconds must be a non-negative number, got {}",
            sync.lookahead_seconds
        )));
    }
    if sync.identity_poll_ms == 0 || sync.clock_tick_ms == 0 {
        return Err(ConfigurationError::Invalid(
            "sync intervals must be greater than zero".to_string(),
        ));
    }

    let defaults = CaptionSettings::default();
    let captions = match config.captions {
        Some(c) => CaptionSettings {
            preferred_languages: c.preferred_languages,
            watch_url_base: c.watch_url_base.unwrap_or(defaults.watch_url_base),
        },
        None => defaults,
    };

    Ok((home, verifier, sync, captions))
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".veritrack");

    let config_file = find_config_file();

    let (home, mut verifier, sync, captions) = if let Some(ref config_path) = config_file {
        let config = load_config_file(config_path)?;
        let config_dir = config_path.parent().unwrap_or(Path::new("."));
        apply_config_file(config, config_dir, default_home)?
    } else {
        (
            default_home,
            VerifierSettings::default(),
            SyncSettings::default(),
            CaptionSettings::default(),
        )
    };

    let home = std::env::var("VERITRACK_HOME")
        .map(PathBuf::from)
        .unwrap_or(home);
    if let Ok(model) = std::env::var("VERITRACK_MODEL") {
        verifier.model = model;
    }
    if let Ok(api_base) = std::env::var("VERITRACK_API_BASE") {
        verifier.api_base = api_base;
    }

    Ok(ResolvedConfig {
        home,
        config_file,
        verifier,
        sync,
        captions,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
