//! Application settings persistence
//!
//! Handles saving and loading user preferences.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::AnalyserConfig;

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Backend connection
    #[serde(default)]
    pub backend: BackendSettings,
    /// EQ update timing and response preview
    #[serde(default)]
    pub eq: EqSettings,
    /// Live visualization
    #[serde(default)]
    pub display: DisplaySettings,
}

/// Backend connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Base URL the `/api/audio/*` paths are joined onto
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// EQ coordinator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqSettings {
    /// Quiet period before a gain change is sent for processing (ms)
    #[serde(default = "default_apply_debounce_ms")]
    pub apply_debounce_ms: u64,
    /// Quiet period before the response curve is refreshed (ms)
    #[serde(default = "default_curve_debounce_ms")]
    pub curve_debounce_ms: u64,
    /// Sample rate for the response curve when the track does not report one
    #[serde(default = "default_response_sample_rate")]
    pub response_sample_rate: u32,
    /// Filter q for the response curve
    #[serde(default = "default_response_q")]
    pub response_q: f32,
}

/// Display and interface settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplaySettings {
    /// Show the original-audio overlay at startup
    #[serde(default = "default_true")]
    pub overlay_by_default: bool,
    /// Transport position refresh (ms)
    #[serde(default = "default_position_interval_ms")]
    pub position_interval_ms: u64,
    /// Live spectrum refresh (ms)
    #[serde(default = "default_spectrum_interval_ms")]
    pub spectrum_interval_ms: u64,
    /// Analyser FFT size (rounded up to a power of two)
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    /// Analyser smoothing between frames (0.0 = none)
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_apply_debounce_ms() -> u64 {
    300
}

fn default_curve_debounce_ms() -> u64 {
    200
}

fn default_response_sample_rate() -> u32 {
    44100
}

fn default_response_q() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_position_interval_ms() -> u64 {
    100
}

fn default_spectrum_interval_ms() -> u64 {
    50
}

fn default_fft_size() -> usize {
    2048
}

fn default_smoothing() -> f32 {
    0.8
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for EqSettings {
    fn default() -> Self {
        Self {
            apply_debounce_ms: default_apply_debounce_ms(),
            curve_debounce_ms: default_curve_debounce_ms(),
            response_sample_rate: default_response_sample_rate(),
            response_q: default_response_q(),
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            overlay_by_default: true,
            position_interval_ms: default_position_interval_ms(),
            spectrum_interval_ms: default_spectrum_interval_ms(),
            fft_size: default_fft_size(),
            smoothing: default_smoothing(),
        }
    }
}

impl BackendSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl DisplaySettings {
    pub fn analyser(&self) -> AnalyserConfig {
        AnalyserConfig {
            fft_size: self.fft_size,
            smoothing: self.smoothing,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn file_path() -> Option<PathBuf> {
        crate::utils::project_dirs().map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Load settings from file, or return defaults if not found
    pub fn load() -> Self {
        Self::file_path()
            .and_then(|path| Self::load_from_file(&path).ok())
            .unwrap_or_default()
    }

    /// Load settings from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SettingsError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Save settings to the default file
    pub fn save(&self) -> Result<(), SettingsError> {
        if let Some(path) = Self::file_path() {
            self.save_to_file(&path)
        } else {
            Err(SettingsError::Io(
                "Could not determine config directory".to_string(),
            ))
        }
    }

    /// Save settings to a specific file
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::Io(e.to_string()))?;
        }

        let content =
            serde_json::to_string_pretty(self).map_err(|e| SettingsError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| SettingsError::Io(e.to_string()))?;
        Ok(())
    }
}

/// Errors that can occur with settings
#[derive(Debug, Clone)]
pub enum SettingsError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "IO error: {}", e),
            SettingsError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for SettingsError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("eqscope-settings-{}-{}", name, std::process::id()))
            .join("settings.json")
    }

    #[test]
    fn test_round_trip_through_file() {
        let path = temp_path("round-trip");
        let mut settings = Settings::default();
        settings.backend.base_url = "http://audio.local:8080".to_string();
        settings.eq.response_q = 0.7;
        settings.display.overlay_by_default = false;

        settings.save_to_file(&path).unwrap();
        let loaded = Settings::load_from_file(&path).unwrap();
        assert_eq!(loaded, settings);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"backend": {"base_url": "http://x"}}"#).unwrap();
        assert_eq!(settings.backend.timeout_secs, 30);
        assert_eq!(settings.eq, EqSettings::default());
        assert!(settings.display.overlay_by_default);
        assert_eq!(settings.display.analyser().fft_size, 2048);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = Settings::load_from_file(&temp_path("missing")).unwrap_err();
        assert!(matches!(err, SettingsError::Io(_)));
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let path = temp_path("garbage");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();
        let err = Settings::load_from_file(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
