//! Application settings, persisted as `config.toml`

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use dbench_core::prelude::*;

const CONFIG_FILENAME: &str = "config.toml";
const APP_DIR: &str = "droid-bench";

/// Lower bound for the device poll period; anything below it is treated
/// as a broken config value, not an aggressive preference.
const MIN_REFRESH_INTERVAL_MS: u64 = 250;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Device monitor poll period in milliseconds
    pub refresh_interval_ms: u64,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Explicit path to the backend daemon; PATH lookup otherwise
    pub program: Option<PathBuf>,

    /// Per-invocation timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            program: None,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub device: DeviceSettings,
    pub backend: BackendSettings,
}

impl Settings {
    /// Location of the settings file under the platform config dir
    pub fn config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join(APP_DIR).join(CONFIG_FILENAME)
    }

    /// Load settings, falling back to defaults when no file exists.
    /// A malformed file is an error; silently replacing a config the
    /// user wrote by hand would hide their mistake.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&raw)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
        Ok(settings.validate())
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let payload = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("serialize settings: {e}")))?;
        fs::write(path, payload)?;
        Ok(())
    }

    /// Clamp nonsense values back to their defaults
    fn validate(mut self) -> Self {
        if self.device.refresh_interval_ms < MIN_REFRESH_INTERVAL_MS {
            self.device.refresh_interval_ms = DeviceSettings::default().refresh_interval_ms;
        }
        if self.backend.request_timeout_secs == 0 {
            self.backend.request_timeout_secs = BackendSettings::default().request_timeout_secs;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.device.refresh_interval_ms, 5000);
        assert_eq!(settings.backend.request_timeout_secs, 30);
        assert!(settings.backend.program.is_none());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "[device]\nrefresh_interval_ms = 2000\n").unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.device.refresh_interval_ms, 2000);
        assert_eq!(settings.backend.request_timeout_secs, 30);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "this is not toml [").unwrap();

        let err = Settings::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_clamps_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(
            &path,
            "[device]\nrefresh_interval_ms = 10\n[backend]\nrequest_timeout_secs = 0\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.device.refresh_interval_ms, 5000);
        assert_eq!(settings.backend.request_timeout_secs, 30);
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILENAME);

        let mut settings = Settings::default();
        settings.device.refresh_interval_ms = 1500;
        settings.backend.program = Some(PathBuf::from("/opt/dbench/dbenchd"));
        settings.save_to(&path).unwrap();

        let reloaded = Settings::load_from(&path).unwrap();
        assert_eq!(reloaded, settings);
    }

    #[test]
    fn test_config_path_under_app_dir() {
        let path = Settings::config_path();
        assert!(path.ends_with("droid-bench/config.toml"));
    }
}
