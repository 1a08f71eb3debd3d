use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::session::Endpoint;

/// Loopback-to-host alias used by emulated environments.
pub const DEFAULT_HOST: &str = "10.0.2.2";
pub const DEFAULT_PORT: &str = "8080";

/// Persisted endpoint settings. Absent files or fields resolve to the
/// defaults; missing configuration is never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: String,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> String {
    DEFAULT_PORT.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Settings {
    /// Settings file location. `TETHER_SETTINGS_PATH` overrides the default
    /// of `$HOME/.tether-settings.json`.
    pub fn path() -> PathBuf {
        if let Ok(path) = env::var("TETHER_SETTINGS_PATH") {
            return PathBuf::from(path);
        }
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".tether-settings.json")
    }

    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw).with_context(|| format!("failed to write settings to {path:?}"))
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            host: self.host.clone(),
            port: self.port.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(tag: &str) -> PathBuf {
        env::temp_dir().join(format!("tether-settings-{tag}-{}.json", std::process::id()))
    }

    #[test]
    fn defaults_when_file_is_missing() {
        let settings = Settings::load_from(Path::new("/nonexistent/tether-settings.json"));
        assert_eq!(settings.host, DEFAULT_HOST);
        assert_eq!(settings.port, DEFAULT_PORT);
    }

    #[test]
    fn defaults_when_file_is_garbage() {
        let path = scratch_path("garbage");
        fs::write(&path, "not json").expect("write scratch file");
        let settings = Settings::load_from(&path);
        assert_eq!(settings, Settings::default());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn round_trips_through_disk() {
        let path = scratch_path("roundtrip");
        let settings = Settings {
            host: "192.168.1.20".to_string(),
            port: "9001".to_string(),
        };
        settings.save_to(&path).expect("save settings");
        assert_eq!(Settings::load_from(&path), settings);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let path = scratch_path("partial");
        fs::write(&path, r#"{"host": "example.com"}"#).expect("write scratch file");
        let settings = Settings::load_from(&path);
        assert_eq!(settings.host, "example.com");
        assert_eq!(settings.port, DEFAULT_PORT);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn endpoint_mirrors_the_fields() {
        let settings = Settings::default();
        let endpoint = settings.endpoint();
        assert_eq!(endpoint.host, DEFAULT_HOST);
        assert_eq!(endpoint.port, DEFAULT_PORT);
    }
}
