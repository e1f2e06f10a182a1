use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{LensError, Result};
use crate::explain::ExplainConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_model_path")]
    pub model_path: String,
    #[serde(default = "default_large_income_threshold")]
    pub large_income_threshold: f64,
    #[serde(default = "default_expense_multiple")]
    pub expense_multiple: f64,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_model_path() -> String {
    config_dir().join("model.json").to_string_lossy().to_string()
}

fn default_large_income_threshold() -> f64 {
    50_000.0
}

fn default_expense_multiple() -> f64 {
    1.5
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            large_income_threshold: default_large_income_threshold(),
            expense_multiple: default_expense_multiple(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

impl Settings {
    pub fn explain_config(&self) -> ExplainConfig {
        ExplainConfig {
            large_income_threshold: self.large_income_threshold,
            expense_multiple: self.expense_multiple,
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("ledgerlens")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Missing or unreadable settings fall back to defaults.
pub fn load_settings_from(path: &Path) -> Settings {
    if !path.exists() {
        return Settings::default();
    }
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot read settings");
            return Settings::default();
        }
    };
    serde_json::from_str(&content).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "Ignoring malformed settings");
        Settings::default()
    })
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

pub fn save_settings_to(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| LensError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(settings, &settings_path())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            model_path: "/tmp/model.json".to_string(),
            large_income_threshold: 10_000.0,
            expense_multiple: 2.0,
            currency_symbol: "₹".to_string(),
        };
        save_settings_to(&settings, &path).unwrap();
        assert_eq!(load_settings_from(&path), settings);
    }

    #[test]
    fn test_load_returns_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_from(&dir.path().join("nope.json"));
        assert_eq!(s, Settings::default());
        assert_eq!(s.currency_symbol, "$");
        assert!(s.model_path.ends_with("model.json"));
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"model_path": "/srv/model.json"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.model_path, "/srv/model.json");
        assert_eq!(s.large_income_threshold, 50_000.0);
        assert_eq!(s.expense_multiple, 1.5);
    }

    #[test]
    fn test_load_ignores_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(load_settings_from(&path), Settings::default());
    }

    #[test]
    fn test_load_falls_back_when_path_is_not_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::create_dir(&path).unwrap();
        assert_eq!(load_settings_from(&path), Settings::default());
    }

    #[test]
    fn test_save_creates_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep").join("nested").join("settings.json");
        save_settings_to(&Settings::default(), &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_explain_config_from_settings() {
        let s = Settings {
            expense_multiple: 3.0,
            ..Settings::default()
        };
        assert_eq!(s.explain_config().expense_multiple, 3.0);
    }
}
