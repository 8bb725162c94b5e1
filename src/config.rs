use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result, anyhow};

use crate::backend::DEFAULT_BACKEND_URL;

pub const BACKEND_URL_ENV: &str = "AROGYA_BACKEND_URL";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub backend_url: Option<String>,
    pub show_hindi: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            backend_url: None,
            show_hindi: true,
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Re-read the config file, apply `change` and write it back. A file that
    /// exists but does not parse is left untouched and the error returned.
    pub fn update(change: impl FnOnce(&mut Config)) -> Result<Config> {
        Self::update_at(&Self::get_config_path()?, change)
    }

    pub fn update_at(path: &Path, change: impl FnOnce(&mut Config)) -> Result<Config> {
        let mut config = Self::load_from(path)
            .with_context(|| format!("not saving over unreadable config {}", path.display()))?;
        change(&mut config);
        config.save_to(path)?;
        Ok(config)
    }

    /// Backend base URL: CLI flag, then environment, then file, then default.
    pub fn resolve_backend_url(&self, flag: Option<&str>) -> String {
        let env = std::env::var(BACKEND_URL_ENV).ok();
        Self::pick_backend_url(flag, env.as_deref(), self.backend_url.as_deref())
    }

    fn pick_backend_url(flag: Option<&str>, env: Option<&str>, file: Option<&str>) -> String {
        [flag, env, file]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|url| !url.is_empty())
            .unwrap_or(DEFAULT_BACKEND_URL)
            .to_string()
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("arogya-mitra").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            backend_url: Some("http://10.0.0.5:8000".into()),
            show_hindi: false,
        };

        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"backend_url": "http://api.local"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.backend_url.as_deref(), Some("http://api.local"));
        assert!(config.show_hindi);
    }

    #[test]
    fn test_update_keeps_other_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"backend_url": "http://clinic.lan:8000", "show_hindi": true}"#).unwrap();

        let config = Config::update_at(&path, |c| c.show_hindi = false).unwrap();

        assert!(!config.show_hindi);
        assert_eq!(Config::load_from(&path).unwrap().backend_url.as_deref(), Some("http://clinic.lan:8000"));
    }

    #[test]
    fn test_update_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arogya-mitra").join("config.json");

        Config::update_at(&path, |c| c.show_hindi = false).unwrap();

        assert!(!Config::load_from(&path).unwrap().show_hindi);
    }

    #[test]
    fn test_update_leaves_invalid_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let broken = r#"{"backend_url": "http://clinic.lan:8000", "show_hindi": tru"#;
        fs::write(&path, broken).unwrap();

        assert!(Config::update_at(&path, |c| c.show_hindi = false).is_err());

        assert_eq!(fs::read_to_string(&path).unwrap(), broken);
    }

    #[test]
    fn test_backend_url_precedence() {
        assert_eq!(
            Config::pick_backend_url(Some("http://flag"), Some("http://env"), Some("http://file")),
            "http://flag"
        );
        assert_eq!(
            Config::pick_backend_url(None, Some("http://env"), Some("http://file")),
            "http://env"
        );
        assert_eq!(Config::pick_backend_url(None, Some(" "), Some("http://file")), "http://file");
        assert_eq!(Config::pick_backend_url(None, None, None), DEFAULT_BACKEND_URL);
    }
}
