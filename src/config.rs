use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Could not determine config directory")?;
    Ok(base.join("catsync"))
}

/// Default location of the persisted state file
pub fn default_state_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("state.json"))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the catalog API
    pub api_url: String,
    /// API token; also settable via CATSYNC_TOKEN
    #[serde(default)]
    pub token: String,
    /// Where the state file lives; defaults next to the config
    #[serde(default)]
    pub state_file: Option<PathBuf>,
}

impl Config {
    /// Load config.toml from the config directory, applying env overrides.
    pub fn load() -> Result<Self> {
        let path = config_dir()?.join("config.toml");
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let mut config: Config =
            toml::from_str(&content).context("Invalid config.toml format")?;

        if let Ok(url) = std::env::var("CATSYNC_API_URL") {
            config.api_url = url;
        }
        if let Ok(token) = std::env::var("CATSYNC_TOKEN") {
            config.token = token;
        }
        Ok(config)
    }

    pub fn state_path(&self) -> Result<PathBuf> {
        match &self.state_file {
            Some(path) => Ok(path.clone()),
            None => default_state_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_from_parses_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "api_url = \"https://catalog.example.com\"\ntoken = \"tok_1\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api_url, "https://catalog.example.com");
        assert_eq!(config.token, "tok_1");
        assert!(config.state_file.is_none());
    }

    #[test]
    fn load_from_fails_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn explicit_state_file_wins() {
        let config = Config {
            api_url: "https://catalog.example.com".into(),
            token: String::new(),
            state_file: Some(PathBuf::from("/tmp/catsync-state.json")),
        };
        assert_eq!(
            config.state_path().unwrap(),
            PathBuf::from("/tmp/catsync-state.json")
        );
    }
}
