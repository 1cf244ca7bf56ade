//! TOML configuration shared by the `ingest` and `query` binaries.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::kml::ParserOptions;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub parser: ParserOptions,
    /// Document to load at startup
    pub document: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kml::DEFAULT_PROGRESS_EVERY;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:3000");
        assert_eq!(config.parser.progress_every, DEFAULT_PROGRESS_EVERY);
        assert!(config.document.is_none());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml(
            r#"
            document = "zones/city.kml"

            [server]
            listen = "127.0.0.1:8080"

            [parser]
            progress_every = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:8080");
        assert_eq!(config.parser.progress_every, 10);
        assert_eq!(config.document, Some(PathBuf::from("zones/city.kml")));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[parser]\nprogress_every = 5").unwrap();
        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.parser.progress_every, 5);
    }

    #[test]
    fn test_invalid_config() {
        assert!(Config::from_toml("[server]\nlisten = 5").is_err());
    }
}
