use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

fn default_base_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

fn default_search_timeout_secs() -> u64 {
    30
}

fn default_grep_program() -> String {
    "grep".to_string()
}

/// Which implementation runs the raw line search for `grep_search`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchBackendKind {
    /// Spawn the external `grep` program once per query.
    #[default]
    Grep,
    /// Scan files in-process with the `regex` crate.
    Regex,
}

/// Server configuration. Built once at startup, validated, then shared
/// read-only with every component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Directory all operations are confined to. Canonicalised by
    /// [`Config::validate`].
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,

    /// Largest file `read_file_contents` will return, in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// TCP address to listen on. When unset the server speaks over stdio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen: Option<String>,

    /// Upper bound on a single search process.
    #[serde(default = "default_search_timeout_secs")]
    pub search_timeout_secs: u64,

    #[serde(default = "default_grep_program")]
    pub grep_program: String,

    #[serde(default)]
    pub search_backend: SearchBackendKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            max_file_size: default_max_file_size(),
            listen: None,
            search_timeout_secs: default_search_timeout_secs(),
            grep_program: default_grep_program(),
            search_backend: SearchBackendKind::default(),
        }
    }
}

impl Config {
    /// Config rooted at `base_path` with every other field defaulted. Mostly
    /// useful for tests, which each want their own sandbox.
    pub fn for_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            ..Default::default()
        }
    }

    /// Load a config file. A missing file is not an error; defaults are used.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {path:?}"))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse config {path:?}"))
    }

    /// The default config location (~/.fsview/config.toml)
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(".fsview").join("config.toml"))
    }

    /// Checks the base path exists, makes it absolute, and fills in defaults
    /// for unset limits.
    pub fn validate(mut self) -> Result<Self> {
        if !self.base_path.exists() {
            bail!("base path does not exist: {}", self.base_path.display());
        }
        if !self.base_path.is_dir() {
            bail!("base path is not a directory: {}", self.base_path.display());
        }

        self.base_path = self
            .base_path
            .canonicalize()
            .with_context(|| format!("Failed to get absolute path for {:?}", self.base_path))?;

        if self.max_file_size == 0 {
            self.max_file_size = DEFAULT_MAX_FILE_SIZE;
        }
        if self.search_timeout_secs == 0 {
            self.search_timeout_secs = default_search_timeout_secs();
        }

        Ok(self)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.search_backend, SearchBackendKind::Grep);
        assert_eq!(config.grep_program, "grep");
        assert!(config.listen.is_none());
    }

    #[test]
    fn test_partial_toml_uses_defaults() -> Result<()> {
        let config: Config = toml::from_str(
            r#"
            base_path = "/srv/data"
            search_backend = "regex"
            "#,
        )?;
        assert_eq!(config.base_path, PathBuf::from("/srv/data"));
        assert_eq!(config.search_backend, SearchBackendKind::Regex);
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(config.search_timeout_secs, 30);
        Ok(())
    }

    #[test]
    fn test_load_missing_file_is_default() -> Result<()> {
        let temp = tempdir()?;
        let config = Config::load(&temp.path().join("nope.toml"))?;
        assert_eq!(config, Config::default());
        Ok(())
    }

    #[test]
    fn test_validate_canonicalises_and_fills_limits() -> Result<()> {
        let temp = tempdir()?;
        let mut config = Config::for_base_path(temp.path().join("."));
        config.max_file_size = 0;

        let config = config.validate()?;
        assert!(config.base_path.is_absolute());
        assert_eq!(config.base_path, temp.path().canonicalize()?);
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
        Ok(())
    }

    #[test]
    fn test_validate_rejects_missing_base() {
        let temp = tempdir().unwrap();
        let err = Config::for_base_path(temp.path().join("missing"))
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("base path does not exist"));
    }
}
