//! # Configuration
//!
//! Application settings resolved from, in increasing priority: built-in
//! defaults, an optional TOML file and the process environment. A `.env`
//! file can seed the environment before resolution.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Database settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `sqlite` or `postgres`
    pub driver: String,
    /// SQLite database file
    pub sqlite_path: PathBuf,
    /// PostgreSQL connection URL
    pub postgres_url: Option<String>,
    /// Pool size
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: "sqlite".to_string(),
            sqlite_path: PathBuf::from("database/database.sqlite"),
            postgres_url: None,
            max_connections: 5,
        }
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application name
    pub name: String,
    /// Detailed error pages and verbose logs
    pub debug: bool,
    /// Public base URL
    pub url: Option<String>,
    /// Display timezone
    pub timezone: String,
    /// Application secret
    pub key: Option<String>,
    /// Database settings
    pub database: DatabaseConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Octane".to_string(),
            debug: false,
            url: None,
            timezone: "UTC".to_string(),
            key: None,
            database: DatabaseConfig::default(),
        }
    }
}

impl AppConfig {
    /// Resolve configuration from an optional TOML file and the environment
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file cannot be read or parsed
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        config.apply_env_with(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML file
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file cannot be read or parsed
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML text
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the text is not valid configuration
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config {
            message: e.to_string(),
        })
    }

    /// Override fields from environment-style variables supplied by `lookup`
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("APP_NAME") {
            self.name = name;
        }
        if let Some(debug) = lookup("APP_DEBUG") {
            self.debug = debug.trim().eq_ignore_ascii_case("true");
        }
        if let Some(url) = lookup("APP_URL") {
            self.url = Some(url);
        }
        if let Some(key) = lookup("APP_KEY") {
            self.key = Some(key);
        }
        if let Some(driver) = lookup("DB_DRIVER") {
            self.database.driver = driver;
        }
        if let Some(path) = lookup("DB_SQLITE_PATH") {
            self.database.sqlite_path = PathBuf::from(path);
        }
        if let Some(url) = lookup("DB_PGSQL_URL") {
            self.database.postgres_url = Some(url);
        }
    }

    /// Dot-path lookup, e.g. `database.driver`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        let root = serde_json::to_value(self).ok()?;
        key.split('.')
            .try_fold(&root, |node, part| node.get(part))
            .cloned()
    }
}

/// Parse `.env` text into `(key, value)` pairs
///
/// Blank lines, `#` comments and lines without `=` are skipped. Surrounding
/// quotes are stripped from values.
#[must_use]
pub fn parse_env(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            (key.trim().to_string(), value.to_string())
        })
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

/// Export the variables of a `.env` file into the process environment
///
/// Variables that are already set are left untouched. Returns how many
/// variables were exported.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be read
pub fn load_env_file(path: &Path) -> Result<usize> {
    let content = fs::read_to_string(path)?;
    let mut exported = 0;
    for (key, value) in parse_env(&content) {
        if std::env::var_os(&key).is_none() {
            std::env::set_var(&key, value);
            exported += 1;
        }
    }
    Ok(exported)
}
