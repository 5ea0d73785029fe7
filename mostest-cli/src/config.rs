/// Settings for the mostest CLI.
///
/// Every field is optional. A flag beats the environment, which beats the
/// config file, which beats the built-in default.
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use mostest_core::constants::DEFAULT_FEATURED_LIMIT;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:mostest.db";
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

#[derive(Deserialize, Default, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MostestConfig {
    pub database_url: Option<String>,
    pub user: Option<String>,
    pub timeout_ms: Option<u64>,
    pub featured_limit: Option<usize>,
}

const DEFAULT_CONFIG_TEMPLATE: &str = "\
# mostest configuration
# All values here can be overridden by CLI flags or environment variables.

# SQLite database URL (env: DATABASE_URL)
# database_url = \"sqlite:mostest.db\"

# Who you are when creating and editing leaderboards (env: MOSTEST_USER).
# Leave unset to create anonymous leaderboards, which nobody can edit later.
# user = \"ash\"

# Give up on a single database call after this many milliseconds
# timeout_ms = 5000

# How many leaderboards `mostest featured` lists
# featured_limit = 3
";

/// Values that can come from the command line.
#[derive(Default)]
pub struct Overrides {
    pub database_url: Option<String>,
    pub user: Option<String>,
    pub timeout_ms: Option<u64>,
}

/// Values read from the environment.
#[derive(Default)]
pub struct EnvVars {
    pub database_url: Option<String>,
    pub user: Option<String>,
}

impl EnvVars {
    pub fn from_process() -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        EnvVars {
            database_url: non_empty("DATABASE_URL"),
            user: non_empty("MOSTEST_USER"),
        }
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub user: Option<String>,
    pub timeout: Duration,
    pub featured_limit: usize,
}

impl Settings {
    pub fn resolve(cli: Overrides, env: EnvVars, file: MostestConfig) -> Self {
        Settings {
            database_url: cli
                .database_url
                .or(env.database_url)
                .or(file.database_url)
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            user: cli.user.or(env.user).or(file.user),
            timeout: Duration::from_millis(
                cli.timeout_ms.or(file.timeout_ms).unwrap_or(DEFAULT_TIMEOUT_MS),
            ),
            featured_limit: file.featured_limit.unwrap_or(DEFAULT_FEATURED_LIMIT),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot locate a config file: HOME is not set (pass --config)")]
    NoHome,
    #[error("could not read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("{} is not a valid mostest config: {source}", .path.display())]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("{} already exists; edit it or remove it first", .0.display())]
    AlreadyExists(PathBuf),
    #[error("could not write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// The TOML file a run takes its settings from.
pub struct ConfigFile {
    pub path: PathBuf,
}

impl ConfigFile {
    /// Use `explicit` when given, else `$HOME/.config/mostest/config.toml`.
    pub fn locate(explicit: Option<PathBuf>, home: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path,
            None => home.ok_or(ConfigError::NoHome)?.join(".config/mostest/config.toml"),
        };
        Ok(ConfigFile { path })
    }

    /// The parsed file. A file that was never written counts as empty.
    pub fn read(&self) -> Result<MostestConfig, ConfigError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(MostestConfig::default()),
            Err(source) => return Err(ConfigError::Read { path: self.path.clone(), source }),
        };
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path: self.path.clone(), source })
    }

    /// Write the commented template, refusing to replace an existing file.
    pub fn write_template(&self) -> Result<(), ConfigError> {
        if self.path.exists() {
            return Err(ConfigError::AlreadyExists(self.path.clone()));
        }
        let write_err = |source| ConfigError::Write { path: self.path.clone(), source };
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(write_err)?;
        }
        fs::write(&self.path, DEFAULT_CONFIG_TEMPLATE).map_err(write_err)
    }
}
