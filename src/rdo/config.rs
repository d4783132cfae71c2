//! `/etc/rdo.conf` loading.
//!
//! The file is line oriented `key=value`. It is read fresh on every
//! invocation and never cached.

use crate::rdo::error::{Error, Result};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;

pub const CONFIG_PATH: &str = "/etc/rdo.conf";

const KEY_GROUP: &str = "group";
const KEY_WRONG_PW_SLEEP: &str = "wrong_pw_sleep";
const KEY_SESSION_TTL: &str = "session_ttl";
const KEY_ENV_POLICY: &str = "env_policy";

/// What the launched command inherits from the caller's environment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvPolicy {
    /// Keep everything, only `HOME` is replaced.
    #[default]
    Inherit,
    /// Drop everything and rebuild a minimal superuser environment.
    Clear,
}

impl EnvPolicy {
    fn parse(value: &str) -> Result<Self> {
        match value {
            "inherit" => Ok(Self::Inherit),
            "clear" => Ok(Self::Clear),
            other => Err(Error::ConfigInvalid {
                key: KEY_ENV_POLICY,
                reason: format!("expected 'inherit' or 'clear', got '{other}'"),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub group: String,
    pub wrong_pw_sleep: Duration,
    pub session_ttl: Duration,
    pub env_policy: EnvPolicy,
}

impl Config {
    /// Read and parse the configuration at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or a required entry is
    /// missing or malformed.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| Error::ConfigRead {
            path: PathBuf::from(path),
            err,
        })?;

        let config = Self::parse(&raw)?;

        debug!(
            group = %config.group,
            wrong_pw_sleep_ms = config.wrong_pw_sleep.as_millis(),
            session_ttl_secs = config.session_ttl.as_secs(),
            env_policy = ?config.env_policy,
            "configuration loaded"
        );

        Ok(config)
    }

    /// Parse configuration text.
    ///
    /// # Errors
    /// Returns an error if a required entry is missing or malformed.
    pub fn parse(raw: &str) -> Result<Self> {
        let group = entry(raw, KEY_GROUP)
            .filter(|value| !value.is_empty())
            .ok_or(Error::ConfigMissing(KEY_GROUP))?
            .to_string();

        // the value is handed to a microsecond sleep after `* 1000`
        let wrong_pw_sleep = integer(raw, KEY_WRONG_PW_SLEEP)?
            .checked_mul(1000)
            .map(Duration::from_micros)
            .ok_or_else(|| overflow(KEY_WRONG_PW_SLEEP))?;

        let session_ttl = integer(raw, KEY_SESSION_TTL)?
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(|| overflow(KEY_SESSION_TTL))?;

        let env_policy = match entry(raw, KEY_ENV_POLICY) {
            Some(value) => EnvPolicy::parse(value)?,
            None => EnvPolicy::default(),
        };

        Ok(Self {
            group,
            wrong_pw_sleep,
            session_ttl,
            env_policy,
        })
    }
}

/// Where the configuration comes from; loaded once per invocation.
pub trait ConfigSource {
    /// # Errors
    /// Returns an error if the configuration is unreadable or malformed.
    fn load(&self) -> Result<Config>;
}

#[derive(Clone, Debug)]
pub struct ConfigFile(pub PathBuf);

impl Default for ConfigFile {
    fn default() -> Self {
        Self(PathBuf::from(CONFIG_PATH))
    }
}

impl ConfigSource for ConfigFile {
    fn load(&self) -> Result<Config> {
        Config::load(&self.0)
    }
}

/// First value whose key matches exactly; comments and blank lines skipped.
fn entry<'a>(raw: &'a str, key: &str) -> Option<&'a str> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .find(|(k, _)| k.trim() == key)
        .map(|(_, value)| value.trim())
}

fn integer(raw: &str, key: &'static str) -> Result<u64> {
    let value = entry(raw, key).ok_or(Error::ConfigMissing(key))?;

    value.parse::<u64>().map_err(|e| Error::ConfigInvalid {
        key,
        reason: format!("'{value}' is not a non-negative integer: {e}"),
    })
}

fn overflow(key: &'static str) -> Error {
    Error::ConfigInvalid {
        key,
        reason: "value out of range".to_string(),
    }
}
