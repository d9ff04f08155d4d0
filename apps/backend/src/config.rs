//! Service configuration from the environment.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is not valid: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Base URL of the vocabulary API.
    pub upstream_url: String,
    /// Bearer token sent to the vocabulary API, if it requires one.
    pub upstream_token: Option<String>,
    /// Fixed shuffle seed for every session. Entropy when unset.
    pub session_seed: Option<u64>,
    /// Upper bound on one upstream round trip, pronunciation scoring included.
    pub upstream_timeout: Duration,
    /// Sessions older than this are abandoned and dropped.
    pub session_ttl: Duration,
}

impl Config {
    /// Read configuration from the process environment.
    ///
    /// Env vars:
    /// - HOST (default 0.0.0.0)
    /// - PORT (default 3000)
    /// - UPSTREAM_URL (required)
    /// - UPSTREAM_TOKEN
    /// - SESSION_SEED
    /// - UPSTREAM_TIMEOUT_SECS (default 20)
    /// - SESSION_TTL_SECS (default 3600)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match lookup("PORT") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "PORT", value })?,
            None => 3000,
        };
        let upstream_url = lookup("UPSTREAM_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("UPSTREAM_URL"))?;
        let upstream_token = lookup("UPSTREAM_TOKEN").filter(|t| !t.is_empty());
        let session_seed = match lookup("SESSION_SEED") {
            Some(value) => Some(
                value
                    .parse()
                    .map_err(|_| ConfigError::Invalid { name: "SESSION_SEED", value })?,
            ),
            None => None,
        };
        let upstream_timeout = seconds(&lookup, "UPSTREAM_TIMEOUT_SECS", 20)?;
        let session_ttl = seconds(&lookup, "SESSION_TTL_SECS", 3600)?;

        Ok(Self {
            host,
            port,
            upstream_url,
            upstream_token,
            session_seed,
            upstream_timeout,
            session_ttl,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn seconds<F>(lookup: &F, name: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = match lookup(name) {
        Some(value) => match value.parse::<u64>() {
            Ok(secs) if secs > 0 => secs,
            _ => return Err(ConfigError::Invalid { name, value }),
        },
        None => default,
    };
    Ok(Duration::from_secs(secs))
}
