//! Configuration for vow, read from `~/.vow/config.toml`.
//!
//! Every section is optional. String values may reference environment
//! variables as `${NAME}`; references are expanded once, at load time.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};
use toml::de;

/// Comma-separated URL list that replaces `[bootstrap] urls`.
pub const BOOTSTRAP_URLS_ENV: &str = "VOW_BOOTSTRAP_URLS";

const DEFAULT_BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Default, Deserialize)]
pub struct VowConfig {
    pub log: Option<LogConfig>,
    pub timers: Option<TimersConfig>,
    pub bootstrap: Option<BootstrapConfig>,
    pub http: Option<HttpConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TimersConfig {
    /// Default progress refresh for delays, in milliseconds. Zero disables
    /// progress.
    pub refresh_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub urls: Vec<String>,
    /// Timeout for the whole bootstrap, in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Pause before fetching, in milliseconds.
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HttpConfig {
    pub content_type: Option<String>,
    pub accept: Option<String>,
    /// Extra headers sent with every request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Replace every `${NAME}` with the value of that environment variable.
///
/// Unset variables expand to the empty string. `${}` is dropped and an
/// unclosed `${` is kept as written.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let name = &rest[start + 2..start + 2 + len];
        if !name.is_empty() {
            out.push_str(&env::var(name).unwrap_or_default());
        }
        rest = &rest[start + 2 + len + 1..];
    }

    out.push_str(rest);
    out
}

/// Split a comma-separated list, dropping blank entries.
#[must_use]
pub fn parse_url_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

fn expand_in_place(value: &mut String) {
    if value.contains("${") {
        *value = expand_env_vars(value);
    }
}

impl VowConfig {
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| {
            tracing::warn!("Failed to read config at {}: {source}", path.display());
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let mut config = Self::parse(&content).map_err(|source| {
            tracing::warn!("Failed to parse config at {}: {source}", path.display());
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        config.expand_env();
        Ok(config)
    }

    fn parse(content: &str) -> Result<Self, de::Error> {
        toml::from_str(content)
    }

    fn expand_env(&mut self) {
        if let Some(filter) = self.log.as_mut().and_then(|log| log.filter.as_mut()) {
            expand_in_place(filter);
        }
        if let Some(bootstrap) = self.bootstrap.as_mut() {
            bootstrap.urls.iter_mut().for_each(expand_in_place);
        }
        if let Some(http) = self.http.as_mut() {
            http.content_type.iter_mut().for_each(expand_in_place);
            http.accept.iter_mut().for_each(expand_in_place);
            http.headers.values_mut().for_each(expand_in_place);
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    #[must_use]
    pub fn log_filter(&self) -> Option<&str> {
        self.log.as_ref()?.filter.as_deref()
    }

    /// Default progress refresh for delays. `None` when unset or zero.
    #[must_use]
    pub fn refresh(&self) -> Option<Duration> {
        self.timers
            .as_ref()?
            .refresh_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    #[must_use]
    pub fn bootstrap_timeout(&self) -> Duration {
        self.bootstrap
            .as_ref()
            .and_then(|bootstrap| bootstrap.timeout_ms)
            .map_or(DEFAULT_BOOTSTRAP_TIMEOUT, Duration::from_millis)
    }

    /// Pause before the bootstrap fetches. `None` when unset or zero.
    #[must_use]
    pub fn bootstrap_delay(&self) -> Option<Duration> {
        self.bootstrap
            .as_ref()?
            .delay_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Bootstrap URLs, with `VOW_BOOTSTRAP_URLS` taking precedence over the
    /// file.
    #[must_use]
    pub fn bootstrap_urls(&self) -> Vec<String> {
        if let Some(urls) = env_bootstrap_urls() {
            return urls;
        }
        self.bootstrap
            .as_ref()
            .map(|bootstrap| bootstrap.urls.clone())
            .unwrap_or_default()
    }
}

/// URLs from `VOW_BOOTSTRAP_URLS`, if set and non-empty.
#[must_use]
pub fn env_bootstrap_urls() -> Option<Vec<String>> {
    let value = env::var(BOOTSTRAP_URLS_ENV).ok()?;
    let urls = parse_url_list(&value);
    (!urls.is_empty()).then_some(urls)
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".vow").join("config.toml"))
}
