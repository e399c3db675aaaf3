//! Registry configuration.
//!
//! Server locations and request limits are plain values handed to
//! [`Registries::from_config`](crate::registry::Registries::from_config), so tests
//! can point the pipelines at local stub servers.
//!
//! # Environment
//!
//! | Variable              | Field             |
//! |-----------------------|-------------------|
//! | `ACD_GALAXY_SERVER`   | `galaxy_url`      |
//! | `ACD_PYPI_SERVER`     | `pypi_url`        |
//! | `ACD_BASE_PACKAGE`    | `base_package`    |
//! | `ACD_REQUEST_TIMEOUT` | `request_timeout` |
//! | `ACD_MAX_PAGES`       | `max_pages`       |

use std::env;
use std::num::ParseIntError;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;
use tracing::debug;

use crate::consts::{
  DEFAULT_BASE_PACKAGE, DEFAULT_GALAXY_URL, DEFAULT_MAX_PAGES, DEFAULT_PYPI_URL, DEFAULT_REQUEST_TIMEOUT_SECS,
};

pub const GALAXY_SERVER_ENV: &str = "ACD_GALAXY_SERVER";
pub const PYPI_SERVER_ENV: &str = "ACD_PYPI_SERVER";
pub const BASE_PACKAGE_ENV: &str = "ACD_BASE_PACKAGE";
pub const REQUEST_TIMEOUT_ENV: &str = "ACD_REQUEST_TIMEOUT";
pub const MAX_PAGES_ENV: &str = "ACD_MAX_PAGES";

/// Where to look for collections and the base platform, and how long to wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
  /// Collection registry base URL.
  pub galaxy_url: String,
  /// Package index base URL.
  pub pypi_url: String,
  /// Package on the index that carries the base platform version.
  pub base_package: String,
  /// Deadline applied to every HTTP request.
  pub request_timeout: Duration,
  /// Maximum number of version pages followed for one collection.
  pub max_pages: usize,
}

/// Errors in configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("invalid server URL '{url}': {message}")]
  InvalidUrl { url: String, message: String },

  #[error("invalid {name} '{value}': {source}")]
  InvalidTimeout {
    name: &'static str,
    value: String,
    #[source]
    source: humantime::DurationError,
  },

  #[error("invalid {name} '{value}': {source}")]
  InvalidMaxPages {
    name: &'static str,
    value: String,
    #[source]
    source: ParseIntError,
  },

  #[error("max pages must be at least 1")]
  ZeroMaxPages,

  #[error("failed to build HTTP client: {0}")]
  HttpClient(#[from] reqwest::Error),
}

impl Default for RegistryConfig {
  fn default() -> Self {
    Self {
      galaxy_url: DEFAULT_GALAXY_URL.to_string(),
      pypi_url: DEFAULT_PYPI_URL.to_string(),
      base_package: DEFAULT_BASE_PACKAGE.to_string(),
      request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
      max_pages: DEFAULT_MAX_PAGES,
    }
  }
}

impl RegistryConfig {
  /// Defaults overlaid with any `ACD_*` environment variables that are set.
  pub fn from_env() -> Result<Self, ConfigError> {
    let mut config = Self::default();

    if let Ok(url) = env::var(GALAXY_SERVER_ENV) {
      debug!(url = %url, "collection registry from environment");
      config.galaxy_url = url;
    }
    if let Ok(url) = env::var(PYPI_SERVER_ENV) {
      debug!(url = %url, "package index from environment");
      config.pypi_url = url;
    }
    if let Ok(package) = env::var(BASE_PACKAGE_ENV) {
      config.base_package = package;
    }
    if let Ok(value) = env::var(REQUEST_TIMEOUT_ENV) {
      config.request_timeout = parse_timeout(REQUEST_TIMEOUT_ENV, &value)?;
    }
    if let Ok(value) = env::var(MAX_PAGES_ENV) {
      config.max_pages = value.trim().parse().map_err(|source| ConfigError::InvalidMaxPages {
        name: MAX_PAGES_ENV,
        value: value.clone(),
        source,
      })?;
    }

    config.validate()?;
    Ok(config)
  }

  /// Check every value without touching the network.
  pub fn validate(&self) -> Result<(), ConfigError> {
    base_url(&self.galaxy_url)?;
    base_url(&self.pypi_url)?;
    if self.max_pages == 0 {
      return Err(ConfigError::ZeroMaxPages);
    }
    Ok(())
  }
}

/// Parse a humantime duration such as `30s` or `2m`.
pub fn parse_timeout(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
  humantime::parse_duration(value.trim()).map_err(|source| ConfigError::InvalidTimeout {
    name,
    value: value.to_string(),
    source,
  })
}

/// Parse a server URL so that relative API paths join beneath it.
pub(crate) fn base_url(raw: &str) -> Result<Url, ConfigError> {
  let mut url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl {
    url: raw.to_string(),
    message: e.to_string(),
  })?;

  if url.cannot_be_a_base() {
    return Err(ConfigError::InvalidUrl {
      url: raw.to_string(),
      message: "not a hierarchical URL".to_string(),
    });
  }

  if !url.path().ends_with('/') {
    let path = format!("{}/", url.path());
    url.set_path(&path);
  }

  Ok(url)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  const ALL_VARS: [&str; 5] = [
    GALAXY_SERVER_ENV,
    PYPI_SERVER_ENV,
    BASE_PACKAGE_ENV,
    REQUEST_TIMEOUT_ENV,
    MAX_PAGES_ENV,
  ];

  /// Every `ACD_*` variable, unset unless named in `set`.
  fn vars_with(set: &[(&'static str, &'static str)]) -> Vec<(&'static str, Option<&'static str>)> {
    ALL_VARS
      .iter()
      .map(|name| (*name, set.iter().find(|(k, _)| k == name).map(|(_, v)| *v)))
      .collect()
  }

  mod base_urls {
    use super::*;

    #[test]
    fn appends_trailing_slash() {
      let url = base_url("http://localhost:8080/galaxy").unwrap();
      assert_eq!(url.as_str(), "http://localhost:8080/galaxy/");
      assert_eq!(
        url.join("api/v2/collections").unwrap().as_str(),
        "http://localhost:8080/galaxy/api/v2/collections"
      );
    }

    #[test]
    fn keeps_root_url() {
      let url = base_url("https://galaxy.ansible.com").unwrap();
      assert_eq!(url.as_str(), "https://galaxy.ansible.com/");
    }

    #[test]
    fn rejects_garbage() {
      assert!(matches!(base_url("not a url"), Err(ConfigError::InvalidUrl { .. })));
      assert!(matches!(base_url("mailto:someone"), Err(ConfigError::InvalidUrl { .. })));
    }
  }

  mod from_env {
    use super::*;

    #[test]
    #[serial]
    fn defaults_without_variables() {
      temp_env::with_vars(vars_with(&[]), || {
        let config = RegistryConfig::from_env().unwrap();
        assert_eq!(config, RegistryConfig::default());
      });
    }

    #[test]
    #[serial]
    fn overlays_variables() {
      let vars = vars_with(&[
        (GALAXY_SERVER_ENV, "http://127.0.0.1:9000"),
        (PYPI_SERVER_ENV, "http://127.0.0.1:9001/"),
        (BASE_PACKAGE_ENV, "ansible-core"),
        (REQUEST_TIMEOUT_ENV, "45s"),
        (MAX_PAGES_ENV, "7"),
      ]);

      temp_env::with_vars(vars, || {
        let config = RegistryConfig::from_env().unwrap();
        assert_eq!(config.galaxy_url, "http://127.0.0.1:9000");
        assert_eq!(config.pypi_url, "http://127.0.0.1:9001/");
        assert_eq!(config.base_package, "ansible-core");
        assert_eq!(config.request_timeout, Duration::from_secs(45));
        assert_eq!(config.max_pages, 7);
      });
    }

    #[test]
    #[serial]
    fn invalid_timeout_is_reported() {
      let vars = vars_with(&[(REQUEST_TIMEOUT_ENV, "soon")]);

      temp_env::with_vars(vars, || {
        let err = RegistryConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimeout { .. }));
      });
    }

    #[test]
    #[serial]
    fn zero_pages_is_rejected() {
      let vars = vars_with(&[(MAX_PAGES_ENV, "0")]);

      temp_env::with_vars(vars, || {
        assert!(matches!(RegistryConfig::from_env(), Err(ConfigError::ZeroMaxPages)));
      });
    }
  }
}
