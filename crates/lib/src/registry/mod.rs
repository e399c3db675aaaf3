//! HTTP clients for the remote registries.
//!
//! # Modules
//!
//! - [`galaxy`] - collection registry: paginated version listing and artifact download
//! - [`pypi`] - package index: latest release of the base platform
//!
//! All clients share one [`reqwest::Client`], so concurrent requests in a phase
//! draw from the same connection pool.

pub mod galaxy;
pub mod pypi;

use std::path::PathBuf;

use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::collection::CollectionName;
use crate::config::{ConfigError, RegistryConfig, base_url};
use crate::consts::APP_NAME;
use crate::version::VersionRange;

pub use galaxy::{DownloadedArtifact, GalaxyClient};
pub use pypi::PackageIndexClient;

/// Errors returned by registry queries.
#[derive(Debug, Error)]
pub enum RegistryError {
  /// The registry answered not-found for the first page of a collection.
  #[error("collection '{collection}' not found at {url}")]
  CollectionNotFound { collection: CollectionName, url: String },

  /// Transport failure, unexpected HTTP status, or a body that did not decode.
  #[error("registry request to {url} failed: {message}")]
  Unavailable { url: String, message: String },

  /// A `next` pointer led back to a page that was already read.
  #[error("pagination cycle detected at {url}")]
  PaginationCycle { url: String },

  /// The page chain was longer than the configured cap.
  #[error("pagination exceeded {limit} pages at {url}")]
  PaginationLimit { url: String, limit: usize },

  /// A URL built from registry data could not be parsed.
  #[error("invalid registry URL '{url}': {message}")]
  InvalidUrl { url: String, message: String },

  /// No published version satisfies the requested range.
  #[error("no version of '{collection}' satisfies {range}")]
  NoMatchingVersion { collection: CollectionName, range: VersionRange },

  /// Writing a downloaded artifact failed.
  #[error("failed to write {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

impl RegistryError {
  /// Whether the registry reported the collection as unknown.
  pub fn is_not_found(&self) -> bool {
    matches!(self, RegistryError::CollectionNotFound { .. })
  }

  pub(crate) fn unavailable(url: &Url, message: impl ToString) -> Self {
    RegistryError::Unavailable {
      url: url.to_string(),
      message: message.to_string(),
    }
  }
}

/// The set of registry clients a pipeline talks to.
#[derive(Debug, Clone)]
pub struct Registries {
  pub galaxy: GalaxyClient,
  pub index: PackageIndexClient,
  /// Package on the index that carries the base platform version.
  pub base_package: String,
}

impl Registries {
  /// Build clients from configuration, sharing one HTTP connection pool.
  pub fn from_config(config: &RegistryConfig) -> Result<Self, ConfigError> {
    config.validate()?;

    let http = reqwest::Client::builder()
      .timeout(config.request_timeout)
      .user_agent(format!("{APP_NAME}/{}", env!("CARGO_PKG_VERSION")))
      .build()?;

    debug!(
      galaxy = %config.galaxy_url,
      pypi = %config.pypi_url,
      timeout = ?config.request_timeout,
      "configured registries"
    );

    Ok(Self {
      galaxy: GalaxyClient::new(http.clone(), base_url(&config.galaxy_url)?, config.max_pages),
      index: PackageIndexClient::new(http, base_url(&config.pypi_url)?),
      base_package: config.base_package.clone(),
    })
  }
}

/// Join a path onto a base URL.
pub(crate) fn join_url(base: &Url, path: &str) -> Result<Url, RegistryError> {
  base.join(path).map_err(|e| RegistryError::InvalidUrl {
    url: format!("{base}{path}"),
    message: e.to_string(),
  })
}

/// GET a URL and decode a JSON body.
///
/// Returns `Ok(None)` on 404 so callers decide what not-found means for them.
pub(crate) async fn get_json<T: DeserializeOwned>(http: &reqwest::Client, url: &Url) -> Result<Option<T>, RegistryError> {
  debug!(url = %url, "GET");

  let response = http
    .get(url.clone())
    .send()
    .await
    .map_err(|e| RegistryError::unavailable(url, e))?;

  let status = response.status();
  if status == StatusCode::NOT_FOUND {
    return Ok(None);
  }
  if !status.is_success() {
    return Err(RegistryError::unavailable(url, format!("HTTP {status}")));
  }

  let body = response.text().await.map_err(|e| RegistryError::unavailable(url, e))?;
  let value = serde_json::from_str(&body).map_err(|e| RegistryError::unavailable(url, format!("malformed JSON: {e}")))?;
  Ok(Some(value))
}
