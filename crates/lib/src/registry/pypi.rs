//! Package index client.

use reqwest::Url;
use serde::Deserialize;
use tracing::info;

use super::{RegistryError, get_json, join_url};
use crate::version::BaseVersion;

/// Client for a PyPI-style JSON API (`/pypi/<package>/json`).
#[derive(Debug, Clone)]
pub struct PackageIndexClient {
  http: reqwest::Client,
  base_url: Url,
}

#[derive(Debug, Deserialize)]
struct PackageMetadata {
  info: PackageInfo,
}

#[derive(Debug, Deserialize)]
struct PackageInfo {
  version: String,
}

impl PackageIndexClient {
  pub fn new(http: reqwest::Client, base_url: Url) -> Self {
    Self { http, base_url }
  }

  /// Latest published version of `package`.
  ///
  /// Any failure, including a missing package or a body without
  /// `info.version`, is [`RegistryError::Unavailable`].
  pub async fn fetch_latest_version(&self, package: &str) -> Result<BaseVersion, RegistryError> {
    let url = join_url(&self.base_url, &format!("pypi/{package}/json"))?;

    let metadata: PackageMetadata = get_json(&self.http, &url)
      .await?
      .ok_or_else(|| RegistryError::unavailable(&url, format!("package '{package}' not found")))?;

    let version = metadata
      .info
      .version
      .parse()
      .map_err(|e| RegistryError::unavailable(&url, e))?;

    info!(package, version = %version, "latest base version");
    Ok(version)
  }
}
