//! Collection registry client.
//!
//! Talks to the Galaxy v2 API:
//!
//! - `api/v2/collections/<namespace>/<name>/versions` - paginated version listing,
//!   `{ "results": [{ "version": "1.2.3" }, ...], "next": "<url>" | null }`
//! - `api/v2/collections/<namespace>/<name>/versions/<version>/` - version detail
//!   with the artifact `download_url`
//!
//! Every request carries `format=json`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use reqwest::{StatusCode, Url};
use semver::Version;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::{RegistryError, get_json, join_url};
use crate::collection::CollectionName;
use crate::version::VersionRange;

/// Client for one collection registry.
#[derive(Debug, Clone)]
pub struct GalaxyClient {
  http: reqwest::Client,
  base_url: Url,
  max_pages: usize,
}

/// An artifact fetched into a local directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
  pub collection: CollectionName,
  /// The concrete version the range resolved to.
  pub version: Version,
  pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct VersionPage {
  results: Vec<VersionRecord>,
  #[serde(default)]
  next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VersionRecord {
  version: String,
}

#[derive(Debug, Deserialize)]
struct VersionDetail {
  download_url: String,
  #[serde(default)]
  artifact: Option<ArtifactInfo>,
}

#[derive(Debug, Deserialize)]
struct ArtifactInfo {
  filename: String,
}

impl GalaxyClient {
  pub fn new(http: reqwest::Client, base_url: Url, max_pages: usize) -> Self {
    Self {
      http,
      base_url,
      max_pages,
    }
  }

  /// Every published version string of `collection`, in registry order.
  ///
  /// Follows `next` pointers until the chain ends. A not-found answer on the
  /// first page is [`RegistryError::CollectionNotFound`]; on any later page it
  /// is [`RegistryError::Unavailable`]. Revisiting a page or exceeding the page
  /// cap stops the walk with an error.
  pub async fn fetch_all_versions(&self, collection: &CollectionName) -> Result<Vec<String>, RegistryError> {
    let first = join_url(
      &self.base_url,
      &format!("api/v2/collections/{}/versions", collection.registry_path()),
    )?;

    let mut visited: HashSet<Url> = HashSet::new();
    let mut versions = Vec::new();
    let mut next = Some(first);

    while let Some(url) = next.take() {
      let url = with_json_format(url);

      if visited.contains(&url) {
        return Err(RegistryError::PaginationCycle { url: url.to_string() });
      }
      if visited.len() >= self.max_pages {
        return Err(RegistryError::PaginationLimit {
          url: url.to_string(),
          limit: self.max_pages,
        });
      }
      let is_first = visited.is_empty();
      visited.insert(url.clone());

      let page: VersionPage = match get_json(&self.http, &url).await? {
        Some(page) => page,
        None if is_first => {
          return Err(RegistryError::CollectionNotFound {
            collection: collection.clone(),
            url: url.to_string(),
          });
        }
        None => return Err(RegistryError::unavailable(&url, "HTTP 404 on a later page")),
      };

      debug!(
        collection = %collection,
        url = %url,
        count = page.results.len(),
        "read version page"
      );

      versions.extend(page.results.into_iter().map(|record| record.version));
      next = match page.next.filter(|n| !n.is_empty()) {
        Some(n) => Some(join_url(&self.base_url, &n)?),
        None => None,
      };
    }

    debug!(collection = %collection, pages = visited.len(), versions = versions.len(), "listed versions");
    Ok(versions)
  }

  /// Download the newest version of `collection` inside `range` into `dest_dir`.
  pub async fn download_artifact(
    &self,
    collection: &CollectionName,
    range: &VersionRange,
    dest_dir: &Path,
  ) -> Result<DownloadedArtifact, RegistryError> {
    let raw = self.fetch_all_versions(collection).await?;
    let version = newest_in_range(collection, &raw, range).ok_or_else(|| RegistryError::NoMatchingVersion {
      collection: collection.clone(),
      range: range.clone(),
    })?;

    let detail_url = with_json_format(join_url(
      &self.base_url,
      &format!("api/v2/collections/{}/versions/{}/", collection.registry_path(), version),
    )?);
    let detail: VersionDetail = get_json(&self.http, &detail_url)
      .await?
      .ok_or_else(|| RegistryError::unavailable(&detail_url, format!("no detail for version {version}")))?;

    let download_url = join_url(&self.base_url, &detail.download_url)?;
    let filename = detail
      .artifact
      .and_then(|artifact| safe_filename(&artifact.filename))
      .unwrap_or_else(|| format!("{}-{}-{}.tar.gz", collection.namespace(), collection.name(), version));

    info!(collection = %collection, version = %version, url = %download_url, "downloading artifact");

    let path = dest_dir.join(filename);
    let size = match self.download_to(&download_url, &path).await {
      Ok(size) => size,
      Err(e) => {
        // Leave no partial artifact behind.
        let _ = tokio::fs::remove_file(&path).await;
        return Err(e);
      }
    };

    info!(path = ?path, size, "download complete");

    Ok(DownloadedArtifact {
      collection: collection.clone(),
      version,
      path,
    })
  }

  /// Stream the body at `url` into a new file at `path`, returning its size.
  async fn download_to(&self, url: &Url, path: &Path) -> Result<u64, RegistryError> {
    let mut response = self
      .http
      .get(url.clone())
      .send()
      .await
      .map_err(|e| RegistryError::unavailable(url, e))?;

    let status = response.status();
    if status != StatusCode::OK {
      return Err(RegistryError::unavailable(url, format!("HTTP {status}")));
    }

    let io_error = |source| RegistryError::Io {
      path: path.to_path_buf(),
      source,
    };
    let mut file = tokio::fs::File::create(path).await.map_err(io_error)?;
    let mut size = 0u64;
    while let Some(chunk) = response.chunk().await.map_err(|e| RegistryError::unavailable(url, e))? {
      file.write_all(&chunk).await.map_err(io_error)?;
      size += chunk.len() as u64;
    }
    file.flush().await.map_err(io_error)?;

    Ok(size)
  }
}

/// Add `format=json` unless the URL already names a format.
fn with_json_format(mut url: Url) -> Url {
  if !url.query_pairs().any(|(key, _)| key == "format") {
    url.query_pairs_mut().append_pair("format", "json");
  }
  url
}

/// Highest parseable version inside `range`; unparseable entries are skipped.
fn newest_in_range(collection: &CollectionName, raw: &[String], range: &VersionRange) -> Option<Version> {
  raw
    .iter()
    .filter_map(|v| match Version::parse(v.trim()) {
      Ok(version) => Some(version),
      Err(e) => {
        warn!(collection = %collection, version = %v, error = %e, "skipping unparseable version");
        None
      }
    })
    .filter(|v| range.matches(v))
    .max()
}

/// Final path component of a registry-supplied file name.
fn safe_filename(name: &str) -> Option<String> {
  Path::new(name)
    .file_name()
    .and_then(|n| n.to_str())
    .filter(|n| !n.is_empty())
    .map(str::to_string)
}
