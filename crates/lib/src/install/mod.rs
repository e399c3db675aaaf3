//! Release installation from a build manifest.
//!
//! Downloads run concurrently into a scratch directory. Installs run one at a
//! time, in collection name order, into `<destination>/ansible-<release>`: the
//! external installer is not safe to run twice against one tree.

mod installer;

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use semver::Version;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

pub use installer::{ArtifactInstaller, GalaxyCliInstaller, InstallStepError};

use crate::collection::{CollectionError, CollectionName};
use crate::manifest::{BuildManifest, DepsManifest};
use crate::registry::{DownloadedArtifact, Registries};

#[derive(Debug, Clone)]
pub struct InstallOptions {
  /// The concrete release being built.
  pub release_version: Version,
  /// Parent of the release directory.
  pub destination: PathBuf,
}

impl InstallOptions {
  pub fn release_dir(&self) -> PathBuf {
    self.destination.join(format!("ansible-{}", self.release_version))
  }
}

#[derive(Debug)]
pub struct InstallResult {
  /// What was installed, for the caller to persist.
  pub deps: DepsManifest,
  /// The tree every collection was installed into.
  pub release_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum InstallError {
  #[error("failed to create scratch directory: {0}")]
  Scratch(#[source] io::Error),

  #[error("failed to create {}: {source}", path.display())]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("{} collection(s) failed to download", failures.len())]
  Downloads {
    failures: BTreeMap<CollectionName, CollectionError>,
  },

  #[error("failed to install {collection}: {source}")]
  Install {
    collection: CollectionName,
    #[source]
    source: InstallStepError,
  },
}

/// Download and install every dependency of `manifest`.
///
/// Any download failure stops the run before the first install; the failures
/// are reported per collection.
pub async fn install<I: ArtifactInstaller>(
  registries: &Registries,
  manifest: &BuildManifest,
  options: &InstallOptions,
  installer: &I,
) -> Result<InstallResult, InstallError> {
  info!(
    release = %options.release_version,
    collections = manifest.dependencies.len(),
    "building release"
  );

  let scratch = tempfile::Builder::new()
    .prefix("acd-downloads-")
    .tempdir()
    .map_err(InstallError::Scratch)?;

  let artifacts = download_all(registries, manifest, scratch.path()).await?;

  let release_dir = options.release_dir();
  tokio::fs::create_dir_all(&release_dir)
    .await
    .map_err(|source| InstallError::CreateDir {
      path: release_dir.clone(),
      source,
    })?;

  let mut dependencies = BTreeMap::new();
  for (name, artifact) in artifacts {
    installer
      .install(&artifact.path, &release_dir)
      .await
      .map_err(|source| InstallError::Install {
        collection: name.clone(),
        source,
      })?;
    dependencies.insert(name, artifact.version);
  }

  info!(release_dir = ?release_dir, installed = dependencies.len(), "release installed");

  Ok(InstallResult {
    deps: DepsManifest {
      acd_version: options.release_version.clone(),
      base_version: manifest.base_version.clone(),
      dependencies,
    },
    release_dir,
  })
}

async fn download_all(
  registries: &Registries,
  manifest: &BuildManifest,
  scratch: &Path,
) -> Result<BTreeMap<CollectionName, DownloadedArtifact>, InstallError> {
  let mut join_set = JoinSet::new();
  for (name, range) in &manifest.dependencies {
    let galaxy = registries.galaxy.clone();
    let name = name.clone();
    let range = range.clone();
    let dest = scratch.to_path_buf();
    join_set.spawn(async move {
      let result = galaxy.download_artifact(&name, &range, &dest).await;
      (name, result)
    });
  }

  let mut pending: BTreeSet<CollectionName> = manifest.dependencies.keys().cloned().collect();
  let mut artifacts = BTreeMap::new();
  let mut failures = BTreeMap::new();
  let mut task_error = None;

  while let Some(joined) = join_set.join_next().await {
    match joined {
      Ok((name, Ok(artifact))) => {
        pending.remove(&name);
        artifacts.insert(name, artifact);
      }
      Ok((name, Err(e))) => {
        warn!(collection = %name, error = %e, "download failed");
        pending.remove(&name);
        failures.insert(name, CollectionError::Registry(e));
      }
      Err(e) => {
        error!(error = %e, "download task did not complete");
        task_error = Some(e.to_string());
      }
    }
  }

  let task_error = task_error.unwrap_or_else(|| "task lost".to_string());
  for name in pending {
    failures.insert(name, CollectionError::TaskFailed(task_error.clone()));
  }

  if failures.is_empty() {
    Ok(artifacts)
  } else {
    Err(InstallError::Downloads { failures })
  }
}
