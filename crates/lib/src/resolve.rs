//! Collection version resolution.
//!
//! Coordinates the `new-acd` flow:
//! 1. Query the package index for the base version and the collection registry
//!    for every collection's versions, all at once
//! 2. Wait for every query to finish (no early cancellation)
//! 3. Select one version per collection
//! 4. Assemble the [`BuildManifest`] for the caller to persist
//!
//! A collection that fails never hides its siblings' results: each task hands
//! back its name with its outcome, and failures are collected by name.

use std::collections::{BTreeMap, BTreeSet};

use semver::Version;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::collection::{CollectionError, CollectionName};
use crate::manifest::BuildManifest;
use crate::registry::{Registries, RegistryError};
use crate::select::{CompatibilityPolicy, select_compatible};
use crate::version::{AcdVersion, BaseVersion};

/// Result of resolving a batch of collections.
#[derive(Debug)]
pub struct ResolutionResult {
  /// Build manifest covering every collection that resolved.
  pub manifest: BuildManifest,
  /// Concrete version chosen per collection.
  pub selected: BTreeMap<CollectionName, Version>,
  /// Collections that could not be resolved, with the reason.
  pub failures: BTreeMap<CollectionName, CollectionError>,
}

impl ResolutionResult {
  /// Whether every requested collection resolved.
  pub fn is_complete(&self) -> bool {
    self.failures.is_empty()
  }
}

/// Errors that abort a resolution as a whole.
///
/// Collection lookups that failed in the same run are kept in `failures`.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// The base platform version could not be determined.
  #[error("failed to determine base version: {source}")]
  BaseVersion {
    #[source]
    source: RegistryError,
    failures: BTreeMap<CollectionName, CollectionError>,
  },

  /// The base version lookup task panicked or was cancelled.
  #[error("base version lookup did not complete: {message}")]
  BaseVersionTask {
    message: String,
    failures: BTreeMap<CollectionName, CollectionError>,
  },
}

impl ResolveError {
  /// Collections whose own lookup failed before the run was aborted.
  pub fn failures(&self) -> &BTreeMap<CollectionName, CollectionError> {
    match self {
      ResolveError::BaseVersion { failures, .. } | ResolveError::BaseVersionTask { failures, .. } => failures,
    }
  }
}

/// Outcome of one concurrent lookup.
enum Lookup {
  Base(Result<BaseVersion, RegistryError>),
  Versions(CollectionName, Result<Vec<String>, RegistryError>),
}

/// Resolve `collections` against the registries.
///
/// # Errors
///
/// Only a failed base version lookup is an error; per-collection failures are
/// returned in [`ResolutionResult::failures`], or in [`ResolveError::failures`]
/// when the base lookup failed too.
pub async fn resolve(
  registries: &Registries,
  acd_version: AcdVersion,
  collections: &[CollectionName],
  policy: &dyn CompatibilityPolicy,
) -> Result<ResolutionResult, ResolveError> {
  let mut requested = BTreeSet::new();
  for name in collections {
    if !requested.insert(name.clone()) {
      warn!(collection = %name, "collection listed more than once");
    }
  }

  info!(acd_version = %acd_version, count = requested.len(), "resolving collection versions");

  let mut join_set = JoinSet::new();

  let index = registries.index.clone();
  let package = registries.base_package.clone();
  join_set.spawn(async move { Lookup::Base(index.fetch_latest_version(&package).await) });

  for name in &requested {
    let galaxy = registries.galaxy.clone();
    let name = name.clone();
    join_set.spawn(async move {
      let versions = galaxy.fetch_all_versions(&name).await;
      Lookup::Versions(name, versions)
    });
  }

  let mut base = None;
  let mut raw: BTreeMap<CollectionName, Vec<String>> = BTreeMap::new();
  let mut failures = BTreeMap::new();
  let mut pending = requested;
  let mut task_error = None;

  while let Some(joined) = join_set.join_next().await {
    match joined {
      Ok(Lookup::Base(result)) => base = Some(result),
      Ok(Lookup::Versions(name, Ok(versions))) => {
        pending.remove(&name);
        raw.insert(name, versions);
      }
      Ok(Lookup::Versions(name, Err(e))) => {
        warn!(collection = %name, error = %e, "version lookup failed");
        pending.remove(&name);
        failures.insert(name, CollectionError::Registry(e));
      }
      Err(e) => {
        error!(error = %e, "lookup task did not complete");
        task_error = Some(e.to_string());
      }
    }
  }

  // Names still pending belong to tasks that never reported back.
  let task_error = task_error.unwrap_or_else(|| "task lost".to_string());
  for name in pending {
    failures.insert(name, CollectionError::TaskFailed(task_error.clone()));
  }

  let base_version = match base {
    Some(Ok(version)) => version,
    Some(Err(source)) => return Err(ResolveError::BaseVersion { source, failures }),
    None => {
      return Err(ResolveError::BaseVersionTask {
        message: task_error,
        failures,
      });
    }
  };

  let selection = select_compatible(&base_version, &raw, policy);
  failures.extend(
    selection
      .failures
      .into_iter()
      .map(|(name, e)| (name, CollectionError::Selection(e))),
  );

  let manifest = BuildManifest::from_selection(acd_version, base_version, &selection.selected);

  info!(
    resolved = selection.selected.len(),
    failed = failures.len(),
    "resolution complete"
  );

  Ok(ResolutionResult {
    manifest,
    selected: selection.selected,
    failures,
  })
}
