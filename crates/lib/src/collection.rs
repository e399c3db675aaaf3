//! Collection names and per-collection failures.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::registry::RegistryError;
use crate::select::SelectError;

/// A namespace-qualified collection name, `namespace.name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "String")]
pub struct CollectionName {
  full: String,
  dot: usize,
}

/// Errors for malformed collection names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionNameError {
  #[error("'{0}' is not of the form 'namespace.name'")]
  MissingNamespace(String),

  #[error("'{name}' contains invalid character '{ch}'")]
  InvalidCharacter { name: String, ch: char },
}

impl CollectionName {
  pub fn namespace(&self) -> &str {
    &self.full[..self.dot]
  }

  pub fn name(&self) -> &str {
    &self.full[self.dot + 1..]
  }

  pub fn as_str(&self) -> &str {
    &self.full
  }

  /// Path segment used by the registry API (`namespace/name`).
  pub fn registry_path(&self) -> String {
    format!("{}/{}", self.namespace(), self.name())
  }
}

impl FromStr for CollectionName {
  type Err = CollectionNameError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let full = s.trim();
    let dot = full
      .find('.')
      .ok_or_else(|| CollectionNameError::MissingNamespace(full.to_string()))?;

    let (namespace, name) = (&full[..dot], &full[dot + 1..]);
    if namespace.is_empty() || name.is_empty() {
      return Err(CollectionNameError::MissingNamespace(full.to_string()));
    }

    if let Some(ch) = full[..dot]
      .chars()
      .chain(name.chars())
      .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
      return Err(CollectionNameError::InvalidCharacter {
        name: full.to_string(),
        ch,
      });
    }

    Ok(Self {
      full: full.to_string(),
      dot,
    })
  }
}

impl fmt::Display for CollectionName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.full)
  }
}

impl From<CollectionName> for String {
  fn from(name: CollectionName) -> Self {
    name.full
  }
}

/// Why a single collection could not be resolved or downloaded.
///
/// Collected per collection in pipeline results; never aborts sibling work.
#[derive(Debug, Error)]
pub enum CollectionError {
  #[error(transparent)]
  Registry(#[from] RegistryError),

  #[error(transparent)]
  Selection(#[from] SelectError),

  /// The task handling this collection panicked or was cancelled.
  #[error("task did not complete: {0}")]
  TaskFailed(String),
}

/// Coarse classification of a [`CollectionError`] for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
  NotFound,
  RegistryUnavailable,
  VersionParse,
  Incompatible,
  Internal,
}

impl FailureKind {
  pub fn as_str(self) -> &'static str {
    match self {
      FailureKind::NotFound => "not-found",
      FailureKind::RegistryUnavailable => "registry-unavailable",
      FailureKind::VersionParse => "version-parse",
      FailureKind::Incompatible => "incompatible",
      FailureKind::Internal => "internal",
    }
  }
}

impl fmt::Display for FailureKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl CollectionError {
  pub fn kind(&self) -> FailureKind {
    match self {
      CollectionError::Registry(e) if e.is_not_found() => FailureKind::NotFound,
      CollectionError::Registry(_) => FailureKind::RegistryUnavailable,
      CollectionError::Selection(SelectError::InvalidVersion { .. }) => FailureKind::VersionParse,
      CollectionError::Selection(SelectError::NoCompatibleVersion { .. }) => FailureKind::Incompatible,
      CollectionError::TaskFailed(_) => FailureKind::Internal,
    }
  }
}
