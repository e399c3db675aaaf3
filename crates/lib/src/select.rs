//! Version selection.
//!
//! Turns the raw version lists returned by the registry into one concrete
//! version per collection: parse every entry, order newest first, take the first
//! candidate the [`CompatibilityPolicy`] accepts.

use std::collections::BTreeMap;

use semver::Version;
use thiserror::Error;
use tracing::{debug, warn};

use crate::collection::CollectionName;
use crate::version::BaseVersion;

/// Decides whether a collection version may ship with a base platform version.
pub trait CompatibilityPolicy: Send + Sync {
  fn is_compatible(&self, base: &BaseVersion, collection: &CollectionName, candidate: &Version) -> bool;
}

/// Accepts every version.
///
/// Collections do not yet publish which base versions they support.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysCompatible;

impl CompatibilityPolicy for AlwaysCompatible {
  fn is_compatible(&self, _base: &BaseVersion, _collection: &CollectionName, _candidate: &Version) -> bool {
    true
  }
}

impl<F> CompatibilityPolicy for F
where
  F: Fn(&BaseVersion, &CollectionName, &Version) -> bool + Send + Sync,
{
  fn is_compatible(&self, base: &BaseVersion, collection: &CollectionName, candidate: &Version) -> bool {
    self(base, collection, candidate)
  }
}

/// Why no version could be selected for a collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
  /// The registry listed a version that is not a semantic version.
  #[error("registry listed invalid version '{version}': {message}")]
  InvalidVersion { version: String, message: String },

  /// Every listed version was rejected by the compatibility policy.
  #[error("none of {candidates} version(s) is compatible with base {base}")]
  NoCompatibleVersion { base: String, candidates: usize },
}

/// Outcome of selection over a batch of collections.
#[derive(Debug, Default)]
pub struct Selection {
  /// Chosen version per collection.
  pub selected: BTreeMap<CollectionName, Version>,
  /// Collections for which nothing could be chosen.
  pub failures: BTreeMap<CollectionName, SelectError>,
}

/// Pick the newest compatible version of every collection in `raw`.
///
/// Each collection ends up in exactly one of [`Selection::selected`] or
/// [`Selection::failures`].
pub fn select_compatible(
  base: &BaseVersion,
  raw: &BTreeMap<CollectionName, Vec<String>>,
  policy: &dyn CompatibilityPolicy,
) -> Selection {
  let mut selection = Selection::default();

  for (collection, versions) in raw {
    match newest_compatible(base, collection, versions, policy) {
      Ok(version) => {
        debug!(collection = %collection, version = %version, "selected version");
        selection.selected.insert(collection.clone(), version);
      }
      Err(e) => {
        warn!(collection = %collection, error = %e, "no version selected");
        selection.failures.insert(collection.clone(), e);
      }
    }
  }

  selection
}

/// Newest version of one collection accepted by `policy`.
pub fn newest_compatible(
  base: &BaseVersion,
  collection: &CollectionName,
  raw: &[String],
  policy: &dyn CompatibilityPolicy,
) -> Result<Version, SelectError> {
  let mut versions = raw
    .iter()
    .map(|v| {
      Version::parse(v.trim()).map_err(|e| SelectError::InvalidVersion {
        version: v.clone(),
        message: e.to_string(),
      })
    })
    .collect::<Result<Vec<_>, _>>()?;

  versions.sort_unstable_by(|a, b| b.cmp(a));

  versions
    .iter()
    .find(|v| policy.is_compatible(base, collection, v))
    .cloned()
    .ok_or_else(|| SelectError::NoCompatibleVersion {
      base: base.to_string(),
      candidates: versions.len(),
    })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn base() -> BaseVersion {
    "2.10.0".parse().unwrap()
  }

  fn name(s: &str) -> CollectionName {
    s.parse().unwrap()
  }

  fn strings(versions: &[&str]) -> Vec<String> {
    versions.iter().map(|v| v.to_string()).collect()
  }

  mod newest_compatible {
    use super::*;

    #[test]
    fn highest_regardless_of_input_order() {
      let orderings = [
        ["1.0.0", "1.10.0", "1.2.0", "0.9.0"],
        ["0.9.0", "1.2.0", "1.10.0", "1.0.0"],
        ["1.10.0", "0.9.0", "1.0.0", "1.2.0"],
      ];

      for raw in orderings {
        let version = newest_compatible(&base(), &name("a.b"), &strings(&raw), &AlwaysCompatible).unwrap();
        assert_eq!(version, Version::new(1, 10, 0), "input {raw:?}");
      }
    }

    #[test]
    fn release_outranks_its_prerelease() {
      let raw = strings(&["2.0.0-rc.1", "2.0.0", "2.0.0-beta.2"]);
      let version = newest_compatible(&base(), &name("a.b"), &raw, &AlwaysCompatible).unwrap();
      assert_eq!(version, Version::new(2, 0, 0));
    }

    #[test]
    fn prerelease_wins_when_newest() {
      let raw = strings(&["1.9.0", "2.0.0-rc.1"]);
      let version = newest_compatible(&base(), &name("a.b"), &raw, &AlwaysCompatible).unwrap();
      assert_eq!(version, Version::parse("2.0.0-rc.1").unwrap());
    }

    #[test]
    fn invalid_version_is_an_error() {
      let raw = strings(&["1.0.0", "1.0"]);
      let err = newest_compatible(&base(), &name("a.b"), &raw, &AlwaysCompatible).unwrap_err();
      assert!(matches!(err, SelectError::InvalidVersion { ref version, .. } if version == "1.0"));
    }

    #[test]
    fn policy_skips_rejected_versions() {
      let below_two = |_: &BaseVersion, _: &CollectionName, v: &Version| v.major < 2;
      let raw = strings(&["2.1.0", "1.5.0", "3.0.0", "1.4.0"]);
      let version = newest_compatible(&base(), &name("a.b"), &raw, &below_two).unwrap();
      assert_eq!(version, Version::new(1, 5, 0));
    }

    #[test]
    fn nothing_compatible() {
      let never = |_: &BaseVersion, _: &CollectionName, _: &Version| false;
      let err = newest_compatible(&base(), &name("a.b"), &strings(&["1.0.0"]), &never).unwrap_err();
      assert_eq!(
        err,
        SelectError::NoCompatibleVersion {
          base: "2.10.0".to_string(),
          candidates: 1
        }
      );
    }

    #[test]
    fn empty_listing_has_nothing_compatible() {
      let err = newest_compatible(&base(), &name("a.b"), &[], &AlwaysCompatible).unwrap_err();
      assert!(matches!(err, SelectError::NoCompatibleVersion { candidates: 0, .. }));
    }
  }

  mod select_compatible {
    use super::*;

    #[test]
    fn failures_are_reported_not_dropped() {
      let mut raw = BTreeMap::new();
      raw.insert(name("good.one"), strings(&["1.0.0", "1.1.0"]));
      raw.insert(name("bad.one"), strings(&["latest"]));
      raw.insert(name("old.one"), strings(&["0.1.0"]));

      let policy = |_: &BaseVersion, c: &CollectionName, _: &Version| c.namespace() != "old";
      let selection = select_compatible(&base(), &raw, &policy);

      assert_eq!(selection.selected.len(), 1);
      assert_eq!(selection.selected[&name("good.one")], Version::new(1, 1, 0));
      assert!(matches!(
        selection.failures[&name("bad.one")],
        SelectError::InvalidVersion { .. }
      ));
      assert!(matches!(
        selection.failures[&name("old.one")],
        SelectError::NoCompatibleVersion { .. }
      ));
    }

    #[test]
    fn policy_sees_base_version() {
      let mut raw = BTreeMap::new();
      raw.insert(name("a.b"), strings(&["1.0.0"]));

      let policy = |b: &BaseVersion, _: &CollectionName, _: &Version| b.as_str() == "2.10.0";
      let selection = select_compatible(&base(), &raw, &policy);

      assert!(selection.failures.is_empty());
    }
  }
}
