//! The build file: acceptable version range per collection for one release series.
//!
//! ```text
//! _acd_version:2.10
//! _ansible_base_version:2.10.0
//! ansible.posix:>=1.0.0,<2.0.0
//! community.general:>=1.0.0,<2.0.0
//! ```

use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;

use semver::Version;
use tracing::info;

use super::types::{FileFormatError, ManifestError, load_with, parse_document, write_atomic};
use crate::collection::CollectionName;
use crate::consts::{ACD_VERSION_KEY, BASE_VERSION_KEY};
use crate::version::{AcdVersion, BaseVersion, VersionRange};

/// The hand-off document between resolution and install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildManifest {
  pub acd_version: AcdVersion,
  pub base_version: BaseVersion,
  pub dependencies: BTreeMap<CollectionName, VersionRange>,
}

impl BuildManifest {
  /// Widen each selected version to the range of its major release.
  pub fn from_selection(
    acd_version: AcdVersion,
    base_version: BaseVersion,
    selected: &BTreeMap<CollectionName, Version>,
  ) -> Self {
    let dependencies = selected
      .iter()
      .map(|(name, version)| (name.clone(), VersionRange::for_major(version)))
      .collect();

    Self {
      acd_version,
      base_version,
      dependencies,
    }
  }

  /// Serialize: reserved fields first, then dependencies sorted by name.
  pub fn render(&self) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "{ACD_VERSION_KEY}:{}", self.acd_version);
    let _ = writeln!(out, "{BASE_VERSION_KEY}:{}", self.base_version);
    for (name, range) in &self.dependencies {
      let _ = writeln!(out, "{name}:{range}");
    }
    out
  }

  pub fn parse(content: &str) -> Result<Self, FileFormatError> {
    let doc = parse_document(content, |v| v.parse::<AcdVersion>(), |v| v.parse::<VersionRange>())?;
    Ok(Self {
      acd_version: doc.acd_version,
      base_version: doc.base_version,
      dependencies: doc.dependencies,
    })
  }

  pub fn load(path: &Path) -> Result<Self, ManifestError> {
    load_with(path, Self::parse)
  }

  pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
    info!(path = %path.display(), dependencies = self.dependencies.len(), "writing build file");
    write_atomic(path, &self.render())
  }
}
