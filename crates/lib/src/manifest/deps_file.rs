//! The deps file: the exact collection versions installed into one release.
//!
//! Same records as the build file, written with a space after the colon and
//! concrete versions instead of ranges:
//!
//! ```text
//! _acd_version: 2.10.1
//! _ansible_base_version: 2.10.0
//! ansible.posix: 1.1.0
//! ```

use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;

use semver::Version;
use tracing::info;

use super::types::{FileFormatError, ManifestError, load_with, parse_document, write_atomic};
use crate::collection::CollectionName;
use crate::consts::{ACD_VERSION_KEY, BASE_VERSION_KEY};
use crate::version::{BaseVersion, parse_version};

/// Record of what one release actually contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepsManifest {
  /// The concrete release version.
  pub acd_version: Version,
  pub base_version: BaseVersion,
  pub dependencies: BTreeMap<CollectionName, Version>,
}

impl DepsManifest {
  pub fn render(&self) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{ACD_VERSION_KEY}: {}", self.acd_version);
    let _ = writeln!(out, "{BASE_VERSION_KEY}: {}", self.base_version);
    for (name, version) in &self.dependencies {
      let _ = writeln!(out, "{name}: {version}");
    }
    out
  }

  pub fn parse(content: &str) -> Result<Self, FileFormatError> {
    let doc = parse_document(content, parse_version, parse_version)?;
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
    info!(path = %path.display(), dependencies = self.dependencies.len(), "writing deps file");
    write_atomic(path, &self.render())
  }
}
