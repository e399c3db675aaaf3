//! On-disk manifests.
//!
//! - [`BuildManifest`] - version ranges a release series accepts (`*.build`)
//! - [`DepsManifest`] - versions a release actually installed (`*.deps`)
//! - [`pieces`] - the list of collections a release is made of (`*.in`)
//!
//! Manifests are built completely in memory and written with a single
//! rename, so a concurrent reader never sees a partial file.

mod build_file;
mod deps_file;
pub mod pieces;
mod types;

use std::path::Path;

use semver::Version;

pub use build_file::BuildManifest;
pub use deps_file::DepsManifest;
pub use types::{FileFormatError, ManifestError};

use crate::consts::DEFAULT_FILE_BASE;
use crate::version::AcdVersion;

/// `<stem>-<major>.<minor>.build`, the stem taken from the pieces file if given.
pub fn default_build_filename(pieces_file: Option<&Path>, series: AcdVersion) -> String {
  let stem = pieces_file
    .and_then(|p| p.file_stem())
    .and_then(|s| s.to_str())
    .unwrap_or(DEFAULT_FILE_BASE);
  format!("{stem}-{series}.build")
}

/// `<build-stem>-<release>.deps`.
pub fn default_deps_filename(build_file: &Path, release: &Version) -> String {
  let stem = build_file
    .file_stem()
    .and_then(|s| s.to_str())
    .unwrap_or(DEFAULT_FILE_BASE);
  format!("{stem}-{release}.deps")
}
