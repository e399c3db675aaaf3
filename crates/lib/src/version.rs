//! Version types used in manifests.
//!
//! - [`AcdVersion`] - the `major.minor` release series a build file targets
//! - [`BaseVersion`] - the base platform version as published by the package index
//! - [`VersionRange`] - the `>=X.0.0,<Y.0.0` range written for each dependency

use std::fmt;
use std::str::FromStr;

use semver::Version;
use thiserror::Error;

/// Errors produced when parsing version text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
  #[error("expected 'major.minor', found '{0}'")]
  InvalidSeries(String),

  #[error("version must not be empty")]
  Empty,

  #[error("expected '>=LOWER,<UPPER', found '{0}'")]
  InvalidRange(String),

  #[error("invalid version '{value}': {message}")]
  InvalidVersion { value: String, message: String },
}

/// The release series (`major.minor`) of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AcdVersion {
  pub major: u64,
  pub minor: u64,
}

impl AcdVersion {
  pub fn new(major: u64, minor: u64) -> Self {
    Self { major, minor }
  }

  /// Whether a concrete release belongs to this series.
  pub fn contains(&self, release: &Version) -> bool {
    release.major == self.major && release.minor == self.minor
  }
}

impl From<&Version> for AcdVersion {
  fn from(release: &Version) -> Self {
    Self::new(release.major, release.minor)
  }
}

impl fmt::Display for AcdVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}", self.major, self.minor)
  }
}

impl FromStr for AcdVersion {
  type Err = VersionError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || VersionError::InvalidSeries(s.to_string());
    let (major, minor) = s.trim().split_once('.').ok_or_else(invalid)?;
    Ok(Self::new(
      series_part(major).ok_or_else(invalid)?,
      series_part(minor).ok_or_else(invalid)?,
    ))
  }
}

/// A series component: ASCII digits only, no sign.
fn series_part(part: &str) -> Option<u64> {
  if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  part.parse().ok()
}

/// Version of the base platform.
///
/// Kept as published: package index versions (`2.10.0b1`, `2.10.0rc1`) are not
/// guaranteed to be valid semantic versions, and nothing here orders them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BaseVersion(String);

impl BaseVersion {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for BaseVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl FromStr for BaseVersion {
  type Err = VersionError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
      return Err(VersionError::Empty);
    }
    Ok(Self(trimmed.to_string()))
  }
}

/// A half-open version range, `lower <= v < upper`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
  pub lower: Version,
  pub upper: Version,
}

impl VersionRange {
  /// The range of every release sharing `version`'s major component.
  pub fn for_major(version: &Version) -> Self {
    Self {
      lower: Version::new(version.major, 0, 0),
      upper: Version::new(version.major + 1, 0, 0),
    }
  }

  pub fn matches(&self, candidate: &Version) -> bool {
    *candidate >= self.lower && *candidate < self.upper
  }
}

impl fmt::Display for VersionRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, ">={},<{}", self.lower, self.upper)
  }
}

impl FromStr for VersionRange {
  type Err = VersionError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || VersionError::InvalidRange(s.to_string());
    let (lower, upper) = s.trim().split_once(',').ok_or_else(invalid)?;
    let lower = lower.trim().strip_prefix(">=").ok_or_else(invalid)?;
    let upper = upper.trim().strip_prefix('<').ok_or_else(invalid)?;

    Ok(Self {
      lower: parse_version(lower)?,
      upper: parse_version(upper)?,
    })
  }
}

/// Parse a concrete semantic version, keeping the offending text in the error.
pub fn parse_version(value: &str) -> Result<Version, VersionError> {
  let value = value.trim();
  Version::parse(value).map_err(|e| VersionError::InvalidVersion {
    value: value.to_string(),
    message: e.to_string(),
  })
}
