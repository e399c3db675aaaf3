//! Errors and the shared line reader for manifest files.
//!
//! Both manifest files are line oriented: one `key:value` record per line, split
//! on the first colon, key and value trimmed. Blank lines are skipped. The two
//! reserved keys must each appear exactly once; every other key names a
//! collection and may appear only once.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::collection::{CollectionName, CollectionNameError};
use crate::consts::{ACD_VERSION_KEY, BASE_VERSION_KEY};
use crate::version::{BaseVersion, VersionError};

/// Structural violations in a build or deps file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileFormatError {
  /// A reserved field appeared a second time.
  #[error("line {line}: {field} specified more than once")]
  DuplicateField { field: &'static str, line: usize },

  /// A reserved field never appeared.
  #[error("missing required field {field}")]
  MissingField { field: &'static str },

  /// A non-blank line without a `key:value` shape.
  #[error("line {line}: expected 'key:value', found '{content}'")]
  MalformedLine { line: usize, content: String },

  /// A collection appeared a second time.
  #[error("line {line}: collection '{collection}' listed more than once")]
  DuplicateDependency { collection: String, line: usize },

  /// A dependency key that is not a collection name.
  #[error("line {line}: {source}")]
  InvalidCollection {
    line: usize,
    #[source]
    source: CollectionNameError,
  },

  /// A value that does not parse as the expected kind of version.
  #[error("line {line}: invalid value '{value}': {source}")]
  InvalidVersion {
    line: usize,
    value: String,
    #[source]
    source: VersionError,
  },
}

/// Errors reading or writing a manifest file.
#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write {}: {source}", path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("invalid file format in {}: {source}", path.display())]
  Format {
    path: PathBuf,
    #[source]
    source: FileFormatError,
  },
}

impl ManifestError {
  /// The format violation, if this is one.
  pub fn format_error(&self) -> Option<&FileFormatError> {
    match self {
      ManifestError::Format { source, .. } => Some(source),
      _ => None,
    }
  }
}

/// One `key:value` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Record<'a> {
  /// 1-based line number.
  pub line: usize,
  pub key: &'a str,
  pub value: &'a str,
}

impl Record<'_> {
  fn invalid_version(&self, source: VersionError) -> FileFormatError {
    FileFormatError::InvalidVersion {
      line: self.line,
      value: self.value.to_string(),
      source,
    }
  }
}

/// Split content into records, skipping blank lines.
pub(crate) fn records(content: &str) -> impl Iterator<Item = Result<Record<'_>, FileFormatError>> {
  content.lines().enumerate().filter_map(|(idx, raw)| {
    let line = idx + 1;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
      return None;
    }

    Some(match trimmed.split_once(':') {
      Some((key, value)) if !key.trim().is_empty() => Ok(Record {
        line,
        key: key.trim(),
        value: value.trim(),
      }),
      _ => Err(FileFormatError::MalformedLine {
        line,
        content: trimmed.to_string(),
      }),
    })
  })
}

/// Reserved fields plus dependency entries of a parsed file.
#[derive(Debug)]
pub(crate) struct Document<A, V> {
  pub acd_version: A,
  pub base_version: BaseVersion,
  pub dependencies: BTreeMap<CollectionName, V>,
}

/// Parse either manifest variant; the two differ only in how values parse.
pub(crate) fn parse_document<A, V>(
  content: &str,
  parse_acd: impl Fn(&str) -> Result<A, VersionError>,
  parse_dep: impl Fn(&str) -> Result<V, VersionError>,
) -> Result<Document<A, V>, FileFormatError> {
  let mut acd_version = None;
  let mut base_version: Option<BaseVersion> = None;
  let mut dependencies = BTreeMap::new();

  for record in records(content) {
    let record = record?;

    match record.key {
      ACD_VERSION_KEY => {
        if acd_version.is_some() {
          return Err(FileFormatError::DuplicateField {
            field: ACD_VERSION_KEY,
            line: record.line,
          });
        }
        acd_version = Some(parse_acd(record.value).map_err(|e| record.invalid_version(e))?);
      }
      BASE_VERSION_KEY => {
        if base_version.is_some() {
          return Err(FileFormatError::DuplicateField {
            field: BASE_VERSION_KEY,
            line: record.line,
          });
        }
        base_version = Some(record.value.parse().map_err(|e| record.invalid_version(e))?);
      }
      key => {
        let collection: CollectionName = key.parse().map_err(|source| FileFormatError::InvalidCollection {
          line: record.line,
          source,
        })?;
        if dependencies.contains_key(&collection) {
          return Err(FileFormatError::DuplicateDependency {
            collection: collection.to_string(),
            line: record.line,
          });
        }
        let version = parse_dep(record.value).map_err(|e| record.invalid_version(e))?;
        dependencies.insert(collection, version);
      }
    }
  }

  Ok(Document {
    acd_version: acd_version.ok_or(FileFormatError::MissingField { field: ACD_VERSION_KEY })?,
    base_version: base_version.ok_or(FileFormatError::MissingField { field: BASE_VERSION_KEY })?,
    dependencies,
  })
}

/// Read a manifest file and parse it with `parse`.
pub(crate) fn load_with<T>(path: &Path, parse: impl Fn(&str) -> Result<T, FileFormatError>) -> Result<T, ManifestError> {
  let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  parse(&content).map_err(|source| ManifestError::Format {
    path: path.to_path_buf(),
    source,
  })
}

/// Replace `path` with `content` in one step.
///
/// The document is written to a temporary file beside `path` and renamed over
/// it, so readers see either the old file or the complete new one.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<(), ManifestError> {
  let write_err = |source| ManifestError::Write {
    path: path.to_path_buf(),
    source,
  };

  let dir = match path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent,
    _ => Path::new("."),
  };

  let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
  tmp.write_all(content.as_bytes()).map_err(write_err)?;
  tmp.flush().map_err(write_err)?;

  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    tmp
      .as_file()
      .set_permissions(std::fs::Permissions::from_mode(0o644))
      .map_err(write_err)?;
  }

  tmp.persist(path).map_err(|e| write_err(e.error))?;
  Ok(())
}
