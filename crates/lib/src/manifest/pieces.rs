//! The pieces file: the collections a release is made of.
//!
//! One `namespace.name` per line. Surrounding whitespace is ignored, as are
//! blank lines and lines starting with `#`.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::collection::{CollectionName, CollectionNameError};

#[derive(Debug, Error)]
pub enum PiecesError {
  #[error("failed to read pieces file {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("line {line}: {source}")]
  InvalidName {
    line: usize,
    #[source]
    source: CollectionNameError,
  },
}

pub fn parse_pieces(content: &str) -> Result<Vec<CollectionName>, PiecesError> {
  content
    .lines()
    .enumerate()
    .map(|(idx, raw)| (idx + 1, raw.trim()))
    .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
    .map(|(line, text)| text.parse().map_err(|source| PiecesError::InvalidName { line, source }))
    .collect()
}

pub fn load_pieces(path: &Path) -> Result<Vec<CollectionName>, PiecesError> {
  let content = std::fs::read_to_string(path).map_err(|source| PiecesError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  parse_pieces(&content)
}
