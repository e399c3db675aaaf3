mod build_single;
mod new_acd;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;
use serde_json::json;

use acd_lib::collection::{CollectionError, CollectionName, FailureKind};

use crate::output::{print_error, print_json};

pub use build_single::cmd_build_single;
pub use new_acd::cmd_new_acd;

/// A problem with the arguments rather than with the work they describe.
#[derive(Debug)]
pub struct UsageError(pub String);

impl fmt::Display for UsageError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl std::error::Error for UsageError {}

pub(crate) fn require_dir(path: &Path) -> Result<(), UsageError> {
  if path.is_dir() {
    Ok(())
  } else {
    Err(UsageError(format!("{} must be an existing directory", path.display())))
  }
}

pub(crate) fn require_file(path: &Path, what: &str) -> Result<(), UsageError> {
  if path.is_file() {
    Ok(())
  } else {
    Err(UsageError(format!("The {what}, {} must already exist", path.display())))
  }
}

#[derive(Debug, Serialize)]
pub(crate) struct FailureReport {
  pub collection: CollectionName,
  pub kind: FailureKind,
  pub error: String,
}

pub(crate) fn failure_reports(failures: &BTreeMap<CollectionName, CollectionError>) -> Vec<FailureReport> {
  failures
    .iter()
    .map(|(collection, e)| FailureReport {
      collection: collection.clone(),
      kind: e.kind(),
      error: e.to_string(),
    })
    .collect()
}

/// One line per failed collection, naming the kind of failure.
pub(crate) fn print_failures(failures: &[FailureReport]) {
  for failure in failures {
    print_error(&format!("{} [{}]: {}", failure.collection, failure.kind, failure.error));
  }
}

/// JSON report for a run that stopped before writing its output file.
pub(crate) fn print_json_error(error: &str, failures: &[FailureReport]) -> anyhow::Result<()> {
  print_json(&json_error(error, failures))
}

fn json_error(error: &str, failures: &[FailureReport]) -> serde_json::Value {
  json!({ "error": error, "failures": failures })
}
