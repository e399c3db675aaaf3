//! Implementation of the `build-acd new-acd` command.
//!
//! Resolves every collection in the pieces file and writes the build file for
//! the release series. Nothing is written unless every collection resolved.

use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use semver::Version;
use serde_json::json;

use acd_lib::manifest::{default_build_filename, pieces::load_pieces};
use acd_lib::registry::Registries;
use acd_lib::resolve::resolve;
use acd_lib::select::AlwaysCompatible;
use acd_lib::{config::RegistryConfig, version::AcdVersion};

use super::{UsageError, failure_reports, print_failures, print_json_error, require_dir, require_file};
use crate::output::{
  OutputFormat, format_duration, print_error, print_info, print_json, print_pinned, print_stat,
  print_success, print_warning,
};

pub async fn cmd_new_acd(
  config: &RegistryConfig,
  acd_version: &Version,
  pieces_file: &Path,
  build_file: Option<&Path>,
  dest_dir: &Path,
  format: OutputFormat,
) -> Result<ExitCode> {
  let start = Instant::now();
  let series = AcdVersion::from(acd_version);

  require_dir(dest_dir)?;
  require_file(pieces_file, "pieces file")?;

  let collections = load_pieces(pieces_file)
    .with_context(|| format!("Failed to read pieces file {}", pieces_file.display()))?;
  let build_path = match build_file {
    Some(name) => dest_dir.join(name),
    None => dest_dir.join(default_build_filename(Some(pieces_file), series)),
  };

  let registries = Registries::from_config(config).map_err(|e| UsageError(e.to_string()))?;

  if !format.is_json() {
    print_info(&format!("Resolving {} collection(s) for ACD {}", collections.len(), series));
  }

  let result = match resolve(&registries, series, &collections, &AlwaysCompatible).await {
    Ok(result) => result,
    Err(e) => {
      let failures = failure_reports(e.failures());
      let message = format!("Resolution failed: {e}");
      if format.is_json() {
        print_json_error(&message, &failures)?;
      } else {
        print_failures(&failures);
        print_error(&message);
      }
      return Ok(ExitCode::FAILURE);
    }
  };
  let failures = failure_reports(&result.failures);

  if result.is_complete() {
    result
      .manifest
      .save(&build_path)
      .context("Failed to write build file")?;
  }

  if format.is_json() {
    let pinned: serde_json::Map<_, _> = result
      .selected
      .iter()
      .map(|(name, version)| {
        let range = result.manifest.dependencies.get(name).map(ToString::to_string);
        (name.to_string(), json!({ "version": version.to_string(), "range": range }))
      })
      .collect();
    print_json(&json!({
      "acd_version": series.to_string(),
      "base_version": result.manifest.base_version.as_str(),
      "build_file": result.is_complete().then(|| build_path.display().to_string()),
      "collections": pinned,
      "failures": failures,
    }))?;
  } else {
    for (name, version) in &result.selected {
      print_pinned(name.as_str(), &version.to_string());
    }
    println!();
    print_stat("Base version", result.manifest.base_version.as_str());
    print_stat("Resolved", &result.selected.len().to_string());

    if result.is_complete() {
      print_success(&format!("Wrote {}", build_path.display()));
      print_stat("Duration", &format_duration(start.elapsed()));
    } else {
      print_failures(&failures);
      print_warning(&format!("{} collection(s) failed; no build file written", failures.len()));
    }
  }

  if result.is_complete() {
    Ok(ExitCode::SUCCESS)
  } else {
    Ok(ExitCode::FAILURE)
  }
}
