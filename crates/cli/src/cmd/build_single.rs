//! Implementation of the `build-acd build-single` command.
//!
//! Installs the newest allowed version of every collection in a build file
//! into `<dest-dir>/ansible-<version>` and records the result in a deps file.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use semver::Version;
use serde_json::json;

use acd_lib::config::RegistryConfig;
use acd_lib::install::{GalaxyCliInstaller, InstallError, InstallOptions, install};
use acd_lib::manifest::{BuildManifest, default_build_filename, default_deps_filename};
use acd_lib::registry::Registries;
use acd_lib::version::AcdVersion;

use super::{UsageError, failure_reports, print_failures, require_dir, require_file};
use crate::output::{
  OutputFormat, format_duration, print_info, print_json, print_pinned, print_stat, print_success, print_warning,
};

pub async fn cmd_build_single(
  config: &RegistryConfig,
  acd_version: &Version,
  build_file: Option<&Path>,
  deps_file: Option<&Path>,
  dest_dir: &Path,
  format: OutputFormat,
) -> Result<ExitCode> {
  let start = Instant::now();

  require_dir(dest_dir)?;
  let build_path = match build_file {
    Some(path) => path.to_path_buf(),
    None => PathBuf::from(default_build_filename(None, AcdVersion::from(acd_version))),
  };
  require_file(&build_path, "build file")?;

  let deps_path = match deps_file {
    Some(name) => dest_dir.join(name),
    None => dest_dir.join(default_deps_filename(&build_path, acd_version)),
  };

  let manifest = BuildManifest::load(&build_path).context("Failed to read build file")?;

  if !manifest.acd_version.contains(acd_version) {
    print_warning(&format!(
      "{} is for version {} but we need {}",
      build_path.display(),
      manifest.acd_version,
      AcdVersion::from(acd_version)
    ));
  }

  let registries = Registries::from_config(config).map_err(|e| UsageError(e.to_string()))?;
  let options = InstallOptions {
    release_version: acd_version.clone(),
    destination: dest_dir.to_path_buf(),
  };

  if !format.is_json() {
    print_info(&format!(
      "Installing {} collection(s) into {}",
      manifest.dependencies.len(),
      options.release_dir().display()
    ));
  }

  let result = match install(&registries, &manifest, &options, &GalaxyCliInstaller::default()).await {
    Ok(result) => result,
    Err(InstallError::Downloads { failures }) => {
      let failures = failure_reports(&failures);
      if format.is_json() {
        print_json(&json!({ "acd_version": acd_version.to_string(), "deps_file": null, "failures": failures }))?;
      } else {
        print_failures(&failures);
        print_warning(&format!("{} collection(s) failed to download; nothing installed", failures.len()));
      }
      return Ok(ExitCode::FAILURE);
    }
    Err(e) => return Err(e).context("Install failed"),
  };

  result.deps.save(&deps_path).context("Failed to write deps file")?;

  if format.is_json() {
    let installed: serde_json::Map<_, _> = result
      .deps
      .dependencies
      .iter()
      .map(|(name, version)| (name.to_string(), json!(version.to_string())))
      .collect();
    print_json(&json!({
      "acd_version": acd_version.to_string(),
      "base_version": result.deps.base_version.as_str(),
      "release_dir": result.release_dir.display().to_string(),
      "deps_file": deps_path.display().to_string(),
      "collections": installed,
      "failures": [],
    }))?;
  } else {
    for (name, version) in &result.deps.dependencies {
      print_pinned(name.as_str(), &version.to_string());
    }
    println!();
    print_stat("Release directory", &result.release_dir.display().to_string());
    print_success(&format!("Wrote {}", deps_path.display()));
    print_stat("Duration", &format_duration(start.elapsed()));
  }

  Ok(ExitCode::SUCCESS)
}
