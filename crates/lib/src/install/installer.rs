//! The external install step.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum InstallStepError {
  #[error("failed to run {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("installing {} exited with {}{}", artifact.display(), exit_code(*code), stderr_suffix(stderr))]
  Failed {
    artifact: PathBuf,
    code: Option<i32>,
    stderr: String,
  },
}

fn exit_code(code: Option<i32>) -> String {
  code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}"))
}

fn stderr_suffix(stderr: &str) -> String {
  if stderr.is_empty() {
    String::new()
  } else {
    format!(": {stderr}")
  }
}

/// Installs one downloaded artifact into a destination tree.
///
/// Implementations are never invoked concurrently against the same destination.
pub trait ArtifactInstaller: Send + Sync {
  fn install(&self, artifact: &Path, destination: &Path) -> impl Future<Output = Result<(), InstallStepError>> + Send;
}

/// Runs `ansible-galaxy collection install -p <destination> <artifact>`.
#[derive(Debug, Clone)]
pub struct GalaxyCliInstaller {
  program: String,
}

impl GalaxyCliInstaller {
  pub fn new(program: impl Into<String>) -> Self {
    Self { program: program.into() }
  }
}

impl Default for GalaxyCliInstaller {
  fn default() -> Self {
    Self::new("ansible-galaxy")
  }
}

impl ArtifactInstaller for GalaxyCliInstaller {
  async fn install(&self, artifact: &Path, destination: &Path) -> Result<(), InstallStepError> {
    info!(artifact = ?artifact, destination = ?destination, "installing artifact");

    let output = Command::new(&self.program)
      .args(["collection", "install", "-p"])
      .arg(destination)
      .arg(artifact)
      .output()
      .await
      .map_err(|source| InstallStepError::Spawn {
        program: self.program.clone(),
        source,
      })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.is_empty() {
      debug!(stdout = %stdout.trim(), "installer output");
    }

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
      if !stderr.is_empty() {
        warn!(artifact = ?artifact, stderr = %stderr, "installer stderr");
      }
      return Err(InstallStepError::Failed {
        artifact: artifact.to_path_buf(),
        code: output.status.code(),
        stderr,
      });
    }

    Ok(())
  }
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[tokio::test]
  async fn successful_exit_is_ok() {
    let temp = TempDir::new().unwrap();
    GalaxyCliInstaller::new("true")
      .install(&temp.path().join("a-b-1.0.0.tar.gz"), temp.path())
      .await
      .unwrap();
  }

  #[tokio::test]
  async fn failing_exit_is_failed() {
    let temp = TempDir::new().unwrap();
    let err = GalaxyCliInstaller::new("false")
      .install(&temp.path().join("a-b-1.0.0.tar.gz"), temp.path())
      .await
      .unwrap_err();

    assert!(matches!(err, InstallStepError::Failed { code: Some(1), .. }), "{err}");
  }

  fn fake_installer(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("fake-galaxy");
    std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script
  }

  #[tokio::test]
  async fn failure_carries_installer_stderr() {
    let temp = TempDir::new().unwrap();
    let script = fake_installer(temp.path(), "echo 'ERROR! tarball is corrupt' >&2; exit 1");

    let err = GalaxyCliInstaller::new(script.to_string_lossy())
      .install(&temp.path().join("a-b-1.0.0.tar.gz"), temp.path())
      .await
      .unwrap_err();

    assert!(
      matches!(&err, InstallStepError::Failed { stderr, .. } if stderr == "ERROR! tarball is corrupt"),
      "{err}"
    );
    assert!(err.to_string().ends_with("exited with code 1: ERROR! tarball is corrupt"), "{err}");
  }

  #[tokio::test]
  async fn silent_failure_has_no_stderr_suffix() {
    let temp = TempDir::new().unwrap();
    let err = GalaxyCliInstaller::new("false")
      .install(&temp.path().join("a-b-1.0.0.tar.gz"), temp.path())
      .await
      .unwrap_err();

    assert!(err.to_string().ends_with("exited with code 1"), "{err}");
  }

  #[tokio::test]
  async fn missing_program_is_spawn_error() {
    let temp = TempDir::new().unwrap();
    let err = GalaxyCliInstaller::new("/nonexistent/ansible-galaxy")
      .install(temp.path(), temp.path())
      .await
      .unwrap_err();

    assert!(matches!(err, InstallStepError::Spawn { .. }), "{err}");
  }

  #[tokio::test]
  async fn passes_collection_install_arguments() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("args.log");
    let script = fake_installer(temp.path(), &format!("echo \"$@\" > {}", log.display()));

    let artifact = temp.path().join("a-b-1.0.0.tar.gz");
    let dest = temp.path().join("ansible-2.10.1");
    GalaxyCliInstaller::new(script.to_string_lossy())
      .install(&artifact, &dest)
      .await
      .unwrap();

    let args = std::fs::read_to_string(&log).unwrap();
    assert_eq!(
      args.trim(),
      format!("collection install -p {} {}", dest.display(), artifact.display())
    );
  }
}
