use std::path::{Path, PathBuf};
use std::sync::Mutex;

use mockito::{Matcher, Server, ServerGuard};

use acd_lib::config::RegistryConfig;
use acd_lib::install::{ArtifactInstaller, InstallStepError};
use acd_lib::registry::Registries;

/// A mock server acting as both the collection registry and the package index.
pub struct FakeRegistry {
  pub server: ServerGuard,
}

impl FakeRegistry {
  pub async fn start(base_version: &str) -> Self {
    let mut server = Server::new_async().await;
    server
      .mock("GET", "/pypi/ansible-base/json")
      .with_body(serde_json::json!({ "info": { "version": base_version } }).to_string())
      .create_async()
      .await;
    Self { server }
  }

  pub fn registries(&self) -> Registries {
    let config = RegistryConfig {
      galaxy_url: self.server.url(),
      pypi_url: self.server.url(),
      ..RegistryConfig::default()
    };
    Registries::from_config(&config).unwrap()
  }

  /// Publish `versions` of `collection` on one page, with downloadable artifacts.
  pub async fn publish(&mut self, collection: &str, versions: &[&str]) {
    let (namespace, name) = collection.split_once('.').unwrap();
    let base = format!("/api/v2/collections/{namespace}/{name}/versions");
    let results: Vec<_> = versions.iter().map(|v| serde_json::json!({ "version": v })).collect();
    self
      .server
      .mock("GET", base.as_str())
      .match_query(Matcher::Any)
      .with_body(serde_json::json!({ "results": results, "next": null }).to_string())
      .create_async()
      .await;

    for version in versions {
      let filename = format!("{namespace}-{name}-{version}.tar.gz");
      self
        .server
        .mock("GET", format!("{base}/{version}/").as_str())
        .match_query(Matcher::Any)
        .with_body(serde_json::json!({ "download_url": format!("/download/{filename}") }).to_string())
        .create_async()
        .await;
      self
        .server
        .mock("GET", format!("/download/{filename}").as_str())
        .with_body(filename.clone().into_bytes())
        .create_async()
        .await;
    }
  }

  pub async fn missing(&mut self, collection: &str) {
    let path = format!("/api/v2/collections/{}/versions", collection.replace('.', "/"));
    self
      .server
      .mock("GET", path.as_str())
      .match_query(Matcher::Any)
      .with_status(404)
      .create_async()
      .await;
  }
}

/// Installer that copies each artifact's file name into the destination.
#[derive(Default)]
pub struct MarkerInstaller {
  pub installed: Mutex<Vec<String>>,
}

impl ArtifactInstaller for MarkerInstaller {
  async fn install(&self, artifact: &Path, destination: &Path) -> Result<(), InstallStepError> {
    let name = artifact.file_name().unwrap().to_string_lossy().into_owned();
    let marker: PathBuf = destination.join(&name);
    tokio::fs::copy(artifact, &marker).await.unwrap();
    self.installed.lock().unwrap().push(name);
    Ok(())
  }
}

pub fn names(list: &[&str]) -> Vec<acd_lib::collection::CollectionName> {
  list.iter().map(|n| n.parse().unwrap()).collect()
}

pub fn name(s: &str) -> acd_lib::collection::CollectionName {
  s.parse().unwrap()
}
