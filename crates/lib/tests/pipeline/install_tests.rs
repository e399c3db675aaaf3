use acd_lib::collection::FailureKind;
use acd_lib::install::{InstallError, InstallOptions, install};
use acd_lib::manifest::{BuildManifest, DepsManifest, default_build_filename, default_deps_filename};
use acd_lib::resolve::resolve;
use acd_lib::select::AlwaysCompatible;
use acd_lib::version::AcdVersion;
use semver::Version;
use tempfile::TempDir;

use super::common::{FakeRegistry, MarkerInstaller, name, names};

#[tokio::test]
async fn build_file_to_deps_file() {
  let mut registry = FakeRegistry::start("2.10.0").await;
  registry.publish("community.general", &["1.0.0", "1.4.2"]).await;
  registry.publish("ansible.posix", &["1.1.0"]).await;
  let registries = registry.registries();

  let temp = TempDir::new().unwrap();
  let series = AcdVersion::new(2, 10);
  let build_path = temp.path().join(default_build_filename(None, series));

  let resolved = resolve(
    &registries,
    series,
    &names(&["community.general", "ansible.posix"]),
    &AlwaysCompatible,
  )
  .await
  .unwrap();
  resolved.manifest.save(&build_path).unwrap();

  let release = Version::new(2, 10, 1);
  let options = InstallOptions {
    release_version: release.clone(),
    destination: temp.path().to_path_buf(),
  };
  let installer = MarkerInstaller::default();
  let manifest = BuildManifest::load(&build_path).unwrap();
  let result = install(&registries, &manifest, &options, &installer).await.unwrap();

  let deps_path = temp.path().join(default_deps_filename(&build_path, &release));
  result.deps.save(&deps_path).unwrap();

  assert_eq!(deps_path.file_name().unwrap(), "acd-2.10-2.10.1.deps");
  assert_eq!(
    std::fs::read_to_string(&deps_path).unwrap(),
    "_acd_version: 2.10.1\n\
     _ansible_base_version: 2.10.0\n\
     ansible.posix: 1.1.0\n\
     community.general: 1.4.2\n"
  );
  assert_eq!(DepsManifest::load(&deps_path).unwrap(), result.deps);

  let installed = installer.installed.lock().unwrap().clone();
  assert_eq!(
    installed,
    ["ansible-posix-1.1.0.tar.gz", "community-general-1.4.2.tar.gz"]
  );
  assert!(
    result
      .release_dir
      .join("community-general-1.4.2.tar.gz")
      .is_file()
  );
}

#[tokio::test]
async fn missing_collection_stops_before_install() {
  let mut registry = FakeRegistry::start("2.10.0").await;
  registry.publish("a.b", &["1.0.0"]).await;
  registry.missing("x.y").await;

  let manifest =
    BuildManifest::parse("_acd_version:2.10\n_ansible_base_version:2.10.0\na.b:>=1.0.0,<2.0.0\nx.y:>=1.0.0,<2.0.0\n")
      .unwrap();
  let temp = TempDir::new().unwrap();
  let options = InstallOptions {
    release_version: Version::new(2, 10, 0),
    destination: temp.path().to_path_buf(),
  };
  let installer = MarkerInstaller::default();

  let err = install(&registry.registries(), &manifest, &options, &installer)
    .await
    .unwrap_err();

  match err {
    InstallError::Downloads { failures } => {
      assert_eq!(failures.len(), 1);
      assert_eq!(failures[&name("x.y")].kind(), FailureKind::NotFound);
    }
    other => panic!("expected download failures, got {other}"),
  }
  assert!(installer.installed.lock().unwrap().is_empty());
}
