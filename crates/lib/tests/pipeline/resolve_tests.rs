use acd_lib::collection::FailureKind;
use acd_lib::manifest::{BuildManifest, default_build_filename};
use acd_lib::resolve::resolve;
use acd_lib::select::AlwaysCompatible;
use acd_lib::version::{AcdVersion, BaseVersion};
use semver::Version;
use tempfile::TempDir;

use super::common::{FakeRegistry, name, names};

#[tokio::test]
async fn one_missing_collection_does_not_hide_the_others() {
  let mut registry = FakeRegistry::start("2.10.0").await;
  registry.publish("a.b", &["1.0.0", "1.2.0"]).await;
  registry.missing("x.y").await;
  registry.publish("c.d", &["0.3.0", "2.0.0"]).await;

  let result = resolve(
    &registry.registries(),
    AcdVersion::new(2, 10),
    &names(&["a.b", "x.y", "c.d"]),
    &AlwaysCompatible,
  )
  .await
  .unwrap();

  assert!(!result.is_complete());
  assert_eq!(result.selected.len(), 2);
  assert_eq!(result.selected[&name("a.b")], Version::new(1, 2, 0));
  assert_eq!(result.selected[&name("c.d")], Version::new(2, 0, 0));

  assert_eq!(result.failures.len(), 1);
  let (collection, failure) = result.failures.iter().next().unwrap();
  assert_eq!(collection.as_str(), "x.y");
  assert_eq!(failure.kind(), FailureKind::NotFound);
}

#[tokio::test]
async fn policy_can_reject_newest_versions() {
  let mut registry = FakeRegistry::start("2.10.0").await;
  registry.publish("a.b", &["1.0.0", "2.0.0", "3.0.0"]).await;
  registry.publish("c.d", &["5.0.0"]).await;

  let below_three = |_: &BaseVersion, _: &acd_lib::collection::CollectionName, v: &Version| v.major < 3;
  let result = resolve(
    &registry.registries(),
    AcdVersion::new(2, 10),
    &names(&["a.b", "c.d"]),
    &below_three,
  )
  .await
  .unwrap();

  assert_eq!(result.selected[&name("a.b")], Version::new(2, 0, 0));
  let failure = &result.failures[&name("c.d")];
  assert_eq!(failure.kind(), FailureKind::Incompatible);
}

#[tokio::test]
async fn resolved_manifest_survives_a_round_trip_through_disk() {
  let mut registry = FakeRegistry::start("2.10.0b1").await;
  registry.publish("community.general", &["1.4.2", "0.9.0"]).await;
  registry.publish("ansible.posix", &["1.1.0"]).await;

  let series = AcdVersion::new(2, 10);
  let result = resolve(
    &registry.registries(),
    series,
    &names(&["community.general", "ansible.posix"]),
    &AlwaysCompatible,
  )
  .await
  .unwrap();
  assert!(result.is_complete());

  let temp = TempDir::new().unwrap();
  let path = temp.path().join(default_build_filename(None, series));
  result.manifest.save(&path).unwrap();

  let loaded = BuildManifest::load(&path).unwrap();
  assert_eq!(loaded, result.manifest);
  assert_eq!(loaded.base_version.as_str(), "2.10.0b1");
  assert_eq!(
    std::fs::read_to_string(&path).unwrap(),
    "_acd_version:2.10\n\
     _ansible_base_version:2.10.0b1\n\
     ansible.posix:>=1.0.0,<2.0.0\n\
     community.general:>=1.0.0,<2.0.0\n"
  );
}
