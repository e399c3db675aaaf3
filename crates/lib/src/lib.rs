//! acd-lib: collection resolution and release assembly
//!
//! This crate provides the two halves of building a release:
//! - `resolve`: query registries and pin one version range per collection in a build file
//! - `install`: download the versions a build file allows and record them in a deps file
//!
//! Both are driven through [`registry::Registries`], built from a [`config::RegistryConfig`].

pub mod collection;
pub mod config;
pub mod consts;
pub mod install;
pub mod manifest;
pub mod registry;
pub mod resolve;
pub mod select;
pub mod version;
