//! The backup/clone pipeline: capture a live IoT Operations resource tree
//! and compile it into a portable ARM deployment template.

use std::path::{Path, PathBuf};

pub mod container;
pub mod manager;
pub mod template;

pub use container::{Container, ContainerConfig, DependencyRef, DeploymentContainer, ResourceContainer};
pub use manager::BackupManager;
pub use template::TemplateGen;

use crate::utils::{timestamp_now_utc, to_safe_filename};

/// Category keys under which captured resources are registered in the
/// template's resources map. The string forms double as `dependsOn` targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    CustomLocation,
    Instance,
    Broker,
    Listener,
    Authn,
    Authz,
    DataflowProfile,
    DataflowEndpoint,
    Dataflow,
    Asset,
    AssetEndpointProfile,
    SecretProviderClass,
    SecretSync,
    RoleAssignment,
}

impl ResourceKey {
    /// The symbolic string form used in the template.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CustomLocation => "customLocation",
            Self::Instance => "instance",
            Self::Broker => "broker",
            Self::Listener => "listener",
            Self::Authn => "authn",
            Self::Authz => "authz",
            Self::DataflowProfile => "dataflowProfile",
            Self::DataflowEndpoint => "dataflowEndpoint",
            Self::Dataflow => "dataflow",
            Self::Asset => "asset",
            Self::AssetEndpointProfile => "assetEndpointProfile",
            Self::SecretProviderClass => "secretProviderClass",
            Self::SecretSync => "secretSync",
            Self::RoleAssignment => "roleAssignment",
        }
    }
}

/// Default output file name: `clone_{instance}_{utc timestamp}_aio.json`.
pub fn default_bundle_name(instance_name: &str) -> String {
    format!(
        "clone_{}_{}_aio.json",
        to_safe_filename(instance_name),
        timestamp_now_utc()
    )
}

/// Resolve the output path for the template bundle.
///
/// An explicit file path wins outright; otherwise the default bundle name is
/// placed under `output_dir` (or the current directory).
pub fn bundle_path(
    instance_name: &str,
    output_dir: Option<&Path>,
    output_file: Option<&Path>,
) -> PathBuf {
    if let Some(file) = output_file {
        return file.to_path_buf();
    }
    let dir = output_dir.map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    dir.join(default_bundle_name(instance_name))
}
