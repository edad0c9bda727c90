//! Azure-facing collaborator boundary.
//!
//! Everything the backup pipeline needs from Azure goes through the
//! [`CloudOps`] trait: listing category collections, fetching single
//! resources, running Resource Graph queries, and managing federated
//! credentials. Keeping the boundary narrow lets the whole pipeline run
//! against the in-memory [`MockCloud`] in tests while production wires in
//! [`ArmClient`].

use std::collections::HashMap;

use anyhow::Result;
use serde_json::Value;

use crate::arm::ParsedResourceId;

mod arm_client;
#[cfg(any(test, feature = "test-utils"))]
mod mock;

pub use arm_client::ArmClient;
#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockCloud;

/// The listable resource collections the pipeline enumerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceCategory {
    Broker,
    BrokerListener,
    BrokerAuthentication,
    BrokerAuthorization,
    DataflowEndpoint,
    DataflowProfile,
    Dataflow,
    SecretProviderClass,
    SecretSync,
}

impl ResourceCategory {
    /// Relative URL path of the collection under a resource group scope.
    ///
    /// Broker-scoped and profile-scoped categories require the matching
    /// parent name in [`ListScope`].
    pub fn collection_path(self, scope: &ListScope<'_>) -> Result<String> {
        let instance = || {
            scope.instance.ok_or_else(|| {
                anyhow::anyhow!("listing {self:?} requires an instance scope")
            })
        };
        let path = match self {
            Self::Broker => format!(
                "providers/Microsoft.IoTOperations/instances/{}/brokers",
                instance()?
            ),
            Self::BrokerListener | Self::BrokerAuthentication | Self::BrokerAuthorization => {
                let broker = scope.broker.ok_or_else(|| {
                    anyhow::anyhow!("listing {self:?} requires a broker scope")
                })?;
                let child = match self {
                    Self::BrokerListener => "listeners",
                    Self::BrokerAuthentication => "authentications",
                    _ => "authorizations",
                };
                format!(
                    "providers/Microsoft.IoTOperations/instances/{}/brokers/{broker}/{child}",
                    instance()?
                )
            }
            Self::DataflowEndpoint => format!(
                "providers/Microsoft.IoTOperations/instances/{}/dataflowEndpoints",
                instance()?
            ),
            Self::DataflowProfile => format!(
                "providers/Microsoft.IoTOperations/instances/{}/dataflowProfiles",
                instance()?
            ),
            Self::Dataflow => {
                let profile = scope.profile.ok_or_else(|| {
                    anyhow::anyhow!("listing dataflows requires a profile scope")
                })?;
                format!(
                    "providers/Microsoft.IoTOperations/instances/{}/dataflowProfiles/{profile}/dataflows",
                    instance()?
                )
            }
            Self::SecretProviderClass => {
                "providers/Microsoft.SecretSyncController/azureKeyVaultSecretProviderClasses"
                    .to_string()
            }
            Self::SecretSync => {
                "providers/Microsoft.SecretSyncController/secretSyncs".to_string()
            }
        };
        Ok(path)
    }

    /// API version used when listing this collection.
    pub fn api_version(self) -> &'static str {
        use crate::constants::{IOTOPS_API_VERSION, SECRETSYNC_API_VERSION};
        match self {
            Self::SecretProviderClass | Self::SecretSync => SECRETSYNC_API_VERSION,
            _ => IOTOPS_API_VERSION,
        }
    }
}

/// Scope a collection listing runs under.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListScope<'a> {
    /// Resource group name; every listing is at least group-scoped.
    pub resource_group: &'a str,
    /// Parent instance name for instance-scoped categories.
    pub instance: Option<&'a str>,
    /// Parent broker name for broker child categories.
    pub broker: Option<&'a str>,
    /// Parent dataflow profile name for dataflow listings.
    pub profile: Option<&'a str>,
}

impl<'a> ListScope<'a> {
    /// Group-only scope.
    pub fn group(resource_group: &'a str) -> Self {
        Self {
            resource_group,
            ..Self::default()
        }
    }

    /// Scope under an instance.
    pub fn instance(resource_group: &'a str, instance: &'a str) -> Self {
        Self {
            resource_group,
            instance: Some(instance),
            ..Self::default()
        }
    }

    /// Narrow an instance scope to one broker.
    pub fn with_broker(self, broker: &'a str) -> Self {
        Self {
            broker: Some(broker),
            ..self
        }
    }

    /// Narrow an instance scope to one dataflow profile.
    pub fn with_profile(self, profile: &'a str) -> Self {
        Self {
            profile: Some(profile),
            ..self
        }
    }
}

/// Narrow interface over the Azure control plane.
///
/// Methods return raw JSON records exactly as the service serialized them;
/// normalization is the containers' job, not the client's.
#[allow(async_fn_in_trait)]
pub trait CloudOps {
    /// The subscription id every operation is scoped to.
    fn subscription(&self) -> &str;

    /// List every record in a category collection, following pagination.
    async fn list_resources(
        &self,
        category: ResourceCategory,
        scope: &ListScope<'_>,
    ) -> Result<Vec<Value>>;

    /// Fetch one resource by fully-qualified id.
    async fn get_resource(&self, resource_id: &str, api_version: &str) -> Result<Value>;

    /// Run an Azure Resource Graph query and return the matching records.
    async fn query_graph(&self, query: &str) -> Result<Vec<Value>>;

    /// Fetch the cluster extensions of the given types, keyed by lowercased
    /// extension type. Types with no installed extension are absent from the
    /// result.
    async fn get_extensions_by_type(
        &self,
        cluster_id: &str,
        extension_types: &[&str],
    ) -> Result<HashMap<String, Value>>;

    /// List the federated credentials of a user-assigned managed identity.
    async fn list_federated_credentials(
        &self,
        identity: &ParsedResourceId,
    ) -> Result<Vec<Value>>;

    /// Create (or overwrite) a federated credential on a managed identity.
    async fn create_federated_credential(
        &self,
        identity: &ParsedResourceId,
        credential_name: &str,
        body: &Value,
    ) -> Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_paths() {
        let scope = ListScope::instance("rg", "inst1");
        assert_eq!(
            ResourceCategory::Broker.collection_path(&scope).unwrap(),
            "providers/Microsoft.IoTOperations/instances/inst1/brokers"
        );
        assert_eq!(
            ResourceCategory::BrokerListener
                .collection_path(&scope.with_broker("default"))
                .unwrap(),
            "providers/Microsoft.IoTOperations/instances/inst1/brokers/default/listeners"
        );
        assert_eq!(
            ResourceCategory::Dataflow
                .collection_path(&scope.with_profile("p1"))
                .unwrap(),
            "providers/Microsoft.IoTOperations/instances/inst1/dataflowProfiles/p1/dataflows"
        );
        assert_eq!(
            ResourceCategory::SecretSync
                .collection_path(&ListScope::group("rg"))
                .unwrap(),
            "providers/Microsoft.SecretSyncController/secretSyncs"
        );
    }

    #[test]
    fn test_collection_path_missing_parent_scope() {
        let scope = ListScope::instance("rg", "inst1");
        assert!(ResourceCategory::BrokerListener.collection_path(&scope).is_err());
        assert!(ResourceCategory::Dataflow.collection_path(&scope).is_err());
        assert!(ResourceCategory::Broker.collection_path(&ListScope::group("rg")).is_err());
    }
}
