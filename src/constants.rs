//! Global constants used throughout the opsclone codebase.
//!
//! This module contains service API versions, cluster extension type
//! identifiers, and policy constants that are used across multiple modules.
//! Defining them centrally improves maintainability and makes magic values
//! more discoverable.

/// CLI version stamped into the generated template metadata.
pub const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");

/// API version for `Microsoft.ExtendedLocation/customLocations` operations.
pub const CUSTOM_LOCATIONS_API_VERSION: &str = "2021-08-31-preview";

/// API version for `Microsoft.IoTOperations` instance-scoped resources.
pub const IOTOPS_API_VERSION: &str = "2024-11-01";

/// API version for `Microsoft.DeviceRegistry` assets and asset endpoint profiles.
pub const REGISTRY_API_VERSION: &str = "2024-11-01";

/// API version for `Microsoft.SecretSyncController` resources.
pub const SECRETSYNC_API_VERSION: &str = "2024-08-21-preview";

/// API version for `Microsoft.KubernetesConfiguration/extensions` operations.
pub const CLUSTER_CONFIG_API_VERSION: &str = "2023-05-01";

/// API version for `Microsoft.ManagedIdentity` federated identity credentials.
pub const MSI_API_VERSION: &str = "2023-01-31";

/// API version for nested `Microsoft.Resources/deployments` blocks.
pub const DEPLOYMENTS_API_VERSION: &str = "2022-09-01";

/// API version for `Microsoft.Authorization/roleAssignments`.
pub const ROLE_ASSIGNMENT_API_VERSION: &str = "2022-04-01";

/// API version for Azure Resource Graph queries.
pub const RESOURCE_GRAPH_API_VERSION: &str = "2022-10-01";

/// Well-known role definition id of the built-in Contributor role.
pub const CONTRIBUTOR_ROLE_ID: &str = "b24988ac-6180-42a0-ab88-20f7382dd24c";

/// Extension type of the IoT Operations platform extension.
pub const EXTENSION_TYPE_PLATFORM: &str = "microsoft.iotoperations.platform";

/// Extension type of the Open Service Mesh extension.
pub const EXTENSION_TYPE_OSM: &str = "microsoft.openservicemesh";

/// Extension type of the secret store extension.
pub const EXTENSION_TYPE_SSC: &str = "microsoft.azure.secretstore";

/// Extension type of the Arc container storage extension.
pub const EXTENSION_TYPE_ACS: &str = "microsoft.arc.containerstorage";

/// Extension type of the IoT Operations ("ops") extension itself.
pub const EXTENSION_TYPE_OPS: &str = "microsoft.iotoperations";

/// The full set of cluster extension types captured by a backup, in the order
/// they are registered in the output template.
pub const EXTENSION_TYPES: [&str; 5] = [
    EXTENSION_TYPE_PLATFORM,
    EXTENSION_TYPE_OSM,
    EXTENSION_TYPE_SSC,
    EXTENSION_TYPE_ACS,
    EXTENSION_TYPE_OPS,
];

/// Extension types the ops extension declares as prerequisites.
pub const OPS_EXTENSION_DEPS: [&str; 4] = [
    EXTENSION_TYPE_PLATFORM,
    EXTENSION_TYPE_OSM,
    EXTENSION_TYPE_SSC,
    EXTENSION_TYPE_ACS,
];

/// Maps an extension type to the moniker used as its symbolic name in the
/// generated template. Returns `None` for extension types a backup does not
/// track.
pub fn extension_moniker(extension_type: &str) -> Option<&'static str> {
    match extension_type {
        EXTENSION_TYPE_PLATFORM => Some("platform"),
        EXTENSION_TYPE_OSM => Some("openServiceMesh"),
        EXTENSION_TYPE_SSC => Some("secretStore"),
        EXTENSION_TYPE_ACS => Some("containerStorage"),
        EXTENSION_TYPE_OPS => Some("iotOperations"),
        _ => None,
    }
}

/// Default number of resources per nested deployment batch.
///
/// This is a policy constant, not a platform maximum: ARM templates have a
/// bounded resource count, and batching large collections keeps each nested
/// deployment under it. Overridable via `--chunk-size`.
pub const DEFAULT_CHUNK_SIZE: usize = 800;

/// Environment variable that disables progress indicators when set.
pub const NO_PROGRESS_ENV: &str = "OPSCLONE_NO_PROGRESS";

/// Environment variable holding a bearer token for ARM requests.
pub const ACCESS_TOKEN_ENV: &str = "AZURE_ACCESS_TOKEN";

/// Environment variable holding the target subscription id.
pub const SUBSCRIPTION_ENV: &str = "AZURE_SUBSCRIPTION_ID";

/// Environment variable overriding the ARM endpoint (sovereign clouds, tests).
pub const ARM_ENDPOINT_ENV: &str = "OPSCLONE_ARM_ENDPOINT";

/// Default ARM management-plane endpoint.
pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";
