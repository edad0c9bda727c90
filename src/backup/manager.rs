//! Capture orchestration.
//!
//! [`BackupManager`] walks the resource tree of one IoT Operations instance
//! through a fixed sequence of analysis phases and accumulates an
//! insertion-ordered map of symbolic key -> container. The sequence matters:
//! later phases wire their `dependsOn` edges against the last deployment
//! batch an earlier phase registered, so phases are never reordered and a
//! phase that found nothing simply contributes no batch (later phases
//! tolerate the absence with an empty edge, not a failure).
//!
//! All collaborator calls run one at a time. Parallelizing them would require
//! speculative dependency resolution, since each phase needs the previous
//! phase's registered symbolic names to exist.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::arm::ParsedResourceId;
use crate::arm::expressions::{
    TemplateParam, build_parameter, cluster_id_expr, deployment_id_expr, extension_id_literal,
    extension_id_variable, instance_id_expr, parameter_expr, resource_id_expr, variable_expr,
};
use crate::backup::container::{
    Container, ContainerConfig, DependencyRef, DeploymentContainer, ResourceContainer,
};
use crate::backup::template::TemplateGen;
use crate::backup::ResourceKey;
use crate::cloud::{CloudOps, ListScope, ResourceCategory};
use crate::constants::{
    CLI_VERSION, CLUSTER_CONFIG_API_VERSION, CONTRIBUTOR_ROLE_ID, CUSTOM_LOCATIONS_API_VERSION,
    EXTENSION_TYPE_ACS, EXTENSION_TYPE_OPS, EXTENSION_TYPE_OSM, EXTENSION_TYPE_PLATFORM,
    EXTENSION_TYPE_SSC, EXTENSION_TYPES, IOTOPS_API_VERSION, OPS_EXTENSION_DEPS,
    REGISTRY_API_VERSION, ROLE_ASSIGNMENT_API_VERSION, SECRETSYNC_API_VERSION,
    extension_moniker,
};
use crate::core::OpsCloneError;

/// Orchestrates one capture run against one instance.
///
/// Constructed per invocation; never reused across runs.
pub struct BackupManager<'a, C: CloudOps> {
    cloud: &'a C,
    resource_group: String,
    instance_name: String,
    oidc_issuer: Option<String>,
    chunk_size: usize,
    instance_id: String,
    instance_record: Value,
    custom_location: Value,
    cluster_id: String,
    extended_location_id: String,
    template: TemplateGen,
    rcontainer_map: Vec<(String, Container)>,
    instance_identities: Vec<String>,
    active_deployment: HashMap<ResourceKey, Vec<String>>,
}

impl<'a, C: CloudOps> BackupManager<'a, C> {
    /// Fetch the instance and its custom location, and derive the connected
    /// cluster id. Fails fast before any analysis runs when the instance
    /// does not exist or carries no extended location.
    pub async fn new(
        cloud: &'a C,
        resource_group: impl Into<String>,
        instance_name: impl Into<String>,
        oidc_issuer: Option<String>,
        chunk_size: usize,
    ) -> Result<Self> {
        let resource_group = resource_group.into();
        let instance_name = instance_name.into();
        let instance_id = format!(
            "/subscriptions/{}/resourceGroups/{resource_group}/providers/Microsoft.IoTOperations/instances/{instance_name}",
            cloud.subscription()
        );
        let instance_record = cloud
            .get_resource(&instance_id, IOTOPS_API_VERSION)
            .await
            .with_context(|| format!("fetching instance '{instance_name}'"))?;

        let extended_location_id = instance_record
            .pointer("/extendedLocation/name")
            .and_then(Value::as_str)
            .ok_or_else(|| OpsCloneError::MissingExpectedResource {
                kind: "extended location".to_string(),
                scope: instance_name.clone(),
            })?
            .to_string();
        let custom_location = cloud
            .get_resource(&extended_location_id, CUSTOM_LOCATIONS_API_VERSION)
            .await
            .context("fetching the instance's custom location")?;
        let cluster_id = custom_location
            .pointer("/properties/hostResourceId")
            .and_then(Value::as_str)
            .ok_or_else(|| OpsCloneError::MissingExpectedResource {
                kind: "host cluster reference".to_string(),
                scope: extended_location_id.clone(),
            })?
            .to_string();

        Ok(Self {
            cloud,
            resource_group,
            instance_name,
            oidc_issuer,
            // A zero chunk size would make the batching loop spin forever.
            chunk_size: chunk_size.max(1),
            instance_id,
            instance_record,
            custom_location,
            cluster_id,
            extended_location_id,
            template: TemplateGen::new(),
            rcontainer_map: Vec::new(),
            instance_identities: Vec::new(),
            active_deployment: HashMap::new(),
        })
    }

    /// Run every analysis phase in order, populating the container map.
    pub async fn analyze(&mut self) -> Result<()> {
        self.build_parameters()?;
        self.build_variables();
        self.build_metadata();

        self.analyze_extensions().await?;
        self.analyze_instance()?;
        self.analyze_instance_resources().await?;
        self.analyze_assets().await?;
        self.analyze_secretsync().await?;
        self.analyze_instance_identity().await?;
        info!(containers = self.rcontainer_map.len(), "cluster analysis complete");
        Ok(())
    }

    /// Render the assembled template document.
    pub fn render_template(&self) -> Result<Value> {
        self.template.render(&self.rcontainer_map)
    }

    /// Render and write the template bundle.
    pub fn output_template(&self, bundle_path: &Path) -> Result<()> {
        self.template.write(&self.rcontainer_map, bundle_path)
    }

    /// Group captured resources by `namespace/type` for the summary display,
    /// in capture order.
    pub fn enumerate_resources(&self) -> Vec<(String, Vec<String>)> {
        fn collect(entries: &mut Vec<(String, Vec<String>)>, rc: &ResourceContainer) {
            let Some(id) = rc.state().get("id").and_then(Value::as_str) else {
                return;
            };
            let Ok(parsed) = ParsedResourceId::parse(id) else {
                return;
            };
            let mut key = format!("{}/{}", parsed.namespace, parsed.resource_type);
            if let Some(child) = parsed.last_child() {
                key.push('/');
                key.push_str(&child.child_type);
            }
            let name = parsed.nested_name();
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some((_, names)) => names.push(name),
                None => entries.push((key, vec![name])),
            }
        }

        let mut enumerated = Vec::new();
        for (_, container) in &self.rcontainer_map {
            match container {
                Container::Resource(rc) => collect(&mut enumerated, rc),
                Container::Deployment(dc) => {
                    for (_, rc) in dc.inner() {
                        collect(&mut enumerated, rc);
                    }
                }
            }
        }
        enumerated
    }

    fn build_parameters(&mut self) -> Result<()> {
        let schema_registry_id = self
            .instance_record
            .pointer("/properties/schemaRegistryRef/resourceId")
            .cloned()
            .ok_or_else(|| OpsCloneError::MissingExpectedResource {
                kind: "schema registry reference".to_string(),
                scope: self.instance_name.clone(),
            })?;

        for (name, default) in [
            (TemplateParam::ClusterName, None),
            (TemplateParam::InstanceName, None),
            (
                TemplateParam::ResourceSlug,
                Some(json!(
                    "[take(uniqueString(resourceGroup().id, parameters('clusterName'), parameters('instanceName')), 5)]"
                )),
            ),
            (
                TemplateParam::CustomLocationName,
                Some(json!("[format('location-{0}', parameters('resourceSlug'))]")),
            ),
            (TemplateParam::SchemaRegistryId, Some(schema_registry_id)),
        ] {
            let (key, decl) = build_parameter(name.as_str(), default);
            self.template.add_parameter(key, decl);
        }
        Ok(())
    }

    fn build_variables(&mut self) {
        self.template.add_variable(
            "aioExtName",
            json!("[format('azure-iot-operations-{0}', parameters('resourceSlug'))]"),
        );
    }

    fn build_metadata(&mut self) {
        self.template.add_metadata("opsCliVersion", json!(CLI_VERSION));
        let cloned_id = self
            .instance_record
            .get("id")
            .cloned()
            .unwrap_or_else(|| json!(self.instance_id));
        self.template.add_metadata("clonedInstanceId", cloned_id);
    }

    /// Register the installed cluster extensions with their static
    /// cross-extension dependency edges.
    async fn analyze_extensions(&mut self) -> Result<()> {
        let mut extension_map = self
            .cloud
            .get_extensions_by_type(&self.cluster_id, &EXTENSION_TYPES)
            .await
            .context("enumerating cluster extensions")?;

        for extension_type in EXTENSION_TYPES {
            let Some(mut extension) = extension_map.remove(extension_type) else {
                continue;
            };
            let Some(moniker) = extension_moniker(extension_type) else {
                continue;
            };
            extension["scope"] = json!(cluster_id_expr());
            if extension_type == EXTENSION_TYPE_OPS {
                extension["name"] = json!(variable_expr("aioExtName"));
            }
            debug!(moniker, "registering cluster extension");
            self.add_resource(
                moniker,
                CLUSTER_CONFIG_API_VERSION,
                extension,
                extension_depends_on(extension_type),
                ContainerConfig { apply_nested_name: false },
            );
        }
        Ok(())
    }

    /// Register the custom location, the instance itself, and the role
    /// assignment granting the ops extension identity rights on the schema
    /// registry.
    fn analyze_instance(&mut self) -> Result<()> {
        let mut custom_location = self.custom_location.clone();
        custom_location["properties"]["hostResourceId"] = json!(cluster_id_expr());
        custom_location["name"] = json!(parameter_expr(TemplateParam::CustomLocationName));

        // The custom location is founded on these three extensions; all must
        // have been registered by the extension phase.
        let founding_monikers = ["platform", "secretStore", "iotOperations"];
        let mut cl_extension_ids = Vec::new();
        for moniker in founding_monikers {
            if moniker == "iotOperations" {
                cl_extension_ids.push(json!(extension_id_variable("aioExtName")));
                continue;
            }
            let extension_name = self
                .container_state(moniker)
                .and_then(|state| state.get("name"))
                .and_then(Value::as_str)
                .ok_or_else(|| OpsCloneError::MissingExpectedResource {
                    kind: format!("{moniker} extension"),
                    scope: self.cluster_id.clone(),
                })?;
            cl_extension_ids.push(json!(extension_id_literal(extension_name)));
        }
        custom_location["properties"]["clusterExtensionIds"] = Value::Array(cl_extension_ids);
        custom_location["properties"]["displayName"] =
            json!(parameter_expr(TemplateParam::CustomLocationName));

        self.add_resource(
            ResourceKey::CustomLocation.as_str(),
            CUSTOM_LOCATIONS_API_VERSION,
            custom_location,
            founding_monikers.iter().map(|m| DependencyRef::from(*m)).collect(),
            ContainerConfig { apply_nested_name: false },
        );

        let mut instance = self.instance_record.clone();
        instance["properties"]["schemaRegistryRef"]["resourceId"] =
            json!(parameter_expr(TemplateParam::SchemaRegistryId));
        self.add_resource(
            ResourceKey::Instance.as_str(),
            IOTOPS_API_VERSION,
            instance,
            vec![DependencyRef::Key(ResourceKey::CustomLocation)],
            ContainerConfig::default(),
        );

        self.add_resource(
            ResourceKey::RoleAssignment.as_str(),
            ROLE_ASSIGNMENT_API_VERSION,
            role_assignment(),
            vec![DependencyRef::from("iotOperations")],
            ContainerConfig { apply_nested_name: false },
        );
        Ok(())
    }

    /// Register the default broker and the chunked deployment batches for
    /// every instance-scoped child category.
    async fn analyze_instance_resources(&mut self) -> Result<()> {
        let resource_group = self.resource_group.clone();
        let instance_name = self.instance_name.clone();
        let scope = ListScope::instance(&resource_group, &instance_name);
        let brokers = self.cloud.list_resources(ResourceCategory::Broker, &scope).await?;
        // Single-broker capture only; the first listed broker is the target.
        let default_broker = brokers.into_iter().next().ok_or_else(|| {
            OpsCloneError::MissingExpectedResource {
                kind: "broker".to_string(),
                scope: self.instance_name.clone(),
            }
        })?;
        let broker_name = required_str(&default_broker, "name")?.to_string();
        let broker_type = required_str(&default_broker, "type")?.to_string();
        let broker_expr = resource_id_expr(&broker_type, required_str(&default_broker, "id")?)?;
        self.add_resource(
            ResourceKey::Broker.as_str(),
            IOTOPS_API_VERSION,
            default_broker,
            vec![DependencyRef::Key(ResourceKey::Instance)],
            ContainerConfig::default(),
        );

        let nested_params = nested_parameter_scope();
        let broker_scope = scope.with_broker(&broker_name);

        let authns = self
            .cloud
            .list_resources(ResourceCategory::BrokerAuthentication, &broker_scope)
            .await?;
        self.add_deployment(
            ResourceKey::Authn,
            IOTOPS_API_VERSION,
            authns,
            vec![DependencyRef::Symbolic(broker_expr.clone())],
            Some(nested_params.clone()),
        );

        let authzs = self
            .cloud
            .list_resources(ResourceCategory::BrokerAuthorization, &broker_scope)
            .await?;
        self.add_deployment(
            ResourceKey::Authz,
            IOTOPS_API_VERSION,
            authzs,
            vec![DependencyRef::Symbolic(broker_expr)],
            Some(nested_params.clone()),
        );

        // A listener's auth wiring must exist before the listener does, so
        // depend on the last batch of each auth category that produced one.
        let mut listener_depends_on = Vec::new();
        for key in [ResourceKey::Authn, ResourceKey::Authz] {
            if let Some(last) = self.last_deployment(key) {
                listener_depends_on.push(DependencyRef::Symbolic(deployment_id_expr(&last)));
            }
        }
        let listeners = self
            .cloud
            .list_resources(ResourceCategory::BrokerListener, &broker_scope)
            .await?;
        self.add_deployment(
            ResourceKey::Listener,
            IOTOPS_API_VERSION,
            listeners,
            listener_depends_on,
            Some(nested_params.clone()),
        );

        let instance_expr = DependencyRef::Symbolic(instance_id_expr());

        let endpoints = self
            .cloud
            .list_resources(ResourceCategory::DataflowEndpoint, &scope)
            .await?;
        self.add_deployment(
            ResourceKey::DataflowEndpoint,
            IOTOPS_API_VERSION,
            endpoints,
            vec![instance_expr.clone()],
            Some(nested_params.clone()),
        );

        let profiles = self
            .cloud
            .list_resources(ResourceCategory::DataflowProfile, &scope)
            .await?;
        let profile_names: Vec<String> = profiles
            .iter()
            .filter_map(|p| p.get("name").and_then(Value::as_str).map(str::to_string))
            .collect();
        self.add_deployment(
            ResourceKey::DataflowProfile,
            IOTOPS_API_VERSION,
            profiles,
            vec![instance_expr],
            Some(nested_params.clone()),
        );

        if !profile_names.is_empty() {
            let mut dataflows = Vec::new();
            for profile in &profile_names {
                dataflows.extend(
                    self.cloud
                        .list_resources(ResourceCategory::Dataflow, &scope.with_profile(profile))
                        .await?,
                );
            }
            let depends_on = self
                .last_deployment(ResourceKey::DataflowProfile)
                .map(|last| vec![DependencyRef::Symbolic(deployment_id_expr(&last))])
                .unwrap_or_default();
            self.add_deployment(
                ResourceKey::Dataflow,
                IOTOPS_API_VERSION,
                dataflows,
                depends_on,
                Some(nested_params),
            );
        }
        Ok(())
    }

    /// Register asset endpoint profiles and, when both collections are
    /// non-empty, the assets that reference them.
    async fn analyze_assets(&mut self) -> Result<()> {
        let nested_params = nested_parameter_scope();
        let instance_expr = DependencyRef::Symbolic(instance_id_expr());

        let endpoints = self
            .query_by_type("microsoft.deviceregistry/assetendpointprofiles")
            .await?;
        let have_endpoints = !endpoints.is_empty();
        self.add_deployment(
            ResourceKey::AssetEndpointProfile,
            REGISTRY_API_VERSION,
            endpoints,
            vec![instance_expr],
            Some(nested_params.clone()),
        );

        let assets = self.query_by_type("microsoft.deviceregistry/assets").await?;
        if !assets.is_empty() && have_endpoints {
            let depends_on = self
                .last_deployment(ResourceKey::AssetEndpointProfile)
                .map(|last| vec![DependencyRef::Symbolic(deployment_id_expr(&last))])
                .unwrap_or_default();
            self.add_deployment(
                ResourceKey::Asset,
                REGISTRY_API_VERSION,
                assets,
                depends_on,
                Some(nested_params),
            );
        }
        Ok(())
    }

    /// Register secret provider classes and secret syncs bound to the
    /// instance's extended location, and resolve the identities their client
    /// ids point at for the federation phase.
    async fn analyze_secretsync(&mut self) -> Result<()> {
        let nested_params = nested_parameter_scope();
        let instance_expr = DependencyRef::Symbolic(instance_id_expr());
        let ext_loc_lower = self.extended_location_id.to_lowercase();
        let same_location = |record: &Value| {
            record
                .pointer("/extendedLocation/name")
                .and_then(Value::as_str)
                .is_some_and(|name| name.to_lowercase() == ext_loc_lower)
        };

        let resource_group = self.resource_group.clone();
        let group_scope = ListScope::group(&resource_group);
        let spcs: Vec<Value> = self
            .cloud
            .list_resources(ResourceCategory::SecretProviderClass, &group_scope)
            .await?
            .into_iter()
            .filter(same_location)
            .collect();

        let client_ids: Vec<String> = spcs
            .iter()
            .filter_map(|spc| spc.pointer("/properties/clientId").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        if !client_ids.is_empty() {
            for identity in self.identities_by_client_id(&client_ids).await? {
                if let Some(id) = identity.get("id").and_then(Value::as_str) {
                    self.instance_identities.push(id.to_string());
                }
            }
        }

        let have_spcs = !spcs.is_empty();
        self.add_deployment(
            ResourceKey::SecretProviderClass,
            SECRETSYNC_API_VERSION,
            spcs,
            vec![instance_expr],
            Some(nested_params.clone()),
        );

        let secret_syncs: Vec<Value> = self
            .cloud
            .list_resources(ResourceCategory::SecretSync, &group_scope)
            .await?
            .into_iter()
            .filter(same_location)
            .collect();
        if !secret_syncs.is_empty() && have_spcs {
            let depends_on = self
                .last_deployment(ResourceKey::SecretProviderClass)
                .map(|last| vec![DependencyRef::Symbolic(deployment_id_expr(&last))])
                .unwrap_or_default();
            self.add_deployment(
                ResourceKey::SecretSync,
                SECRETSYNC_API_VERSION,
                secret_syncs,
                depends_on,
                Some(nested_params),
            );
        }
        Ok(())
    }

    /// Re-point federated credentials at the target OIDC issuer. This is the
    /// one phase that mutates live state instead of capturing it; it runs
    /// only when an issuer was supplied.
    async fn analyze_instance_identity(&mut self) -> Result<()> {
        let Some(issuer) = self.oidc_issuer.clone() else {
            return Ok(());
        };

        let mut identity_ids: Vec<String> = self
            .instance_record
            .pointer("/identity/userAssignedIdentities")
            .and_then(Value::as_object)
            .map(|uamis| uamis.keys().cloned().collect())
            .unwrap_or_default();
        for id in &self.instance_identities {
            if !identity_ids.contains(id) {
                identity_ids.push(id.clone());
            }
        }
        if identity_ids.is_empty() {
            return Ok(());
        }

        for identity_id in identity_ids {
            let identity = ParsedResourceId::parse(&identity_id)?;
            let credentials = self
                .cloud
                .list_federated_credentials(&identity)
                .await
                .with_context(|| format!("listing federated credentials of '{}'", identity.name))?;

            for credential in credentials {
                let Some(cred_issuer) =
                    credential.pointer("/properties/issuer").and_then(Value::as_str)
                else {
                    continue;
                };
                if cred_issuer == issuer {
                    continue;
                }
                let Some(subject) =
                    credential.pointer("/properties/subject").and_then(Value::as_str)
                else {
                    continue;
                };
                if !subject.contains(":aio-") {
                    continue;
                }

                let body = json!({
                    "properties": {
                        "subject": subject,
                        "audiences": credential
                            .pointer("/properties/audiences")
                            .cloned()
                            .unwrap_or_else(|| json!([])),
                        "issuer": issuer,
                    }
                });
                let credential_name = federated_credential_name(&issuer, subject);
                debug!(identity = %identity.name, credential_name, "federating credential");
                self.cloud
                    .create_federated_credential(&identity, &credential_name, &body)
                    .await
                    .with_context(|| {
                        format!("creating federated credential on '{}'", identity.name)
                    })?;
            }
        }
        Ok(())
    }

    async fn query_by_type(&self, resource_type: &str) -> Result<Vec<Value>> {
        let query = format!(
            "resources\n\
             | where extendedLocation.name =~ '{}'\n\
             | where type =~ '{resource_type}'\n\
             | project id, name, type, location, extendedLocation, properties",
            self.extended_location_id
        );
        self.cloud.query_graph(&query).await
    }

    async fn identities_by_client_id(&self, client_ids: &[String]) -> Result<Vec<Value>> {
        let query = format!(
            "resources\n\
             | where type =~ \"Microsoft.ManagedIdentity/userAssignedIdentities\"\n\
             | where properties.clientId in~ (\"{}\")\n\
             | project id, name, type, properties",
            client_ids.join("\", \"")
        );
        self.cloud.query_graph(&query).await
    }

    fn container_state(&self, key: &str) -> Option<&Value> {
        self.rcontainer_map.iter().find_map(|(k, container)| match container {
            Container::Resource(rc) if k == key => Some(rc.state()),
            _ => None,
        })
    }

    fn last_deployment(&self, key: ResourceKey) -> Option<String> {
        self.active_deployment.get(&key).and_then(|batches| batches.last()).cloned()
    }

    /// Reserve the next symbolic name and ARM name for a deployment batch of
    /// `key`, recording it as the category's latest batch.
    fn register_deployment(&mut self, key: ResourceKey) -> (String, String) {
        let batches = self.active_deployment.entry(key).or_default();
        let symbolic_name = format!("{}s_{}", key.as_str(), batches.len() + 1);
        let deployment_name = format!("concat(parameters('resourceSlug'), '_{symbolic_name}')");
        batches.push(deployment_name.clone());
        (symbolic_name, deployment_name)
    }

    /// Chunk `records` into deployment batches of at most `chunk_size` and
    /// register each. Zero records register nothing.
    fn add_deployment(
        &mut self,
        key: ResourceKey,
        api_version: &str,
        records: Vec<Value>,
        depends_on: Vec<DependencyRef>,
        parameters: Option<Map<String, Value>>,
    ) {
        let mut remaining = records;
        while !remaining.is_empty() {
            let tail = remaining.split_off(self.chunk_size.min(remaining.len()));
            let chunk = std::mem::replace(&mut remaining, tail);

            let (symbolic_name, deployment_name) = self.register_deployment(key);
            debug!(key = key.as_str(), batch = %symbolic_name, resources = chunk.len(), "registering deployment batch");
            let mut deployment = DeploymentContainer::new(
                format!("[{deployment_name}]"),
                parameters.clone(),
                depends_on.clone(),
            );
            deployment.add_resources(
                key.as_str(),
                api_version,
                chunk,
                vec![],
                ContainerConfig::default(),
            );
            self.rcontainer_map.push((symbolic_name, Container::Deployment(deployment)));
        }
    }

    fn add_resource(
        &mut self,
        key: &str,
        api_version: &str,
        record: Value,
        depends_on: Vec<DependencyRef>,
        config: ContainerConfig,
    ) {
        self.rcontainer_map.push((
            key.to_string(),
            Container::Resource(ResourceContainer::new(api_version, record, depends_on, config)),
        ));
    }
}

/// Pass-through parameter declarations every nested deployment exposes, since
/// inner resource names are rewritten to reference them.
fn nested_parameter_scope() -> Map<String, Value> {
    let mut params = Map::new();
    for name in [TemplateParam::CustomLocationName, TemplateParam::InstanceName] {
        let (key, decl) = build_parameter(name.as_str(), None);
        params.insert(key, decl);
    }
    params
}

/// Static cross-extension dependency edges.
fn extension_depends_on(extension_type: &str) -> Vec<DependencyRef> {
    let monikers: Vec<&str> = match extension_type {
        EXTENSION_TYPE_SSC => vec![EXTENSION_TYPE_PLATFORM],
        EXTENSION_TYPE_ACS => vec![EXTENSION_TYPE_PLATFORM, EXTENSION_TYPE_OSM],
        EXTENSION_TYPE_OPS => OPS_EXTENSION_DEPS.to_vec(),
        _ => Vec::new(),
    };
    monikers
        .into_iter()
        .filter_map(extension_moniker)
        .map(DependencyRef::from)
        .collect()
}

/// Role assignment granting the ops extension's managed identity Contributor
/// rights on the schema registry.
fn role_assignment() -> Value {
    json!({
        "type": "Microsoft.Authorization/roleAssignments",
        "name": "[guid(parameters('schemaRegistryId'), parameters('clusterName'), resourceGroup().id)]",
        "scope": "[parameters('schemaRegistryId')]",
        "properties": {
            "roleDefinitionId": format!(
                "[subscriptionResourceId('Microsoft.Authorization/roleDefinitions', '{CONTRIBUTOR_ROLE_ID}')]"
            ),
            "principalId": format!(
                "[reference('iotOperations', '{CLUSTER_CONFIG_API_VERSION}', 'Full').identity.principalId]"
            ),
            "principalType": "ServicePrincipal",
        }
    })
}

/// Deterministic credential name for a federated credential migration, so
/// re-running against the same issuer/subject overwrites instead of piling
/// up duplicates. Stable across builds: the name is a truncated SHA-256 of
/// the issuer and subject.
fn federated_credential_name(oidc_issuer: &str, subject: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(oidc_issuer.as_bytes());
    hasher.update(b"\n");
    hasher.update(subject.as_bytes());
    format!("aiofc-{}", &hex::encode(hasher.finalize())[..16])
}

fn required_str<'v>(record: &'v Value, key: &str) -> Result<&'v str> {
    record.get(key).and_then(Value::as_str).ok_or_else(|| {
        anyhow::anyhow!("captured record is missing required field '{key}'")
    })
}
