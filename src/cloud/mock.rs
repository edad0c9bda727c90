//! In-memory [`CloudOps`] implementation for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use serde_json::Value;

use crate::arm::ParsedResourceId;
use crate::cloud::{CloudOps, ListScope, ResourceCategory};

/// Canned control-plane state plus a record of mutations performed on it.
///
/// Collections are keyed coarsely: per category for flat listings, per parent
/// name for broker children and dataflows. Graph queries are answered by
/// substring match against registered needles.
#[derive(Debug, Default)]
pub struct MockCloud {
    /// Subscription id reported to callers.
    pub subscription: String,
    /// Single resources answered by [`CloudOps::get_resource`], keyed by id.
    pub resources_by_id: HashMap<String, Value>,
    /// Flat category listings (brokers, endpoints, profiles, secret sync).
    pub collections: HashMap<ResourceCategory, Vec<Value>>,
    /// Broker child listings keyed by `(category, broker name)`.
    pub broker_children: HashMap<(ResourceCategory, String), Vec<Value>>,
    /// Dataflow listings keyed by profile name.
    pub dataflows: HashMap<String, Vec<Value>>,
    /// Graph query answers: first entry whose needle the query contains wins.
    pub graph_answers: Vec<(String, Vec<Value>)>,
    /// Cluster extensions keyed by lowercased extension type.
    pub extensions: HashMap<String, Value>,
    /// Federated credentials keyed by identity name.
    pub federated_credentials: HashMap<String, Vec<Value>>,
    /// Credentials created through the mock: `(identity name, credential
    /// name, body)` in call order.
    pub created_credentials: Mutex<Vec<(String, String, Value)>>,
}

impl MockCloud {
    /// Set the subscription id reported to callers.
    pub fn with_subscription(mut self, subscription: impl Into<String>) -> Self {
        self.subscription = subscription.into();
        self
    }

    /// Register a resource answered by id lookup.
    pub fn with_resource(mut self, id: impl Into<String>, record: Value) -> Self {
        self.resources_by_id.insert(id.into(), record);
        self
    }

    /// Register a flat category listing.
    pub fn with_collection(mut self, category: ResourceCategory, records: Vec<Value>) -> Self {
        self.collections.insert(category, records);
        self
    }

    /// Register a broker child listing.
    pub fn with_broker_children(
        mut self,
        category: ResourceCategory,
        broker: impl Into<String>,
        records: Vec<Value>,
    ) -> Self {
        self.broker_children.insert((category, broker.into()), records);
        self
    }

    /// Register a dataflow listing for one profile.
    pub fn with_dataflows(mut self, profile: impl Into<String>, records: Vec<Value>) -> Self {
        self.dataflows.insert(profile.into(), records);
        self
    }

    /// Register a graph answer matched by substring.
    pub fn with_graph_answer(mut self, needle: impl Into<String>, records: Vec<Value>) -> Self {
        self.graph_answers.push((needle.into(), records));
        self
    }

    /// Register an installed cluster extension.
    pub fn with_extension(mut self, extension_type: impl Into<String>, record: Value) -> Self {
        self.extensions.insert(extension_type.into().to_lowercase(), record);
        self
    }

    /// Register existing federated credentials for an identity.
    pub fn with_federated_credentials(
        mut self,
        identity_name: impl Into<String>,
        records: Vec<Value>,
    ) -> Self {
        self.federated_credentials.insert(identity_name.into(), records);
        self
    }
}

impl CloudOps for MockCloud {
    fn subscription(&self) -> &str {
        &self.subscription
    }

    async fn list_resources(
        &self,
        category: ResourceCategory,
        scope: &ListScope<'_>,
    ) -> Result<Vec<Value>> {
        // Validates scope requirements the same way the real client does.
        category.collection_path(scope)?;
        let records = match category {
            ResourceCategory::BrokerListener
            | ResourceCategory::BrokerAuthentication
            | ResourceCategory::BrokerAuthorization => {
                let broker = scope.broker.unwrap_or_default();
                self.broker_children
                    .get(&(category, broker.to_string()))
                    .cloned()
            }
            ResourceCategory::Dataflow => {
                self.dataflows.get(scope.profile.unwrap_or_default()).cloned()
            }
            _ => self.collections.get(&category).cloned(),
        };
        Ok(records.unwrap_or_default())
    }

    async fn get_resource(&self, resource_id: &str, _api_version: &str) -> Result<Value> {
        self.resources_by_id
            .get(resource_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("mock has no resource registered for '{resource_id}'"))
    }

    async fn query_graph(&self, query: &str) -> Result<Vec<Value>> {
        Ok(self
            .graph_answers
            .iter()
            .find(|(needle, _)| query.contains(needle.as_str()))
            .map(|(_, records)| records.clone())
            .unwrap_or_default())
    }

    async fn get_extensions_by_type(
        &self,
        _cluster_id: &str,
        extension_types: &[&str],
    ) -> Result<HashMap<String, Value>> {
        Ok(self
            .extensions
            .iter()
            .filter(|(ext_type, _)| extension_types.contains(&ext_type.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn list_federated_credentials(
        &self,
        identity: &ParsedResourceId,
    ) -> Result<Vec<Value>> {
        Ok(self
            .federated_credentials
            .get(&identity.name)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_federated_credential(
        &self,
        identity: &ParsedResourceId,
        credential_name: &str,
        body: &Value,
    ) -> Result<Value> {
        self.created_credentials.lock().unwrap().push((
            identity.name.clone(),
            credential_name.to_string(),
            body.clone(),
        ));
        Ok(body.clone())
    }
}
