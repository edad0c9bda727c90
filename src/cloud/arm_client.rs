//! HTTP client for the Azure Resource Manager control plane.
//!
//! [`ArmClient`] is the production [`CloudOps`] implementation. It speaks
//! plain REST against the management endpoint with a caller-supplied bearer
//! token: no SDK, no credential refresh, just the handful of GET/POST/PUT
//! shapes the pipeline needs. Collection listings follow `nextLink`
//! pagination transparently.

use std::collections::HashMap;
use std::env;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, trace};

use crate::arm::ParsedResourceId;
use crate::cloud::{CloudOps, ListScope, ResourceCategory};
use crate::constants::{
    ARM_ENDPOINT_ENV, CLUSTER_CONFIG_API_VERSION, DEFAULT_ARM_ENDPOINT, MSI_API_VERSION,
    RESOURCE_GRAPH_API_VERSION,
};
use crate::core::OpsCloneError;

/// One page of an ARM collection listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectionPage {
    #[serde(default)]
    value: Vec<Value>,
    next_link: Option<String>,
}

/// REST client over one subscription of the ARM management plane.
#[derive(Debug, Clone)]
pub struct ArmClient {
    http: reqwest::Client,
    endpoint: String,
    subscription: String,
    token: String,
}

impl ArmClient {
    /// Create a client for the given token and subscription.
    ///
    /// The management endpoint defaults to the public cloud and can be
    /// overridden with `OPSCLONE_ARM_ENDPOINT` for sovereign clouds or test
    /// servers.
    pub fn new(token: impl Into<String>, subscription: impl Into<String>) -> Self {
        let endpoint = env::var(ARM_ENDPOINT_ENV)
            .unwrap_or_else(|_| DEFAULT_ARM_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string();
        Self {
            http: reqwest::Client::new(),
            endpoint,
            subscription: subscription.into(),
            token: token.into(),
        }
    }

    fn group_url(&self, resource_group: &str, path: &str, api_version: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{resource_group}/{path}?api-version={api_version}",
            self.endpoint, self.subscription
        )
    }

    fn resource_url(&self, resource_id: &str, api_version: &str) -> String {
        format!(
            "{}/{}?api-version={api_version}",
            self.endpoint,
            resource_id.trim_start_matches('/')
        )
    }

    async fn into_checked_json(response: reqwest::Response, operation: &str) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OpsCloneError::ArmRequestFailed {
                operation: operation.to_string(),
                status: status.as_u16(),
                body,
            }
            .into());
        }
        response
            .json()
            .await
            .with_context(|| format!("decoding ARM response for {operation}"))
    }

    async fn get_json(&self, url: &str, operation: &str) -> Result<Value> {
        trace!(url, operation, "GET");
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("sending ARM request for {operation}"))?;
        Self::into_checked_json(response, operation).await
    }

    /// GET a collection URL and drain every page into one vector.
    async fn list_paged(&self, first_url: String, operation: &str) -> Result<Vec<Value>> {
        let mut records = Vec::new();
        let mut url = first_url;
        loop {
            let body = self.get_json(&url, operation).await?;
            let page: CollectionPage = serde_json::from_value(body)
                .with_context(|| format!("decoding collection page for {operation}"))?;
            records.extend(page.value);
            match page.next_link {
                Some(next) => url = next,
                None => break,
            }
        }
        debug!(operation, count = records.len(), "listed collection");
        Ok(records)
    }

    fn identity_credentials_url(&self, identity: &ParsedResourceId, credential: Option<&str>) -> String {
        let suffix = credential.map(|c| format!("/{c}")).unwrap_or_default();
        format!(
            "{}/{}/federatedIdentityCredentials{suffix}?api-version={MSI_API_VERSION}",
            self.endpoint,
            identity.to_id().trim_start_matches('/')
        )
    }
}

impl CloudOps for ArmClient {
    fn subscription(&self) -> &str {
        &self.subscription
    }

    async fn list_resources(
        &self,
        category: ResourceCategory,
        scope: &ListScope<'_>,
    ) -> Result<Vec<Value>> {
        let path = category.collection_path(scope)?;
        let url = self.group_url(scope.resource_group, &path, category.api_version());
        self.list_paged(url, &format!("{category:?} list")).await
    }

    async fn get_resource(&self, resource_id: &str, api_version: &str) -> Result<Value> {
        self.get_json(
            &self.resource_url(resource_id, api_version),
            &format!("GET {resource_id}"),
        )
        .await
    }

    async fn query_graph(&self, query: &str) -> Result<Vec<Value>> {
        let url = format!(
            "{}/providers/Microsoft.ResourceGraph/resources?api-version={RESOURCE_GRAPH_API_VERSION}",
            self.endpoint
        );
        trace!(query, "resource graph query");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&json!({
                "query": query,
                "subscriptions": [self.subscription],
            }))
            .send()
            .await
            .context("sending resource graph query")?;
        let mut body = Self::into_checked_json(response, "resource graph query").await?;
        let records = match body.get_mut("data").map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        debug!(count = records.len(), "resource graph query returned");
        Ok(records)
    }

    async fn get_extensions_by_type(
        &self,
        cluster_id: &str,
        extension_types: &[&str],
    ) -> Result<HashMap<String, Value>> {
        let url = format!(
            "{}/{}/providers/Microsoft.KubernetesConfiguration/extensions?api-version={CLUSTER_CONFIG_API_VERSION}",
            self.endpoint,
            cluster_id.trim_start_matches('/')
        );
        let extensions = self.list_paged(url, "cluster extension list").await?;

        let mut by_type = HashMap::new();
        for extension in extensions {
            let Some(ext_type) = extension
                .pointer("/properties/extensionType")
                .and_then(Value::as_str)
                .map(str::to_lowercase)
            else {
                continue;
            };
            if extension_types.contains(&ext_type.as_str()) {
                // First installed extension of each type wins.
                by_type.entry(ext_type).or_insert(extension);
            }
        }
        Ok(by_type)
    }

    async fn list_federated_credentials(
        &self,
        identity: &ParsedResourceId,
    ) -> Result<Vec<Value>> {
        let url = self.identity_credentials_url(identity, None);
        self.list_paged(url, "federated credential list").await
    }

    async fn create_federated_credential(
        &self,
        identity: &ParsedResourceId,
        credential_name: &str,
        body: &Value,
    ) -> Result<Value> {
        let url = self.identity_credentials_url(identity, Some(credential_name));
        debug!(identity = %identity.name, credential_name, "creating federated credential");
        let response = self
            .http
            .put(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .context("sending federated credential request")?;
        Self::into_checked_json(response, "federated credential create").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ArmClient {
        ArmClient::new("token", "0000-sub")
    }

    #[test]
    fn test_group_url_shape() {
        let url = client().group_url(
            "my-rg",
            "providers/Microsoft.IoTOperations/instances/i/brokers",
            "2024-11-01",
        );
        assert_eq!(
            url,
            "https://management.azure.com/subscriptions/0000-sub/resourceGroups/my-rg\
             /providers/Microsoft.IoTOperations/instances/i/brokers?api-version=2024-11-01"
        );
    }

    #[test]
    fn test_resource_url_normalizes_leading_slash() {
        let url = client().resource_url("/subscriptions/s/resourceGroups/rg/providers/p/t/n", "v1");
        assert!(url.starts_with("https://management.azure.com/subscriptions/"));
        assert!(url.ends_with("?api-version=v1"));
    }

    #[test]
    fn test_identity_credentials_url() {
        let identity = ParsedResourceId::parse(
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.ManagedIdentity/userAssignedIdentities/mi1",
        )
        .unwrap();
        let url = client().identity_credentials_url(&identity, Some("cred1"));
        assert!(url.contains("/userAssignedIdentities/mi1/federatedIdentityCredentials/cred1"));
        assert!(url.ends_with(&format!("api-version={MSI_API_VERSION}")));
    }
}
