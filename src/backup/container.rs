//! Resource and deployment containers - the units the template is assembled
//! from.
//!
//! A [`ResourceContainer`] wraps one captured resource record and knows how
//! to normalize it into a template-embeddable block: rewrite its name and
//! extended location into template expressions, scrub server-assigned fields,
//! and attach dependency references. A [`DeploymentContainer`] wraps a batch
//! of resources as a nested `Microsoft.Resources/deployments` resource so a
//! large collection can be chunked while participating in the outer
//! dependency graph through a single deployment-level edge.
//!
//! Containers never mutate the record they were constructed with: `render`
//! works on a fresh clone, so rendering twice yields byte-identical output.

use serde_json::{Map, Value, json};

use crate::arm::ParsedResourceId;
use crate::arm::expressions::{
    custom_location_id_expr, instance_nested_name_expr, parameter_expr, TemplateParam,
};
use crate::backup::ResourceKey;
use crate::constants::DEPLOYMENTS_API_VERSION;
use crate::core::{OpsCloneError, Result};

/// A dependency edge declared by a container.
///
/// Either a symbolic key registered elsewhere in the template, or an
/// arbitrary expression/name carried as a string. Resolution to a string
/// happens only at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyRef {
    /// Reference to a category key registered in the top-level resources map.
    Key(ResourceKey),
    /// A raw symbolic name or `[resourceId(...)]` expression.
    Symbolic(String),
}

impl DependencyRef {
    /// Resolve the reference to the string that appears in `dependsOn`.
    pub fn resolve(&self) -> String {
        match self {
            Self::Key(key) => key.as_str().to_string(),
            Self::Symbolic(s) => s.clone(),
        }
    }
}

impl From<ResourceKey> for DependencyRef {
    fn from(key: ResourceKey) -> Self {
        Self::Key(key)
    }
}

impl From<String> for DependencyRef {
    fn from(s: String) -> Self {
        Self::Symbolic(s)
    }
}

impl From<&str> for DependencyRef {
    fn from(s: &str) -> Self {
        Self::Symbolic(s.to_string())
    }
}

/// Normalization flags for a [`ResourceContainer`].
#[derive(Debug, Clone, Copy)]
pub struct ContainerConfig {
    /// Rewrite the resource name from its parsed id (default). Disabled for
    /// resources whose naming does not follow the nested-child convention,
    /// such as cluster extensions and role assignments.
    pub apply_nested_name: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            apply_nested_name: true,
        }
    }
}

/// Wraps one captured resource record for template embedding.
#[derive(Debug, Clone)]
pub struct ResourceContainer {
    api_version: String,
    state: Value,
    depends_on: Vec<DependencyRef>,
    config: ContainerConfig,
}

impl ResourceContainer {
    /// Create a container owning a private copy of one resource record.
    pub fn new(
        api_version: impl Into<String>,
        state: Value,
        depends_on: Vec<DependencyRef>,
        config: ContainerConfig,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            state,
            depends_on,
            config,
        }
    }

    /// The captured record as held by this container (pre-normalization).
    pub fn state(&self) -> &Value {
        &self.state
    }

    /// Normalize the owned record into a template resource block.
    ///
    /// Applies, in order: nested-name rewrite (unless disabled), extended
    /// location rewrite, identity scrub, volatile-field scrub; then merges
    /// `apiVersion` and `dependsOn`. Idempotent: the owned record is never
    /// modified.
    ///
    /// # Errors
    ///
    /// A record whose `id` fails parsing aborts with
    /// [`OpsCloneError::MalformedResourceId`] - fatal for the whole backup.
    pub fn render(&self) -> Result<Value> {
        let mut state = self.state.clone();

        if self.config.apply_nested_name {
            apply_nested_name(&mut state)?;
        }
        apply_custom_location_ref(&mut state);
        scrub_identity(&mut state);
        scrub_volatile(&mut state);

        let Value::Object(fields) = state else {
            return Err(OpsCloneError::Other {
                message: "captured resource record is not a JSON object".to_string(),
            });
        };

        let mut result = Map::new();
        result.insert("apiVersion".to_string(), Value::String(self.api_version.clone()));
        for (key, value) in fields {
            result.insert(key, value);
        }
        if !self.depends_on.is_empty() {
            result.insert(
                "dependsOn".to_string(),
                Value::Array(self.depends_on.iter().map(|d| Value::String(d.resolve())).collect()),
            );
        }
        Ok(Value::Object(result))
    }
}

/// Rewrite `name` from the record's parsed id. Instance-typed resources get
/// template-parameter names so the output is portable; everything else gets
/// the literal slash-joined nested path.
fn apply_nested_name(state: &mut Value) -> Result<()> {
    let id = state.get("id").and_then(Value::as_str).ok_or_else(|| {
        OpsCloneError::MalformedResourceId {
            id: String::new(),
            reason: "captured record has no 'id' field".to_string(),
        }
    })?;
    let parsed = ParsedResourceId::parse(id)?;

    let name = if parsed.resource_type.eq_ignore_ascii_case("instances") {
        if parsed.children.is_empty() {
            parameter_expr(TemplateParam::InstanceName)
        } else {
            let nested = parsed.nested_name();
            let suffix = &nested[parsed.name.len()..];
            instance_nested_name_expr(suffix)
        }
    } else {
        parsed.nested_name()
    };
    state["name"] = Value::String(name);
    Ok(())
}

/// Point `extendedLocation.name` at the custom location the template creates,
/// never the captured literal.
fn apply_custom_location_ref(state: &mut Value) {
    if let Some(ext_loc) = state.get_mut("extendedLocation") {
        ext_loc["name"] = Value::String(custom_location_id_expr());
    }
}

/// `principalId` is environment-specific and regenerated on redeploy.
fn scrub_identity(state: &mut Value) {
    if let Some(identity) = state.get_mut("identity").and_then(Value::as_object_mut) {
        identity.remove("principalId");
    }
}

/// Remove server-assigned fields that would be rejected or silently mask
/// drift on redeploy.
fn scrub_volatile(state: &mut Value) {
    if let Some(obj) = state.as_object_mut() {
        obj.remove("id");
        obj.remove("systemData");
    }
    if let Some(properties) = state.get_mut("properties").and_then(Value::as_object_mut) {
        for key in ["provisioningState", "currentVersion", "statuses", "status"] {
            properties.remove(key);
        }
    }
}

/// Wraps a batch of resources as one nested ARM deployment.
#[derive(Debug, Clone)]
pub struct DeploymentContainer {
    name: String,
    api_version: String,
    inner: Vec<(String, ResourceContainer)>,
    parameters: Option<Map<String, Value>>,
    depends_on: Vec<DependencyRef>,
}

impl DeploymentContainer {
    /// Create an empty deployment batch.
    ///
    /// `name` is the deployment's ARM name (a full `[...]` expression).
    /// `parameters` declares pass-through parameters the inner resources
    /// reference - their rendered names use parameter expressions that must
    /// resolve inside the nested deployment's own scope.
    pub fn new(
        name: impl Into<String>,
        parameters: Option<Map<String, Value>>,
        depends_on: Vec<DependencyRef>,
    ) -> Self {
        Self {
            name: name.into(),
            api_version: DEPLOYMENTS_API_VERSION.to_string(),
            inner: Vec::new(),
            parameters,
            depends_on,
        }
    }

    /// Wrap each record in a [`ResourceContainer`] under a symbolic key
    /// derived from `key` plus a 1-based occurrence suffix (no suffix for the
    /// first). Input order is preserved.
    pub fn add_resources(
        &mut self,
        key: &str,
        api_version: &str,
        records: Vec<Value>,
        depends_on: Vec<DependencyRef>,
        config: ContainerConfig,
    ) {
        for (count, record) in records.into_iter().enumerate() {
            let target_key = if count == 0 {
                key.to_string()
            } else {
                format!("{key}_{}", count + 1)
            };
            self.inner.push((
                target_key,
                ResourceContainer::new(api_version, record, depends_on.clone(), config),
            ));
        }
    }

    /// The deployment's ARM name expression.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inner containers in insertion order.
    pub fn inner(&self) -> &[(String, ResourceContainer)] {
        &self.inner
    }

    /// Number of inner resources.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when no resources were added.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Render the batch as a nested `Microsoft.Resources/deployments` block
    /// carrying its own mini-template. Idempotent.
    pub fn render(&self) -> Result<Value> {
        let rendered: Vec<Value> =
            self.inner.iter().map(|(_, rc)| rc.render()).collect::<Result<_>>()?;

        let mut template = Map::new();
        template.insert(
            "$schema".to_string(),
            json!("https://schema.management.azure.com/schemas/2019-04-01/deploymentTemplate.json#"),
        );
        template.insert("contentVersion".to_string(), json!("1.0.0.0"));
        template.insert("resources".to_string(), Value::Array(rendered));

        let mut properties = Map::new();
        properties.insert("mode".to_string(), json!("Incremental"));

        if let Some(declared) = &self.parameters {
            let mut pass_through = Map::new();
            for name in declared.keys() {
                pass_through
                    .insert(name.clone(), json!({ "value": format!("[parameters('{name}')]") }));
            }
            template.insert("parameters".to_string(), Value::Object(declared.clone()));
            properties.insert("template".to_string(), Value::Object(template));
            properties.insert("parameters".to_string(), Value::Object(pass_through));
        } else {
            properties.insert("template".to_string(), Value::Object(template));
        }

        let mut result = Map::new();
        result.insert("type".to_string(), json!("Microsoft.Resources/deployments"));
        result.insert("apiVersion".to_string(), Value::String(self.api_version.clone()));
        result.insert("name".to_string(), Value::String(self.name.clone()));
        result.insert("properties".to_string(), Value::Object(properties));
        if !self.depends_on.is_empty() {
            result.insert(
                "dependsOn".to_string(),
                Value::Array(self.depends_on.iter().map(|d| Value::String(d.resolve())).collect()),
            );
        }
        Ok(Value::Object(result))
    }
}

/// A top-level entry in the template's resources map.
#[derive(Debug, Clone)]
pub enum Container {
    /// A single resource block.
    Resource(ResourceContainer),
    /// A nested deployment batch.
    Deployment(DeploymentContainer),
}

impl Container {
    /// Render whichever container this is.
    pub fn render(&self) -> Result<Value> {
        match self {
            Self::Resource(rc) => rc.render(),
            Self::Deployment(dc) => dc.render(),
        }
    }
}
