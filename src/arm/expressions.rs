//! ARM template expression builders.
//!
//! The backup pipeline never embeds captured names or ids verbatim for
//! anything that must be portable across environments; it emits template
//! expressions over a small set of input parameters instead. This module
//! centralizes those expressions so the exact bracket/quote shapes live in
//! one place.

use serde_json::{Value, json};

use crate::arm::resource_id::ParsedResourceId;
use crate::core::OpsCloneError;

/// Input parameters declared by every generated template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateParam {
    /// Name of the target Arc-connected cluster.
    ClusterName,
    /// Name of the IoT Operations instance to create.
    InstanceName,
    /// Short unique suffix derived from cluster and instance names.
    ResourceSlug,
    /// Name of the custom location to create.
    CustomLocationName,
    /// Resource id of the schema registry the instance references.
    SchemaRegistryId,
}

impl TemplateParam {
    /// The parameter name as it appears in the template.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClusterName => "clusterName",
            Self::InstanceName => "instanceName",
            Self::ResourceSlug => "resourceSlug",
            Self::CustomLocationName => "customLocationName",
            Self::SchemaRegistryId => "schemaRegistryId",
        }
    }
}

/// `[parameters('x')]` - a standalone parameter reference expression.
pub fn parameter_expr(param: TemplateParam) -> String {
    format!("[parameters('{}')]", param.as_str())
}

/// `parameters('x')` - a parameter reference usable inside a larger expression.
pub fn parameter_ref(param: TemplateParam) -> String {
    format!("parameters('{}')", param.as_str())
}

/// `[variables('x')]` - a standalone variable reference expression.
pub fn variable_expr(name: &str) -> String {
    format!("[variables('{name}')]")
}

/// Instance name with a nested child suffix, e.g.
/// `[concat(parameters('instanceName'), '/broker1/listener1')]`.
pub fn instance_nested_name_expr(suffix: &str) -> String {
    format!("[concat(parameters('instanceName'), '{suffix}')]")
}

/// Resource id of the target connected cluster.
pub fn cluster_id_expr() -> String {
    format!(
        "[resourceId('Microsoft.Kubernetes/connectedClusters', {})]",
        parameter_ref(TemplateParam::ClusterName)
    )
}

/// Resource id of the custom location being created.
pub fn custom_location_id_expr() -> String {
    format!(
        "[resourceId('Microsoft.ExtendedLocation/customLocations', {})]",
        parameter_ref(TemplateParam::CustomLocationName)
    )
}

/// Resource id of the instance being created.
pub fn instance_id_expr() -> String {
    format!(
        "[resourceId('microsoft.iotoperations/instances', {})]",
        parameter_ref(TemplateParam::InstanceName)
    )
}

/// Cluster extension id for an extension with a literal name.
pub fn extension_id_literal(name: &str) -> String {
    format!(
        "[concat(resourceId('Microsoft.Kubernetes/connectedClusters', {}), \
         '/providers/Microsoft.KubernetesConfiguration/extensions/{name}')]",
        parameter_ref(TemplateParam::ClusterName)
    )
}

/// Cluster extension id for an extension whose name is a template variable.
pub fn extension_id_variable(variable: &str) -> String {
    format!(
        "[concat(resourceId('Microsoft.Kubernetes/connectedClusters', {}), \
         '/providers/Microsoft.KubernetesConfiguration/extensions/', variables('{variable}'))]",
        parameter_ref(TemplateParam::ClusterName)
    )
}

/// `resourceId(...)` expression for an instance-rooted resource: the root
/// name segment is replaced by the `instanceName` parameter and nested child
/// names are carried over as literals.
///
/// For a listener id this yields
/// `[resourceId('t', parameters('instanceName'), 'default', 'listener1')]`.
pub fn resource_id_expr(resource_type: &str, resource_id: &str) -> Result<String, OpsCloneError> {
    let parsed = ParsedResourceId::parse(resource_id)?;
    let mut name_args = parameter_ref(TemplateParam::InstanceName);
    for child in &parsed.children {
        name_args.push_str(&format!(", '{}'", child.child_name));
    }
    Ok(format!("[resourceId('{resource_type}', {name_args})]"))
}

/// `resourceId(...)` expression for a nested deployment whose ARM name is
/// itself an expression fragment (a `concat(...)` without outer brackets).
pub fn deployment_id_expr(deployment_name: &str) -> String {
    format!("[resourceId('Microsoft.Resources/deployments', {deployment_name})]")
}

/// Build one template parameter declaration, `name -> {"type": ..., ...}`.
pub fn build_parameter(
    name: &str,
    default: Option<Value>,
) -> (String, Value) {
    let mut decl = json!({ "type": "string" });
    if let Some(default) = default {
        decl["defaultValue"] = default;
    }
    (name.to_string(), decl)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_expressions() {
        assert_eq!(parameter_expr(TemplateParam::InstanceName), "[parameters('instanceName')]");
        assert_eq!(parameter_ref(TemplateParam::ClusterName), "parameters('clusterName')");
        assert_eq!(variable_expr("aioExtName"), "[variables('aioExtName')]");
    }

    #[test]
    fn test_cluster_and_custom_location_ids() {
        assert_eq!(
            cluster_id_expr(),
            "[resourceId('Microsoft.Kubernetes/connectedClusters', parameters('clusterName'))]"
        );
        assert_eq!(
            custom_location_id_expr(),
            "[resourceId('Microsoft.ExtendedLocation/customLocations', parameters('customLocationName'))]"
        );
    }

    #[test]
    fn test_extension_id_shapes() {
        assert_eq!(
            extension_id_literal("ext-1"),
            "[concat(resourceId('Microsoft.Kubernetes/connectedClusters', parameters('clusterName')), \
             '/providers/Microsoft.KubernetesConfiguration/extensions/ext-1')]"
        );
        assert_eq!(
            extension_id_variable("aioExtName"),
            "[concat(resourceId('Microsoft.Kubernetes/connectedClusters', parameters('clusterName')), \
             '/providers/Microsoft.KubernetesConfiguration/extensions/', variables('aioExtName'))]"
        );
    }

    #[test]
    fn test_resource_id_expr_carries_child_names() {
        let id = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.IoTOperations/instances/inst1/brokers/default";
        assert_eq!(
            resource_id_expr("microsoft.iotoperations/instances/brokers", id).unwrap(),
            "[resourceId('microsoft.iotoperations/instances/brokers', parameters('instanceName'), 'default')]"
        );
    }

    #[test]
    fn test_resource_id_expr_root_resource() {
        let id = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.IoTOperations/instances/inst1";
        assert_eq!(
            resource_id_expr("microsoft.iotoperations/instances", id).unwrap(),
            "[resourceId('microsoft.iotoperations/instances', parameters('instanceName'))]"
        );
    }

    #[test]
    fn test_deployment_id_expr() {
        assert_eq!(
            deployment_id_expr("concat(parameters('resourceSlug'), '_dataflowProfiles_1')"),
            "[resourceId('Microsoft.Resources/deployments', concat(parameters('resourceSlug'), '_dataflowProfiles_1'))]"
        );
    }

    #[test]
    fn test_build_parameter() {
        let (name, decl) = build_parameter("clusterName", None);
        assert_eq!(name, "clusterName");
        assert_eq!(decl, serde_json::json!({"type": "string"}));

        let (_, decl) = build_parameter("resourceSlug", Some("abc".into()));
        assert_eq!(decl["defaultValue"], "abc");
    }
}
