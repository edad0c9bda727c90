//! Structured parsing of ARM resource id strings.
//!
//! ARM resource ids follow the shape:
//!
//! ```text
//! /subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}[/{childType}/{childName}]*
//! ```
//!
//! with the extra wrinkle that a nested `providers` segment restarts the
//! namespace for the segments that follow it (cluster extension ids do this:
//! `.../connectedClusters/c1/providers/Microsoft.KubernetesConfiguration/extensions/ext1`).
//!
//! [`ParsedResourceId`] is an immutable view over one id. Re-joining the
//! parsed segments reconstructs the original id modulo keyword casing, which
//! is what lets the backup pipeline rebuild nested names and `resourceId(...)`
//! template expressions without magic index offsets into a split string.

use crate::core::OpsCloneError;

/// One nested child segment of a resource id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildResource {
    /// Namespace introduced by a nested `providers` segment, if any.
    pub namespace: Option<String>,
    /// The child resource type segment (e.g. `listeners`).
    pub child_type: String,
    /// The child resource name segment.
    pub child_name: String,
}

/// Immutable, structured view of an ARM resource id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResourceId {
    /// Subscription id (GUID string).
    pub subscription: String,
    /// Resource group name.
    pub resource_group: String,
    /// Root provider namespace (e.g. `Microsoft.IoTOperations`).
    pub namespace: String,
    /// Root resource type segment (e.g. `instances`).
    pub resource_type: String,
    /// Root resource name.
    pub name: String,
    /// Nested child segments, outermost first.
    pub children: Vec<ChildResource>,
}

impl ParsedResourceId {
    /// Parse a fully-qualified ARM resource id.
    ///
    /// # Errors
    ///
    /// Returns [`OpsCloneError::MalformedResourceId`] when a structural
    /// keyword (`subscriptions`, `resourceGroups`, `providers`) is missing,
    /// a segment value is empty, or a trailing type segment has no name.
    pub fn parse(id: &str) -> Result<Self, OpsCloneError> {
        let malformed = |reason: &str| OpsCloneError::MalformedResourceId {
            id: id.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = id.trim_matches('/').split('/');

        expect_keyword(&mut segments, "subscriptions").map_err(|r| malformed(&r))?;
        let subscription = segments.next().filter(|s| !s.is_empty());
        expect_keyword(&mut segments, "resourceGroups").map_err(|r| malformed(&r))?;
        let resource_group = segments.next().filter(|s| !s.is_empty());
        expect_keyword(&mut segments, "providers").map_err(|r| malformed(&r))?;
        let namespace = segments.next().filter(|s| !s.is_empty());
        let resource_type = segments.next().filter(|s| !s.is_empty());
        let name = segments.next().filter(|s| !s.is_empty());

        let (Some(subscription), Some(resource_group), Some(namespace)) =
            (subscription, resource_group, namespace)
        else {
            return Err(malformed("empty subscription, resource group or namespace"));
        };
        let (Some(resource_type), Some(name)) = (resource_type, name) else {
            return Err(malformed("missing root resource type/name pair"));
        };

        let mut children = Vec::new();
        let mut child_namespace: Option<String> = None;
        loop {
            let Some(type_seg) = segments.next() else { break };
            if type_seg.eq_ignore_ascii_case("providers") {
                // A nested providers segment restarts the namespace.
                let Some(ns) = segments.next().filter(|s| !s.is_empty()) else {
                    return Err(malformed("nested 'providers' segment without a namespace"));
                };
                child_namespace = Some(ns.to_string());
                continue;
            }
            if type_seg.is_empty() {
                return Err(malformed("empty child type segment"));
            }
            let Some(name_seg) = segments.next().filter(|s| !s.is_empty()) else {
                return Err(malformed(&format!("child type '{type_seg}' has no name segment")));
            };
            children.push(ChildResource {
                namespace: child_namespace.take(),
                child_type: type_seg.to_string(),
                child_name: name_seg.to_string(),
            });
        }

        Ok(Self {
            subscription: subscription.to_string(),
            resource_group: resource_group.to_string(),
            namespace: namespace.to_string(),
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            children,
        })
    }

    /// Slash-joined resource name including every nested child segment, e.g.
    /// `inst/broker1/listener1` for a listener id.
    pub fn nested_name(&self) -> String {
        let mut target = self.name.clone();
        for child in &self.children {
            target.push('/');
            target.push_str(&child.child_name);
        }
        target
    }

    /// The innermost child segment, if any.
    pub fn last_child(&self) -> Option<&ChildResource> {
        self.children.last()
    }

    /// The type segment of the innermost resource (root type when there are
    /// no children).
    pub fn leaf_type(&self) -> &str {
        self.children.last().map_or(self.resource_type.as_str(), |c| c.child_type.as_str())
    }

    /// Rebuild the id string from the parsed segments. Equal to the input of
    /// [`ParsedResourceId::parse`] modulo keyword casing.
    pub fn to_id(&self) -> String {
        let mut id = format!(
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
            self.subscription, self.resource_group, self.namespace, self.resource_type, self.name
        );
        for child in &self.children {
            if let Some(ns) = &child.namespace {
                id.push_str("/providers/");
                id.push_str(ns);
            }
            id.push('/');
            id.push_str(&child.child_type);
            id.push('/');
            id.push_str(&child.child_name);
        }
        id
    }
}

fn expect_keyword<'a, I>(segments: &mut I, keyword: &str) -> Result<(), String>
where
    I: Iterator<Item = &'a str>,
{
    match segments.next() {
        Some(seg) if seg.eq_ignore_ascii_case(keyword) => Ok(()),
        Some(seg) => Err(format!("expected '{keyword}', found '{seg}'")),
        None => Err(format!("missing '{keyword}' segment")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSTANCE_ID: &str = "/subscriptions/aaaa-bbbb/resourceGroups/rg1/providers/Microsoft.IoTOperations/instances/inst1";
    const LISTENER_ID: &str = "/subscriptions/aaaa-bbbb/resourceGroups/rg1/providers/Microsoft.IoTOperations/instances/inst1/brokers/default/listeners/listener1";
    const EXTENSION_ID: &str = "/subscriptions/aaaa-bbbb/resourceGroups/rg1/providers/Microsoft.Kubernetes/connectedClusters/cluster1/providers/Microsoft.KubernetesConfiguration/extensions/azure-iot-operations-x5z2p";
    const SYNC_RULE_ID: &str = "/subscriptions/aaaa-bbbb/resourceGroups/rg1/providers/Microsoft.ExtendedLocation/customLocations/cl1/resourceSyncRules/rsr1";

    #[test]
    fn test_parse_root_resource() {
        let parsed = ParsedResourceId::parse(INSTANCE_ID).unwrap();
        assert_eq!(parsed.subscription, "aaaa-bbbb");
        assert_eq!(parsed.resource_group, "rg1");
        assert_eq!(parsed.namespace, "Microsoft.IoTOperations");
        assert_eq!(parsed.resource_type, "instances");
        assert_eq!(parsed.name, "inst1");
        assert!(parsed.children.is_empty());
        assert_eq!(parsed.nested_name(), "inst1");
        assert_eq!(parsed.leaf_type(), "instances");
    }

    #[test]
    fn test_parse_two_levels_of_children() {
        let parsed = ParsedResourceId::parse(LISTENER_ID).unwrap();
        assert_eq!(parsed.children.len(), 2);
        assert_eq!(parsed.children[0].child_type, "brokers");
        assert_eq!(parsed.children[0].child_name, "default");
        assert_eq!(parsed.children[1].child_type, "listeners");
        assert_eq!(parsed.children[1].child_name, "listener1");
        assert_eq!(parsed.nested_name(), "inst1/default/listener1");
        assert_eq!(parsed.leaf_type(), "listeners");
        assert_eq!(parsed.last_child().unwrap().child_name, "listener1");
    }

    #[test]
    fn test_parse_extension_child_with_nested_providers() {
        let parsed = ParsedResourceId::parse(EXTENSION_ID).unwrap();
        assert_eq!(parsed.namespace, "Microsoft.Kubernetes");
        assert_eq!(parsed.resource_type, "connectedClusters");
        assert_eq!(parsed.name, "cluster1");
        assert_eq!(parsed.children.len(), 1);
        let child = &parsed.children[0];
        assert_eq!(child.namespace.as_deref(), Some("Microsoft.KubernetesConfiguration"));
        assert_eq!(child.child_type, "extensions");
        assert_eq!(child.child_name, "azure-iot-operations-x5z2p");
    }

    #[test]
    fn test_parse_resource_sync_rule_child() {
        let parsed = ParsedResourceId::parse(SYNC_RULE_ID).unwrap();
        assert_eq!(parsed.resource_type, "customLocations");
        assert_eq!(parsed.children.len(), 1);
        assert_eq!(parsed.children[0].child_type, "resourceSyncRules");
        assert!(parsed.children[0].namespace.is_none());
    }

    #[test]
    fn test_round_trip_reconstruction() {
        for id in [INSTANCE_ID, LISTENER_ID, EXTENSION_ID, SYNC_RULE_ID] {
            let parsed = ParsedResourceId::parse(id).unwrap();
            assert_eq!(parsed.to_id(), id);
        }
    }

    #[test]
    fn test_keyword_casing_is_insensitive() {
        let id = "/Subscriptions/s/resourcegroups/rg/Providers/Ns.X/widgets/w1";
        let parsed = ParsedResourceId::parse(id).unwrap();
        assert_eq!(parsed.resource_group, "rg");
        assert_eq!(parsed.name, "w1");
    }

    #[test]
    fn test_missing_subscriptions_keyword() {
        let err = ParsedResourceId::parse("/foo/s/resourceGroups/rg/providers/Ns/t/n").unwrap_err();
        match err {
            OpsCloneError::MalformedResourceId { reason, .. } => {
                assert!(reason.contains("subscriptions"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_missing_providers_keyword() {
        assert!(ParsedResourceId::parse("/subscriptions/s/resourceGroups/rg/Ns/t/n").is_err());
    }

    #[test]
    fn test_odd_trailing_segment_is_rejected() {
        let id = format!("{INSTANCE_ID}/brokers");
        let err = ParsedResourceId::parse(&id).unwrap_err();
        match err {
            OpsCloneError::MalformedResourceId { reason, .. } => {
                assert!(reason.contains("brokers"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_missing_root_name_is_rejected() {
        assert!(
            ParsedResourceId::parse("/subscriptions/s/resourceGroups/rg/providers/Ns/instances")
                .is_err()
        );
    }

    #[test]
    fn test_empty_and_garbage_inputs() {
        assert!(ParsedResourceId::parse("").is_err());
        assert!(ParsedResourceId::parse("/").is_err());
        assert!(ParsedResourceId::parse("not-an-id").is_err());
    }

    #[test]
    fn test_trailing_nested_providers_without_namespace() {
        let id = format!("{INSTANCE_ID}/providers");
        assert!(ParsedResourceId::parse(&id).is_err());
    }
}
