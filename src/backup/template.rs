//! Final template document assembly.
//!
//! [`TemplateGen`] owns the top-level scaffolding of the output ARM template
//! (languageVersion 2.0, symbolic resources map) and merges in the
//! parameters, variables, metadata, and rendered containers the analysis
//! phases accumulate. Scaffold keys that end up empty are pruned so the
//! written document carries no hollow `"outputs": {}` noise.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value, json};

use crate::backup::container::Container;
use crate::utils::fs::atomic_write;

const TEMPLATE_SCHEMA: &str =
    "https://schema.management.azure.com/schemas/2019-04-01/deploymentTemplate.json#";

/// Accumulates template inputs and renders the final document.
#[derive(Debug, Default)]
pub struct TemplateGen {
    parameters: Map<String, Value>,
    variables: Map<String, Value>,
    metadata: Map<String, Value>,
}

impl TemplateGen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare one template parameter. Last declaration of a name wins.
    pub fn add_parameter(&mut self, name: impl Into<String>, declaration: Value) {
        self.parameters.insert(name.into(), declaration);
    }

    /// Set one template variable.
    pub fn add_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    /// Record one metadata entry.
    pub fn add_metadata(&mut self, name: impl Into<String>, value: Value) {
        self.metadata.insert(name.into(), value);
    }

    /// Declared parameters, in declaration order.
    pub fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }

    /// Render the full template document from the accumulated inputs plus
    /// the given symbolic container map.
    pub fn render(&self, containers: &[(String, Container)]) -> Result<Value> {
        let mut resources = Map::new();
        for (key, container) in containers {
            resources.insert(key.clone(), container.render()?);
        }

        let mut document = Map::new();
        document.insert("$schema".to_string(), json!(TEMPLATE_SCHEMA));
        document.insert("languageVersion".to_string(), json!("2.0"));
        document.insert("contentVersion".to_string(), json!("1.0.0.0"));
        document.insert("apiProfile".to_string(), json!(""));
        document.insert("metadata".to_string(), Value::Object(self.metadata.clone()));
        document.insert("definitions".to_string(), json!({}));
        document.insert("parameters".to_string(), Value::Object(self.parameters.clone()));
        document.insert("variables".to_string(), Value::Object(self.variables.clone()));
        document.insert("functions".to_string(), json!([]));
        document.insert("resources".to_string(), Value::Object(resources));
        document.insert("outputs".to_string(), json!({}));

        document.retain(|_, value| !is_empty_value(value));
        Ok(Value::Object(document))
    }

    /// Render and write the document to `path` as pretty-printed JSON.
    pub fn write(&self, containers: &[(String, Container)], path: &Path) -> Result<()> {
        let document = self.render(containers)?;
        let mut body = serde_json::to_string_pretty(&document)
            .context("serializing backup template")?;
        body.push('\n');
        atomic_write(path, body.as_bytes())
            .with_context(|| format!("writing backup template to {}", path.display()))
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}
