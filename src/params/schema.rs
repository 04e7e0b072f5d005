// src/params/schema.rs

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value, json};

/// One node of the parameter schema tree.
///
/// Interior nodes group children; leaves describe a value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaNode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, SchemaNode>,
}

impl SchemaNode {
    /// Walk to `path`, creating missing nodes.
    pub fn resolve_mut(&mut self, path: &[String]) -> &mut SchemaNode {
        path.iter().fold(self, |node, segment| {
            node.children.entry(segment.clone()).or_default()
        })
    }

    pub fn get(&self, path: &[String]) -> Option<&SchemaNode> {
        path.iter()
            .try_fold(self, |node, segment| node.children.get(segment))
    }

    pub fn declare_optional(&mut self, default: Value) -> &mut Self {
        self.value_type = Some(json_type(&default).to_string());
        self.default = Some(default);
        self.required = false;
        self
    }

    /// `sample` is a value of the declared type, only used to name the type.
    pub fn declare_required(&mut self, sample: &Value) -> &mut Self {
        self.value_type = Some(json_type(sample).to_string());
        self.default = None;
        self.required = true;
        self
    }

    pub fn document_title(&mut self, title: impl Into<String>) -> &mut Self {
        self.title = Some(title.into());
        self
    }

    pub fn document_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    pub fn allow_values(&mut self, values: impl IntoIterator<Item = Value>) -> &mut Self {
        self.allowed_values = values.into_iter().collect();
        self
    }

    /// JSON-Schema flavoured rendering of this subtree.
    pub fn to_json_schema(&self) -> Value {
        if !self.children.is_empty() {
            let properties: Map<String, Value> = self
                .children
                .iter()
                .map(|(name, child)| (name.clone(), child.to_json_schema()))
                .collect();
            let required: Vec<&String> = self
                .children
                .iter()
                .filter(|(_, child)| child.requires_value())
                .map(|(name, _)| name)
                .collect();
            return json!({
                "type": "object",
                "properties": properties,
                "required": required,
            });
        }

        let mut out = Map::new();
        if let Some(t) = &self.value_type {
            out.insert("type".into(), Value::String(t.clone()));
        }
        if let Some(d) = &self.default {
            out.insert("default".into(), d.clone());
        }
        if let Some(t) = &self.title {
            out.insert("title".into(), Value::String(t.clone()));
        }
        if let Some(d) = &self.description {
            out.insert("description".into(), Value::String(d.clone()));
        }
        if !self.allowed_values.is_empty() {
            out.insert("enum".into(), Value::Array(self.allowed_values.clone()));
        }
        Value::Object(out)
    }

    fn requires_value(&self) -> bool {
        self.required || self.children.values().any(SchemaNode::requires_value)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> Vec<String> {
        p.split('/').map(String::from).collect()
    }

    #[test]
    fn required_leaf_propagates_to_parent_required_list() {
        let mut root = SchemaNode::default();
        root.resolve_mut(&path("algorithm/ingest/threshold"))
            .declare_required(&json!(0.0));
        root.resolve_mut(&path("algorithm/ingest/mode"))
            .declare_optional(json!("fast"))
            .allow_values([json!("fast"), json!("slow")]);

        let schema = root.to_json_schema();
        assert_eq!(schema["required"], json!(["algorithm"]));
        let ingest = &schema["properties"]["algorithm"]["properties"]["ingest"];
        assert_eq!(ingest["required"], json!(["threshold"]));
        assert_eq!(ingest["properties"]["threshold"]["type"], "number");
        assert_eq!(ingest["properties"]["mode"]["enum"], json!(["fast", "slow"]));
    }
}
