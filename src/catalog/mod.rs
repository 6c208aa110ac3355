/// Node catalog: the read-only set of task types offered by the toolbox
///
/// Each entry names a node type, the label a freshly placed node receives and the
/// schema of the attributes the configuration panel may edit. Node configs are
/// untyped JSON maps; the schema is what recovers type safety per node type.

pub mod registry;

use crate::editor::{GraphError, NodeConfig};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;

pub use registry::{CatalogRegistry, TaskTemplate};

/// Kind of value a config field accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text (description, url)
    Text,
    /// Non-negative integer (retry count, timeout in milliseconds)
    Integer,
    /// Flag (restartable)
    Boolean,
    /// Ordered list of strings (input parameters)
    StringList,
    /// JSON object (request headers)
    Object,
}

impl FieldKind {
    /// Check whether a JSON value has the shape this kind requires
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldKind::Text => value.is_string(),
            FieldKind::Integer => value.is_u64(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            FieldKind::Object => value.is_object(),
        }
    }

    /// Parse raw text typed into a form field into a value of this kind
    ///
    /// Object fields take JSON text; a blank object field parses to `{}`.
    /// String lists take comma separated items.
    pub fn parse_text(&self, raw: &str) -> Result<Value, String> {
        let trimmed = raw.trim();
        match self {
            FieldKind::Text => Ok(Value::String(trimmed.to_string())),
            FieldKind::Integer => trimmed
                .parse::<u64>()
                .map(Value::from)
                .map_err(|_| format!("expected a non-negative integer, got '{}'", trimmed)),
            FieldKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(Value::Bool(true)),
                "false" | "no" | "0" | "" => Ok(Value::Bool(false)),
                other => Err(format!("expected true or false, got '{}'", other)),
            },
            FieldKind::StringList => Ok(Value::Array(
                trimmed
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(|item| Value::String(item.to_string()))
                    .collect(),
            )),
            FieldKind::Object => {
                if trimmed.is_empty() {
                    return Ok(json!({}));
                }
                match serde_json::from_str::<Value>(trimmed) {
                    Ok(value) if value.is_object() => Ok(value),
                    Ok(_) => Err("expected a JSON object".to_string()),
                    Err(_) => Err("invalid JSON format".to_string()),
                }
            }
        }
    }
}

/// One editable attribute in a node type's schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    /// Value shown in the panel until the node overrides it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldSpec {
    pub fn new(name: &str, kind: FieldKind, default: Option<Value>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            default,
        }
    }
}

/// A task type that can be placed on the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Type tag stored on every node of this type (e.g. "task", "fork")
    #[serde(rename = "type")]
    pub node_type: String,
    /// Label given to newly placed nodes
    pub default_label: String,
    #[serde(default)]
    pub config_schema: Vec<FieldSpec>,
}

impl CatalogEntry {
    pub fn new(node_type: &str, default_label: &str, config_schema: Vec<FieldSpec>) -> Self {
        Self {
            node_type: node_type.to_string(),
            default_label: default_label.to_string(),
            config_schema,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.config_schema.iter().find(|field| field.name == name)
    }

    /// Validate a single config value against this entry's schema
    pub fn validate(&self, name: &str, value: &Value) -> Result<(), GraphError> {
        let field = self.field(name).ok_or_else(|| GraphError::InvalidConfig {
            field: name.to_string(),
            reason: format!("not an attribute of node type '{}'", self.node_type),
        })?;

        if field.kind.accepts(value) {
            Ok(())
        } else {
            Err(GraphError::InvalidConfig {
                field: name.to_string(),
                reason: format!("expected {:?} value", field.kind),
            })
        }
    }

    /// Effective config of a node: schema defaults overlaid with its own values
    pub fn resolve(&self, config: &NodeConfig) -> NodeConfig {
        let mut resolved: NodeConfig = self
            .config_schema
            .iter()
            .filter_map(|field| field.default.clone().map(|value| (field.name.clone(), value)))
            .collect();
        for (name, value) in config {
            resolved.insert(name.clone(), value.clone());
        }
        resolved
    }
}

/// Ordered, read-only list of node types
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeCatalog {
    entries: Vec<CatalogEntry>,
}

impl NodeCatalog {
    /// Build a catalog; later entries with an already used type tag are dropped
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        let mut unique: Vec<CatalogEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            if unique.iter().any(|e| e.node_type == entry.node_type) {
                tracing::warn!("Duplicate catalog type ignored: {}", entry.node_type);
                continue;
            }
            unique.push(entry);
        }
        Self { entries: unique }
    }

    /// Built-in toolbox: start, end, fork and a generic task
    pub fn builtin() -> Self {
        Self::new(vec![
            CatalogEntry::new("start", "Start", task_schema()),
            CatalogEntry::new("end", "End", task_schema()),
            CatalogEntry::new("fork", "Fork", task_schema()),
            CatalogEntry::new("task", "Task", task_schema()),
        ])
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(json)?;
        Ok(Self::new(entries))
    }

    /// Load a catalog from a JSON file (array of entries)
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read catalog '{}': {}", path.display(), e))?;
        let catalog = Self::from_json(&raw)?;
        tracing::info!("Loaded {} catalog entries from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn get(&self, node_type: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.node_type == node_type)
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.get(node_type).is_some()
    }

    /// Validate one config value for a node type
    pub fn validate(&self, node_type: &str, field: &str, value: &Value) -> Result<(), GraphError> {
        self.get(node_type)
            .ok_or_else(|| GraphError::InvalidType(node_type.to_string()))?
            .validate(field, value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Toolbox search: case-insensitive match on the label, sorted by label
    pub fn search(&self, query: &str) -> Vec<&CatalogEntry> {
        let needle = query.trim().to_lowercase();
        let mut found: Vec<&CatalogEntry> = self
            .entries
            .iter()
            .filter(|entry| entry.default_label.to_lowercase().contains(&needle))
            .collect();
        found.sort_by(|a, b| a.default_label.cmp(&b.default_label));
        found
    }

    /// Copy of this catalog with one more entry, or `None` if the type or label is taken
    pub fn with_entry(&self, entry: CatalogEntry) -> Option<Self> {
        let taken = self.entries.iter().any(|e| {
            e.node_type == entry.node_type || e.default_label == entry.default_label
        });
        if taken {
            return None;
        }
        let mut entries = self.entries.clone();
        entries.push(entry);
        Some(Self { entries })
    }
}

/// Attributes every built-in node type exposes in the configuration panel
pub fn task_schema() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("description", FieldKind::Text, None),
        FieldSpec::new("url", FieldKind::Text, None),
        FieldSpec::new("headers", FieldKind::Object, None),
        FieldSpec::new("inputParameters", FieldKind::StringList, Some(json!([]))),
        FieldSpec::new("retryCount", FieldKind::Integer, Some(json!(1))),
        FieldSpec::new("retryDelaySeconds", FieldKind::Integer, Some(json!(1))),
        FieldSpec::new("timeoutMilliseconds", FieldKind::Integer, Some(json!(1000))),
        FieldSpec::new("restartable", FieldKind::Boolean, Some(json!(false))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_order() {
        let catalog = NodeCatalog::builtin();
        let types: Vec<&str> = catalog.entries().iter().map(|e| e.node_type.as_str()).collect();
        assert_eq!(types, vec!["start", "end", "fork", "task"]);
        assert_eq!(catalog.get("task").unwrap().default_label, "Task");
    }

    #[test]
    fn test_search_is_case_insensitive_and_sorted() {
        let catalog = NodeCatalog::builtin();
        let labels: Vec<&str> = catalog
            .search("T")
            .iter()
            .map(|e| e.default_label.as_str())
            .collect();
        assert_eq!(labels, vec!["Start", "Task"]);
        assert_eq!(catalog.search("").len(), 4);
    }

    #[test]
    fn test_validate_rejects_unknown_field_and_wrong_kind() {
        let catalog = NodeCatalog::builtin();
        let task = catalog.get("task").unwrap();

        assert!(task.validate("retryCount", &json!(3)).is_ok());
        assert!(matches!(
            task.validate("retryCount", &json!("three")),
            Err(GraphError::InvalidConfig { .. })
        ));
        assert!(matches!(
            task.validate("color", &json!("red")),
            Err(GraphError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_resolve_overlays_defaults() {
        let catalog = NodeCatalog::builtin();
        let task = catalog.get("task").unwrap();
        let mut config = NodeConfig::new();
        config.insert("retryCount".to_string(), json!(5));

        let resolved = task.resolve(&config);
        assert_eq!(resolved["retryCount"], json!(5));
        assert_eq!(resolved["timeoutMilliseconds"], json!(1000));
        assert!(!resolved.contains_key("url"));
    }

    #[test]
    fn test_parse_text_object_field() {
        assert_eq!(FieldKind::Object.parse_text("  ").unwrap(), json!({}));
        assert_eq!(
            FieldKind::Object.parse_text(r#"{"Accept": "application/json"}"#).unwrap(),
            json!({"Accept": "application/json"})
        );
        assert_eq!(
            FieldKind::Object.parse_text("{not json").unwrap_err(),
            "invalid JSON format"
        );
        assert!(FieldKind::Object.parse_text("[1, 2]").is_err());
    }

    #[test]
    fn test_parse_text_scalars() {
        assert_eq!(FieldKind::Integer.parse_text(" 250 ").unwrap(), json!(250));
        assert!(FieldKind::Integer.parse_text("-1").is_err());
        assert_eq!(FieldKind::Boolean.parse_text("Yes").unwrap(), json!(true));
        assert_eq!(
            FieldKind::StringList.parse_text("userId, , orderId").unwrap(),
            json!(["userId", "orderId"])
        );
    }

    #[test]
    fn test_catalog_from_json_drops_duplicate_types() {
        let catalog = NodeCatalog::from_json(
            r#"[
                {"type": "task", "defaultLabel": "Task"},
                {"type": "task", "defaultLabel": "Other"}
            ]"#,
        )
        .unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("task").unwrap().config_schema.is_empty());
    }
}
