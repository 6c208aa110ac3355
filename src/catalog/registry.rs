/// Hot-swappable catalog registry using ArcSwap
///
/// The toolbox can learn new task templates at runtime (pasted as JSON). Each
/// addition swaps the whole catalog pointer, so editors that already hold an
/// `Arc<NodeCatalog>` keep the catalog they were constructed with.

use crate::catalog::{task_schema, CatalogEntry, NodeCatalog};
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// A reusable task definition imported from JSON
///
/// Example: `{ "node": "Fetch user", "url": "https://...", "retryCount": 3 }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTemplate {
    #[serde(default = "default_template_name")]
    pub node: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub headers: Map<String, Value>,
    #[serde(default)]
    pub input_parameters: Vec<String>,
    pub retry_count: Option<u64>,
    pub retry_delay_seconds: Option<u64>,
    pub timeout_milliseconds: Option<u64>,
}

fn default_template_name() -> String {
    "New Task".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<TaskTemplate>),
    One(TaskTemplate),
}

impl TaskTemplate {
    /// Parse a single template object or an array of them
    pub fn parse_many(json: &str) -> Result<Vec<TaskTemplate>, serde_json::Error> {
        Ok(match serde_json::from_str::<OneOrMany>(json)? {
            OneOrMany::Many(templates) => templates,
            OneOrMany::One(template) => vec![template],
        })
    }

    /// Type tag derived from the template name ("Fetch user" -> "task-fetch-user")
    pub fn node_type(&self) -> String {
        let mut slug = String::with_capacity(self.node.len());
        for ch in self.node.trim().chars() {
            if ch.is_ascii_alphanumeric() {
                slug.push(ch.to_ascii_lowercase());
            } else if !slug.ends_with('-') {
                slug.push('-');
            }
        }
        format!("task-{}", slug.trim_matches('-'))
    }

    /// Catalog entry using the task schema with this template's values as defaults
    pub fn to_entry(&self) -> CatalogEntry {
        let mut schema = task_schema();
        for field in schema.iter_mut() {
            let value = match field.name.as_str() {
                "url" if !self.url.trim().is_empty() => Some(Value::String(self.url.trim().to_string())),
                "headers" if !self.headers.is_empty() => Some(Value::Object(self.headers.clone())),
                "inputParameters" => Some(Value::from(self.input_parameters.clone())),
                "retryCount" => self.retry_count.map(Value::from),
                "retryDelaySeconds" => self.retry_delay_seconds.map(Value::from),
                "timeoutMilliseconds" => self.timeout_milliseconds.map(Value::from),
                _ => None,
            };
            if value.is_some() {
                field.default = value;
            }
        }
        CatalogEntry::new(&self.node_type(), self.node.trim(), schema)
    }
}

/// Lock-free catalog holder shared by the HTTP host
#[derive(Debug)]
pub struct CatalogRegistry {
    catalog: ArcSwap<NodeCatalog>,
}

impl CatalogRegistry {
    pub fn new(catalog: NodeCatalog) -> Self {
        Self {
            catalog: ArcSwap::new(Arc::new(catalog)),
        }
    }

    /// Current catalog (cheap Arc clone)
    pub fn current(&self) -> Arc<NodeCatalog> {
        self.catalog.load_full()
    }

    /// Add a task template; returns false when its name or type already exists
    ///
    /// A writer that raced with another retries against the newer catalog.
    pub fn register_template(&self, template: &TaskTemplate) -> bool {
        let entry = template.to_entry();
        let mut registered = false;

        self.catalog.rcu(|current| match current.with_entry(entry.clone()) {
            Some(next) => {
                registered = true;
                Arc::new(next)
            }
            None => {
                registered = false;
                Arc::clone(current)
            }
        });

        if registered {
            tracing::info!("🧩 Registered task template '{}' as {}", template.node.trim(), template.node_type());
        } else {
            tracing::debug!("Task template '{}' already in catalog", template.node.trim());
        }
        registered
    }

    /// Register several templates, returning how many were new
    pub fn register_templates(&self, templates: &[TaskTemplate]) -> usize {
        templates
            .iter()
            .filter(|template| self.register_template(template))
            .count()
    }
}

impl Default for CatalogRegistry {
    fn default() -> Self {
        Self::new(NodeCatalog::builtin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_single_and_array() {
        let one = TaskTemplate::parse_many(r#"{"node": "Fetch user", "retryCount": 3}"#).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].retry_count, Some(3));

        let many = TaskTemplate::parse_many(r#"[{"node": "A"}, {"node": "B"}]"#).unwrap();
        assert_eq!(many.len(), 2);

        let unnamed = TaskTemplate::parse_many("{}").unwrap();
        assert_eq!(unnamed[0].node, "New Task");
    }

    #[test]
    fn test_template_entry_uses_template_defaults() {
        let template = TaskTemplate::parse_many(
            r#"{"node": "Fetch user!", "url": " https://api.test/users ", "timeoutMilliseconds": 5000}"#,
        )
        .unwrap()
        .remove(0);

        assert_eq!(template.node_type(), "task-fetch-user");
        let entry = template.to_entry();
        assert_eq!(entry.default_label, "Fetch user!");
        assert_eq!(entry.field("url").unwrap().default, Some(json!("https://api.test/users")));
        assert_eq!(entry.field("timeoutMilliseconds").unwrap().default, Some(json!(5000)));
        assert_eq!(entry.field("retryCount").unwrap().default, Some(json!(1)));
    }

    #[test]
    fn test_register_template_swaps_catalog_once() {
        let registry = CatalogRegistry::default();
        let before = registry.current();
        let template = TaskTemplate::parse_many(r#"{"node": "Notify"}"#).unwrap().remove(0);

        assert!(registry.register_template(&template));
        assert!(!registry.register_template(&template));

        assert!(!before.contains("task-notify"));
        assert!(registry.current().contains("task-notify"));
        assert_eq!(registry.current().len(), before.len() + 1);
    }

    #[test]
    fn test_concurrent_registrations_keep_every_template() {
        use std::sync::Barrier;
        use std::thread;

        const WRITERS: usize = 8;
        for _ in 0..50 {
            let registry = Arc::new(CatalogRegistry::default());
            let baseline = registry.current().len();
            let barrier = Arc::new(Barrier::new(WRITERS));

            let handles: Vec<_> = (0..WRITERS)
                .map(|i| {
                    let registry = Arc::clone(&registry);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        let template = TaskTemplate::parse_many(&format!(r#"{{"node": "Step {}"}}"#, i))
                            .unwrap()
                            .remove(0);
                        barrier.wait();
                        registry.register_template(&template)
                    })
                })
                .collect();
            let registered = handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .filter(|&added| added)
                .count();

            assert_eq!(registered, WRITERS);
            assert_eq!(registry.current().len(), baseline + registered);
            for i in 0..WRITERS {
                assert!(registry.current().contains(&format!("task-step-{}", i)));
            }
        }
    }

    #[test]
    fn test_register_template_rejects_builtin_label() {
        let registry = CatalogRegistry::default();
        let templates = TaskTemplate::parse_many(r#"[{"node": "Fork"}, {"node": "Audit"}]"#).unwrap();
        assert_eq!(registry.register_templates(&templates), 1);
    }
}
