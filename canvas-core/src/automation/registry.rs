use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::{json, Value};

static BUILTIN_SCHEMAS: Lazy<HashMap<String, Value>> = Lazy::new(|| {
    let mut schemas = HashMap::new();
    schemas.insert(
        "textNote".to_string(),
        json!({
            "type": "object",
            "description": "Free text produced from the connected inputs",
            "properties": { "text": { "type": "string" } }
        }),
    );
    schemas.insert(
        "summary".to_string(),
        json!({
            "type": "object",
            "description": "Condensed summary of every connected input",
            "properties": {
                "title": { "type": "string" },
                "summary": { "type": "string" }
            }
        }),
    );
    schemas.insert(
        "table".to_string(),
        json!({
            "type": "object",
            "description": "Rows extracted from the connected inputs",
            "properties": {
                "columns": { "type": "array", "items": { "type": "string" } },
                "rows": { "type": "array", "items": { "type": "object" } }
            }
        }),
    );
    schemas
});

/// Maps node data types to the input schema handed to the agent.
///
/// Types without a schema cannot be automated.
#[derive(Clone, Debug, Default)]
pub struct InputSchemaRegistry {
    schemas: HashMap<String, Value>,
}

impl InputSchemaRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry seeded with the built-in node types.
    pub fn builtin() -> Self {
        Self {
            schemas: BUILTIN_SCHEMAS.clone(),
        }
    }

    pub fn with_schema(mut self, node_type: impl Into<String>, schema: Value) -> Self {
        self.schemas.insert(node_type.into(), schema);
        self
    }

    pub fn get(&self, node_type: &str) -> Option<&Value> {
        self.schemas.get(node_type)
    }

    pub fn node_types(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}
