//! Response shapes returned by the CMF server.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page of a paginated listing (`display_executions`, `display_artifacts`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Total number of items across all pages
    pub total_items: u64,
    /// Items on this page
    pub items: Vec<Value>,
}

impl Page {
    /// Interpret a response body as a page, if it has the page shape.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.get("total_items").is_some_and(Value::is_u64) {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// Collapse accumulated pages into a single page value.
    pub fn merged(total_items: u64, items: Vec<Value>) -> Value {
        serde_json::json!({
            "total_items": total_items,
            "items": items,
        })
    }
}
