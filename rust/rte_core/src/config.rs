use serde::{Deserialize, Serialize};

use crate::history::DEFAULT_HISTORY_LIMIT;

pub const DEFAULT_PLACEHOLDER: &str = "Write your content here...";

/// Session settings. Missing fields fall back to their defaults, so hosts
/// can pass partial JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Shown while the document is empty.
    pub placeholder: String,
    /// Undo depth; zero keeps every entry.
    pub history_limit: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self { placeholder: DEFAULT_PLACEHOLDER.to_string(), history_limit: DEFAULT_HISTORY_LIMIT }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
