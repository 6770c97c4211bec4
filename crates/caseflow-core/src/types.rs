use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Accumulated workflow variables.
///
/// Keys are only ever added or overwritten, never deleted; activity outputs
/// are stored under a `{activity_id}.{output_name}` prefix so every value
/// carries its provenance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Variables {
    entries: HashMap<String, Value>,
}

impl Variables {
    /// Create an empty variable map
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a variable map from plain key-value pairs
    pub fn from_map(entries: HashMap<String, Value>) -> Self {
        Self { entries }
    }

    /// Get a value by its full key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Get an activity-scoped value
    pub fn get_scoped(&self, activity_id: &str, name: &str) -> Option<&Value> {
        self.entries.get(&format!("{}.{}", activity_id, name))
    }

    /// Set a value by its full key, overwriting any previous value
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    /// Merge an activity's output under its id prefix
    pub fn merge_output(&mut self, activity_id: &str, output: HashMap<String, Value>) {
        for (name, value) in output {
            self.entries
                .insert(format!("{}.{}", activity_id, name), value);
        }
    }

    /// Whether a full key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of accumulated keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }
}

/// Operator-supplied input carried into a resumed activity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResumeInput {
    /// Who completed the external step
    pub completed_by: String,

    /// Decision and form fields submitted with the completion
    pub data: HashMap<String, Value>,
}

impl ResumeInput {
    /// Create a resume input with no payload
    pub fn new(completed_by: impl Into<String>) -> Self {
        Self {
            completed_by: completed_by.into(),
            data: HashMap::new(),
        }
    }

    /// Attach a payload field
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.data.insert(name.into(), value);
        self
    }

    /// The conventional decision field, if submitted
    pub fn decision(&self) -> Option<&str> {
        self.data.get("decision").and_then(|v| v.as_str())
    }
}
