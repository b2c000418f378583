//! Per-scope extraction cache.

use indexmap::IndexMap;
use serde_json::Value;

/// Step name → most recently extracted (or accumulated) values.
///
/// Cleared at the start of every scope run. Later steps read it through
/// `standard` and indexed `iterables` bindings; the parser-final step's entry
/// becomes the scope result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionCache {
    entries: IndexMap<String, Vec<Value>>,
}

impl ExtractionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, step_name: &str) -> Option<&[Value]> {
        self.entries.get(step_name).map(Vec::as_slice)
    }

    /// Stores `values` under `step_name`.
    ///
    /// With `accumulate` the values are appended to an existing entry;
    /// otherwise the entry is replaced.
    pub fn merge(&mut self, step_name: &str, values: Vec<Value>, accumulate: bool) {
        match self.entries.get_mut(step_name) {
            Some(existing) if accumulate => existing.extend(values),
            Some(existing) => *existing = values,
            None => {
                self.entries.insert(step_name.to_string(), values);
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
