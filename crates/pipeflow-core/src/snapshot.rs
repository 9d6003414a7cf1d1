//! Unsaved-change detection by structural comparison against a saved export.

use serde_json::Value;

/// Holds the export captured at the last load or save.
///
/// Only the exported document is compared, so layout, runtime status and other view state never
/// make the model dirty. Without a baseline nothing is dirty.
#[derive(Debug, Clone, Default)]
pub struct DirtySnapshot {
    baseline: Option<Value>,
}

impl DirtySnapshot {
    pub fn capture(&mut self, current: Value) {
        self.baseline = Some(current);
    }

    pub fn clear(&mut self) {
        self.baseline = None;
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }

    pub fn baseline(&self) -> Option<&Value> {
        self.baseline.as_ref()
    }

    pub fn is_dirty(&self, current: &Value) -> bool {
        self.baseline.as_ref().is_some_and(|b| b != current)
    }
}
