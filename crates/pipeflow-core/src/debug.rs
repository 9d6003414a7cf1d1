//! Runtime debug events and how they map onto node statuses.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::graph::{GraphModel, NodeStatus};
use crate::link::LinkSlot;
use crate::record::{Action, TaskRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugPhase {
    Starting,
    Succeeded,
    Failed,
    #[default]
    #[serde(other)]
    Other,
}

impl DebugPhase {
    fn status(self) -> Option<NodeStatus> {
        match self {
            Self::Starting => Some(NodeStatus::Running),
            Self::Succeeded => Some(NodeStatus::Success),
            Self::Failed => Some(NodeStatus::Error),
            Self::Other => None,
        }
    }
}

/// One message from the runtime's debug stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DebugEvent {
    Hello {
        #[serde(default)]
        timestamp: Option<f64>,
    },
    NextList {
        #[serde(default)]
        task_id: Option<Value>,
        name: String,
        #[serde(default)]
        next_list: Vec<Value>,
        #[serde(default)]
        focus: Option<Value>,
    },
    Recognition {
        name: String,
        #[serde(default)]
        status: DebugPhase,
        #[serde(default)]
        reco_id: Option<Value>,
    },
    Action {
        name: String,
        #[serde(default)]
        status: DebugPhase,
    },
    Task {
        #[serde(default)]
        task_id: Option<Value>,
        #[serde(default)]
        status: DebugPhase,
    },
    #[serde(other)]
    Unknown,
}

impl DebugEvent {
    pub fn parse(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }

    /// Candidate names of a `next_list` event. Entries may be plain names or objects with a
    /// `name` key.
    pub fn candidates(&self) -> Vec<&str> {
        match self {
            Self::NextList { next_list, .. } => next_list
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.as_str()),
                    other => other.get("name").and_then(Value::as_str),
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl GraphModel {
    /// Updates node statuses from a debug event. Records are never touched, so this cannot make
    /// the model dirty. Returns whether any status changed.
    pub fn apply_debug_event(&mut self, event: &DebugEvent) -> bool {
        match event {
            DebugEvent::NextList { name, .. } => self.set_status(name, NodeStatus::Running),
            DebugEvent::Recognition { name, status, .. } | DebugEvent::Action { name, status } => {
                match status.status() {
                    Some(s) => self.set_status(name, s),
                    None => false,
                }
            }
            DebugEvent::Task { status, .. } if *status != DebugPhase::Starting => {
                let running: Vec<String> = self
                    .nodes()
                    .filter(|n| n.status == NodeStatus::Running)
                    .map(|n| n.id.clone())
                    .collect();
                running
                    .iter()
                    .fold(false, |acc, id| self.set_status(id, NodeStatus::Idle) || acc)
            }
            DebugEvent::Task { .. } | DebugEvent::Hello { .. } | DebugEvent::Unknown => false,
        }
    }
}

/// How much of a task a debug run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugMode {
    #[default]
    Full,
    /// Recognize only: no successors, no error branch, no action.
    RecognitionOnly,
}

/// The single-task pipeline sent to the runtime for a debug run.
pub fn debug_task(id: &str, record: &TaskRecord, mode: DebugMode) -> Value {
    let mut record = record.clone();
    if mode == DebugMode::RecognitionOnly {
        record.next = Some(LinkSlot::List(Vec::new()));
        record.on_error = Some(LinkSlot::List(Vec::new()));
        record.timeout_next = None;
        record.action = Some(Action::DoNothing);
    }
    let mut out = Map::new();
    out.insert(id.to_string(), record.to_value());
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn events_parse_by_type() {
        let event = DebugEvent::parse(
            r#"{"type":"next_list","task_id":7,"name":"Start","next_list":["A",{"name":"B","jump_back":true}],"timestamp":1}"#,
        )
        .expect("event");
        assert_eq!(event.candidates(), ["A", "B"]);

        let event = DebugEvent::parse(r#"{"type":"recognition","name":"A","status":"succeeded","reco_id":"12"}"#)
            .expect("event");
        assert!(matches!(event, DebugEvent::Recognition { status: DebugPhase::Succeeded, .. }));

        let event = DebugEvent::parse(r#"{"type":"heartbeat"}"#).expect("event");
        assert_eq!(event, DebugEvent::Unknown);
    }

    #[test]
    fn recognition_only_strips_successors_and_action() {
        let record = TaskRecord::from_value(
            "A",
            json!({"recognition": "OCR", "action": "Click", "next": ["B"], "on_error": "C"}),
        )
        .expect("record");
        let task = debug_task("A", &record, DebugMode::RecognitionOnly);
        assert_eq!(
            task,
            json!({"A": {"recognition": "OCR", "action": "DoNothing", "next": [], "on_error": []}})
        );
        let full = debug_task("A", &record, DebugMode::Full);
        assert_eq!(full["A"]["next"], json!(["B"]));
    }
}
