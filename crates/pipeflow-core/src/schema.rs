//! Parameter schema: which keys a record may carry, what shape they take, and which
//! recognition or action kinds read them.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::record::{TaskRecord, json_type_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Bool,
    Integer,
    Number,
    Text,
    /// A string or a list of strings.
    TextOrList,
    /// `[x, y, w, h]`, a node name, or `true`.
    Region,
    /// An integer or an object of wait-freezes options.
    Freezes,
    Choice(&'static [&'static str]),
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Any,
    Recognition(&'static [&'static str]),
    Action(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub key: &'static str,
    pub kind: ParamKind,
    pub scope: Scope,
    /// The value the runtime assumes when the key is absent.
    pub default: Option<DefaultValue>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(&'static str),
    Rect([i64; 4]),
}

impl DefaultValue {
    pub fn to_value(self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(b),
            Self::Int(i) => Value::from(i),
            Self::Float(f) => Value::from(f),
            Self::Text(s) => Value::from(s),
            Self::Rect(r) => Value::from(r.to_vec()),
        }
    }
}

const NEURAL: &[&str] = &["NeuralNetworkClassify", "NeuralNetworkDetect"];
const ORDERED: &[&str] = &[
    "TemplateMatch",
    "FeatureMatch",
    "ColorMatch",
    "OCR",
    "NeuralNetworkClassify",
    "NeuralNetworkDetect",
];
const TOUCH: &[&str] = &["Click", "LongPress", "TouchDown", "TouchMove"];
const TIMED: &[&str] = &["LongPress", "Swipe", "LongPressKey"];

const ORDER_BY: &[&str] = &[
    "Horizontal",
    "Vertical",
    "Score",
    "Area",
    "Length",
    "Random",
    "Expected",
];
const DETECTORS: &[&str] = &["SIFT", "KAZE", "AKAZE", "BRISK", "ORB"];

macro_rules! spec {
    ($key:literal, $kind:expr, $scope:expr) => {
        ParamSpec { key: $key, kind: $kind, scope: $scope, default: None }
    };
    ($key:literal, $kind:expr, $scope:expr, $default:expr) => {
        ParamSpec { key: $key, kind: $kind, scope: $scope, default: Some($default) }
    };
}

pub const PARAMS: &[ParamSpec] = &[
    spec!("rate_limit", ParamKind::Integer, Scope::Any, DefaultValue::Int(1000)),
    spec!("timeout", ParamKind::Integer, Scope::Any, DefaultValue::Int(20000)),
    spec!("inverse", ParamKind::Bool, Scope::Any, DefaultValue::Bool(false)),
    spec!("enabled", ParamKind::Bool, Scope::Any, DefaultValue::Bool(true)),
    spec!("pre_delay", ParamKind::Integer, Scope::Any, DefaultValue::Int(200)),
    spec!("post_delay", ParamKind::Integer, Scope::Any, DefaultValue::Int(200)),
    spec!("pre_wait_freezes", ParamKind::Freezes, Scope::Any, DefaultValue::Int(0)),
    spec!("post_wait_freezes", ParamKind::Freezes, Scope::Any, DefaultValue::Int(0)),
    spec!("focus", ParamKind::Any, Scope::Any),
    spec!("is_sub", ParamKind::Bool, Scope::Any),
    spec!("roi", ParamKind::Region, Scope::Recognition(ORDERED), DefaultValue::Rect([0, 0, 0, 0])),
    spec!("roi_offset", ParamKind::Region, Scope::Recognition(ORDERED), DefaultValue::Rect([0, 0, 0, 0])),
    spec!("index", ParamKind::Integer, Scope::Recognition(ORDERED), DefaultValue::Int(0)),
    spec!("order_by", ParamKind::Choice(ORDER_BY), Scope::Recognition(ORDERED), DefaultValue::Text("Horizontal")),
    spec!("threshold", ParamKind::Any, Scope::Recognition(&["TemplateMatch", "FeatureMatch", "NeuralNetworkDetect"]), DefaultValue::Float(0.7)),
    spec!("method", ParamKind::Integer, Scope::Recognition(&["TemplateMatch", "ColorMatch"]), DefaultValue::Int(5)),
    spec!("green_mask", ParamKind::Bool, Scope::Recognition(&["TemplateMatch", "FeatureMatch"]), DefaultValue::Bool(false)),
    spec!("count", ParamKind::Integer, Scope::Recognition(&["FeatureMatch", "ColorMatch"]), DefaultValue::Int(4)),
    spec!("detector", ParamKind::Choice(DETECTORS), Scope::Recognition(&["FeatureMatch"]), DefaultValue::Text("SIFT")),
    spec!("ratio", ParamKind::Number, Scope::Recognition(&["FeatureMatch"]), DefaultValue::Float(0.6)),
    spec!("lower", ParamKind::Any, Scope::Recognition(&["ColorMatch"])),
    spec!("upper", ParamKind::Any, Scope::Recognition(&["ColorMatch"])),
    spec!("connected", ParamKind::Bool, Scope::Recognition(&["ColorMatch"]), DefaultValue::Bool(false)),
    spec!("expected", ParamKind::Any, Scope::Recognition(ORDERED)),
    spec!("replace", ParamKind::Any, Scope::Recognition(&["OCR"])),
    spec!("only_rec", ParamKind::Bool, Scope::Recognition(&["OCR"]), DefaultValue::Bool(false)),
    spec!("model", ParamKind::Text, Scope::Recognition(MODELS)),
    spec!("labels", ParamKind::TextOrList, Scope::Recognition(NEURAL)),
    spec!("all_of", ParamKind::Any, Scope::Recognition(&["And"])),
    spec!("any_of", ParamKind::Any, Scope::Recognition(&["Or"])),
    spec!("custom_recognition", ParamKind::Text, Scope::Recognition(&["Custom"])),
    spec!("custom_recognition_param", ParamKind::Any, Scope::Recognition(&["Custom"])),
    spec!("target", ParamKind::Any, Scope::Action(TOUCH), DefaultValue::Bool(true)),
    spec!("target_offset", ParamKind::Region, Scope::Action(TOUCH)),
    spec!("duration", ParamKind::Integer, Scope::Action(TIMED), DefaultValue::Int(200)),
    spec!("contact", ParamKind::Integer, Scope::Action(TOUCH), DefaultValue::Int(0)),
    spec!("begin", ParamKind::Any, Scope::Action(&["Swipe"])),
    spec!("end", ParamKind::Any, Scope::Action(&["Swipe"])),
    spec!("swipes", ParamKind::Any, Scope::Action(&["MultiSwipe"])),
    spec!("key", ParamKind::Any, Scope::Action(&["Key", "ClickKey", "LongPressKey", "KeyDown", "KeyUp"])),
    spec!("input_text", ParamKind::Text, Scope::Action(&["InputText"])),
    spec!("package", ParamKind::Text, Scope::Action(&["StartApp", "StopApp"])),
    spec!("exec", ParamKind::Text, Scope::Action(&["Command"])),
    spec!("args", ParamKind::TextOrList, Scope::Action(&["Command"])),
    spec!("cmd", ParamKind::Text, Scope::Action(&["Shell"])),
    spec!("custom_action", ParamKind::Text, Scope::Action(&["Custom"])),
    spec!("custom_action_param", ParamKind::Any, Scope::Action(&["Custom"])),
];

const MODELS: &[&str] = &["OCR", "NeuralNetworkClassify", "NeuralNetworkDetect"];

pub fn lookup(key: &str) -> Option<&'static ParamSpec> {
    PARAMS.iter().find(|p| p.key == key)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ParamIssue {
    /// A key whose value does not have the expected shape.
    WrongType {
        key: String,
        expected: String,
        found: String,
    },
    /// A choice outside the allowed set.
    UnknownChoice { key: String, value: String },
    /// A parameter the record's recognition or action never reads.
    NotApplicable { key: String, kind: String },
    /// A recognition or action kind this build does not know.
    UnknownKind { key: String, value: String },
}

impl fmt::Display for ParamIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongType { key, expected, found } => {
                write!(f, "`{key}` should be {expected}, found {found}")
            }
            Self::UnknownChoice { key, value } => write!(f, "`{key}` has unknown value `{value}`"),
            Self::NotApplicable { key, kind } => write!(f, "`{key}` is not used by `{kind}`"),
            Self::UnknownKind { key, value } => write!(f, "unknown {key} `{value}`"),
        }
    }
}

fn describe(kind: ParamKind) -> String {
    match kind {
        ParamKind::Bool => "a boolean".into(),
        ParamKind::Integer => "an integer".into(),
        ParamKind::Number => "a number".into(),
        ParamKind::Text => "a string".into(),
        ParamKind::TextOrList => "a string or a list of strings".into(),
        ParamKind::Region => "a rectangle, a node name, or true".into(),
        ParamKind::Freezes => "an integer or an object".into(),
        ParamKind::Choice(options) => format!("one of {}", options.join(", ")),
        ParamKind::Any => "any value".into(),
    }
}

fn shape_matches(kind: ParamKind, value: &Value) -> bool {
    match kind {
        ParamKind::Bool => value.is_boolean(),
        ParamKind::Integer => value.is_i64() || value.is_u64(),
        ParamKind::Number => value.is_number(),
        ParamKind::Text => value.is_string(),
        ParamKind::TextOrList => {
            value.is_string()
                || value
                    .as_array()
                    .is_some_and(|items| items.iter().all(Value::is_string))
        }
        ParamKind::Region => match value {
            Value::Array(items) => items.len() == 4 && items.iter().all(Value::is_number),
            Value::String(_) | Value::Bool(true) => true,
            _ => false,
        },
        ParamKind::Freezes => value.is_i64() || value.is_u64() || value.is_object(),
        ParamKind::Choice(_) => value.is_string(),
        ParamKind::Any => true,
    }
}

/// Checks a record against the parameter schema. Issues are advisory; a record with issues is
/// still loaded and exported unchanged.
pub fn validate(record: &TaskRecord) -> Vec<ParamIssue> {
    let mut issues = Vec::new();

    for key in ["recognition", "action"] {
        if let Some(value) = record.params.get(key) {
            if !(key == "recognition" && value.get("type").is_some_and(Value::is_string)) {
                issues.push(ParamIssue::WrongType {
                    key: key.to_string(),
                    expected: "a string".into(),
                    found: json_type_name(value).into(),
                });
            }
        }
    }
    for key in ["next", "on_error", "timeout_next", "template"] {
        if let Some(value) = record.params.get(key) {
            issues.push(ParamIssue::WrongType {
                key: key.to_string(),
                expected: "a string or a list of strings".into(),
                found: json_type_name(value).into(),
            });
        }
    }
    if let Some(value) = record.params.get("anchor") {
        issues.push(ParamIssue::WrongType {
            key: "anchor".into(),
            expected: "a boolean".into(),
            found: json_type_name(value).into(),
        });
    }

    let recognition = record.recognition_kind().unwrap_or_default();
    if !recognition.is_known() {
        issues.push(ParamIssue::UnknownKind {
            key: "recognition".into(),
            value: recognition.as_str().to_string(),
        });
    }
    let action = record.action.clone().unwrap_or(crate::record::Action::DoNothing);
    if !action.is_known() {
        issues.push(ParamIssue::UnknownKind {
            key: "action".into(),
            value: action.as_str().to_string(),
        });
    }

    for (key, value) in &record.params {
        let Some(spec) = lookup(key) else {
            continue;
        };
        if !shape_matches(spec.kind, value) {
            issues.push(ParamIssue::WrongType {
                key: key.clone(),
                expected: describe(spec.kind),
                found: json_type_name(value).into(),
            });
            continue;
        }
        if let (ParamKind::Choice(options), Some(s)) = (spec.kind, value.as_str()) {
            if !options.contains(&s) {
                issues.push(ParamIssue::UnknownChoice {
                    key: key.clone(),
                    value: s.to_string(),
                });
            }
        }
        let (applies, kind) = match spec.scope {
            Scope::Any => (true, ""),
            Scope::Recognition(kinds) => (
                !recognition.is_known() || kinds.contains(&recognition.as_str()),
                recognition.as_str(),
            ),
            Scope::Action(kinds) => (
                !action.is_known() || kinds.contains(&action.as_str()),
                action.as_str(),
            ),
        };
        if !applies {
            issues.push(ParamIssue::NotApplicable {
                key: key.clone(),
                kind: kind.to_string(),
            });
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> TaskRecord {
        TaskRecord::from_value("T", value).expect("record")
    }

    #[test]
    fn clean_record_has_no_issues() {
        let r = record(json!({
            "recognition": "TemplateMatch",
            "template": "a.png",
            "threshold": 0.8,
            "roi": [0, 0, 100, 100],
            "action": "Click",
            "target": true,
            "timeout": 5000
        }));
        assert!(validate(&r).is_empty(), "{:?}", validate(&r));
    }

    #[test]
    fn wrong_shapes_and_choices_are_reported() {
        let r = record(json!({
            "recognition": "FeatureMatch",
            "timeout": "soon",
            "detector": "SURF",
            "next": {"x": 1}
        }));
        let issues = validate(&r);
        assert!(issues.contains(&ParamIssue::WrongType {
            key: "timeout".into(),
            expected: "an integer".into(),
            found: "a string".into()
        }));
        assert!(issues.contains(&ParamIssue::UnknownChoice {
            key: "detector".into(),
            value: "SURF".into()
        }));
        assert!(issues.iter().any(|i| matches!(i, ParamIssue::WrongType { key, .. } if key == "next")));
    }

    #[test]
    fn parameters_for_other_kinds_are_flagged() {
        let r = record(json!({"recognition": "OCR", "detector": "ORB"}));
        assert_eq!(
            validate(&r),
            vec![ParamIssue::NotApplicable {
                key: "detector".into(),
                kind: "OCR".into()
            }]
        );
        // DirectHit is assumed when recognition is absent.
        let r = record(json!({"expected": "x"}));
        assert_eq!(validate(&r).len(), 1);
    }

    #[test]
    fn unknown_kinds_disable_scope_checks() {
        let r = record(json!({"recognition": "Telepathy", "detector": "ORB"}));
        assert_eq!(
            validate(&r),
            vec![ParamIssue::UnknownKind {
                key: "recognition".into(),
                value: "Telepathy".into()
            }]
        );
    }
}
