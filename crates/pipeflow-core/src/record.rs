//! Typed task records.
//!
//! A record keeps the fields the editor understands as typed values and everything else in an
//! ordered parameter bag. Known keys holding a value of the wrong shape also land in the bag so
//! nothing the author wrote is lost; [`crate::schema::validate`] reports them.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{Error, Result};
use crate::link::LinkSlot;
use crate::port::LinkField;

/// Keys the editor owns and never writes to disk.
pub const EDITOR_ONLY_KEYS: [&str; 2] = ["id", "interrupt"];

macro_rules! kind_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            /// A kind this build does not know; kept verbatim.
            Other(String),
        }

        impl $name {
            pub const KNOWN: &'static [&'static str] = &[$(stringify!($variant)),+];

            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant),)+
                    Self::Other(s) => s,
                }
            }

            pub fn is_known(&self) -> bool {
                !matches!(self, Self::Other(_))
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                match s {
                    $(stringify!($variant) => Self::$variant,)+
                    other => Self::Other(other.to_string()),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Ok(Self::from(raw.as_str()))
            }
        }
    };
}

kind_enum!(
    /// How a task decides it matched.
    #[allow(clippy::upper_case_acronyms)]
    Recognition {
        DirectHit,
        TemplateMatch,
        FeatureMatch,
        ColorMatch,
        OCR,
        NeuralNetworkClassify,
        NeuralNetworkDetect,
        And,
        Or,
        Custom,
    }
);

kind_enum!(
    /// What a task does once it matched.
    Action {
        DoNothing,
        Click,
        LongPress,
        Swipe,
        MultiSwipe,
        TouchDown,
        TouchMove,
        TouchUp,
        Scroll,
        Key,
        ClickKey,
        LongPressKey,
        KeyDown,
        KeyUp,
        InputText,
        StartApp,
        StopApp,
        StopTask,
        Command,
        Shell,
        Custom,
    }
);

impl Default for Recognition {
    fn default() -> Self {
        Self::DirectHit
    }
}

/// Template image paths, scalar or list as authored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Templates {
    Single(String),
    List(Vec<String>),
}

impl Templates {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Single(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(Self::List),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Self::Single(s) => Value::String(s.clone()),
            Self::List(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
        }
    }

    pub fn paths(&self) -> Vec<&str> {
        match self {
            Self::Single(s) if s.is_empty() => Vec::new(),
            Self::Single(s) => vec![s.as_str()],
            Self::List(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

/// The persisted configuration of one task.
#[derive(Debug, Clone, Default)]
pub struct TaskRecord {
    pub recognition: Option<Recognition>,
    pub action: Option<Action>,
    pub next: Option<LinkSlot>,
    pub on_error: Option<LinkSlot>,
    pub timeout_next: Option<LinkSlot>,
    pub template: Option<Templates>,
    pub anchor: Option<bool>,
    pub params: IndexMap<String, Value>,
    key_order: Vec<String>,
}

impl PartialEq for TaskRecord {
    fn eq(&self, other: &Self) -> bool {
        self.recognition == other.recognition
            && self.action == other.action
            && self.next == other.next
            && self.on_error == other.on_error
            && self.timeout_next == other.timeout_next
            && self.template == other.template
            && self.anchor == other.anchor
            && self.params == other.params
    }
}

impl TaskRecord {
    pub fn new(recognition: Recognition) -> Self {
        Self {
            recognition: Some(recognition),
            ..Self::default()
        }
    }

    /// Builds a record from a JSON object. Editor-only keys are dropped.
    pub fn from_map(map: Map<String, Value>) -> Self {
        let mut record = Self::default();
        for (key, value) in map {
            if EDITOR_ONLY_KEYS.contains(&key.as_str()) {
                continue;
            }
            record.key_order.push(key.clone());
            let leftover = match key.as_str() {
                "recognition" => match value {
                    Value::String(s) => {
                        record.recognition = Some(Recognition::from(s.as_str()));
                        None
                    }
                    other => Some(other),
                },
                "action" => match value {
                    Value::String(s) => {
                        record.action = Some(Action::from(s.as_str()));
                        None
                    }
                    other => Some(other),
                },
                "template" => match Templates::from_value(&value) {
                    Some(t) => {
                        record.template = Some(t);
                        None
                    }
                    None => Some(value),
                },
                "anchor" => match value {
                    Value::Bool(b) => {
                        record.anchor = Some(b);
                        None
                    }
                    other => Some(other),
                },
                k => match LinkField::from_key(k) {
                    Some(field) => match LinkSlot::from_value(&value) {
                        Some(slot) => {
                            record.set_link_slot(field, Some(slot));
                            None
                        }
                        None => Some(value),
                    },
                    None => Some(value),
                },
            };
            if let Some(value) = leftover {
                record.params.insert(key, value);
            }
        }
        record
    }

    pub fn from_value(id: &str, value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self::from_map(map)),
            other => Err(Error::MalformedRecord {
                id: id.to_string(),
                message: format!("expected an object, found {}", json_type_name(&other)),
            }),
        }
    }

    /// Parses the text of a hand-edited record. JSON5 is accepted.
    pub fn parse_edit(id: &str, text: &str) -> Result<Self> {
        let value: Value = json5::from_str(text).map_err(|e| Error::MalformedRecord {
            id: id.to_string(),
            message: e.to_string(),
        })?;
        Self::from_value(id, value)
    }

    /// Serializes back to an object, keeping authored key order where known.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut entries: IndexMap<String, Value> = IndexMap::new();
        if let Some(r) = &self.recognition {
            entries.insert("recognition".into(), Value::String(r.as_str().to_string()));
        }
        if let Some(a) = &self.action {
            entries.insert("action".into(), Value::String(a.as_str().to_string()));
        }
        for field in LinkField::ALL {
            if let Some(slot) = self.link_slot(field) {
                entries.insert(field.key().into(), slot.to_value());
            }
        }
        if let Some(t) = &self.template {
            entries.insert("template".into(), t.to_value());
        }
        if let Some(a) = self.anchor {
            entries.insert("anchor".into(), Value::Bool(a));
        }
        for (k, v) in &self.params {
            entries.entry(k.clone()).or_insert_with(|| v.clone());
        }

        let mut out = Map::new();
        for key in &self.key_order {
            if let Some(v) = entries.shift_remove(key) {
                out.insert(key.clone(), v);
            }
        }
        out.extend(entries);
        out
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.to_map())
    }

    pub fn link_slot(&self, field: LinkField) -> Option<&LinkSlot> {
        match field {
            LinkField::Next => self.next.as_ref(),
            LinkField::OnError => self.on_error.as_ref(),
            LinkField::TimeoutNext => self.timeout_next.as_ref(),
        }
    }

    pub fn link_slot_mut(&mut self, field: LinkField) -> &mut Option<LinkSlot> {
        match field {
            LinkField::Next => &mut self.next,
            LinkField::OnError => &mut self.on_error,
            LinkField::TimeoutNext => &mut self.timeout_next,
        }
    }

    pub fn set_link_slot(&mut self, field: LinkField, slot: Option<LinkSlot>) {
        *self.link_slot_mut(field) = slot;
    }

    /// Declared recognition kind. Falls back to a structured `{"type": ...}` value left in the
    /// parameter bag.
    pub fn recognition_kind(&self) -> Option<Recognition> {
        if let Some(r) = &self.recognition {
            return Some(r.clone());
        }
        self.params
            .get("recognition")
            .and_then(|v| v.get("type"))
            .and_then(Value::as_str)
            .map(Recognition::from)
    }

    pub fn is_anchor(&self) -> bool {
        self.anchor == Some(true)
    }

    pub fn template_paths(&self) -> Vec<&str> {
        self.template.as_ref().map(Templates::paths).unwrap_or_default()
    }

    pub fn set_template_paths(&mut self, paths: Vec<String>) {
        self.template = Some(Templates::List(paths));
    }
}

impl Serialize for TaskRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TaskRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Map::<String, Value>::deserialize(deserializer).map(Self::from_map)
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
