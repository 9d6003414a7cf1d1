//! Link values: references from one record to another.
//!
//! On disk a link is a node id optionally wrapped with the `[Anchor]` and `[JumpBack]` markers,
//! in any order. In memory it is a [`LinkRef`]; the bracket form only exists at the
//! serialization boundary.
//!
//! Marker stripping is plain substring removal, so both marker strings are reserved: a node id
//! containing one cannot be referenced unambiguously. See [`contains_marker`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

pub const ANCHOR_MARKER: &str = "[Anchor]";
pub const BACK_JUMP_MARKER: &str = "[JumpBack]";

/// Returns true when `id` contains one of the reserved marker strings.
pub fn contains_marker(id: &str) -> bool {
    id.contains(ANCHOR_MARKER) || id.contains(BACK_JUMP_MARKER)
}

/// A decoded link value.
///
/// A value decoded from text remembers its authored spelling so an untouched link re-encodes
/// byte-for-byte; any change through the `with_*` builders drops it and the canonical spelling
/// is used instead.
#[derive(Debug, Clone, Eq)]
pub struct LinkRef {
    target: String,
    back_jump: bool,
    anchor: bool,
    authored: Option<String>,
}

impl PartialEq for LinkRef {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
            && self.back_jump == other.back_jump
            && self.anchor == other.anchor
    }
}

impl LinkRef {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            back_jump: false,
            anchor: false,
            authored: None,
        }
    }

    pub fn decode(raw: &str) -> Self {
        let anchor = raw.contains(ANCHOR_MARKER);
        let back_jump = raw.contains(BACK_JUMP_MARKER);
        let target = raw.replace(ANCHOR_MARKER, "").replace(BACK_JUMP_MARKER, "");
        Self {
            target,
            back_jump,
            anchor,
            authored: Some(raw.to_string()),
        }
    }

    /// Canonical spelling wraps `[Anchor]` first and `[JumpBack]` outermost:
    /// `[JumpBack][Anchor]target`.
    pub fn encode(&self) -> String {
        if let Some(authored) = &self.authored {
            return authored.clone();
        }
        encode(&self.target, self.anchor, self.back_jump)
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn is_back_jump(&self) -> bool {
        self.back_jump
    }

    pub fn is_anchor(&self) -> bool {
        self.anchor
    }

    pub fn with_target(&self, target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            back_jump: self.back_jump,
            anchor: self.anchor,
            authored: None,
        }
    }

    pub fn with_back_jump(&self, back_jump: bool) -> Self {
        if back_jump == self.back_jump {
            return self.clone();
        }
        Self {
            back_jump,
            authored: None,
            ..self.clone()
        }
    }

    pub fn with_anchor(&self, anchor: bool) -> Self {
        if anchor == self.anchor {
            return self.clone();
        }
        Self {
            anchor,
            authored: None,
            ..self.clone()
        }
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::decode(s)),
            Value::Number(n) => Some(Self::decode(&n.to_string())),
            _ => None,
        }
    }
}

pub fn decode(raw: &str) -> LinkRef {
    LinkRef::decode(raw)
}

pub fn encode(target: &str, anchor: bool, back_jump: bool) -> String {
    let mut out = String::with_capacity(target.len() + 18);
    if back_jump {
        out.push_str(BACK_JUMP_MARKER);
    }
    if anchor {
        out.push_str(ANCHOR_MARKER);
    }
    out.push_str(target);
    out
}

impl fmt::Display for LinkRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl Serialize for LinkRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for LinkRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::decode(&raw))
    }
}

/// The contents of one link field, keeping the authored scalar-or-list shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LinkSlot {
    Single(LinkRef),
    List(Vec<LinkRef>),
}

impl LinkSlot {
    /// Accepts a string, a number, or a list of those. Anything else is not a link slot.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(LinkRef::from_json)
                .collect::<Option<Vec<_>>>()
                .map(Self::List),
            other => LinkRef::from_json(other).map(Self::Single),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Single(link) => Value::String(link.encode()),
            Self::List(links) => {
                Value::Array(links.iter().map(|l| Value::String(l.encode())).collect())
            }
        }
    }

    pub fn refs(&self) -> &[LinkRef] {
        match self {
            Self::Single(link) => std::slice::from_ref(link),
            Self::List(links) => links,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.refs().is_empty()
    }

    pub fn replace_at(&mut self, index: usize, link: LinkRef) {
        match self {
            Self::Single(existing) if index == 0 => *existing = link,
            Self::List(links) => {
                if let Some(slot) = links.get_mut(index) {
                    *slot = link;
                }
            }
            Self::Single(_) => {}
        }
    }

    /// Applies `f` to every link, rebuilding only the values it changes.
    pub fn map_refs(&mut self, mut f: impl FnMut(&LinkRef) -> Option<LinkRef>) -> bool {
        let mut changed = false;
        let mut apply = |link: &mut LinkRef| {
            if let Some(next) = f(link) {
                *link = next;
                changed = true;
            }
        };
        match self {
            Self::Single(link) => apply(link),
            Self::List(links) => links.iter_mut().for_each(apply),
        }
        changed
    }
}
