//! Terminals and the link fields they write to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConnectionRejection;

pub const DEFAULT_EDGE_COLOR: &str = "#94a3b8";
pub const BACK_JUMP_COLOR: &str = "#a855f7";

/// A connection point on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terminal {
    #[serde(rename = "source-a")]
    Primary,
    #[serde(rename = "source-c")]
    Error,
    #[serde(rename = "in")]
    Input,
}

impl Terminal {
    pub fn wire_id(self) -> &'static str {
        match self {
            Self::Primary => "source-a",
            Self::Error => "source-c",
            Self::Input => "in",
        }
    }

    pub fn is_source(self) -> bool {
        !matches!(self, Self::Input)
    }

    /// The port configuration for a source terminal.
    pub fn port(self) -> Option<&'static Port> {
        PORTS.iter().find(|p| p.terminal == self)
    }

    /// Ordering weight used when feeding edges to the layout engine.
    pub fn sort_weight(self) -> u8 {
        match self {
            Self::Primary => 1,
            Self::Error => 3,
            Self::Input => 2,
        }
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_id())
    }
}

impl FromStr for Terminal {
    type Err = ConnectionRejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "source-a" => Ok(Self::Primary),
            "source-c" => Ok(Self::Error),
            "in" => Ok(Self::Input),
            other => Err(ConnectionRejection::UnknownTerminal(other.to_string())),
        }
    }
}

/// Record fields that hold links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkField {
    Next,
    OnError,
    /// Legacy scalar field. Read from older documents and drawn from the error terminal, never
    /// written by new connections.
    TimeoutNext,
}

impl LinkField {
    pub const ALL: [LinkField; 3] = [Self::Next, Self::OnError, Self::TimeoutNext];

    pub fn key(self) -> &'static str {
        match self {
            Self::Next => "next",
            Self::OnError => "on_error",
            Self::TimeoutNext => "timeout_next",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    /// The source terminal edges from this field are drawn from.
    pub fn terminal(self) -> Terminal {
        match self {
            Self::Next => Terminal::Primary,
            Self::OnError | Self::TimeoutNext => Terminal::Error,
        }
    }
}

impl fmt::Display for LinkField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Single,
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Port {
    pub terminal: Terminal,
    pub field: LinkField,
    pub cardinality: Cardinality,
    pub color: &'static str,
}

/// Source terminals and the fields new connections from them write to.
pub const PORTS: [Port; 2] = [
    Port {
        terminal: Terminal::Primary,
        field: LinkField::Next,
        cardinality: Cardinality::List,
        color: "#3b82f6",
    },
    Port {
        terminal: Terminal::Error,
        field: LinkField::OnError,
        cardinality: Cardinality::List,
        color: "#f43f5e",
    },
];

/// Rejects self-loops, connections starting at the input terminal, and connections that do not
/// end on it. Unknown terminal ids are rejected too.
pub fn validate_connection(
    source: &str,
    source_terminal: &str,
    target: &str,
    target_terminal: &str,
) -> Result<(Terminal, Terminal), ConnectionRejection> {
    if source == target {
        return Err(ConnectionRejection::SelfLoop);
    }
    let from: Terminal = source_terminal.parse()?;
    let to: Terminal = target_terminal.parse()?;
    if from == Terminal::Input {
        return Err(ConnectionRejection::InputAsSource);
    }
    if to != Terminal::Input {
        return Err(ConnectionRejection::TargetNotInput);
    }
    Ok((from, to))
}

pub fn is_valid_connection(
    source: &str,
    source_terminal: &str,
    target: &str,
    target_terminal: &str,
) -> bool {
    validate_connection(source, source_terminal, target, target_terminal).is_ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStyle {
    #[default]
    Smoothstep,
    Bezier,
}

/// How an edge should be drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeAppearance {
    pub style: EdgeStyle,
    pub color: &'static str,
    pub label: String,
    pub animated: bool,
    pub dashed: bool,
}
