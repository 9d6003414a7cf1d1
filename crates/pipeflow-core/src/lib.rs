#![forbid(unsafe_code)]

//! Graph/document synchronization for task-pipeline documents.
//!
//! A pipeline document maps task ids to records; records point at each other through link
//! fields (`next`, `on_error`, legacy `timeout_next`). [`GraphModel`] keeps a node/edge view of
//! a document in lockstep with its records, so that every editing gesture on the graph is also
//! an edit of the document, and exporting the model gives back a document.

pub mod assets;
pub mod collab;
pub mod config;
pub mod debug;
pub mod document;
pub mod error;
pub mod graph;
pub mod layout;
pub mod link;
pub mod port;
pub mod record;
pub mod schema;
pub mod snapshot;

pub use assets::{AssetAction, NodeAssets, PendingAssets, PendingImage, TemplateImage};
pub use config::EditorConfig;
pub use debug::{DebugEvent, DebugMode, DebugPhase};
pub use document::Document;
pub use error::{ConnectionRejection, Error, Result};
pub use graph::{
    Change, ChangeKind, ConnectOutcome, Connection, GraphEdge, GraphModel, GraphNode, LoadIssue,
    LoadReport, NodeKind, NodeStatus, NodeUpdate, SubscriptionId,
};
pub use layout::{
    ChainLayout, LayoutEngine, MeasuredSizes, NodeSizing, Position, Positions, Size, Spacing,
    SpacingKey,
};
pub use link::{LinkRef, LinkSlot};
pub use port::{
    EdgeAppearance, EdgeStyle, LinkField, Terminal, is_valid_connection, validate_connection,
};
pub use record::{Action, Recognition, TaskRecord, Templates};
pub use snapshot::DirtySnapshot;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
