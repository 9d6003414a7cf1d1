#![forbid(unsafe_code)]

//! `pipeflow` is the editor core for task-pipeline documents.
//!
//! It re-exports [`pipeflow_core`] and adds the pieces that touch the outside world: an
//! [`Editor`] that drives a [`GraphModel`] through a [`DocumentStore`], and (with the `fs`
//! feature) a [`FsDocumentStore`] that keeps documents and template images on disk.
//!
//! # Features
//!
//! - `fs` (default): filesystem-backed document store

pub use pipeflow_core::*;

pub use pipeflow_core::Error as CoreError;

pub use pipeflow_core::collab::{
    DebugBridge, DeviceInfo, DocumentStore, FailedPath, ImageChangeReport, ImageChanges,
    ImageUpload, ImageUsage, TemplateImages, UnusedImageReport,
};

mod editor;
mod error;
#[cfg(feature = "fs")]
mod fs_store;

pub use editor::{Editor, SaveReport};
pub use error::{Error, Result};
#[cfg(feature = "fs")]
pub use fs_store::{FsDocumentStore, decode_image_data, encode_image_data};
