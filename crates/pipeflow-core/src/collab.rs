//! Boundaries to the persistence backend and the debug runtime.
//!
//! The model never performs I/O itself; an editor drives it through these traits.

#![allow(async_fn_in_trait)]

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::assets::{PendingAssets, TemplateImage};
use crate::debug::DebugMode;
use crate::document::Document;
use crate::record::TaskRecord;

/// Committed images per node id.
pub type TemplateImages = IndexMap<String, Vec<TemplateImage>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUsage {
    pub path: String,
    pub used_by: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnusedImageReport {
    /// Paths no other document references.
    pub unused: Vec<String>,
    pub used: Vec<ImageUsage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUpload {
    pub path: String,
    pub base64: String,
}

/// File-level image operations derived from [`PendingAssets`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageChanges {
    pub deletions: Vec<String>,
    pub uploads: Vec<ImageUpload>,
}

impl ImageChanges {
    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty() && self.uploads.is_empty()
    }
}

impl From<&PendingAssets> for ImageChanges {
    fn from(pending: &PendingAssets) -> Self {
        let mut deletions: Vec<String> = Vec::new();
        for d in &pending.deletions {
            if !deletions.contains(&d.path) {
                deletions.push(d.path.clone());
            }
        }
        let uploads = pending
            .additions
            .iter()
            .filter_map(|a| {
                a.base64.as_ref().map(|b| ImageUpload {
                    path: a.path.clone(),
                    base64: b.clone(),
                })
            })
            .collect();
        Self { deletions, uploads }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedPath {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageChangeReport {
    pub deleted: Vec<String>,
    pub delete_failed: Vec<FailedPath>,
    pub saved: Vec<String>,
    pub save_failed: Vec<FailedPath>,
}

impl ImageChangeReport {
    pub fn is_clean(&self) -> bool {
        self.delete_failed.is_empty() && self.save_failed.is_empty()
    }
}

/// Where pipeline documents and their template images live.
pub trait DocumentStore {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn load_document(&self, source: &str, filename: &str) -> Result<Document, Self::Error>;

    async fn save_document(
        &self,
        source: &str,
        filename: &str,
        document: &Document,
    ) -> Result<(), Self::Error>;

    /// Creates an empty document. Returns the final file name.
    async fn create_file(&self, source: &str, filename: &str) -> Result<String, Self::Error>;

    async fn list_template_images(
        &self,
        source: &str,
        document: &Document,
    ) -> Result<TemplateImages, Self::Error>;

    /// Which of `paths` are referenced by documents other than `filename`.
    async fn check_unused_images(
        &self,
        source: &str,
        filename: &str,
        paths: &[String],
    ) -> Result<UnusedImageReport, Self::Error>;

    async fn apply_image_changes(
        &self,
        source: &str,
        changes: &ImageChanges,
    ) -> Result<ImageChangeReport, Self::Error>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default)]
    pub adb_path: Option<String>,
    pub address: String,
    #[serde(default)]
    pub config: Value,
}

/// The automation runtime used for debug runs.
pub trait DebugBridge {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn connect_device(&self, device: &DeviceInfo) -> Result<(), Self::Error>;

    async fn disconnect_device(&self) -> Result<(), Self::Error>;

    /// Starts a run of one task. Build the payload with [`crate::debug::debug_task`].
    async fn run_node(
        &self,
        node_id: &str,
        record: &TaskRecord,
        mode: DebugMode,
    ) -> Result<(), Self::Error>;

    async fn stop(&self) -> Result<(), Self::Error>;
}
