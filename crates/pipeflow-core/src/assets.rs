//! Template images attached to nodes.
//!
//! Each node carries three lists: images the backend has on disk, committed images staged for
//! deletion, and new images staged for upload. The record's `template` field always lists the
//! paths the node will reference once pending changes are written.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::collab::ImageChangeReport;
use crate::graph::{ChangeKind, GraphModel};
use crate::record::TaskRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateImage {
    pub path: String,
    /// Base64 body or data URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub found: Option<bool>,
}

impl TemplateImage {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            base64: None,
            found: None,
        }
    }

    pub fn with_data(path: impl Into<String>, base64: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            base64: Some(base64.into()),
            found: Some(true),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeAssets {
    pub images: Vec<TemplateImage>,
    pub deleted: Vec<TemplateImage>,
    pub staged: Vec<TemplateImage>,
}

impl NodeAssets {
    pub fn has_pending(&self) -> bool {
        !self.deleted.is_empty() || !self.staged.is_empty()
    }
}

/// An edit to a node's images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "_action", rename_all = "snake_case")]
pub enum AssetAction {
    #[serde(rename = "delete_images")]
    StageDelete {
        #[serde(rename = "deletePaths")]
        paths: Vec<String>,
    },
    #[serde(rename = "add_temp_image")]
    StageAdd {
        #[serde(rename = "imagePath")]
        path: String,
        #[serde(rename = "imageBase64")]
        base64: String,
    },
    #[serde(rename = "restore_image")]
    Restore {
        #[serde(rename = "imagePath")]
        path: String,
    },
    /// Replaces everything with the result of a save.
    #[serde(rename = "save_image_changes")]
    CommitAll {
        #[serde(rename = "validPaths")]
        valid_paths: Vec<String>,
        #[serde(default)]
        images: Vec<TemplateImage>,
        #[serde(default, rename = "tempImages")]
        staged: Vec<TemplateImage>,
        #[serde(default, rename = "deletedImages")]
        deleted: Vec<TemplateImage>,
    },
}

fn add_template(record: &mut TaskRecord, path: &str) {
    let mut paths: Vec<String> = record.template_paths().into_iter().map(str::to_string).collect();
    if !paths.iter().any(|p| p == path) {
        paths.push(path.to_string());
        record.set_template_paths(paths);
    }
}

fn remove_template(record: &mut TaskRecord, path: &str) {
    let paths: Vec<String> = record.template_paths().into_iter().map(str::to_string).collect();
    if paths.iter().any(|p| p == path) {
        record.set_template_paths(paths.into_iter().filter(|p| p != path).collect());
    }
}

/// Applies `action` to one node's assets and record. Returns whether anything changed.
pub fn apply_action(assets: &mut NodeAssets, record: &mut TaskRecord, action: AssetAction) -> bool {
    match action {
        AssetAction::StageDelete { paths } => {
            let mut changed = false;
            for path in paths {
                if let Some(i) = assets.images.iter().position(|img| img.path == path) {
                    let image = assets.images.remove(i);
                    assets.deleted.push(image);
                    remove_template(record, &path);
                    changed = true;
                } else if let Some(i) = assets.staged.iter().position(|img| img.path == path) {
                    // Never uploaded; dropping it is enough.
                    assets.staged.remove(i);
                    remove_template(record, &path);
                    changed = true;
                }
            }
            changed
        }
        AssetAction::StageAdd { path, base64 } => {
            if path.is_empty() || base64.is_empty() {
                return false;
            }
            assets.staged.retain(|img| img.path != path);
            assets.staged.push(TemplateImage::with_data(path.as_str(), base64));
            add_template(record, &path);
            true
        }
        AssetAction::Restore { path } => {
            let Some(i) = assets.deleted.iter().position(|img| img.path == path) else {
                return false;
            };
            let image = assets.deleted.remove(i);
            assets.images.push(image);
            add_template(record, &path);
            true
        }
        AssetAction::CommitAll {
            valid_paths,
            images,
            staged,
            deleted,
        } => {
            assets.images = images;
            assets.staged = staged;
            assets.deleted = deleted;
            record.set_template_paths(valid_paths);
            true
        }
    }
}

/// A pending deletion or upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingImage {
    pub node: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PendingAssets {
    pub deletions: Vec<PendingImage>,
    pub additions: Vec<PendingImage>,
}

impl PendingAssets {
    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty() && self.additions.is_empty()
    }
}

impl GraphModel {
    pub fn apply_asset_action(&mut self, node_id: &str, action: AssetAction) -> bool {
        let Some(node) = self.nodes.get_mut(node_id) else {
            return false;
        };
        let changed = apply_action(&mut node.assets, &mut node.record, action);
        if changed {
            self.feed.bump(ChangeKind::Assets);
        }
        changed
    }

    /// Sets the committed image list of each named node. Unknown ids are skipped.
    pub fn attach_committed_images(&mut self, images: IndexMap<String, Vec<TemplateImage>>) {
        let mut touched = 0usize;
        for (id, list) in images {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.assets.images = list;
                touched += 1;
            }
        }
        if touched > 0 {
            self.feed.bump(ChangeKind::Assets);
        }
    }

    /// Deletions and uploads staged across all real nodes.
    pub fn pending_assets(&self) -> PendingAssets {
        let mut pending = PendingAssets::default();
        for node in self.nodes.values().filter(|n| !n.placeholder) {
            pending.deletions.extend(
                node.assets
                    .deleted
                    .iter()
                    .filter(|img| !img.path.is_empty())
                    .map(|img| PendingImage {
                        node: node.id.clone(),
                        path: img.path.clone(),
                        base64: None,
                    }),
            );
            pending.additions.extend(
                node.assets
                    .staged
                    .iter()
                    .filter(|img| !img.path.is_empty())
                    .filter_map(|img| {
                        img.base64.as_ref().map(|data| PendingImage {
                            node: node.id.clone(),
                            path: img.path.clone(),
                            base64: Some(data.clone()),
                        })
                    }),
            );
        }
        pending
    }

    /// Folds the outcome of a save into the node assets. Uploads in `saved` become committed
    /// images and deletions in `deleted` are forgotten; anything the store failed to write or
    /// remove stays pending for the next save.
    pub fn commit_pending(&mut self, report: &ImageChangeReport) {
        let mut changed = false;
        for node in self.nodes.values_mut().filter(|n| !n.placeholder) {
            if !node.assets.has_pending() {
                continue;
            }
            let (uploaded, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut node.assets.staged)
                .into_iter()
                .partition(|img| report.saved.contains(&img.path));
            node.assets.staged = kept;
            changed |= !uploaded.is_empty();
            node.assets.images.extend(uploaded);

            let before = node.assets.deleted.len();
            node.assets
                .deleted
                .retain(|img| !report.deleted.contains(&img.path));
            changed |= before != node.assets.deleted.len();
        }
        if changed {
            self.feed.bump(ChangeKind::Assets);
        }
    }
}
