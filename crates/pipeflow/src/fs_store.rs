//! A [`DocumentStore`] over a plain directory tree.
//!
//! Layout on disk:
//!
//! ```text
//! <resource>/
//!   pipeline/      <- `source`: pipeline documents (*.json)
//!   image/         <- template images, addressed relative to this directory
//! ```

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;
use std::path::{Component, Path, PathBuf};

use pipeflow_core::Document;
use pipeflow_core::collab::{
    DocumentStore, FailedPath, ImageChangeReport, ImageChanges, ImageUsage, TemplateImages,
    UnusedImageReport,
};
use pipeflow_core::assets::TemplateImage;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct FsDocumentStore;

impl FsDocumentStore {
    pub fn new() -> Self {
        Self
    }

    pub fn document_path(source: &str, filename: &str) -> PathBuf {
        Path::new(source).join(filename)
    }

    /// Template images live in the `image` directory next to the pipeline directory.
    pub fn image_root(source: &str) -> PathBuf {
        let source = Path::new(source);
        source
            .parent()
            .unwrap_or(source)
            .join("image")
    }

    fn image_path(source: &str, relative: &str) -> Result<PathBuf> {
        let rel = Path::new(relative);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if relative.is_empty() || escapes {
            return Err(Error::InvalidFileName(relative.to_string()));
        }
        Ok(Self::image_root(source).join(rel))
    }

    fn documents_in(source: &str) -> Result<Vec<PathBuf>> {
        let dir = Path::new(source);
        let entries = std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(dir, e))?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                out.push(path);
            }
        }
        out.sort();
        Ok(out)
    }
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("bmp") => "image/bmp",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// `data:<mime>;base64,<body>` for the bytes of `path`.
pub fn encode_image_data(path: &Path, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_for(path), STANDARD.encode(bytes))
}

/// Decodes a base64 body, with or without a data-URI prefix.
pub fn decode_image_data(data: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let body = match data.split_once(";base64,") {
        Some((prefix, body)) if prefix.starts_with("data:") => body,
        _ => data,
    };
    STANDARD.decode(body.trim())
}

impl DocumentStore for FsDocumentStore {
    type Error = Error;

    async fn load_document(&self, source: &str, filename: &str) -> Result<Document> {
        let path = Self::document_path(source, filename);
        let text = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let doc = Document::parse(&text)?;
        tracing::debug!(path = %path.display(), tasks = doc.tasks.len(), "loaded document");
        Ok(doc)
    }

    async fn save_document(&self, source: &str, filename: &str, document: &Document) -> Result<()> {
        let path = Self::document_path(source, filename);
        let text = document.to_pretty_json()?;
        std::fs::write(&path, text).map_err(|e| Error::io(&path, e))?;
        tracing::debug!(path = %path.display(), tasks = document.tasks.len(), "saved document");
        Ok(())
    }

    async fn create_file(&self, source: &str, filename: &str) -> Result<String> {
        let name = filename.trim();
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(Error::InvalidFileName(filename.to_string()));
        }
        let name = if name.ends_with(".json") {
            name.to_string()
        } else {
            format!("{name}.json")
        };
        let path = Self::document_path(source, &name);
        if path.exists() {
            return Err(Error::FileExists(name));
        }
        std::fs::create_dir_all(source).map_err(|e| Error::io(source, e))?;
        std::fs::write(&path, "{}\n").map_err(|e| Error::io(&path, e))?;
        Ok(name)
    }

    async fn list_template_images(&self, source: &str, document: &Document) -> Result<TemplateImages> {
        let mut out = TemplateImages::new();
        for (id, record) in &document.tasks {
            let mut images = Vec::new();
            for rel in record.template_paths() {
                let image = match Self::image_path(source, rel) {
                    Ok(full) => match std::fs::read(&full) {
                        Ok(bytes) => TemplateImage::with_data(rel, encode_image_data(&full, &bytes)),
                        Err(_) => TemplateImage {
                            path: rel.to_string(),
                            base64: None,
                            found: Some(false),
                        },
                    },
                    Err(_) => TemplateImage {
                        path: rel.to_string(),
                        base64: None,
                        found: Some(false),
                    },
                };
                images.push(image);
            }
            if !images.is_empty() {
                out.insert(id.clone(), images);
            }
        }
        Ok(out)
    }

    async fn check_unused_images(
        &self,
        source: &str,
        filename: &str,
        paths: &[String],
    ) -> Result<UnusedImageReport> {
        let mut used: IndexMap<&str, Vec<String>> = IndexMap::new();
        for path in Self::documents_in(source)? {
            if path.file_name().is_some_and(|n| n == filename) {
                continue;
            }
            let file = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let doc = match std::fs::read_to_string(&path)
                .map_err(|e| Error::io(&path, e))
                .and_then(|text| Document::parse(&text).map_err(Error::from))
            {
                Ok(doc) => doc,
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "skipping unreadable document");
                    continue;
                }
            };
            for (id, record) in &doc.tasks {
                for tpl in record.template_paths() {
                    if let Some(p) = paths.iter().find(|p| p.as_str() == tpl) {
                        used.entry(p.as_str())
                            .or_default()
                            .push(format!("{file}:{id}"));
                    }
                }
            }
        }

        Ok(UnusedImageReport {
            unused: paths
                .iter()
                .filter(|p| !used.contains_key(p.as_str()))
                .cloned()
                .collect(),
            used: used
                .into_iter()
                .map(|(path, used_by)| ImageUsage {
                    path: path.to_string(),
                    used_by,
                })
                .collect(),
        })
    }

    async fn apply_image_changes(&self, source: &str, changes: &ImageChanges) -> Result<ImageChangeReport> {
        let mut report = ImageChangeReport::default();

        for rel in changes.deletions.iter().filter(|p| !p.is_empty()) {
            let outcome = Self::image_path(source, rel).and_then(|full| {
                if !full.is_file() {
                    return Ok(false);
                }
                std::fs::remove_file(&full)
                    .map(|()| true)
                    .map_err(|e| Error::io(&full, e))
            });
            match outcome {
                Ok(true) => report.deleted.push(rel.clone()),
                Ok(false) => report.delete_failed.push(FailedPath {
                    path: rel.clone(),
                    reason: "File not found".into(),
                }),
                Err(err) => report.delete_failed.push(FailedPath {
                    path: rel.clone(),
                    reason: err.to_string(),
                }),
            }
        }

        for upload in &changes.uploads {
            if upload.path.is_empty() || upload.base64.is_empty() {
                continue;
            }
            let outcome = Self::image_path(source, &upload.path).and_then(|full| {
                let bytes = decode_image_data(&upload.base64).map_err(|source| Error::ImageData {
                    path: upload.path.clone(),
                    source,
                })?;
                if let Some(parent) = full.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
                }
                std::fs::write(&full, bytes).map_err(|e| Error::io(&full, e))
            });
            match outcome {
                Ok(()) => report.saved.push(upload.path.clone()),
                Err(err) => report.save_failed.push(FailedPath {
                    path: upload.path.clone(),
                    reason: err.to_string(),
                }),
            }
        }

        if !report.is_clean() {
            tracing::warn!(
                delete_failed = report.delete_failed.len(),
                save_failed = report.save_failed.len(),
                "some image changes failed"
            );
        }
        Ok(report)
    }
}
