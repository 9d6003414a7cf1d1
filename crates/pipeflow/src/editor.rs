use pipeflow_core::collab::{DocumentStore, ImageChangeReport, ImageChanges, UnusedImageReport};
use indexmap::IndexMap;
use pipeflow_core::{
    ChainLayout, EdgeAppearance, EditorConfig, GraphModel, LayoutEngine, LoadReport,
    MeasuredSizes, Positions,
};

use crate::error::{Error, Result};

fn store_err<E: Into<Error>>(err: E) -> Error {
    err.into()
}

/// What a save wrote besides the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub images: Option<ImageChangeReport>,
}

/// One open document: the model, how to lay it out, and where it came from.
#[derive(Debug)]
pub struct Editor<S> {
    store: S,
    source: String,
    filename: String,
    config: EditorConfig,
    engine: LayoutEngine,
    model: GraphModel,
}

impl<S> Editor<S>
where
    S: DocumentStore,
    S::Error: Into<Error>,
{
    /// Loads a document, attaches its template images, and lays it out with fallback sizes.
    pub async fn open(
        store: S,
        source: impl Into<String>,
        filename: impl Into<String>,
        config: EditorConfig,
    ) -> Result<(Self, LoadReport)> {
        let source = source.into();
        let filename = filename.into();
        let document = store
            .load_document(&source, &filename)
            .await
            .map_err(store_err)?;

        let mut model = GraphModel::new();
        let report = model.load(&document);
        for issue in &report.issues {
            tracing::warn!(file = %filename, %issue, "load issue");
        }

        let images = store
            .list_template_images(&source, &document)
            .await
            .map_err(store_err)?;
        model.attach_committed_images(images);

        let engine = LayoutEngine::from_config(&config);
        let positions = engine.layout(&model);
        model.apply_positions(&positions);
        model.capture_baseline();

        tracing::info!(
            file = %filename,
            nodes = report.nodes,
            edges = report.edges,
            placeholders = report.placeholders.len(),
            "opened document"
        );
        Ok((
            Self {
                store,
                source,
                filename,
                config,
                engine,
                model,
            },
            report,
        ))
    }

    /// Creates an empty document and opens it.
    pub async fn create(
        store: S,
        source: impl Into<String>,
        filename: &str,
        config: EditorConfig,
    ) -> Result<Self> {
        let source = source.into();
        let filename = store
            .create_file(&source, filename)
            .await
            .map_err(store_err)?;
        let (editor, _) = Self::open(store, source, filename, config).await?;
        Ok(editor)
    }

    /// Writes the document, then pending image deletions and uploads. Image changes the store
    /// could not apply stay pending and are retried by the next save.
    pub async fn save(&mut self) -> Result<SaveReport> {
        let document = self.model.export_document();
        self.store
            .save_document(&self.source, &self.filename, &document)
            .await
            .map_err(store_err)?;

        let changes = ImageChanges::from(&self.model.pending_assets());
        let images = if changes.is_empty() {
            None
        } else {
            let report = self
                .store
                .apply_image_changes(&self.source, &changes)
                .await
                .map_err(store_err)?;
            self.model.commit_pending(&report);
            Some(report)
        };

        self.model.mark_saved();
        tracing::info!(file = %self.filename, tasks = document.tasks.len(), "saved document");
        Ok(SaveReport { images })
    }

    /// Which of the images staged for deletion other documents still use.
    pub async fn check_staged_deletions(&self) -> Result<UnusedImageReport> {
        let paths: Vec<String> = self
            .model
            .pending_assets()
            .deletions
            .into_iter()
            .map(|d| d.path)
            .collect();
        if paths.is_empty() {
            return Ok(UnusedImageReport::default());
        }
        self.store
            .check_unused_images(&self.source, &self.filename, &paths)
            .await
            .map_err(store_err)
    }

    /// Lays out again once rendered sizes are known.
    pub fn relayout(&mut self, measured: &MeasuredSizes) -> Positions {
        let positions = self.engine.relayout(&self.model, measured);
        self.model.apply_positions(&positions);
        positions
    }

    /// Applies the ordered chain layout rooted at `root`. `None` when the root does not exist.
    pub fn arrange_chain(&mut self, root: &str, measured: &MeasuredSizes) -> Option<ChainLayout> {
        let chain = self.engine.chain_layout(&self.model, root, measured)?;
        self.model.apply_positions(&chain.positions());
        Some(chain)
    }

    /// How each edge should be drawn in the configured style, keyed by edge id.
    pub fn edge_appearances(&self) -> IndexMap<String, EdgeAppearance> {
        self.model
            .edges()
            .iter()
            .map(|e| (e.id.clone(), e.appearance(self.config.edge_style)))
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        self.model.is_dirty()
    }

    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut GraphModel {
        &mut self.model
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }
}
