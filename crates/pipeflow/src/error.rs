use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] pipeflow_core::Error),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file `{0}` already exists")]
    FileExists(String),

    #[error("invalid file name `{0}`")]
    InvalidFileName(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "fs")]
    #[error("invalid image data for `{path}`: {source}")]
    ImageData {
        path: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("store error: {0}")]
    Store(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
