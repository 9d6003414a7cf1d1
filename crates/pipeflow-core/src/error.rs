pub type Result<T> = std::result::Result<T, Error>;

/// Why a proposed connection was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionRejection {
    #[error("a node cannot connect to itself")]
    SelfLoop,
    #[error("the input terminal cannot start a connection")]
    InputAsSource,
    #[error("connections must end on the input terminal")]
    TargetNotInput,
    #[error("unknown terminal `{0}`")]
    UnknownTerminal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot rename: node id `{id}` already exists")]
    RenameCollision { id: String },

    #[error("node `{id}` already exists")]
    NodeExists { id: String },

    #[error("node id `{id}` contains a reserved link marker (`[Anchor]` or `[JumpBack]`)")]
    ReservedIdentifier { id: String },

    #[error("node id must not be empty")]
    EmptyIdentifier,

    #[error("invalid connection: {reason}")]
    InvalidConnection { reason: ConnectionRejection },

    #[error("node `{id}` not found")]
    NodeNotFound { id: String },

    #[error("edge `{id}` not found")]
    EdgeNotFound { id: String },

    #[error("record `{id}` is malformed: {message}")]
    MalformedRecord { id: String, message: String },

    #[error("malformed document: {message}")]
    MalformedDocument { message: String },

    #[error("invalid config: {message}")]
    InvalidConfig { message: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<ConnectionRejection> for Error {
    fn from(reason: ConnectionRejection) -> Self {
        Self::InvalidConnection { reason }
    }
}
