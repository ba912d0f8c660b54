use thiserror::Error;

/// Canonical error type for backup and restore operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The dashboard service answered with a non-success status, or could not
    /// be reached at all (`status == 0`).
    #[error("dashboard service error (status {status}): {message}")]
    Service {
        /// HTTP status code, `0` for transport failures.
        status: u16,
        /// Response body or transport error text.
        message: String,
    },

    /// Artifact store backend error (I/O, network, permissions).
    #[error("storage error: {0}")]
    Store(String),

    /// Entity was not found.
    #[error("{entity} `{id}` was not found")]
    NotFound {
        /// Entity type name (e.g. `"object"`).
        entity: &'static str,
        /// Identifier of the missing entity.
        id: String,
    },

    /// Restore requested for a target that has never been backed up.
    #[error("no snapshots found for target `{target}`")]
    NoSnapshotsFound {
        /// Target name.
        target: String,
    },

    /// The selected snapshot exists (or was named) but holds no artifacts.
    #[error("snapshot `{snapshot}` contains no artifacts")]
    EmptySnapshot {
        /// Snapshot path that was listed.
        snapshot: String,
    },

    /// Stored artifact is not a dashboard document.
    #[error("malformed artifact `{key}`: {reason}")]
    MalformedArtifact {
        /// Artifact key.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// I/O error occurred during file operations.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error occurred.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Validation error for input data.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl CoreError {
    /// Creates a `NotFound` variant.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates a `Service` variant.
    #[must_use]
    pub fn service(status: u16, message: impl Into<String>) -> Self {
        Self::Service {
            status,
            message: message.into(),
        }
    }

    /// Creates a `MalformedArtifact` variant.
    #[must_use]
    pub fn malformed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedArtifact {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Convenient result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
