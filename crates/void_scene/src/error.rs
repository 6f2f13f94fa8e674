//! Error types for scene loading

use thiserror::Error;
use void_asset::{AssetError, AssetKind};

/// Scene loading errors
///
/// Asset failures never escape `load()`; they are logged per node and leave
/// that node pending.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Failed to parse node data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Asset '{key}' ({kind}) required by node '{node}' is neither resident nor declared")]
    MissingAsset {
        node: String,
        key: String,
        kind: AssetKind,
    },

    #[error("Failed to fetch asset '{key}' for node '{node}': {source}")]
    Fetch {
        node: String,
        key: String,
        #[source]
        source: AssetError,
    },

    #[error("Invalid '{kind}' component on node '{node}': {reason}")]
    InvalidComponent {
        node: String,
        kind: String,
        reason: String,
    },

    #[error("Failed to spawn scene load: {0}")]
    Spawn(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for scene operations
pub type SceneResult<T> = Result<T, SceneError>;
