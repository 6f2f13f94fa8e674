//! Asset Provider - The resolution contract consumed by scene loading
//!
//! A provider answers three questions about an asset key:
//! - is it resident right now (`find`)
//! - could it be fetched (`has_declared`)
//! - fetch it (`load`)
//!
//! Providers are driven from a single thread; `load` returns a local future
//! that completes whenever the provider finishes the fetch.

use futures::future::LocalBoxFuture;
use thiserror::Error;

use crate::handle::{AssetHandle, AssetKind};

/// Asset resolution errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssetError {
    #[error("Asset not declared: {0}")]
    NotDeclared(String),

    #[error("Asset '{key}' is declared as {declared}, requested as {requested}")]
    KindMismatch {
        key: String,
        declared: AssetKind,
        requested: AssetKind,
    },

    #[error("Failed to read asset '{key}' from {path}")]
    Read { key: String, path: String },

    #[error("Fetch of asset '{0}' was dropped before completion")]
    Cancelled(String),

    #[error("Invalid manifest: {0}")]
    Manifest(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for AssetError {
    fn from(e: std::io::Error) -> Self {
        AssetError::Io(e.to_string())
    }
}

/// Result type for asset operations
pub type AssetResult<T> = Result<T, AssetError>;

/// Future returned by [`AssetProvider::load`]
pub type AssetFuture = LocalBoxFuture<'static, AssetResult<AssetHandle>>;

/// Resolution contract for resources referenced by scene nodes
///
/// Implementations must tolerate redundant calls: many nodes may ask for the
/// same key in the same frame.
pub trait AssetProvider {
    /// Synchronous lookup of an already-resident asset
    fn find(&self, key: &str) -> Option<AssetHandle>;

    /// Whether the key is known to be loadable, optionally of a given kind
    fn has_declared(&self, key: &str, kind: Option<AssetKind>) -> bool;

    /// Fetch a declared asset
    ///
    /// `cache` is a retention hint forwarded from the scene tree.
    fn load(&self, key: &str, kind: AssetKind, cache: bool) -> AssetFuture;
}
