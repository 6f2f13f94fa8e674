//! # void_asset - Asset Provider for Scene Loading
//!
//! Resolution of named resources for scene nodes:
//! - The [`AssetProvider`] contract (`find`, `has_declared`, `load`)
//! - Shared [`AssetHandle`]s to resident bytes
//! - A manifest of declared, fetchable keys
//! - [`AssetServer`], a provider whose fetches complete once per frame
//!
//! ## Example
//!
//! ```ignore
//! use void_asset::prelude::*;
//!
//! let server = AssetServer::default_config()
//!     .with_manifest(AssetManifest::new().with("sedan", AssetKind::Model, "models/sedan.obj"));
//!
//! // Request a fetch (returns a local future)
//! let pending = server.load("sedan", AssetKind::Model, true);
//!
//! // Each frame
//! server.process_from_disk();
//! ```

pub mod handle;
pub mod manifest;
pub mod provider;
pub mod server;
pub mod storage;

pub use handle::{AssetHandle, AssetId, AssetKind, LoadState};
pub use manifest::{AssetDecl, AssetManifest};
pub use provider::{AssetError, AssetFuture, AssetProvider, AssetResult};
pub use server::{AssetEvent, AssetMeta, AssetServer, AssetServerConfig};
pub use storage::AssetStorage;

/// Prelude - commonly used types
pub mod prelude {
    pub use crate::handle::{AssetHandle, AssetId, AssetKind};
    pub use crate::manifest::AssetManifest;
    pub use crate::provider::{AssetError, AssetProvider, AssetResult};
    pub use crate::server::{AssetEvent, AssetServer, AssetServerConfig};
}
