//! Port traits for the collaborators the edit workflow talks to.
//!
//! All calls are async; implementations must not block the caller's
//! event loop. Adapters live in `conform-core`.

use crate::error::CatalogResult;
use async_trait::async_trait;
use conform_types::{Dataset, DatasetSummary, SchemaFieldTree, VersionSelector};

/// Read-only lookup of versioned schemas.
#[async_trait]
pub trait SchemaCatalog: Send + Sync {
    /// Fails with `NotFound` for an unknown `(name, version)` pair.
    async fn fetch(&self, name: &str, version: u32) -> CatalogResult<SchemaFieldTree>;
}

/// Versioned dataset storage. Writes are whole documents.
#[async_trait]
pub trait DatasetVersionGateway: Send + Sync {
    /// Persist `dataset` as the next version after `dataset.version`.
    ///
    /// Fails with `Conflict` when `dataset.version` is no longer the latest
    /// and with `Validation` for malformed rules. Returns the new version.
    async fn persist(&self, dataset: &Dataset) -> CatalogResult<u32>;

    async fn fetch(&self, name: &str, version: VersionSelector) -> CatalogResult<Dataset>;

    /// Dataset names with their latest versions, sorted by name.
    async fn list(&self) -> CatalogResult<Vec<DatasetSummary>>;

    /// Hide every version of a dataset.
    async fn disable(&self, name: &str) -> CatalogResult<()>;
}

/// Yes/no question put to the user before destructive actions.
#[async_trait]
pub trait ConfirmationPrompt: Send + Sync {
    async fn ask(&self, message: &str) -> bool;
}
