//! Embeddable core library for conform.
//!
//! Provides a clap-free controller for one dataset detail view plus default
//! adapters for the ports defined in `conform-domain`.
//!
//! # Adapters
//!
//! - [`InMemoryCatalog`](adapters::InMemoryCatalog): schemas and dataset versions in memory
//! - [`FsCatalog`](adapters::FsCatalog): JSON documents under a catalog directory
//! - [`SchemaCache`](adapters::SchemaCache): lazy per-version schema cache
//! - [`FixedPrompt`](adapters::FixedPrompt) and [`ScriptedPrompt`](adapters::ScriptedPrompt)
//!
//! # Entry point
//!
//! [`DatasetDetail`](detail::DatasetDetail) routes to a dataset version and
//! drives rule add, edit, delete and dataset disable against it.

pub mod adapters;
pub mod detail;
pub mod settings;

// Re-export the ports and errors so embedders don't need conform-domain directly.
pub use conform_domain::{
    CatalogError, CatalogResult, ConfirmationPrompt, DatasetVersionGateway, Disposition,
    SchemaCatalog,
};
