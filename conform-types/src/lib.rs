//! Shared document types (schemas-as-code) for the conform workspace.
//!
//! # Design constraints
//! - Datasets are persisted whole; a new version is a new document.
//! - Rule kinds form a closed set; adding one is a breaking change.
//! - Prefer adding optional fields over changing semantics.

pub mod dataset;
pub mod reference;
pub mod rule;
pub mod schema;

pub use dataset::{Dataset, DatasetRef, DatasetSummary, VersionSelector};
pub use reference::{CatalogRef, RefCollection, UnknownCollection};
pub use rule::{ConformanceRule, JoinCondition, MappingRule, RuleKind};
pub use schema::{DataType, SchemaField, SchemaFieldTree};
