//! Editing workflow for dataset conformance rules.
//!
//! The pieces:
//! - [`RuleList`] holds the ordered rules of one dataset version and derives
//!   new lists for add, edit and remove.
//! - [`projector`] computes the schema a rule sees at its position.
//! - [`RuleEditSession`] drives the add/edit dialog from open to commit.
//! - [`request_delete`] and [`request_disable`] gate destructive writes on a
//!   [`ConfirmationPrompt`].
//!
//! Storage is reached through the [`SchemaCatalog`] and
//! [`DatasetVersionGateway`] ports; `conform-core` provides adapters.

mod deletion;
mod error;
mod ports;
pub mod projector;
mod rule_list;
mod session;
pub mod validate;

pub use deletion::{
    DELETE_RULE_MESSAGE, DISABLE_DATASET_MESSAGE, DeleteOutcome, request_delete, request_disable,
};
pub use error::{CatalogError, CatalogResult, Disposition};
pub use ports::{ConfirmationPrompt, DatasetVersionGateway, SchemaCatalog};
pub use projector::{SchemaEffect, UnresolvedInput, project, unresolved_inputs};
pub use rule_list::RuleList;
pub use session::{CommitReceipt, DraftMode, RuleDraft, RuleEditSession, SessionPhase};
