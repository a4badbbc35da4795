//! Confirmed destructive actions: removing a rule, disabling a dataset.

use crate::error::CatalogResult;
use crate::ports::{ConfirmationPrompt, DatasetVersionGateway};
use crate::rule_list::RuleList;
use conform_types::{ConformanceRule, Dataset, DatasetRef};
use tracing::{debug, info};

pub const DELETE_RULE_MESSAGE: &str = "Are you sure you want to delete the conformance rule?";

pub const DISABLE_DATASET_MESSAGE: &str =
    "This action will remove all versions of the dataset definition.\nAre you sure?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The user said no. Nothing was written.
    Declined,
    Deleted {
        /// The version that was written.
        dataset: DatasetRef,
        removed: ConformanceRule,
    },
}

impl DeleteOutcome {
    pub fn new_version(&self) -> Option<u32> {
        match self {
            DeleteOutcome::Declined => None,
            DeleteOutcome::Deleted { dataset, .. } => Some(dataset.version),
        }
    }
}

/// Remove the rule at `index` after confirmation.
///
/// The index is checked before the prompt, so an out-of-range request never
/// asks the user anything.
pub async fn request_delete(
    dataset: &Dataset,
    index: usize,
    message: &str,
    prompt: &dyn ConfirmationPrompt,
    gateway: &dyn DatasetVersionGateway,
) -> CatalogResult<DeleteOutcome> {
    let rules = RuleList::from_rules(dataset.conformance.clone());
    let removed = rules.get(index)?.clone();

    if !prompt.ask(message).await {
        debug!(dataset = %dataset.key(), index, "rule deletion declined");
        return Ok(DeleteOutcome::Declined);
    }

    let next = dataset.with_conformance(rules.remove_at(index)?.into_vec());
    let new_version = gateway.persist(&next).await?;
    info!(
        dataset = %dataset.name,
        version = new_version,
        index,
        output_column = %removed.output_column,
        "rule deleted"
    );
    Ok(DeleteOutcome::Deleted {
        dataset: DatasetRef {
            name: next.name,
            version: new_version,
        },
        removed,
    })
}

/// Disable every version of `name` after confirmation. Returns whether the
/// dataset was disabled.
pub async fn request_disable(
    name: &str,
    message: &str,
    prompt: &dyn ConfirmationPrompt,
    gateway: &dyn DatasetVersionGateway,
) -> CatalogResult<bool> {
    if !prompt.ask(message).await {
        debug!(dataset = name, "disable declined");
        return Ok(false);
    }
    gateway.disable(name).await?;
    info!(dataset = name, "dataset disabled");
    Ok(true)
}
