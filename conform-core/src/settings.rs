//! Clap-free settings for the dataset detail controller.

use conform_domain::{DELETE_RULE_MESSAGE, DISABLE_DATASET_MESSAGE};

/// Settings for [`DatasetDetail`](crate::detail::DatasetDetail).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailSettings {
    /// Question asked before a rule is deleted.
    pub delete_rule_message: String,

    /// Question asked before every version of a dataset is disabled.
    pub disable_dataset_message: String,

    /// After a rule is deleted, replay the remaining rules and log inputs
    /// that no longer resolve.
    pub report_dangling_inputs: bool,
}

impl Default for DetailSettings {
    fn default() -> Self {
        Self {
            delete_rule_message: DELETE_RULE_MESSAGE.to_string(),
            disable_dataset_message: DISABLE_DATASET_MESSAGE.to_string(),
            report_dangling_inputs: true,
        }
    }
}
