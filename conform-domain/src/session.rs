//! Lifecycle of the add/edit rule dialog.
//!
//! ```text
//! Closed -> Opening -> Open -> Committing -> Closed
//!                        \---> Cancelling -> Closed
//! ```
//!
//! A failed open returns to `Closed`; a failed commit returns to `Open` with
//! the draft untouched.

use crate::error::{CatalogError, CatalogResult};
use crate::ports::{DatasetVersionGateway, SchemaCatalog};
use crate::projector::project;
use crate::rule_list::RuleList;
use crate::validate::validate_rule;
use conform_types::{ConformanceRule, Dataset, DatasetRef, RuleKind, SchemaFieldTree};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Closed,
    Opening,
    Open,
    Committing,
    Cancelling,
}

/// Whether the draft creates a rule or replaces the one at `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DraftMode {
    Add,
    Edit { index: usize },
}

/// Editable copy of a rule held while the dialog is open.
///
/// `kind` is `None` for a blank draft until the user picks a rule type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleDraft {
    pub mode: DraftMode,
    pub order: u32,
    pub output_column: String,
    pub control_checkpoint: bool,
    pub kind: Option<RuleKind>,
}

impl RuleDraft {
    pub fn blank(order: u32) -> Self {
        Self {
            mode: DraftMode::Add,
            order,
            output_column: String::new(),
            control_checkpoint: false,
            kind: None,
        }
    }

    /// Deep copy of `rule` for editing in place.
    pub fn from_rule(index: usize, rule: &ConformanceRule) -> Self {
        let rule = rule.clone();
        Self {
            mode: DraftMode::Edit { index },
            order: index as u32,
            output_column: rule.output_column,
            control_checkpoint: rule.control_checkpoint,
            kind: Some(rule.kind),
        }
    }

    pub fn title(&self) -> &'static str {
        match self.mode {
            DraftMode::Add => "Add",
            DraftMode::Edit { .. } => "Edit",
        }
    }

    pub fn is_edit(&self) -> bool {
        matches!(self.mode, DraftMode::Edit { .. })
    }

    /// Overwrite the editable fields from a complete rule.
    ///
    /// Mode and order stay as opened; the rule's own `order` is ignored.
    pub fn fill_from(&mut self, rule: ConformanceRule) {
        self.output_column = rule.output_column;
        self.control_checkpoint = rule.control_checkpoint;
        self.kind = Some(rule.kind);
    }

    pub fn to_rule(&self) -> CatalogResult<ConformanceRule> {
        let kind = self
            .kind
            .clone()
            .ok_or_else(|| CatalogError::validation(vec!["rule type is required".to_string()]))?;
        Ok(ConformanceRule {
            order: self.order,
            output_column: self.output_column.trim().to_string(),
            control_checkpoint: self.control_checkpoint,
            kind,
        })
    }
}

#[derive(Debug)]
struct Dialog {
    id: Uuid,
    base: DatasetRef,
    draft: RuleDraft,
    schema_view: SchemaFieldTree,
    last_error: Option<String>,
}

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    /// The version that was written.
    pub dataset: DatasetRef,
    pub order: u32,
    pub was_edit: bool,
}

/// At most one dialog at a time; opening while not closed is `SessionBusy`.
#[derive(Debug)]
pub struct RuleEditSession {
    phase: SessionPhase,
    dialog: Option<Dialog>,
}

impl Default for RuleEditSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEditSession {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Closed,
            dialog: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase == SessionPhase::Open
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.dialog.as_ref().map(|d| d.id)
    }

    /// Dataset version the dialog was opened against.
    pub fn base(&self) -> Option<&DatasetRef> {
        self.dialog.as_ref().map(|d| &d.base)
    }

    pub fn draft(&self) -> Option<&RuleDraft> {
        self.dialog.as_ref().map(|d| &d.draft)
    }

    pub fn draft_mut(&mut self) -> CatalogResult<&mut RuleDraft> {
        if self.phase != SessionPhase::Open {
            return Err(CatalogError::SessionClosed);
        }
        self.dialog
            .as_mut()
            .map(|d| &mut d.draft)
            .ok_or(CatalogError::SessionClosed)
    }

    /// Field tree shown to the draft: the base schema with every rule
    /// before the draft's position applied.
    pub fn schema_view(&self) -> Option<&SchemaFieldTree> {
        self.dialog.as_ref().map(|d| &d.schema_view)
    }

    /// Message of the last failed commit, kept for inline display.
    pub fn last_error(&self) -> Option<&str> {
        self.dialog.as_ref().and_then(|d| d.last_error.as_deref())
    }

    /// Open a blank draft that will be appended after the current rules.
    pub async fn open_for_add(
        &mut self,
        dataset: &Dataset,
        catalog: &dyn SchemaCatalog,
    ) -> CatalogResult<&RuleDraft> {
        self.ensure_closed()?;
        let rules = RuleList::from_rules(dataset.conformance.clone());
        let draft = RuleDraft::blank(rules.len() as u32);
        self.open(dataset, draft, rules.as_slice(), catalog).await
    }

    /// Open a copy of the rule at `index`. The view excludes that rule and
    /// everything after it.
    pub async fn open_for_edit(
        &mut self,
        dataset: &Dataset,
        index: usize,
        catalog: &dyn SchemaCatalog,
    ) -> CatalogResult<&RuleDraft> {
        self.ensure_closed()?;
        let rules = RuleList::from_rules(dataset.conformance.clone());
        let draft = RuleDraft::from_rule(index, rules.get(index)?);
        self.open(dataset, draft, rules.prefix(index)?, catalog).await
    }

    async fn open(
        &mut self,
        dataset: &Dataset,
        draft: RuleDraft,
        preceding: &[ConformanceRule],
        catalog: &dyn SchemaCatalog,
    ) -> CatalogResult<&RuleDraft> {
        let id = Uuid::new_v4();
        self.phase = SessionPhase::Opening;
        debug!(
            session = %id,
            dataset = %dataset.key(),
            mode = ?draft.mode,
            "opening rule dialog"
        );

        let base = match catalog
            .fetch(&dataset.schema_name, dataset.schema_version)
            .await
        {
            Ok(tree) => tree,
            Err(err) => {
                self.phase = SessionPhase::Closed;
                warn!(session = %id, error = %err, "schema fetch failed; dialog not opened");
                return Err(err);
            }
        };

        let dialog = self.dialog.insert(Dialog {
            id,
            base: dataset.key(),
            schema_view: project(&base, preceding),
            draft,
            last_error: None,
        });
        self.phase = SessionPhase::Open;
        Ok(&dialog.draft)
    }

    /// Write the draft as a new dataset version.
    ///
    /// `dataset` must be the version the dialog was opened against. On any
    /// failure the dialog stays open with the draft as it was.
    pub async fn commit(
        &mut self,
        dataset: &Dataset,
        gateway: &dyn DatasetVersionGateway,
    ) -> CatalogResult<CommitReceipt> {
        if self.phase != SessionPhase::Open {
            return Err(CatalogError::SessionClosed);
        }
        let Some(dialog) = self.dialog.as_mut() else {
            return Err(CatalogError::SessionClosed);
        };

        let (next, order) = match prepare(dialog, dataset) {
            Ok(prepared) => prepared,
            Err(err) => {
                dialog.last_error = Some(err.to_string());
                return Err(err);
            }
        };
        let id = dialog.id;
        let was_edit = dialog.draft.is_edit();

        self.phase = SessionPhase::Committing;
        debug!(session = %id, dataset = %next.key(), order, was_edit, "persisting rule");

        match gateway.persist(&next).await {
            Ok(new_version) => {
                self.phase = SessionPhase::Closed;
                self.dialog = None;
                info!(
                    session = %id,
                    dataset = %next.name,
                    version = new_version,
                    order,
                    "rule committed"
                );
                Ok(CommitReceipt {
                    dataset: DatasetRef {
                        name: next.name,
                        version: new_version,
                    },
                    order,
                    was_edit,
                })
            }
            Err(err) => {
                self.phase = SessionPhase::Open;
                if let Some(dialog) = self.dialog.as_mut() {
                    dialog.last_error = Some(err.to_string());
                }
                warn!(session = %id, error = %err, "commit failed; draft kept");
                Err(err)
            }
        }
    }

    /// Discard the draft and its view. No backend call is made.
    pub fn cancel(&mut self) -> CatalogResult<()> {
        if self.phase != SessionPhase::Open {
            return Err(CatalogError::SessionClosed);
        }
        self.phase = SessionPhase::Cancelling;
        let dialog = self.dialog.take();
        self.phase = SessionPhase::Closed;
        debug!(session = ?dialog.map(|d| d.id), "rule dialog cancelled");
        Ok(())
    }

    /// Close from any phase, e.g. when the view navigates elsewhere.
    pub fn abandon(&mut self) {
        if let Some(dialog) = self.dialog.take() {
            debug!(session = %dialog.id, phase = ?self.phase, "rule dialog abandoned");
        }
        self.phase = SessionPhase::Closed;
    }

    fn ensure_closed(&self) -> CatalogResult<()> {
        if self.phase == SessionPhase::Closed {
            Ok(())
        } else {
            Err(CatalogError::SessionBusy)
        }
    }
}

fn prepare(dialog: &Dialog, dataset: &Dataset) -> CatalogResult<(Dataset, u32)> {
    if dataset.name != dialog.base.name || dataset.version != dialog.base.version {
        return Err(CatalogError::Conflict {
            name: dialog.base.name.clone(),
            expected: dialog.base.version,
            actual: dataset.version,
        });
    }

    let rule = dialog.draft.to_rule()?;
    validate_rule(&rule)?;

    let rules = RuleList::from_rules(dataset.conformance.clone());
    let (updated, order) = match dialog.draft.mode {
        DraftMode::Edit { index } => (rules.replace_at(index, rule)?, index as u32),
        DraftMode::Add => rules.insert_at_end(rule),
    };
    Ok((dataset.with_conformance(updated.into_vec()), order))
}
