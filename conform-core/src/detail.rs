//! Dataset detail controller.
//!
//! Owns the currently displayed dataset version and the single rule edit
//! session. Every write produces a new version, which is then re-fetched
//! and becomes the current one.

use crate::adapters::SchemaCache;
use crate::settings::DetailSettings;
use conform_domain::{
    CatalogError, CatalogResult, CommitReceipt, ConfirmationPrompt, DatasetVersionGateway,
    DeleteOutcome, RuleDraft, RuleEditSession, RuleList, SchemaCatalog, UnresolvedInput, project,
    request_delete, request_disable, unresolved_inputs,
};
use conform_types::{Dataset, SchemaFieldTree, VersionSelector};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Which dataset version the view should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetRoute {
    /// The first dataset in the listing, at its latest version.
    First,
    Latest(String),
    Exact(String, u32),
}

/// Navigation generation counter shared with whoever can move the view.
///
/// Work started under one generation must not touch the view once the
/// generation has moved on.
#[derive(Debug, Clone, Default)]
pub struct RouteGuard {
    generation: Arc<AtomicU64>,
}

/// Generation captured when a piece of work started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteTicket(u64);

impl RouteGuard {
    pub fn ticket(&self) -> RouteTicket {
        RouteTicket(self.generation.load(Ordering::SeqCst))
    }

    /// Mark every outstanding ticket as stale.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_current(&self, ticket: RouteTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }
}

/// Header fields of a dataset that can be edited outside the rule list.
///
/// `None` leaves a field as it is; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetEdit {
    pub description: Option<Option<String>>,
    pub raw_path: Option<Option<String>>,
    pub publish_path: Option<Option<String>>,
    pub schema: Option<(String, u32)>,
}

impl DatasetEdit {
    pub fn is_empty(&self) -> bool {
        *self == DatasetEdit::default()
    }

    fn apply(&self, dataset: &Dataset) -> Dataset {
        let mut next = dataset.clone();
        if let Some(description) = &self.description {
            next.description = description.clone();
        }
        if let Some(raw_path) = &self.raw_path {
            next.raw_path = raw_path.clone();
        }
        if let Some(publish_path) = &self.publish_path {
            next.publish_path = publish_path.clone();
        }
        if let Some((name, version)) = &self.schema {
            next.schema_name = name.clone();
            next.schema_version = *version;
        }
        next
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The write landed and the view now shows the new version.
    Committed(Dataset),
    /// The write landed but the view had moved on; the view was not touched.
    Superseded(CommitReceipt),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub outcome: DeleteOutcome,
    /// Inputs of the remaining rules that no longer resolve.
    pub dangling: Vec<UnresolvedInput>,
}

pub struct DatasetDetail {
    schemas: SchemaCache,
    gateway: Arc<dyn DatasetVersionGateway>,
    prompt: Arc<dyn ConfirmationPrompt>,
    settings: DetailSettings,
    current: Option<Dataset>,
    session: RuleEditSession,
    route: RouteGuard,
}

impl fmt::Debug for DatasetDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetDetail")
            .field("current", &self.current.as_ref().map(Dataset::key))
            .field("session", &self.session.phase())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl DatasetDetail {
    pub fn new(
        catalog: Arc<dyn SchemaCatalog>,
        gateway: Arc<dyn DatasetVersionGateway>,
        prompt: Arc<dyn ConfirmationPrompt>,
        settings: DetailSettings,
    ) -> Self {
        Self {
            schemas: SchemaCache::new(catalog),
            gateway,
            prompt,
            settings,
            current: None,
            session: RuleEditSession::new(),
            route: RouteGuard::default(),
        }
    }

    pub fn current(&self) -> Option<&Dataset> {
        self.current.as_ref()
    }

    pub fn session(&self) -> &RuleEditSession {
        &self.session
    }

    /// Handle for code that can navigate the view while work is in flight.
    pub fn route_guard(&self) -> RouteGuard {
        self.route.clone()
    }

    fn loaded(&self) -> CatalogResult<&Dataset> {
        self.current
            .as_ref()
            .ok_or_else(|| CatalogError::not_found("no dataset is loaded"))
    }

    /// Load the dataset version named by `route`.
    ///
    /// Once the version is loaded, any open rule dialog is dropped and
    /// in-flight work is superseded. On failure the previously shown version
    /// and its dialog stay as they were.
    pub async fn route_matched(&mut self, route: DatasetRoute) -> CatalogResult<&Dataset> {
        let (name, selector) = match route {
            DatasetRoute::First => {
                let listing = self.gateway.list().await?;
                let first = listing
                    .into_iter()
                    .next()
                    .ok_or_else(|| CatalogError::not_found("no datasets"))?;
                (first.name, VersionSelector::Latest)
            }
            DatasetRoute::Latest(name) => (name, VersionSelector::Latest),
            DatasetRoute::Exact(name, version) => (name, VersionSelector::Exact(version)),
        };

        let dataset = match self.gateway.fetch(&name, selector).await {
            Ok(dataset) => dataset,
            Err(err) => {
                warn!(dataset = %name, version = %selector, error = %err, "route not loaded");
                return Err(err);
            }
        };
        self.route.invalidate();
        self.session.abandon();
        debug!(dataset = %dataset.key(), "route matched");
        Ok(self.current.insert(dataset))
    }

    /// Base schema of the current dataset, fetched once per schema version.
    pub async fn fetch_schema(&self) -> CatalogResult<SchemaFieldTree> {
        let dataset = self.loaded()?;
        self.schemas
            .fetch(&dataset.schema_name, dataset.schema_version)
            .await
    }

    /// Schema as seen by the rule at `position`: the base schema with rules
    /// `0..position` applied. `position == len` gives the fully conformed
    /// schema.
    pub async fn schema_at(&self, position: usize) -> CatalogResult<SchemaFieldTree> {
        let dataset = self.loaded()?;
        let len = dataset.conformance.len();
        if position > len {
            return Err(CatalogError::OutOfRange {
                index: position,
                len,
            });
        }
        let rules = RuleList::from_rules(dataset.conformance.clone());
        let base = self.fetch_schema().await?;
        Ok(project(&base, &rules.as_slice()[..position]))
    }

    pub async fn open_add_rule(&mut self) -> CatalogResult<&RuleDraft> {
        let dataset = self
            .current
            .as_ref()
            .ok_or_else(|| CatalogError::not_found("no dataset is loaded"))?;
        self.session.open_for_add(dataset, &self.schemas).await
    }

    pub async fn open_edit_rule(&mut self, index: usize) -> CatalogResult<&RuleDraft> {
        let dataset = self
            .current
            .as_ref()
            .ok_or_else(|| CatalogError::not_found("no dataset is loaded"))?;
        self.session.open_for_edit(dataset, index, &self.schemas).await
    }

    pub fn draft_mut(&mut self) -> CatalogResult<&mut RuleDraft> {
        self.session.draft_mut()
    }

    pub fn cancel_rule(&mut self) -> CatalogResult<()> {
        self.session.cancel()
    }

    /// Commit the open dialog and move the view to the written version.
    pub async fn commit_rule(&mut self) -> CatalogResult<CommitOutcome> {
        let ticket = self.route.ticket();
        let dataset = self
            .current
            .as_ref()
            .ok_or(CatalogError::SessionClosed)?;
        let receipt = self.session.commit(dataset, self.gateway.as_ref()).await?;

        if !self.route.is_current(ticket) {
            debug!(dataset = %receipt.dataset, "view moved during commit; response ignored");
            return Ok(CommitOutcome::Superseded(receipt));
        }
        let dataset = self.refetch(receipt.dataset.version).await?;
        Ok(CommitOutcome::Committed(dataset))
    }

    /// Delete the rule at `index` after confirmation, then report inputs of
    /// the remaining rules that no longer resolve.
    ///
    /// References are never rewritten; dangling inputs are only reported.
    pub async fn delete_rule(&mut self, index: usize) -> CatalogResult<DeleteReport> {
        let ticket = self.route.ticket();
        let dataset = self.loaded()?;
        let outcome = request_delete(
            dataset,
            index,
            &self.settings.delete_rule_message,
            self.prompt.as_ref(),
            self.gateway.as_ref(),
        )
        .await?;

        let new_version = match outcome.new_version() {
            Some(v) if self.route.is_current(ticket) => v,
            _ => {
                return Ok(DeleteReport {
                    outcome,
                    dangling: Vec::new(),
                });
            }
        };

        let updated = self.refetch(new_version).await?;
        let dangling = if self.settings.report_dangling_inputs {
            let base = self.fetch_schema().await?;
            let rules = RuleList::from_rules(updated.conformance.clone());
            unresolved_inputs(&base, rules.as_slice())
        } else {
            Vec::new()
        };
        for input in &dangling {
            warn!(
                dataset = %updated.key(),
                index = input.order,
                column = %input.column,
                "rule input no longer resolves"
            );
        }
        Ok(DeleteReport { outcome, dangling })
    }

    /// Disable every version of the current dataset after confirmation.
    ///
    /// On success the view is cleared.
    pub async fn disable_dataset(&mut self) -> CatalogResult<bool> {
        let name = self.loaded()?.name.clone();
        let disabled = request_disable(
            &name,
            &self.settings.disable_dataset_message,
            self.prompt.as_ref(),
            self.gateway.as_ref(),
        )
        .await?;
        if disabled {
            self.route.invalidate();
            self.session.abandon();
            self.current = None;
        }
        Ok(disabled)
    }

    /// Write a new version with edited header fields.
    ///
    /// A changed schema reference must exist in the catalog.
    pub async fn edit_dataset(&mut self, edit: &DatasetEdit) -> CatalogResult<Dataset> {
        let dataset = self.loaded()?;
        if edit.is_empty() {
            return Ok(dataset.clone());
        }
        if let Some((name, version)) = &edit.schema {
            self.schemas.fetch(name, *version).await?;
        }
        let next = edit.apply(dataset);
        let version = self.gateway.persist(&next).await?;
        info!(dataset = %next.name, version, "dataset header edited");
        self.refetch(version).await
    }

    async fn refetch(&mut self, version: u32) -> CatalogResult<Dataset> {
        let name = self.loaded()?.name.clone();
        let dataset = self
            .gateway
            .fetch(&name, VersionSelector::Exact(version))
            .await?;
        self.current = Some(dataset.clone());
        Ok(dataset)
    }
}
