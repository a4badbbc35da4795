//! End-to-end flows through `DatasetDetail` over the in-memory catalog.

use async_trait::async_trait;
use conform_core::adapters::{FixedPrompt, FsCatalog, InMemoryCatalog, ScriptedPrompt};
use conform_core::detail::{CommitOutcome, DatasetDetail, DatasetEdit, DatasetRoute, RouteGuard};
use conform_core::settings::DetailSettings;
use conform_core::{CatalogError, CatalogResult, DatasetVersionGateway};
use conform_domain::{DELETE_RULE_MESSAGE, DeleteOutcome, DISABLE_DATASET_MESSAGE};
use conform_types::{
    ConformanceRule, DataType, Dataset, DatasetSummary, MappingRule, RuleKind, SchemaField,
    SchemaFieldTree, VersionSelector,
};
use camino::Utf8PathBuf;
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use tempfile::TempDir;

fn schema() -> SchemaFieldTree {
    SchemaFieldTree::named(
        "orders_schema",
        1,
        vec![
            SchemaField::new("id", DataType::primitive("long")),
            SchemaField::new("name", DataType::string()),
            SchemaField::new("currency", DataType::string()),
        ],
    )
}

fn upper(order: u32, input: &str, output: &str) -> ConformanceRule {
    ConformanceRule::new(
        order,
        output,
        RuleKind::Uppercase {
            input_column: input.to_string(),
        },
    )
}

fn orders_v1() -> Dataset {
    let mut ds = Dataset::new("orders", "orders_schema", 1);
    ds.conformance = vec![upper(0, "name", "a"), upper(1, "a", "b")];
    ds
}

fn catalog() -> Arc<InMemoryCatalog> {
    Arc::new(
        InMemoryCatalog::new()
            .with_schema(schema())
            .unwrap()
            .with_dataset(orders_v1())
            .with_dataset(Dataset::new("zeta", "orders_schema", 1)),
    )
}

fn detail_with(catalog: Arc<InMemoryCatalog>, answer: bool) -> DatasetDetail {
    DatasetDetail::new(
        catalog.clone(),
        catalog,
        Arc::new(FixedPrompt(answer)),
        DetailSettings::default(),
    )
}

#[tokio::test]
async fn first_route_loads_first_dataset_latest() {
    let mut detail = detail_with(catalog(), true);
    let ds = detail.route_matched(DatasetRoute::First).await.unwrap();
    assert_eq!(ds.name, "orders");
    assert_eq!(ds.version, 1);
}

#[tokio::test]
async fn unknown_route_keeps_current_dataset() {
    let mut detail = detail_with(catalog(), true);
    detail
        .route_matched(DatasetRoute::Latest("orders".to_string()))
        .await
        .unwrap();

    let err = detail
        .route_matched(DatasetRoute::Exact("orders".to_string(), 9))
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::NotFound { .. }));
    assert_eq!(detail.current().unwrap().version, 1);
}

#[tokio::test]
async fn add_mapping_rule_moves_view_to_new_version() {
    let mut detail = detail_with(catalog(), true);
    detail
        .route_matched(DatasetRoute::Latest("orders".to_string()))
        .await
        .unwrap();

    detail.open_add_rule().await.unwrap();
    detail.draft_mut().unwrap().fill_from(ConformanceRule::new(
        0,
        "rate",
        RuleKind::Mapping(MappingRule {
            mapping_table: "fx".to_string(),
            mapping_table_version: 1,
            attribute_mappings: BTreeMap::from([("ccy".to_string(), "currency".to_string())]),
            target_attribute: "rate".to_string(),
            target_data_type: Some("double".to_string()),
            null_safe: false,
        }),
    ));

    let CommitOutcome::Committed(ds) = detail.commit_rule().await.unwrap() else {
        panic!("expected committed");
    };
    assert_eq!(ds.version, 2);
    assert_eq!(ds.conformance.len(), 3);
    assert_eq!(ds.conformance[2].order, 2);
    assert_eq!(detail.current().unwrap().version, 2);

    let conformed = detail.schema_at(3).await.unwrap();
    assert_eq!(conformed.find("rate").unwrap().data_type.label(), "double");
}

#[tokio::test]
async fn schema_at_past_end_is_out_of_range() {
    let mut detail = detail_with(catalog(), true);
    detail
        .route_matched(DatasetRoute::Latest("orders".to_string()))
        .await
        .unwrap();
    assert!(matches!(
        detail.schema_at(3).await,
        Err(CatalogError::OutOfRange { index: 3, len: 2 })
    ));
    let view = detail.schema_at(1).await.unwrap();
    assert!(view.contains("a"));
    assert!(!view.contains("b"));
}

#[tokio::test]
async fn failed_navigation_keeps_open_draft() {
    let mut detail = detail_with(catalog(), true);
    detail
        .route_matched(DatasetRoute::Latest("orders".to_string()))
        .await
        .unwrap();
    detail.open_edit_rule(1).await.unwrap();
    detail.draft_mut().unwrap().output_column = "b_renamed".to_string();

    assert!(
        detail
            .route_matched(DatasetRoute::Exact("orders".to_string(), 9))
            .await
            .is_err()
    );
    assert!(detail.session().is_open());
    assert_eq!(detail.session().draft().unwrap().output_column, "b_renamed");

    detail
        .route_matched(DatasetRoute::Latest("zeta".to_string()))
        .await
        .unwrap();
    assert!(!detail.session().is_open());
    assert!(detail.session().draft().is_none());
}

#[tokio::test]
async fn delete_reports_dangling_inputs() {
    let catalog = catalog();
    let prompt = Arc::new(ScriptedPrompt::new([true]));
    let mut detail = DatasetDetail::new(
        catalog.clone(),
        catalog.clone(),
        prompt.clone(),
        DetailSettings::default(),
    );
    detail
        .route_matched(DatasetRoute::Latest("orders".to_string()))
        .await
        .unwrap();

    let report = detail.delete_rule(0).await.unwrap();

    assert_eq!(report.outcome.new_version(), Some(2));
    assert_eq!(report.dangling.len(), 1);
    assert_eq!(report.dangling[0].column, "a");
    assert_eq!(prompt.asked().await, vec![DELETE_RULE_MESSAGE.to_string()]);

    let current = detail.current().unwrap();
    assert_eq!(current.version, 2);
    assert_eq!(current.conformance[0].output_column, "b");
    assert_eq!(current.conformance[0].order, 0);
}

#[tokio::test]
async fn declined_delete_keeps_version() {
    let catalog = catalog();
    let mut detail = detail_with(catalog.clone(), false);
    detail
        .route_matched(DatasetRoute::Latest("orders".to_string()))
        .await
        .unwrap();

    let report = detail.delete_rule(1).await.unwrap();

    assert_eq!(report.outcome, DeleteOutcome::Declined);
    assert_eq!(catalog.history("orders").await.len(), 1);
}

#[tokio::test]
async fn disable_clears_view_and_hides_dataset() {
    let catalog = catalog();
    let prompt = Arc::new(ScriptedPrompt::new([true]));
    let mut detail = DatasetDetail::new(
        catalog.clone(),
        catalog.clone(),
        prompt.clone(),
        DetailSettings::default(),
    );
    detail
        .route_matched(DatasetRoute::Latest("orders".to_string()))
        .await
        .unwrap();

    assert!(detail.disable_dataset().await.unwrap());
    assert!(detail.current().is_none());
    assert_eq!(prompt.asked().await, vec![DISABLE_DATASET_MESSAGE.to_string()]);

    let ds = detail.route_matched(DatasetRoute::First).await.unwrap();
    assert_eq!(ds.name, "zeta");
}

#[tokio::test]
async fn edit_header_checks_schema_and_writes_version() {
    let mut detail = detail_with(catalog(), true);
    detail
        .route_matched(DatasetRoute::Latest("orders".to_string()))
        .await
        .unwrap();

    let missing = DatasetEdit {
        schema: Some(("orders_schema".to_string(), 5)),
        ..DatasetEdit::default()
    };
    assert!(matches!(
        detail.edit_dataset(&missing).await,
        Err(CatalogError::NotFound { .. })
    ));

    let edit = DatasetEdit {
        description: Some(Some("daily orders".to_string())),
        raw_path: Some(Some("/raw/orders".to_string())),
        ..DatasetEdit::default()
    };
    let ds = detail.edit_dataset(&edit).await.unwrap();
    assert_eq!(ds.version, 2);
    assert_eq!(ds.description.as_deref(), Some("daily orders"));
    assert_eq!(ds.conformance.len(), 2);
}

/// Gateway that moves the view while a write is in flight.
struct NavigatesAway {
    inner: Arc<InMemoryCatalog>,
    guard: OnceLock<RouteGuard>,
}

#[async_trait]
impl DatasetVersionGateway for NavigatesAway {
    async fn persist(&self, dataset: &Dataset) -> CatalogResult<u32> {
        let version = self.inner.persist(dataset).await?;
        if let Some(guard) = self.guard.get() {
            guard.invalidate();
        }
        Ok(version)
    }

    async fn fetch(&self, name: &str, version: VersionSelector) -> CatalogResult<Dataset> {
        DatasetVersionGateway::fetch(self.inner.as_ref(), name, version).await
    }

    async fn list(&self) -> CatalogResult<Vec<DatasetSummary>> {
        self.inner.list().await
    }

    async fn disable(&self, name: &str) -> CatalogResult<()> {
        self.inner.disable(name).await
    }
}

#[tokio::test]
async fn commit_response_after_navigation_is_ignored() {
    let inner = catalog();
    let gateway = Arc::new(NavigatesAway {
        inner: inner.clone(),
        guard: OnceLock::new(),
    });
    let mut detail = DatasetDetail::new(
        inner.clone(),
        gateway.clone(),
        Arc::new(FixedPrompt(true)),
        DetailSettings::default(),
    );
    detail
        .route_matched(DatasetRoute::Latest("orders".to_string()))
        .await
        .unwrap();
    let _ = gateway.guard.set(detail.route_guard());

    detail.open_edit_rule(1).await.unwrap();
    detail.draft_mut().unwrap().output_column = "b2".to_string();
    let outcome = detail.commit_rule().await.unwrap();

    assert!(matches!(outcome, CommitOutcome::Superseded(ref r) if r.dataset.version == 2));
    assert_eq!(detail.current().unwrap().version, 1, "view untouched");
    assert_eq!(inner.history("orders").await.len(), 2, "write still landed");
}

#[tokio::test]
async fn fs_catalog_backs_the_detail_view() {
    let temp = TempDir::new().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let fs_catalog = FsCatalog::new(root.clone());
    fs_catalog.init().unwrap();
    fs_catalog.put_schema(&schema()).unwrap();
    fs_catalog.put_dataset(&orders_v1()).unwrap();
    let fs_catalog = Arc::new(fs_catalog);

    let mut detail = DatasetDetail::new(
        fs_catalog.clone(),
        fs_catalog,
        Arc::new(FixedPrompt(true)),
        DetailSettings::default(),
    );
    detail.route_matched(DatasetRoute::First).await.unwrap();
    detail.open_edit_rule(0).await.unwrap();
    detail.cancel_rule().unwrap();
    detail.delete_rule(1).await.unwrap();

    assert!(root.join("datasets/orders/2.json").exists());
    assert_eq!(detail.current().unwrap().conformance.len(), 1);
}

#[tokio::test]
async fn shuffled_document_projects_like_the_edit_dialog() {
    let temp = TempDir::new().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let fs_catalog = FsCatalog::new(root.clone());
    fs_catalog.init().unwrap();
    fs_catalog.put_schema(&schema()).unwrap();
    // Hand-written file: rule `b` (order 1) is stored before rule `a` (order 0).
    let mut stored = orders_v1();
    stored.conformance.reverse();
    std::fs::create_dir_all(root.join("datasets/orders")).unwrap();
    std::fs::write(
        root.join("datasets/orders/1.json"),
        serde_json::to_string_pretty(&stored).unwrap(),
    )
    .unwrap();
    let fs_catalog = Arc::new(fs_catalog);

    let mut detail = DatasetDetail::new(
        fs_catalog.clone(),
        fs_catalog,
        Arc::new(FixedPrompt(true)),
        DetailSettings::default(),
    );
    detail.route_matched(DatasetRoute::First).await.unwrap();

    let at_one = detail.schema_at(1).await.unwrap();
    assert!(at_one.contains("a"));
    assert!(!at_one.contains("b"));

    detail.open_edit_rule(1).await.unwrap();
    assert_eq!(detail.session().schema_view(), Some(&at_one));
}
