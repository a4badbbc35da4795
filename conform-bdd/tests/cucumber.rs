use conform_bdd::{currency_mapping, dataset_with_rules, orders_schema, split_columns};
use conform_core::adapters::{InMemoryCatalog, ScriptedPrompt};
use conform_core::detail::{CommitOutcome, DatasetDetail, DatasetRoute};
use conform_core::settings::DetailSettings;
use conform_core::{CatalogError, DatasetVersionGateway};
use conform_domain::SessionPhase;
use conform_types::VersionSelector;
use cucumber::{World, given, then, when};
use std::sync::Arc;

#[derive(Debug, Default, World)]
pub struct ConformWorld {
    catalog: Option<Arc<InMemoryCatalog>>,
    prompt: Option<Arc<ScriptedPrompt>>,
    detail: Option<DatasetDetail>,
    dataset: Option<String>,
    last_error: Option<String>,
}

impl ConformWorld {
    fn catalog(&self) -> Arc<InMemoryCatalog> {
        self.catalog.clone().expect("catalog set")
    }

    fn detail(&mut self) -> &mut DatasetDetail {
        self.detail.as_mut().expect("dataset opened")
    }

    fn dataset_name(&self) -> String {
        self.dataset.clone().expect("dataset set")
    }

    fn record<T>(&mut self, result: Result<T, CatalogError>) -> Option<T> {
        match result {
            Ok(v) => {
                self.last_error = None;
                Some(v)
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                None
            }
        }
    }
}

#[given(expr = "a dataset {string} at version 1 with rules {string}")]
async fn dataset_with(world: &mut ConformWorld, name: String, rules: String) {
    let catalog = InMemoryCatalog::new()
        .with_schema(orders_schema())
        .expect("named schema")
        .with_dataset(dataset_with_rules(&name, &split_columns(&rules)));
    world.catalog = Some(Arc::new(catalog));
    world.dataset = Some(name);
}

#[given(expr = "the user will answer {word} to confirmations")]
async fn user_answers(world: &mut ConformWorld, answer: String) {
    world.prompt = Some(Arc::new(ScriptedPrompt::new([answer == "yes"])));
}

#[given("the dataset detail view shows the latest version")]
async fn open_detail(world: &mut ConformWorld) {
    let catalog = world.catalog();
    let prompt = world
        .prompt
        .clone()
        .unwrap_or_else(|| Arc::new(ScriptedPrompt::new([])));
    let mut detail = DatasetDetail::new(
        catalog.clone(),
        catalog,
        prompt,
        DetailSettings::default(),
    );
    let name = world.dataset_name();
    detail
        .route_matched(DatasetRoute::Latest(name))
        .await
        .expect("route matched");
    world.detail = Some(detail);
}

#[when("another user writes a new version of the dataset")]
async fn concurrent_write(world: &mut ConformWorld) {
    let catalog = world.catalog();
    let name = world.dataset_name();
    let latest = DatasetVersionGateway::fetch(catalog.as_ref(), &name, VersionSelector::Latest)
        .await
        .expect("latest");
    catalog.persist(&latest).await.expect("concurrent write");
}

#[when(expr = "I delete rule {int}")]
async fn delete_rule(world: &mut ConformWorld, index: usize) {
    let result = world.detail().delete_rule(index).await;
    world.record(result);
}

#[when("I open the add rule dialog")]
async fn open_add(world: &mut ConformWorld) {
    let result = world.detail().open_add_rule().await.map(|_| ());
    world.record(result);
}

#[when(expr = "I open the edit dialog for rule {int}")]
async fn open_edit(world: &mut ConformWorld, index: usize) {
    let result = world.detail().open_edit_rule(index).await.map(|_| ());
    world.record(result);
}

#[when(expr = "I fill the draft with a mapping rule writing {string}")]
async fn fill_mapping(world: &mut ConformWorld, output: String) {
    world
        .detail()
        .draft_mut()
        .expect("open dialog")
        .fill_from(currency_mapping(&output));
}

#[when(expr = "I change the draft output column to {string}")]
async fn change_output(world: &mut ConformWorld, output: String) {
    world.detail().draft_mut().expect("open dialog").output_column = output;
}

#[when("I commit the draft")]
async fn commit(world: &mut ConformWorld) {
    let result = world.detail().commit_rule().await;
    if let Some(outcome) = world.record(result) {
        assert!(matches!(outcome, CommitOutcome::Committed(_)));
    }
}

#[when("I cancel the draft")]
async fn cancel(world: &mut ConformWorld) {
    world.detail().cancel_rule().expect("cancel open dialog");
}

#[then(expr = "the latest version of the dataset is {int}")]
async fn latest_version(world: &mut ConformWorld, version: u32) {
    let catalog = world.catalog();
    let name = world.dataset_name();
    let latest = DatasetVersionGateway::fetch(catalog.as_ref(), &name, VersionSelector::Latest)
        .await
        .expect("latest");
    assert_eq!(latest.version, version);
}

#[then(expr = "{int} version(s) of the dataset are stored")]
async fn stored_versions(world: &mut ConformWorld, count: usize) {
    let name = world.dataset_name();
    assert_eq!(world.catalog().history(&name).await.len(), count);
}

#[then(expr = "the current rules are {string}")]
async fn current_rules(world: &mut ConformWorld, expected: String) {
    let current = world.detail().current().expect("current dataset").clone();
    let columns: Vec<&str> = current
        .conformance
        .iter()
        .map(|r| r.output_column.as_str())
        .collect();
    assert_eq!(columns, split_columns(&expected));
    for (i, rule) in current.conformance.iter().enumerate() {
        assert_eq!(rule.order as usize, i, "orders must be dense");
    }
}

#[then(expr = "the dialog view contains {string}")]
async fn view_contains(world: &mut ConformWorld, path: String) {
    let view = world.detail().session().schema_view().expect("open dialog");
    assert!(view.contains(&path), "expected {path} in {:?}", view.paths());
}

#[then(expr = "the dialog view does not contain {string}")]
async fn view_lacks(world: &mut ConformWorld, path: String) {
    let view = world.detail().session().schema_view().expect("open dialog");
    assert!(!view.contains(&path), "unexpected {path} in {:?}", view.paths());
}

#[then(expr = "the dialog is open with output column {string}")]
async fn dialog_open_with(world: &mut ConformWorld, output: String) {
    let session = world.detail().session();
    assert_eq!(session.phase(), SessionPhase::Open);
    assert_eq!(session.draft().expect("draft").output_column, output);
}

#[then("the dialog is closed")]
async fn dialog_closed(world: &mut ConformWorld) {
    assert_eq!(world.detail().session().phase(), SessionPhase::Closed);
}

#[then(expr = "the error mentions {string}")]
async fn error_mentions(world: &mut ConformWorld, fragment: String) {
    let err = world.last_error.as_deref().expect("an error was recorded");
    assert!(err.contains(&fragment), "error was: {err}");
}

#[then("no error was reported")]
async fn no_error(world: &mut ConformWorld) {
    assert_eq!(world.last_error, None);
}

#[tokio::main]
async fn main() {
    let features_path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("features");
    ConformWorld::cucumber().run(features_path).await;
}
