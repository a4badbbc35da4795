//! Default port implementations: in-memory and filesystem catalogs, a
//! per-version schema cache, and non-interactive confirmation prompts.

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use conform_domain::validate::{name_problem, validate_dataset};
use conform_domain::{
    CatalogError, CatalogResult, ConfirmationPrompt, DatasetVersionGateway, SchemaCatalog,
};
use conform_types::{Dataset, DatasetSummary, SchemaFieldTree, VersionSelector};
use fs_err as fs;
use std::collections::{BTreeMap, VecDeque};
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Version a write against `base` would receive, given the stored latest.
///
/// A name with no stored versions starts at 1.
fn next_version(name: &str, latest: Option<u32>, base: u32) -> CatalogResult<u32> {
    match latest {
        None => Ok(1),
        Some(latest) if latest == base => Ok(latest + 1),
        Some(latest) => Err(CatalogError::Conflict {
            name: name.to_string(),
            expected: base,
            actual: latest,
        }),
    }
}

fn stamped(dataset: &Dataset, version: u32) -> Dataset {
    Dataset {
        version,
        last_updated: Some(Utc::now()),
        disabled: false,
        ..dataset.clone()
    }
}

fn schema_key(tree: &SchemaFieldTree) -> CatalogResult<(String, u32)> {
    match (&tree.name, tree.version) {
        (Some(name), Some(version)) => Ok((name.clone(), version)),
        _ => Err(CatalogError::validation(vec![
            "schema must carry a name and version".to_string(),
        ])),
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Schemas and versioned datasets held in memory.
///
/// Enforces the same rules as the filesystem catalog: stale writes fail with
/// `Conflict`, malformed documents with `Validation`.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    schemas: RwLock<BTreeMap<(String, u32), SchemaFieldTree>>,
    datasets: RwLock<BTreeMap<String, Vec<Dataset>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style schema registration. The tree must be named and versioned.
    pub fn with_schema(mut self, tree: SchemaFieldTree) -> CatalogResult<Self> {
        let key = schema_key(&tree)?;
        self.schemas.get_mut().insert(key, tree);
        Ok(self)
    }

    /// Builder-style dataset registration, stored exactly as given.
    pub fn with_dataset(mut self, dataset: Dataset) -> Self {
        let versions = self.datasets.get_mut().entry(dataset.name.clone()).or_default();
        versions.push(dataset);
        versions.sort_by_key(|d| d.version);
        self
    }

    pub async fn insert_schema(&self, tree: SchemaFieldTree) -> CatalogResult<()> {
        let key = schema_key(&tree)?;
        self.schemas.write().await.insert(key, tree);
        Ok(())
    }

    /// Every stored version of `name`, oldest first, including disabled ones.
    pub async fn history(&self, name: &str) -> Vec<Dataset> {
        self.datasets
            .read()
            .await
            .get(name)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl SchemaCatalog for InMemoryCatalog {
    async fn fetch(&self, name: &str, version: u32) -> CatalogResult<SchemaFieldTree> {
        self.schemas
            .read()
            .await
            .get(&(name.to_string(), version))
            .cloned()
            .ok_or_else(|| CatalogError::not_found(format!("schema {name} v{version}")))
    }
}

#[async_trait]
impl DatasetVersionGateway for InMemoryCatalog {
    async fn persist(&self, dataset: &Dataset) -> CatalogResult<u32> {
        validate_dataset(dataset)?;
        let mut datasets = self.datasets.write().await;
        let versions = datasets.entry(dataset.name.clone()).or_default();
        let latest = versions.last().map(|d| d.version);
        let version = next_version(&dataset.name, latest, dataset.version)?;
        versions.push(stamped(dataset, version));
        debug!(dataset = %dataset.name, version, "stored in memory");
        Ok(version)
    }

    async fn fetch(&self, name: &str, version: VersionSelector) -> CatalogResult<Dataset> {
        let datasets = self.datasets.read().await;
        let versions = datasets
            .get(name)
            .filter(|v| v.last().is_some_and(|d| !d.disabled))
            .ok_or_else(|| CatalogError::not_found(format!("dataset {name}")))?;
        let found = match version {
            VersionSelector::Latest => versions.last(),
            VersionSelector::Exact(v) => versions.iter().find(|d| d.version == v),
        };
        found
            .cloned()
            .ok_or_else(|| CatalogError::not_found(format!("dataset {name} v{version}")))
    }

    async fn list(&self) -> CatalogResult<Vec<DatasetSummary>> {
        Ok(self
            .datasets
            .read()
            .await
            .iter()
            .filter_map(|(name, versions)| versions.last().map(|latest| (name, latest)))
            .filter(|(_, latest)| !latest.disabled)
            .map(|(name, latest)| DatasetSummary {
                name: name.clone(),
                latest_version: latest.version,
                disabled: false,
            })
            .collect())
    }

    async fn disable(&self, name: &str) -> CatalogResult<()> {
        let mut datasets = self.datasets.write().await;
        let versions = datasets
            .get_mut(name)
            .ok_or_else(|| CatalogError::not_found(format!("dataset {name}")))?;
        for version in versions.iter_mut() {
            version.disabled = true;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Filesystem
// ---------------------------------------------------------------------------

/// JSON documents on disk:
///
/// ```text
/// <root>/schemas/<name>/<version>.json
/// <root>/datasets/<name>/<version>.json
/// ```
///
/// File access runs on the blocking pool so callers' tasks are not stalled.
#[derive(Debug, Clone)]
pub struct FsCatalog {
    root: Utf8PathBuf,
}

impl FsCatalog {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Create the directory layout under `root`.
    pub fn init(&self) -> anyhow::Result<()> {
        for dir in ["schemas", "datasets"] {
            let path = self.root.join(dir);
            fs::create_dir_all(&path).with_context(|| format!("create {path}"))?;
        }
        Ok(())
    }

    /// Write a schema document. Overwrites an existing file for the same
    /// name and version.
    pub fn put_schema(&self, tree: &SchemaFieldTree) -> CatalogResult<Utf8PathBuf> {
        let (name, version) = schema_key(tree)?;
        if let Some(problem) = name_problem("schema name", &name) {
            return Err(CatalogError::validation(vec![problem]));
        }
        let path = self.schema_path(&name, version);
        write_json(&path, tree)?;
        Ok(path)
    }

    /// Write a dataset document exactly as given, bypassing version checks.
    pub fn put_dataset(&self, dataset: &Dataset) -> CatalogResult<Utf8PathBuf> {
        validate_dataset(dataset)?;
        let path = dataset_path(&self.root, &dataset.name, dataset.version);
        write_json(&path, dataset)?;
        Ok(path)
    }

    fn schema_path(&self, name: &str, version: u32) -> Utf8PathBuf {
        self.root
            .join("schemas")
            .join(name)
            .join(format!("{version}.json"))
    }

    async fn blocking<T, F>(&self, f: F) -> CatalogResult<T>
    where
        T: Send + 'static,
        F: FnOnce(Utf8PathBuf) -> CatalogResult<T> + Send + 'static,
    {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || f(root))
            .await
            .map_err(|e| CatalogError::Backend(anyhow!("catalog task failed: {e}")))?
    }
}

fn dataset_path(root: &Utf8Path, name: &str, version: u32) -> Utf8PathBuf {
    root.join("datasets")
        .join(name)
        .join(format!("{version}.json"))
}

/// Unusable names cannot be stored, so a lookup by one is a plain miss.
fn lookup_name(what: &str, name: &str) -> CatalogResult<()> {
    match name_problem(what, name) {
        Some(problem) => {
            debug!(%problem, "rejected catalog name");
            Err(CatalogError::not_found(format!("{what} {name}")))
        }
        None => Ok(()),
    }
}

/// Create `path` holding `value`. Returns `false` without writing when the
/// file already exists.
fn create_json<T: serde::Serialize + ?Sized>(path: &Utf8Path, value: &T) -> CatalogResult<bool> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create parent dir for {path}"))?;
    }
    let json = serde_json::to_string_pretty(value).context("serialize document")?;
    let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(anyhow::Error::from(e).context(format!("create {path}")).into()),
    };
    file.write_all(json.as_bytes()).with_context(|| format!("write {path}"))?;
    Ok(true)
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Utf8Path, value: &T) -> CatalogResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create parent dir for {path}"))?;
    }
    let json = serde_json::to_string_pretty(value).context("serialize document")?;
    fs::write(path, json).with_context(|| format!("write {path}"))?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Utf8Path) -> CatalogResult<T> {
    let text = fs::read_to_string(path).with_context(|| format!("read {path}"))?;
    let value = serde_json::from_str(&text).with_context(|| format!("parse {path}"))?;
    Ok(value)
}

/// Stored version numbers of dataset `name`, ascending.
fn stored_versions(root: &Utf8Path, name: &str) -> CatalogResult<Vec<u32>> {
    let pattern = root.join("datasets").join(name).join("*.json");
    let mut versions = Vec::new();
    for entry in glob::glob(pattern.as_str()).context("invalid dataset glob")? {
        let path = entry.context("read dataset dir entry")?;
        let version = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<u32>().ok());
        match version {
            Some(v) => versions.push(v),
            None => debug!(path = %path.display(), "ignoring non-version file"),
        }
    }
    versions.sort_unstable();
    Ok(versions)
}

fn dataset_names(root: &Utf8Path) -> CatalogResult<Vec<String>> {
    let dir = root.join("datasets");
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(&dir).with_context(|| format!("list {dir}"))? {
        let entry = entry.with_context(|| format!("list {dir}"))?;
        if entry.path().is_dir()
            && let Some(name) = entry.file_name().to_str()
            && name_problem("dataset", name).is_none()
        {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

#[async_trait]
impl SchemaCatalog for FsCatalog {
    async fn fetch(&self, name: &str, version: u32) -> CatalogResult<SchemaFieldTree> {
        lookup_name("schema", name)?;
        let path = self.schema_path(name, version);
        let what = format!("schema {name} v{version}");
        self.blocking(move |_| {
            if !path.exists() {
                return Err(CatalogError::not_found(what));
            }
            read_json(&path)
        })
        .await
    }
}

#[async_trait]
impl DatasetVersionGateway for FsCatalog {
    async fn persist(&self, dataset: &Dataset) -> CatalogResult<u32> {
        validate_dataset(dataset)?;
        let dataset = dataset.clone();
        self.blocking(move |root| {
            let latest = stored_versions(&root, &dataset.name)?.last().copied();
            let version = next_version(&dataset.name, latest, dataset.version)?;
            let path = dataset_path(&root, &dataset.name, version);
            // Another writer may have taken `version` since the listing.
            if !create_json(&path, &stamped(&dataset, version))? {
                return Err(CatalogError::Conflict {
                    name: dataset.name.clone(),
                    expected: dataset.version,
                    actual: version,
                });
            }
            debug!(dataset = %dataset.name, version, path = %path, "stored on disk");
            Ok(version)
        })
        .await
    }

    async fn fetch(&self, name: &str, version: VersionSelector) -> CatalogResult<Dataset> {
        lookup_name("dataset", name)?;
        let name = name.to_string();
        self.blocking(move |root| {
            let versions = stored_versions(&root, &name)?;
            let Some(&latest) = versions.last() else {
                return Err(CatalogError::not_found(format!("dataset {name}")));
            };
            let latest_doc: Dataset = read_json(&dataset_path(&root, &name, latest))?;
            if latest_doc.disabled {
                return Err(CatalogError::not_found(format!("dataset {name}")));
            }
            match version {
                VersionSelector::Latest => Ok(latest_doc),
                VersionSelector::Exact(v) if versions.contains(&v) => {
                    read_json(&dataset_path(&root, &name, v))
                }
                VersionSelector::Exact(v) => {
                    Err(CatalogError::not_found(format!("dataset {name} v{v}")))
                }
            }
        })
        .await
    }

    async fn list(&self) -> CatalogResult<Vec<DatasetSummary>> {
        self.blocking(|root| {
            let mut out = Vec::new();
            for name in dataset_names(&root)? {
                let Some(&latest) = stored_versions(&root, &name)?.last() else {
                    continue;
                };
                let doc: Dataset = read_json(&dataset_path(&root, &name, latest))?;
                if !doc.disabled {
                    out.push(DatasetSummary {
                        name,
                        latest_version: latest,
                        disabled: false,
                    });
                }
            }
            Ok(out)
        })
        .await
    }

    async fn disable(&self, name: &str) -> CatalogResult<()> {
        lookup_name("dataset", name)?;
        let name = name.to_string();
        self.blocking(move |root| {
            let versions = stored_versions(&root, &name)?;
            if versions.is_empty() {
                return Err(CatalogError::not_found(format!("dataset {name}")));
            }
            for v in versions {
                let path = dataset_path(&root, &name, v);
                let mut doc: Dataset = read_json(&path)?;
                doc.disabled = true;
                write_json(&path, &doc)?;
            }
            Ok(())
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Schema cache
// ---------------------------------------------------------------------------

/// Lazily fills a per-`(name, version)` cache from an inner catalog.
///
/// Schema versions are immutable, so entries never expire. Failed lookups
/// are not cached.
pub struct SchemaCache {
    inner: Arc<dyn SchemaCatalog>,
    entries: RwLock<BTreeMap<(String, u32), SchemaFieldTree>>,
}

impl SchemaCache {
    pub fn new(inner: Arc<dyn SchemaCatalog>) -> Self {
        Self {
            inner,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    pub async fn is_cached(&self, name: &str, version: u32) -> bool {
        self.entries
            .read()
            .await
            .contains_key(&(name.to_string(), version))
    }
}

impl std::fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCache").finish_non_exhaustive()
    }
}

#[async_trait]
impl SchemaCatalog for SchemaCache {
    async fn fetch(&self, name: &str, version: u32) -> CatalogResult<SchemaFieldTree> {
        let key = (name.to_string(), version);
        if let Some(tree) = self.entries.read().await.get(&key) {
            return Ok(tree.clone());
        }
        let tree = self.inner.fetch(name, version).await?;
        debug!(schema = name, version, "schema cached");
        self.entries.write().await.insert(key, tree.clone());
        Ok(tree)
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

/// Always gives the same answer. `FixedPrompt(true)` backs `--yes`.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrompt(pub bool);

#[async_trait]
impl ConfirmationPrompt for FixedPrompt {
    async fn ask(&self, message: &str) -> bool {
        debug!(answer = self.0, question = message, "fixed confirmation");
        self.0
    }
}

/// Answers from a queue and records every question asked.
///
/// Once the queue is empty every further question is declined.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<bool>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub async fn asked(&self) -> Vec<String> {
        self.asked.lock().await.clone()
    }
}

#[async_trait]
impl ConfirmationPrompt for ScriptedPrompt {
    async fn ask(&self, message: &str) -> bool {
        self.asked.lock().await.push(message.to_string());
        self.answers.lock().await.pop_front().unwrap_or(false)
    }
}
