mod config;
mod prompt;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use conform_core::adapters::{FixedPrompt, FsCatalog};
use conform_core::detail::{CommitOutcome, DatasetDetail, DatasetRoute};
use conform_core::{CatalogError, ConfirmationPrompt, DatasetVersionGateway};
use conform_domain::DeleteOutcome;
use conform_render::{render_dataset_list_md, render_dataset_md, render_schema_md};
use conform_types::{ConformanceRule, VersionSelector};
use config::{ConfigMerger, MergedConfig};
use fs_err as fs;
use prompt::StdinPrompt;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "conform",
    version,
    about = "Edit dataset conformance rules against a versioned catalog."
)]
struct Cli {
    /// Directory searched for conform.toml (default: current directory).
    #[arg(long, global = true, default_value = ".")]
    root: Utf8PathBuf,

    /// Catalog directory (overrides [catalog] dir).
    #[arg(long, global = true, env = "CONFORM_CATALOG")]
    catalog: Option<Utf8PathBuf>,

    /// Answer yes to confirmation prompts.
    #[arg(long, short = 'y', global = true, default_value_t = false)]
    yes: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List enabled datasets with their latest versions.
    List,
    /// Show a dataset version with its conformance rules.
    Show(ShowArgs),
    /// Show the schema as seen at a rule position.
    Project(ProjectArgs),
    /// Append a rule, writing a new dataset version.
    AddRule(AddRuleArgs),
    /// Replace the rule at an index, writing a new dataset version.
    EditRule(EditRuleArgs),
    /// Delete the rule at an index after confirmation.
    RemoveRule(RemoveRuleArgs),
    /// Disable every version of a dataset after confirmation.
    Disable(DisableArgs),
}

#[derive(Debug, Parser)]
struct DatasetArgs {
    /// Dataset name.
    dataset: String,

    /// Dataset version ("latest" or a number).
    #[arg(long = "dataset-version", default_value = "latest")]
    dataset_version: VersionSelector,
}

impl DatasetArgs {
    fn route(&self) -> DatasetRoute {
        match self.dataset_version {
            VersionSelector::Latest => DatasetRoute::Latest(self.dataset.clone()),
            VersionSelector::Exact(v) => DatasetRoute::Exact(self.dataset.clone(), v),
        }
    }
}

#[derive(Debug, Parser)]
struct ShowArgs {
    #[command(flatten)]
    target: DatasetArgs,

    #[arg(long, value_enum, default_value = "md")]
    format: OutputFormat,
}

#[derive(Debug, Parser)]
struct ProjectArgs {
    #[command(flatten)]
    target: DatasetArgs,

    /// Rule position; rules before it are applied (default: all rules).
    #[arg(long)]
    at: Option<usize>,

    #[arg(long, value_enum, default_value = "md")]
    format: OutputFormat,
}

#[derive(Debug, Parser)]
struct AddRuleArgs {
    #[command(flatten)]
    target: DatasetArgs,

    /// Rule as JSON, or @path to a JSON file.
    #[arg(long)]
    rule: String,
}

#[derive(Debug, Parser)]
struct EditRuleArgs {
    #[command(flatten)]
    target: DatasetArgs,

    /// Zero-based index of the rule to replace.
    index: usize,

    /// Rule as JSON, or @path to a JSON file.
    #[arg(long)]
    rule: String,
}

#[derive(Debug, Parser)]
struct RemoveRuleArgs {
    #[command(flatten)]
    target: DatasetArgs,

    /// Zero-based index of the rule to delete.
    index: usize,
}

#[derive(Debug, Parser)]
struct DisableArgs {
    /// Dataset name.
    dataset: String,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Md,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    match real_main().await {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            error!("{:?}", e);
            eprintln!("error: {e:#}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}

/// Catalog errors carry their own exit code; anything else is 1.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<CatalogError>()
        .map(CatalogError::exit_code)
        .unwrap_or(1)
}

async fn real_main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let file_config = config::load_or_default(&cli.root).context("load conform.toml config")?;
    let merger = ConfigMerger::new(cli.root.clone(), file_config);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(merger.log_filter()))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let merged = merger.merge_args(cli.catalog.as_deref(), cli.yes);
    debug!(
        "merged config: catalog_dir={}, assume_yes={}",
        merged.catalog_dir, merged.assume_yes
    );

    match cli.cmd {
        Command::List => cmd_list(&merged).await,
        Command::Show(args) => cmd_show(&merged, args).await,
        Command::Project(args) => cmd_project(&merged, args).await,
        Command::AddRule(args) => cmd_add_rule(&merged, args).await,
        Command::EditRule(args) => cmd_edit_rule(&merged, args).await,
        Command::RemoveRule(args) => cmd_remove_rule(&merged, args).await,
        Command::Disable(args) => cmd_disable(&merged, args).await,
    }
}

fn open_catalog(merged: &MergedConfig) -> anyhow::Result<Arc<FsCatalog>> {
    if !merged.catalog_dir.is_dir() {
        anyhow::bail!("catalog directory {} does not exist", merged.catalog_dir);
    }
    Ok(Arc::new(FsCatalog::new(merged.catalog_dir.clone())))
}

fn detail_for(merged: &MergedConfig) -> anyhow::Result<DatasetDetail> {
    let catalog = open_catalog(merged)?;
    let prompt: Arc<dyn ConfirmationPrompt> = if merged.assume_yes {
        Arc::new(FixedPrompt(true))
    } else {
        Arc::new(StdinPrompt)
    };
    Ok(DatasetDetail::new(
        catalog.clone(),
        catalog,
        prompt,
        merged.detail.clone(),
    ))
}

/// Parse a rule from JSON text or `@file`. A missing `order` defaults to 0;
/// the position is assigned on write.
fn parse_rule(raw: &str) -> anyhow::Result<ConformanceRule> {
    let text = match raw.strip_prefix('@') {
        Some(path) => fs::read_to_string(path).with_context(|| format!("read rule file {path}"))?,
        None => raw.to_string(),
    };
    let mut value: serde_json::Value =
        serde_json::from_str(&text).context("rule is not valid JSON")?;
    if let Some(obj) = value.as_object_mut() {
        obj.entry("order").or_insert(serde_json::json!(0));
    }
    serde_json::from_value(value).context("rule does not match a known rule type")
}

async fn cmd_list(merged: &MergedConfig) -> anyhow::Result<()> {
    let catalog = open_catalog(merged)?;
    let datasets = catalog.list().await?;
    print!("{}", render_dataset_list_md(&datasets));
    Ok(())
}

async fn cmd_show(merged: &MergedConfig, args: ShowArgs) -> anyhow::Result<()> {
    let mut detail = detail_for(merged)?;
    let dataset = detail.route_matched(args.target.route()).await?;
    match args.format {
        OutputFormat::Md => print!("{}", render_dataset_md(dataset)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(dataset)?),
    }
    Ok(())
}

async fn cmd_project(merged: &MergedConfig, args: ProjectArgs) -> anyhow::Result<()> {
    let mut detail = detail_for(merged)?;
    let len = detail
        .route_matched(args.target.route())
        .await?
        .conformance
        .len();
    let tree = detail.schema_at(args.at.unwrap_or(len)).await?;
    match args.format {
        OutputFormat::Md => print!("{}", render_schema_md(&tree)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tree)?),
    }
    Ok(())
}

async fn cmd_add_rule(merged: &MergedConfig, args: AddRuleArgs) -> anyhow::Result<()> {
    let rule = parse_rule(&args.rule)?;
    let mut detail = detail_for(merged)?;
    detail.route_matched(args.target.route()).await?;
    detail.open_add_rule().await?;
    detail.draft_mut()?.fill_from(rule);
    report_commit(detail.commit_rule().await?, "added");
    Ok(())
}

async fn cmd_edit_rule(merged: &MergedConfig, args: EditRuleArgs) -> anyhow::Result<()> {
    let rule = parse_rule(&args.rule)?;
    let mut detail = detail_for(merged)?;
    detail.route_matched(args.target.route()).await?;
    detail.open_edit_rule(args.index).await?;
    detail.draft_mut()?.fill_from(rule);
    report_commit(detail.commit_rule().await?, "replaced");
    Ok(())
}

fn report_commit(outcome: CommitOutcome, verb: &str) {
    match outcome {
        CommitOutcome::Committed(dataset) => {
            println!("{verb} rule: {}", dataset.key());
        }
        CommitOutcome::Superseded(receipt) => {
            println!("{verb} rule {}: {}", receipt.order, receipt.dataset);
        }
    }
}

async fn cmd_remove_rule(merged: &MergedConfig, args: RemoveRuleArgs) -> anyhow::Result<()> {
    let mut detail = detail_for(merged)?;
    detail.route_matched(args.target.route()).await?;
    let report = detail.delete_rule(args.index).await?;
    match &report.outcome {
        DeleteOutcome::Declined => println!("cancelled"),
        DeleteOutcome::Deleted { dataset, removed } => {
            println!(
                "removed rule {} (`{}`): {}",
                args.index, removed.output_column, dataset
            );
        }
    }
    for input in &report.dangling {
        eprintln!(
            "warning: rule {} reads `{}`, which no longer resolves",
            input.order, input.column
        );
    }
    Ok(())
}

async fn cmd_disable(merged: &MergedConfig, args: DisableArgs) -> anyhow::Result<()> {
    let mut detail = detail_for(merged)?;
    detail
        .route_matched(DatasetRoute::Latest(args.dataset.clone()))
        .await?;
    if detail.disable_dataset().await? {
        println!("disabled {}", args.dataset);
    } else {
        println!("cancelled");
    }
    Ok(())
}
