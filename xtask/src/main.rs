use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use conform_core::adapters::FsCatalog;
use conform_domain::validate::validate_dataset;
use conform_types::{ConformanceRule, DataType, Dataset, RuleKind, SchemaField, SchemaFieldTree};
use fs_err as fs;
use std::process::Command as ProcessCommand;

#[derive(Debug, Parser)]
#[command(name = "xtask", about = "Workspace helper tasks")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the rule type tags accepted in dataset documents.
    PrintKinds,
    /// Create an empty catalog layout (schemas/ and datasets/).
    InitCatalog {
        #[arg(long, default_value = "catalog")]
        dir: Utf8PathBuf,
        /// Also write a sample schema and dataset.
        #[arg(long)]
        sample: bool,
    },
    /// Check every stored dataset document parses and has valid rules.
    Validate {
        #[arg(long, default_value = "catalog")]
        dir: Utf8PathBuf,
    },
    /// Run the cucumber scenarios.
    Bdd,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::PrintKinds => {
            for tag in RuleKind::ALL_TAGS {
                println!("{tag}");
            }
        }
        Command::InitCatalog { dir, sample } => {
            let catalog = FsCatalog::new(dir.clone());
            catalog.init()?;
            if sample {
                catalog.put_schema(&sample_schema())?;
                catalog.put_dataset(&sample_dataset())?;
            }
            println!("initialized {dir}/{{schemas,datasets}}");
        }
        Command::Validate { dir } => {
            let failures = validate_catalog(&dir)?;
            if failures > 0 {
                anyhow::bail!("{failures} dataset document(s) failed validation");
            }
        }
        Command::Bdd => {
            let status = ProcessCommand::new("cargo")
                .args(["test", "-p", "conform-bdd", "--test", "cucumber"])
                .status()
                .context("run cucumber scenarios")?;
            if !status.success() {
                anyhow::bail!("bdd failed");
            }
        }
    }
    Ok(())
}

/// Returns the number of documents that failed.
fn validate_catalog(dir: &Utf8PathBuf) -> anyhow::Result<usize> {
    let pattern = format!("{dir}/datasets/*/*.json");
    let mut failures = 0;
    for entry in glob::glob(&pattern).with_context(|| format!("bad glob {pattern}"))? {
        let path = entry?;
        let text = fs::read_to_string(&path)?;
        let outcome = serde_json::from_str::<Dataset>(&text)
            .map_err(anyhow::Error::from)
            .and_then(|ds| validate_dataset(&ds).map_err(anyhow::Error::from));
        match outcome {
            Ok(()) => println!("ok   {}", path.display()),
            Err(e) => {
                failures += 1;
                println!("FAIL {}: {e:#}", path.display());
            }
        }
    }
    Ok(failures)
}

fn sample_schema() -> SchemaFieldTree {
    SchemaFieldTree::named(
        "orders_schema",
        1,
        vec![
            SchemaField::new("id", DataType::primitive("long")).required(),
            SchemaField::new("customer", DataType::string()),
            SchemaField::new("currency", DataType::string()),
        ],
    )
}

fn sample_dataset() -> Dataset {
    let mut ds = Dataset::new("orders", "orders_schema", 1);
    ds.conformance = vec![ConformanceRule::new(
        0,
        "customer_uc",
        RuleKind::Uppercase {
            input_column: "customer".to_string(),
        },
    )];
    ds
}
