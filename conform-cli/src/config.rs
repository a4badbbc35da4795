//! Configuration file loading for conform.
//!
//! Discovers and loads `conform.toml` from the working root.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use conform_core::settings::DetailSettings;
use fs_err as fs;
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "conform.toml";

/// Catalog directory used when neither the config nor the CLI names one.
pub const DEFAULT_CATALOG_DIR: &str = "catalog";

/// Log filter used when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Top-level configuration from conform.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConformConfig {
    pub catalog: CatalogConfig,
    pub prompts: PromptsConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Catalog directory, relative to the root it was discovered in.
    pub dir: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Answer yes to every confirmation.
    pub assume_yes: bool,

    /// Replacement for the rule deletion question.
    pub delete_rule_message: Option<String>,

    /// Replacement for the dataset disable question.
    pub disable_dataset_message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

/// Discover the conform.toml config file in `root`.
pub fn discover_config(root: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = root.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

pub fn load_config(path: &Utf8Path) -> anyhow::Result<ConformConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

pub fn parse_config(contents: &str) -> anyhow::Result<ConformConfig> {
    let config: ConformConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load config from `root`, or return default if not found.
pub fn load_or_default(root: &Utf8Path) -> anyhow::Result<ConformConfig> {
    match discover_config(root) {
        Some(path) => load_config(&path),
        None => Ok(ConformConfig::default()),
    }
}

/// Config file and CLI arguments combined.
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub catalog_dir: Utf8PathBuf,
    pub assume_yes: bool,
    pub detail: DetailSettings,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    root: Utf8PathBuf,
    config: ConformConfig,
}

impl ConfigMerger {
    pub fn new(root: impl Into<Utf8PathBuf>, config: ConformConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Filter directive for the log subscriber when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &str {
        self.config
            .log
            .filter
            .as_deref()
            .unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// A CLI `--catalog` replaces the config dir as given; the config dir is
    /// resolved against the root. `--yes` can only turn confirmation off.
    pub fn merge_args(self, cli_catalog: Option<&Utf8Path>, cli_yes: bool) -> MergedConfig {
        let catalog_dir = match cli_catalog {
            Some(dir) => dir.to_path_buf(),
            None => self.root.join(
                self.config
                    .catalog
                    .dir
                    .as_deref()
                    .unwrap_or(Utf8Path::new(DEFAULT_CATALOG_DIR)),
            ),
        };

        let mut detail = DetailSettings::default();
        if let Some(msg) = self.config.prompts.delete_rule_message {
            detail.delete_rule_message = msg;
        }
        if let Some(msg) = self.config.prompts.disable_dataset_message {
            detail.disable_dataset_message = msg;
        }

        MergedConfig {
            catalog_dir,
            assume_yes: cli_yes || self.config.prompts.assume_yes,
            detail,
        }
    }
}
