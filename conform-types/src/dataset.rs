use crate::reference::{CatalogRef, RefCollection};
use crate::rule::ConformanceRule;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One immutable version of a dataset definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub version: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub schema_name: String,
    pub schema_version: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_path: Option<String>,

    #[serde(default)]
    pub conformance: Vec<ConformanceRule>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
}

impl Dataset {
    pub fn new(name: impl Into<String>, schema_name: impl Into<String>, schema_version: u32) -> Self {
        Self {
            name: name.into(),
            version: 1,
            description: None,
            schema_name: schema_name.into(),
            schema_version,
            raw_path: None,
            publish_path: None,
            conformance: vec![],
            last_updated: None,
            disabled: false,
        }
    }

    pub fn key(&self) -> DatasetRef {
        DatasetRef {
            name: self.name.clone(),
            version: self.version,
        }
    }

    pub fn schema_ref(&self) -> CatalogRef {
        CatalogRef {
            collection: RefCollection::Schema,
            name: self.schema_name.clone(),
            version: self.schema_version,
        }
    }

    /// Copy of this version carrying a different rule list.
    ///
    /// The copy keeps `version`: it describes the base a write is made
    /// against, and the gateway assigns the new number.
    pub fn with_conformance(&self, conformance: Vec<ConformanceRule>) -> Dataset {
        Dataset {
            conformance,
            ..self.clone()
        }
    }
}

/// Identity of a dataset version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DatasetRef {
    pub name: String,
    pub version: u32,
}

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.name, self.version)
    }
}

/// Which version of a dataset to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionSelector {
    #[default]
    Latest,
    Exact(u32),
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSelector::Latest => f.write_str("latest"),
            VersionSelector::Exact(v) => write!(f, "{v}"),
        }
    }
}

impl FromStr for VersionSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("latest") {
            return Ok(VersionSelector::Latest);
        }
        match s.parse::<u32>() {
            Ok(v) if v >= 1 => Ok(VersionSelector::Exact(v)),
            _ => Err(format!("invalid version '{s}': expected 'latest' or a number >= 1")),
        }
    }
}

/// Listing entry for a dataset name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub name: String,
    pub latest_version: u32,

    #[serde(default)]
    pub disabled: bool,
}
