use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Catalog collections that can be linked to from a dataset view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefCollection {
    Schema,
    MappingTable,
    Dataset,
}

impl RefCollection {
    pub const ALL: [RefCollection; 3] = [
        RefCollection::Schema,
        RefCollection::MappingTable,
        RefCollection::Dataset,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RefCollection::Schema => "schema",
            RefCollection::MappingTable => "mapping_table",
            RefCollection::Dataset => "dataset",
        }
    }

    /// Route segment of the collection's detail page.
    pub fn route(self) -> &'static str {
        match self {
            RefCollection::Schema => "schemas",
            RefCollection::MappingTable => "mappingTables",
            RefCollection::Dataset => "datasets",
        }
    }
}

impl fmt::Display for RefCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a collection name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCollection(pub String);

impl fmt::Display for UnknownCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported reference collection: {}", self.0)
    }
}

impl std::error::Error for UnknownCollection {}

impl FromStr for RefCollection {
    type Err = UnknownCollection;

    /// Case-insensitive; `-` and `_` are interchangeable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_");
        RefCollection::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| UnknownCollection(s.to_string()))
    }
}

/// Versioned link to another catalog entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogRef {
    pub collection: RefCollection,
    pub name: String,
    pub version: u32,
}

impl CatalogRef {
    pub fn route_path(&self) -> String {
        format!("{}/{}/{}", self.collection.route(), self.name, self.version)
    }
}

impl fmt::Display for CatalogRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@v{}", self.collection, self.name, self.version)
    }
}
