use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One step of a dataset's conformance pipeline.
///
/// `order` is the rule's zero-based position in the dataset's rule sequence.
/// Within a persisted dataset the orders are dense (`0..n`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConformanceRule {
    pub order: u32,

    /// Column written by the rule (for `drop`, the column removed).
    pub output_column: String,

    #[serde(default)]
    pub control_checkpoint: bool,

    #[serde(flatten)]
    pub kind: RuleKind,
}

impl ConformanceRule {
    pub fn new(order: u32, output_column: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            order,
            output_column: output_column.into(),
            control_checkpoint: false,
            kind,
        }
    }

    /// Columns this rule reads from the schema it is applied to.
    pub fn input_columns(&self) -> Vec<&str> {
        self.kind.input_columns()
    }
}

/// Closed set of rule kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKind {
    Casting {
        input_column: String,
        output_data_type: String,
    },
    Concatenation {
        input_columns: Vec<String>,
    },
    Drop,
    Literal {
        value: String,
    },
    Mapping(MappingRule),
    Negation {
        input_column: String,
    },
    SingleColumn {
        input_column: String,
        input_column_alias: String,
    },
    SparkSessionConf {
        spark_conf_key: String,
    },
    Uppercase {
        input_column: String,
    },
    FillNulls {
        input_column: String,
        value: String,
    },
    Coalesce {
        input_columns: Vec<String>,
    },
}

impl RuleKind {
    /// Wire tags of every kind, in declaration order.
    pub const ALL_TAGS: [&'static str; 11] = [
        "casting",
        "concatenation",
        "drop",
        "literal",
        "mapping",
        "negation",
        "single_column",
        "spark_session_conf",
        "uppercase",
        "fill_nulls",
        "coalesce",
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            RuleKind::Casting { .. } => "casting",
            RuleKind::Concatenation { .. } => "concatenation",
            RuleKind::Drop => "drop",
            RuleKind::Literal { .. } => "literal",
            RuleKind::Mapping(_) => "mapping",
            RuleKind::Negation { .. } => "negation",
            RuleKind::SingleColumn { .. } => "single_column",
            RuleKind::SparkSessionConf { .. } => "spark_session_conf",
            RuleKind::Uppercase { .. } => "uppercase",
            RuleKind::FillNulls { .. } => "fill_nulls",
            RuleKind::Coalesce { .. } => "coalesce",
        }
    }

    pub fn input_columns(&self) -> Vec<&str> {
        match self {
            RuleKind::Casting { input_column, .. }
            | RuleKind::Negation { input_column }
            | RuleKind::SingleColumn { input_column, .. }
            | RuleKind::Uppercase { input_column }
            | RuleKind::FillNulls { input_column, .. } => vec![input_column.as_str()],
            RuleKind::Concatenation { input_columns } | RuleKind::Coalesce { input_columns } => {
                input_columns.iter().map(String::as_str).collect()
            }
            RuleKind::Mapping(mapping) => mapping
                .attribute_mappings
                .values()
                .map(String::as_str)
                .collect(),
            RuleKind::Drop | RuleKind::Literal { .. } | RuleKind::SparkSessionConf { .. } => {
                vec![]
            }
        }
    }

    pub fn as_mapping(&self) -> Option<&MappingRule> {
        match self {
            RuleKind::Mapping(m) => Some(m),
            _ => None,
        }
    }
}

/// Lookup of a value in a mapping table joined on dataset columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRule {
    pub mapping_table: String,
    pub mapping_table_version: u32,

    /// Mapping-table field -> dataset field.
    #[serde(default)]
    pub attribute_mappings: BTreeMap<String, String>,

    pub target_attribute: String,

    /// Type of `target_attribute` in the mapping table; string when unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_data_type: Option<String>,

    #[serde(default)]
    pub null_safe: bool,
}

impl MappingRule {
    /// Join conditions for display. Derived, never persisted.
    pub fn join_conditions(&self, dataset_name: &str) -> Vec<JoinCondition> {
        self.attribute_mappings
            .iter()
            .map(|(table_field, dataset_field)| JoinCondition {
                mapping_table_field: format!("{}.{}", self.mapping_table, table_field),
                dataset_field: format!("{}.{}", dataset_name, dataset_field),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCondition {
    pub mapping_table_field: String,
    pub dataset_field: String,
}
