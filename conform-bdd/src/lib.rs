//! BDD harness (cucumber-rs).
//!
//! Scenario fixtures live here so step definitions stay short.

use conform_types::{
    ConformanceRule, DataType, Dataset, MappingRule, RuleKind, SchemaField, SchemaFieldTree,
};
use std::collections::BTreeMap;

pub const SCHEMA_NAME: &str = "orders_schema";

pub fn orders_schema() -> SchemaFieldTree {
    SchemaFieldTree::named(
        SCHEMA_NAME,
        1,
        vec![
            SchemaField::new("id", DataType::primitive("long")),
            SchemaField::new("name", DataType::string()),
            SchemaField::new("currency", DataType::string()),
        ],
    )
}

/// Uppercase rules writing `columns` in order, each reading the column
/// written before it (the first reads `name`).
pub fn chained_rules(columns: &[&str]) -> Vec<ConformanceRule> {
    let mut input = "name";
    let mut rules = Vec::new();
    for (i, &column) in columns.iter().enumerate() {
        rules.push(ConformanceRule::new(
            i as u32,
            column,
            RuleKind::Uppercase {
                input_column: input.to_string(),
            },
        ));
        input = column;
    }
    rules
}

/// Comma separated column list, blanks dropped.
pub fn split_columns(list: &str) -> Vec<&str> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn dataset_with_rules(name: &str, columns: &[&str]) -> Dataset {
    let mut ds = Dataset::new(name, SCHEMA_NAME, 1);
    ds.conformance = chained_rules(columns);
    ds
}

pub fn currency_mapping(output: &str) -> ConformanceRule {
    ConformanceRule::new(
        0,
        output,
        RuleKind::Mapping(MappingRule {
            mapping_table: "fx_rates".to_string(),
            mapping_table_version: 1,
            attribute_mappings: BTreeMap::from([("ccy".to_string(), "currency".to_string())]),
            target_attribute: "rate".to_string(),
            target_data_type: Some("double".to_string()),
            null_safe: false,
        }),
    )
}
