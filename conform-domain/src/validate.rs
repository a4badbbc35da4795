//! Structural checks on rules and datasets.
//!
//! Used by the edit session before a write and by gateways on persist.

use crate::error::{CatalogError, CatalogResult};
use conform_types::{ConformanceRule, Dataset, RuleKind};

/// Problems with a single rule; empty when valid.
pub fn rule_problems(rule: &ConformanceRule) -> Vec<String> {
    let mut problems = Vec::new();
    let at = format!("rule {} ({})", rule.order, rule.kind.tag());

    check_path(&mut problems, &at, "output_column", &rule.output_column);

    match &rule.kind {
        RuleKind::Casting {
            input_column,
            output_data_type,
        } => {
            check_path(&mut problems, &at, "input_column", input_column);
            if output_data_type.trim().is_empty() {
                problems.push(format!("{at}: output_data_type is required"));
            }
        }
        RuleKind::Concatenation { input_columns } | RuleKind::Coalesce { input_columns } => {
            if input_columns.is_empty() {
                problems.push(format!("{at}: at least one input column is required"));
            }
            for column in input_columns {
                check_path(&mut problems, &at, "input_columns", column);
            }
        }
        RuleKind::Drop | RuleKind::Literal { .. } => {}
        RuleKind::Mapping(mapping) => {
            if mapping.mapping_table.trim().is_empty() {
                problems.push(format!("{at}: mapping_table is required"));
            }
            if mapping.mapping_table_version == 0 {
                problems.push(format!("{at}: mapping_table_version must be >= 1"));
            }
            if mapping.attribute_mappings.is_empty() {
                problems.push(format!("{at}: at least one attribute mapping is required"));
            }
            for (table_field, dataset_field) in &mapping.attribute_mappings {
                check_path(&mut problems, &at, "attribute_mappings key", table_field);
                check_path(&mut problems, &at, "attribute_mappings value", dataset_field);
            }
            if mapping.target_attribute.trim().is_empty() {
                problems.push(format!("{at}: target_attribute is required"));
            }
        }
        RuleKind::Negation { input_column }
        | RuleKind::Uppercase { input_column }
        | RuleKind::FillNulls { input_column, .. } => {
            check_path(&mut problems, &at, "input_column", input_column);
        }
        RuleKind::SingleColumn {
            input_column,
            input_column_alias,
        } => {
            check_path(&mut problems, &at, "input_column", input_column);
            if input_column_alias.trim().is_empty() || input_column_alias.contains('.') {
                problems.push(format!(
                    "{at}: input_column_alias must be a single non-empty name"
                ));
            }
        }
        RuleKind::SparkSessionConf { spark_conf_key } => {
            if spark_conf_key.trim().is_empty() {
                problems.push(format!("{at}: spark_conf_key is required"));
            }
        }
    }

    problems
}

pub fn validate_rule(rule: &ConformanceRule) -> CatalogResult<()> {
    into_result(rule_problems(rule))
}

/// Orders must be exactly `0..n` in sequence.
pub fn check_dense_order(rules: &[ConformanceRule]) -> Vec<String> {
    rules
        .iter()
        .enumerate()
        .filter(|(i, r)| r.order as usize != *i)
        .map(|(i, r)| format!("rule at position {i} has order {}", r.order))
        .collect()
}

/// Full document check: header fields, dense orders, every rule.
pub fn validate_dataset(dataset: &Dataset) -> CatalogResult<()> {
    let mut problems = Vec::new();
    problems.extend(name_problem("dataset name", &dataset.name));
    if dataset.version == 0 {
        problems.push("dataset version must be >= 1".to_string());
    }
    problems.extend(name_problem("schema_name", &dataset.schema_name));
    if dataset.schema_version == 0 {
        problems.push("schema_version must be >= 1".to_string());
    }
    problems.extend(check_dense_order(&dataset.conformance));
    for rule in &dataset.conformance {
        problems.extend(rule_problems(rule));
    }
    into_result(problems)
}

/// Problem with a dataset or schema name, if any.
///
/// Names become directory names and glob patterns in file-backed catalogs:
/// only letters, digits, `_`, `-` and `.` are allowed, and a name may not
/// start with `.`.
pub fn name_problem(field: &str, name: &str) -> Option<String> {
    if name.trim().is_empty() {
        return Some(format!("{field} is required"));
    }
    if name.starts_with('.') {
        return Some(format!("{field} '{name}' may not start with '.'"));
    }
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '_' | '-' | '.');
    name.chars()
        .find(|&c| !allowed(c))
        .map(|c| format!("{field} '{name}' contains '{c}'"))
}

fn check_path(problems: &mut Vec<String>, at: &str, field: &str, path: &str) {
    if path.trim().is_empty() {
        problems.push(format!("{at}: {field} is required"));
    } else if path.split('.').any(|s| s.trim().is_empty()) {
        problems.push(format!("{at}: {field} '{path}' has an empty path segment"));
    }
}

fn into_result(problems: Vec<String>) -> CatalogResult<()> {
    if problems.is_empty() {
        Ok(())
    } else {
        Err(CatalogError::validation(problems))
    }
}
