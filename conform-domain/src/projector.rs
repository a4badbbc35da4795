//! Schema projection: the field tree a rule sees at its position.
//!
//! `project` replays the schema effect of every preceding rule on a clone
//! of the base tree. Nothing is cached; each call starts from the base.

use conform_types::{ConformanceRule, DataType, RuleKind, SchemaField, SchemaFieldTree};
use tracing::debug;

/// What a single rule does to the tree it is applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaEffect {
    Add { path: String, data_type: DataType },
    Remove { path: String },
    Unchanged,
}

/// Effective tree after applying `preceding` to `base`, in order.
pub fn project(base: &SchemaFieldTree, preceding: &[ConformanceRule]) -> SchemaFieldTree {
    let mut tree = base.clone();
    for rule in preceding {
        apply(&mut tree, rule);
    }
    tree
}

/// Apply one rule's effect in place. Returns the effect that was applied.
pub fn apply(tree: &mut SchemaFieldTree, rule: &ConformanceRule) -> SchemaEffect {
    let effect = schema_effect(tree, rule);
    match &effect {
        SchemaEffect::Add { path, data_type } => {
            if !tree.upsert(path, data_type.clone(), Some(rule.order)) {
                debug!(
                    order = rule.order,
                    path = %path,
                    "output path not addressable; tree unchanged"
                );
                return SchemaEffect::Unchanged;
            }
        }
        SchemaEffect::Remove { path } => {
            tree.remove(path);
        }
        SchemaEffect::Unchanged => {}
    }
    effect
}

/// Effect of `rule` when applied to `tree`. Does not modify the tree.
pub fn schema_effect(tree: &SchemaFieldTree, rule: &ConformanceRule) -> SchemaEffect {
    let path = rule.output_column.clone();
    let input_type = |column: &str| tree.find(column).map(|f| f.data_type.clone());

    let data_type = match &rule.kind {
        RuleKind::Drop => {
            return if tree.contains(&path) {
                SchemaEffect::Remove { path }
            } else {
                SchemaEffect::Unchanged
            };
        }
        RuleKind::Casting {
            output_data_type, ..
        } => DataType::primitive(output_data_type.trim()),
        RuleKind::Concatenation { .. }
        | RuleKind::Literal { .. }
        | RuleKind::SparkSessionConf { .. }
        | RuleKind::Uppercase { .. } => DataType::string(),
        RuleKind::Mapping(mapping) => mapping
            .target_data_type
            .as_deref()
            .map(DataType::primitive)
            .unwrap_or_else(DataType::string),
        RuleKind::Negation { input_column } => {
            input_type(input_column.as_str()).unwrap_or_else(DataType::boolean)
        }
        RuleKind::FillNulls { input_column, .. } => {
            input_type(input_column.as_str()).unwrap_or_else(DataType::string)
        }
        RuleKind::Coalesce { input_columns } => input_columns
            .iter()
            .find_map(|c| input_type(c.as_str()))
            .unwrap_or_else(DataType::string),
        RuleKind::SingleColumn {
            input_column,
            input_column_alias,
        } => DataType::Struct {
            fields: vec![SchemaField::new(
                input_column_alias.clone(),
                input_type(input_column.as_str()).unwrap_or_else(DataType::string),
            )],
        },
    };

    SchemaEffect::Add { path, data_type }
}

/// An input column that does not resolve in the view of the rule reading it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedInput {
    pub order: u32,
    pub column: String,
}

/// Replay `rules` over `base`, collecting every input column that is not
/// present in the tree the reading rule would see.
pub fn unresolved_inputs(base: &SchemaFieldTree, rules: &[ConformanceRule]) -> Vec<UnresolvedInput> {
    let mut tree = base.clone();
    let mut out = Vec::new();
    for rule in rules {
        for column in rule.input_columns() {
            if !tree.contains(column) {
                out.push(UnresolvedInput {
                    order: rule.order,
                    column: column.to_string(),
                });
            }
        }
        apply(&mut tree, rule);
    }
    out
}
