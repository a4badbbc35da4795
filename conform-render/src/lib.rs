//! Rendering helpers (markdown) for dataset, rule and schema views.

use conform_types::{
    CatalogRef, ConformanceRule, Dataset, DatasetSummary, RefCollection, RuleKind, SchemaField,
    SchemaFieldTree,
};

pub fn render_dataset_list_md(datasets: &[DatasetSummary]) -> String {
    let mut out = String::new();
    out.push_str("# datasets\n\n");
    if datasets.is_empty() {
        out.push_str("_No datasets._\n");
        return out;
    }
    for d in datasets {
        out.push_str(&format!("- `{}` v{}\n", d.name, d.latest_version));
    }
    out
}

pub fn render_dataset_md(dataset: &Dataset) -> String {
    let mut out = String::new();
    out.push_str(&format!("# dataset {} v{}\n\n", dataset.name, dataset.version));
    if let Some(desc) = &dataset.description {
        out.push_str(&format!("{}\n\n", desc));
    }
    out.push_str(&format!("- Schema: {}\n", link(&dataset.schema_ref())));
    if let Some(raw) = &dataset.raw_path {
        out.push_str(&format!("- Raw path: `{}`\n", raw));
    }
    if let Some(publish) = &dataset.publish_path {
        out.push_str(&format!("- Publish path: `{}`\n", publish));
    }
    if let Some(ts) = dataset.last_updated {
        out.push_str(&format!("- Last updated: {}\n", ts.to_rfc3339()));
    }
    if dataset.disabled {
        out.push_str("- Disabled: `true`\n");
    }
    out.push('\n');
    out.push_str(&render_rules_md(dataset));
    out
}

/// Rule list section, including derived join conditions for mapping rules.
pub fn render_rules_md(dataset: &Dataset) -> String {
    let mut out = String::new();
    out.push_str("## Conformance rules\n\n");
    if dataset.conformance.is_empty() {
        out.push_str("_No conformance rules._\n");
        return out;
    }

    for rule in &dataset.conformance {
        out.push_str(&format!(
            "### {}. `{}` → `{}`\n\n",
            rule.order,
            rule.kind.tag(),
            rule.output_column
        ));
        render_rule_details(&mut out, &dataset.name, rule);
        if rule.control_checkpoint {
            out.push_str("- Control checkpoint: `true`\n");
        }
        out.push('\n');
    }
    out
}

fn render_rule_details(out: &mut String, dataset_name: &str, rule: &ConformanceRule) {
    match &rule.kind {
        RuleKind::Casting {
            input_column,
            output_data_type,
        } => {
            out.push_str(&format!("- Input: `{}`\n", input_column));
            out.push_str(&format!("- Type: `{}`\n", output_data_type));
        }
        RuleKind::Concatenation { input_columns } | RuleKind::Coalesce { input_columns } => {
            out.push_str(&format!("- Inputs: {}\n", code_list(input_columns)));
        }
        RuleKind::Drop => {}
        RuleKind::Literal { value } => {
            out.push_str(&format!("- Value: `{}`\n", value));
        }
        RuleKind::Mapping(mapping) => {
            let table = CatalogRef {
                collection: RefCollection::MappingTable,
                name: mapping.mapping_table.clone(),
                version: mapping.mapping_table_version,
            };
            out.push_str(&format!("- Mapping table: {}\n", link(&table)));
            out.push_str(&format!("- Target: `{}`\n", mapping.target_attribute));
            if mapping.null_safe {
                out.push_str("- Null safe: `true`\n");
            }
            out.push_str("\n**Join conditions**\n\n");
            for jc in mapping.join_conditions(dataset_name) {
                out.push_str(&format!(
                    "- `{}` = `{}`\n",
                    jc.mapping_table_field, jc.dataset_field
                ));
            }
        }
        RuleKind::Negation { input_column } | RuleKind::Uppercase { input_column } => {
            out.push_str(&format!("- Input: `{}`\n", input_column));
        }
        RuleKind::SingleColumn {
            input_column,
            input_column_alias,
        } => {
            out.push_str(&format!(
                "- Input: `{}` as `{}`\n",
                input_column, input_column_alias
            ));
        }
        RuleKind::SparkSessionConf { spark_conf_key } => {
            out.push_str(&format!("- Conf key: `{}`\n", spark_conf_key));
        }
        RuleKind::FillNulls {
            input_column,
            value,
        } => {
            out.push_str(&format!("- Input: `{}`\n", input_column));
            out.push_str(&format!("- Fill value: `{}`\n", value));
        }
    }
}

/// Field tree as a nested list. Fields added by a rule are marked with the
/// rule's order.
pub fn render_schema_md(tree: &SchemaFieldTree) -> String {
    let mut out = String::new();
    match (&tree.name, tree.version) {
        (Some(name), Some(version)) => out.push_str(&format!("# schema {} v{}\n\n", name, version)),
        _ => out.push_str("# schema\n\n"),
    }
    if tree.fields.is_empty() {
        out.push_str("_No fields._\n");
        return out;
    }
    render_fields(&mut out, &tree.fields, 0);
    out
}

fn render_fields(out: &mut String, fields: &[SchemaField], depth: usize) {
    for f in fields {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&format!("- `{}`: {}", f.name, f.data_type.label()));
        if !f.nullable {
            out.push_str(" (required)");
        }
        if let Some(order) = f.introduced_by {
            out.push_str(&format!(" _(rule {})_", order));
        }
        out.push('\n');
        if let Some(children) = f.data_type.children() {
            render_fields(out, children, depth + 1);
        }
    }
}

fn link(r: &CatalogRef) -> String {
    format!("[{}](/{})", r, r.route_path())
}

fn code_list(items: &[String]) -> String {
    items
        .iter()
        .map(|s| format!("`{}`", s))
        .collect::<Vec<_>>()
        .join(", ")
}
