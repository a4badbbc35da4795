//! Projection behaviour across whole rule lists.

use conform_domain::{RuleList, project, projector::apply, unresolved_inputs};
use conform_types::{ConformanceRule, DataType, RuleKind, SchemaField, SchemaFieldTree};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn base() -> SchemaFieldTree {
    SchemaFieldTree::named(
        "orders",
        1,
        vec![
            SchemaField::new("id", DataType::primitive("long")),
            SchemaField::new("name", DataType::string()),
            SchemaField::new(
                "customer",
                DataType::Struct {
                    fields: vec![SchemaField::new("country", DataType::string())],
                },
            ),
        ],
    )
}

fn upper(order: u32, input: &str, output: &str) -> ConformanceRule {
    ConformanceRule::new(
        order,
        output,
        RuleKind::Uppercase {
            input_column: input.to_string(),
        },
    )
}

#[test]
fn order_matters_for_drop_then_add() {
    let drop = ConformanceRule::new(0, "name", RuleKind::Drop);
    let add = upper(1, "id", "name");

    let dropped_last = project(&base(), &[add.clone(), drop.clone()]);
    let added_last = project(&base(), &[drop, add]);

    assert!(!dropped_last.contains("name"));
    assert!(added_last.contains("name"));
    assert_ne!(dropped_last, added_last);
}

#[test]
fn edit_view_excludes_rule_and_successors() {
    let rules = RuleList::from_rules(vec![
        upper(0, "name", "a"),
        upper(1, "a", "b"),
        upper(2, "b", "c"),
    ]);

    let view = project(&base(), rules.prefix(1).unwrap());

    assert!(view.contains("a"));
    assert!(!view.contains("b"));
    assert!(!view.contains("c"));
    assert!(view.contains("name"), "base fields stay visible");
}

#[test]
fn nested_output_lands_inside_existing_struct() {
    let rule = upper(0, "customer.country", "customer.country_uc");
    let view = project(&base(), &[rule]);

    assert_eq!(
        view.paths(),
        vec![
            "id",
            "name",
            "customer",
            "customer.country",
            "customer.country_uc"
        ]
    );
    assert_eq!(view.derived_paths(), vec![("customer.country_uc".to_string(), 0)]);
}

#[test]
fn chain_of_rules_resolves_inputs_in_sequence() {
    let rules = vec![upper(0, "name", "a"), upper(1, "a", "b")];
    assert!(unresolved_inputs(&base(), &rules).is_empty());

    let removed = RuleList::from_rules(rules).remove_at(0).unwrap();
    let dangling = unresolved_inputs(&base(), removed.as_slice());
    assert_eq!(dangling.len(), 1);
    assert_eq!(dangling[0].column, "a");
    assert_eq!(dangling[0].order, 0);
}

fn arb_rule() -> impl Strategy<Value = ConformanceRule> {
    let column = prop::sample::select(vec!["id", "name", "x", "y", "customer.country"]);
    (column.clone(), column, 0u8..3).prop_map(|(input, output, kind)| {
        let kind = match kind {
            0 => RuleKind::Drop,
            1 => RuleKind::Uppercase {
                input_column: input.to_string(),
            },
            _ => RuleKind::Negation {
                input_column: input.to_string(),
            },
        };
        ConformanceRule::new(0, output, kind)
    })
}

proptest! {
    /// Projecting a prefix and then applying the next rule equals projecting
    /// the longer prefix.
    #[test]
    fn projection_is_incremental(rules in prop::collection::vec(arb_rule(), 0..8)) {
        let list = RuleList::from_rules(rules);
        let slice = list.as_slice();
        for k in 0..slice.len() {
            let mut stepped = project(&base(), &slice[..k]);
            apply(&mut stepped, &slice[k]);
            prop_assert_eq!(stepped, project(&base(), &slice[..=k]));
        }
    }

    #[test]
    fn projection_never_mutates_base(rules in prop::collection::vec(arb_rule(), 0..8)) {
        let b = base();
        let _ = project(&b, &rules);
        prop_assert_eq!(b, base());
    }
}
