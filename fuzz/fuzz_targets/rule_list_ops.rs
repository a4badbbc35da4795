#![no_main]

//! Fuzz target for rule-list edits.
//!
//! After any sequence of inserts, removals and replacements the orders must
//! stay dense and match list positions.

use conform_domain::RuleList;
use conform_types::{ConformanceRule, RuleKind};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, arbitrary::Arbitrary)]
enum Op {
    Insert(String),
    Remove(u8),
    Replace(u8, String),
}

fn rule(column: String) -> ConformanceRule {
    ConformanceRule::new(u32::MAX, column, RuleKind::Drop)
}

fuzz_target!(|ops: Vec<Op>| {
    let mut list = RuleList::from_rules(Vec::new());
    for op in ops {
        let before = list.len();
        match op {
            Op::Insert(column) => {
                let (next, order) = list.insert_at_end(rule(column));
                assert_eq!(order as usize, before);
                list = next;
            }
            Op::Remove(i) => match list.remove_at(i as usize) {
                Ok(next) => list = next,
                Err(_) => assert!(i as usize >= before),
            },
            Op::Replace(i, column) => match list.replace_at(i as usize, rule(column)) {
                Ok(next) => list = next,
                Err(_) => assert!(i as usize >= before),
            },
        }
        for (i, r) in list.iter().enumerate() {
            assert_eq!(r.order as usize, i);
        }
    }
});
