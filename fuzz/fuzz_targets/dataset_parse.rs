#![no_main]

//! Fuzz target for dataset and schema document parsing.
//!
//! Parsed documents are run through validation and projection, which must
//! never panic regardless of content.

use conform_domain::validate::validate_dataset;
use conform_domain::{project, unresolved_inputs};
use conform_types::{ConformanceRule, Dataset, SchemaFieldTree};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(dataset) = serde_json::from_str::<Dataset>(s) {
        let _ = validate_dataset(&dataset);
        let _ = serde_json::to_string(&dataset);
        let base = SchemaFieldTree::new(Vec::new());
        let _ = project(&base, &dataset.conformance);
        let _ = unresolved_inputs(&base, &dataset.conformance);
    }

    if let Ok(tree) = serde_json::from_str::<SchemaFieldTree>(s) {
        let _ = tree.paths();
        let _ = tree.derived_paths();
    }

    let _ = serde_json::from_str::<ConformanceRule>(s);
});
