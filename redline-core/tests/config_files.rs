//! The sample rule tables shipped in `configs/` must load and validate.

use pretty_assertions::assert_eq;
use redline_core::{InputDocument, OverlapPolicy, ReviewConfig, ReviewProcessor};
use std::path::PathBuf;

fn config_path(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../configs")
        .join(name)
        .display()
        .to_string()
}

#[test]
fn adgm_matches_builtin_defaults() {
    let loaded = ReviewConfig::load_from_file(&config_path("adgm.yaml")).unwrap();
    loaded.validate().unwrap();

    let builtin = ReviewConfig::default();
    assert_eq!(loaded.classifier, builtin.classifier);
    assert_eq!(loaded.requirements, builtin.requirements);
    for (group, rules) in &builtin.rules {
        assert_eq!(&loaded.rules[group], rules);
    }
    assert_eq!(loaded.rules.len(), builtin.rules.len());
}

#[test]
fn extended_table_classifies_specific_documents_first() {
    let config = ReviewConfig::load_from_file(&config_path("adgm-extended.yaml")).unwrap();
    assert_eq!(config.annotation.overlap_policy, OverlapPolicy::Merge);

    let processor = ReviewProcessor::new(config).unwrap();
    let review = processor
        .review_document(&InputDocument::new(
            "ubo.txt",
            b"UBO Declaration (see articles)\nName: TBC\nThe registrar may at its discretion refer to Dubai Courts."
                .to_vec(),
        ))
        .unwrap();

    assert_eq!(review.report.document_type, "UBO Declaration Form");
    let found: Vec<&str> = review.issues.iter().map(|i| i.matched_text.as_str()).collect();
    assert_eq!(found, vec!["TBC", "Dubai Courts", "may at its discretion"]);
}
