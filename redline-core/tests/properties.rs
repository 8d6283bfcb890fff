//! Property tests for detection and annotation invariants.

mod common;

use common::{fixture_config, AOA};
use proptest::prelude::*;
use redline_core::document::{AnnotatableParagraph, Document};
use redline_core::{Annotator, ReviewConfig, RuleEngine};
use regex::RegexBuilder;

/// Paragraph text drawn from a small vocabulary so rule hits are common
fn paragraph() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("Dubai Courts"),
            Just("AED"),
            Just("dirham"),
            Just("UAE Federal"),
            Just("the"),
            Just("company"),
            Just("محكمة"),
            Just(","),
        ],
        0..12,
    )
    .prop_map(|words| words.join(" "))
}

fn document() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(paragraph(), 0..6)
}

fn expected_matches(config: &ReviewConfig, text: &str, doc_type: &str) -> usize {
    config
        .rules_for(doc_type)
        .map(|rule| {
            RegexBuilder::new(&rule.pattern)
                .case_insensitive(true)
                .build()
                .unwrap()
                .find_iter(text)
                .filter(|m| !m.as_str().is_empty())
                .count()
        })
        .sum()
}

proptest! {
    #[test]
    fn issue_count_is_sum_of_rule_matches(paragraphs in document()) {
        let config = fixture_config();
        let engine = RuleEngine::new(&config).unwrap();
        let text = paragraphs.join("\n");

        for doc_type in [AOA, "Unknown Document"] {
            let issues = engine.detect(&text, doc_type);
            prop_assert_eq!(issues.len(), expected_matches(&config, &text, doc_type));
            for issue in &issues {
                prop_assert_eq!(&text[issue.start_offset..issue.end_offset()], issue.matched_text.as_str());
            }
        }
    }

    #[test]
    fn detection_is_deterministic(paragraphs in document()) {
        let engine = RuleEngine::new(&fixture_config()).unwrap();
        let text = paragraphs.join("\n");
        prop_assert_eq!(engine.detect(&text, AOA), engine.detect(&text, AOA));
    }

    #[test]
    fn empty_issue_list_keeps_text(paragraphs in document()) {
        let mut doc = Document::from_paragraphs(paragraphs.clone());
        let before = doc.flattened_text();
        let outcome = Annotator::new(&ReviewConfig::default().annotation)
            .annotate(&mut doc.paragraphs, &[]);
        prop_assert_eq!(outcome.annotated, 0);
        prop_assert_eq!(doc.flattened_text(), before);
        prop_assert_eq!(doc.modified_paragraphs(), 0);
    }

    #[test]
    fn annotation_only_inserts_comments(paragraphs in document()) {
        let config = fixture_config();
        let engine = RuleEngine::new(&config).unwrap();
        let mut doc = Document::from_paragraphs(paragraphs.clone());
        let issues = engine.detect(&doc.flattened_text(), AOA);

        Annotator::new(&config.annotation).annotate(&mut doc.paragraphs, &issues);

        // Dropping the italic comment runs gives back every original paragraph
        for (paragraph, original) in doc.paragraphs.iter().zip(&paragraphs) {
            let stripped: String = paragraph
                .runs
                .iter()
                .filter(|run| !run.style.italic)
                .map(|run| run.text.as_str())
                .collect();
            prop_assert_eq!(&stripped, original);
            prop_assert_eq!(paragraph.modified, paragraph.text() != *original);
        }
    }
}
