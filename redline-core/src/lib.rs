// Redline Core Library
//
// Compliance review of structured documents: classify each document, scan its
// flattened text against a rule table, and write issues back in place as
// styled inline annotations.

pub mod annotator;
pub mod checklist;
pub mod classifier;
pub mod config;
pub mod document;
pub mod error;
pub mod processor;
pub mod report;
pub mod rules;
pub mod types;

// Re-export main types and functions for easy use
pub use annotator::{AnnotationOutcome, Annotator, ParagraphIndex, SkipReason, SkippedIssue};
pub use checklist::ChecklistEntry;
pub use classifier::{ClassificationResult, DocumentClassifier};
pub use config::{OverlapPolicy, ReviewConfig};
pub use document::{AnnotatableParagraph, Document, DocumentFormat, Paragraph, Run, RunStyle};
pub use error::{Result, ReviewError};
pub use processor::{BatchReport, DocumentReport, InputDocument, ReviewProcessor, ReviewStatus};
pub use report::{reviewed_file_name, JsonReport};
pub use rules::RuleEngine;
pub use types::*;
