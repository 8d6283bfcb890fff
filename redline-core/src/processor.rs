use crate::annotator::{Annotator, ParagraphIndex, SkippedIssue};
use crate::checklist::{build_checklist, ChecklistEntry};
use crate::classifier::DocumentClassifier;
use crate::config::{ProcessRequirement, ReviewConfig, UNKNOWN_DOCUMENT};
use crate::document::format_for_name;
use crate::error::{Result, ReviewError};
use crate::rules::RuleEngine;
use crate::types::{Issue, Severity, SeverityCounts};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Instant;

/// Wall-clock time one review stage took for one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageTiming {
    pub stage: &'static str,
    pub millis: f64,
}

/// Times the stages of a single document review when profiling is on
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<StageTiming>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, stage: &'static str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let millis = start.elapsed().as_secs_f64() * 1000.0;
        tracing::debug!(stage, millis, "⏱️  stage finished");
        self.timings.push(StageTiming { stage, millis });
        result
    }

    /// Log the breakdown for `document` and hand the timings to its report
    pub fn finish(self, document: &str) -> Vec<StageTiming> {
        if self.timings.is_empty() {
            return self.timings;
        }

        let total: f64 = self.timings.iter().map(|t| t.millis).sum();
        for timing in &self.timings {
            let share = if total > 0.0 {
                timing.millis / total * 100.0
            } else {
                0.0
            };
            tracing::info!(
                document,
                stage = timing.stage,
                "⏱️  {:.<20} {:.1}ms ({:.1}%)",
                timing.stage,
                timing.millis,
                share
            );
        }
        tracing::info!(document, "📊 {:.<20} {:.1}ms", "Total", total);
        self.timings
    }
}

/// One document to review: its file name (selects the container format) and raw bytes
#[derive(Debug, Clone)]
pub struct InputDocument {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputDocument {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a document from disk, named after its file name
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReviewStatus {
    Reviewed,
    Failed { reason: String },
}

/// Per-document outcome of a review
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub name: String,
    pub document_type: String,
    pub category: Option<String>,
    /// Annotated document bytes; absent for failed documents
    #[serde(skip)]
    pub file: Option<Vec<u8>>,
    /// Issues detected
    pub issues: usize,
    /// Issues rendered inline
    pub annotated: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedIssue>,
    #[serde(flatten)]
    pub status: ReviewStatus,
    /// SHA-256 of the input bytes
    pub input_hash: String,
    /// Stage timings, recorded when profiling is enabled
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub timings: Vec<StageTiming>,
}

impl DocumentReport {
    fn failed(input: &InputDocument, error: &ReviewError) -> Self {
        Self {
            name: input.name.clone(),
            document_type: UNKNOWN_DOCUMENT.to_string(),
            category: None,
            file: None,
            issues: 0,
            annotated: 0,
            skipped: Vec::new(),
            status: ReviewStatus::Failed {
                reason: error.to_string(),
            },
            input_hash: fingerprint(&input.bytes),
            timings: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, ReviewStatus::Failed { .. })
    }
}

/// A reviewed document together with its issue list
#[derive(Debug, Clone)]
pub struct DocumentReview {
    pub report: DocumentReport,
    pub issues: Vec<Issue>,
}

/// Aggregated outcome of a batch, in input order
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub documents: Vec<DocumentReport>,
    /// Every issue across the batch, grouped by document in input order
    pub issues: Vec<Issue>,
    pub generated_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn total_issues(&self) -> usize {
        self.issues.len()
    }

    pub fn severity_counts(&self) -> SeverityCounts {
        SeverityCounts::from_issues(&self.issues)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &DocumentReport> {
        self.documents.iter().filter(|d| d.is_failed())
    }

    pub fn checklist(&self, requirements: &[ProcessRequirement]) -> Vec<ChecklistEntry> {
        build_checklist(
            requirements,
            self.documents
                .iter()
                .filter(|d| !d.is_failed())
                .map(|d| (d.document_type.as_str(), d.category.as_deref())),
        )
    }
}

/// Hex SHA-256 of raw input bytes
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Drives documents through parse, classify, detect, annotate and serialize.
///
/// Tables are compiled once at construction and only read afterwards, so one
/// processor reviews any number of batches.
pub struct ReviewProcessor {
    config: ReviewConfig,
    classifier: DocumentClassifier,
    rule_engine: RuleEngine,
    annotator: Annotator,
    profiling: bool,
}

impl ReviewProcessor {
    /// Validate and compile `config`. Any defect is a configuration error.
    pub fn new(config: ReviewConfig) -> Result<Self> {
        config.validate()?;
        let rule_engine = RuleEngine::new(&config)?;
        let classifier = DocumentClassifier::new(config.classifier.clone());
        let annotator = Annotator::new(&config.annotation);

        tracing::debug!(
            classifier_entries = config.classifier.len(),
            rules = rule_engine.rule_count(),
            "review processor ready"
        );
        Ok(Self {
            config,
            classifier,
            rule_engine,
            annotator,
            profiling: false,
        })
    }

    /// Record and log per-stage timings for every document
    pub fn with_profiling(mut self, enabled: bool) -> Self {
        self.profiling = enabled;
        self
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    /// Review one document. Errors are per-document (parse or serialize).
    pub fn review_document(&self, input: &InputDocument) -> Result<DocumentReview> {
        let mut profiler = StepProfiler::new(self.profiling);
        let format = format_for_name(&input.name)?;

        let mut document = profiler.time_step("Parse", || format.parse(&input.bytes))?;
        let text = document.flattened_text();

        let classification = profiler.time_step("Classification", || self.classifier.classify(&text));
        let doc_type = classification.document_type.as_str();

        let mut issues = profiler.time_step("Rule detection", || self.rule_engine.detect(&text, doc_type));
        if self.config.detection.skip_separator_matches {
            let index = ParagraphIndex::build(&document.paragraphs);
            let before = issues.len();
            issues.retain(|issue| index.locate(issue.start_offset).is_some());
            if issues.len() < before {
                tracing::debug!(
                    dropped = before - issues.len(),
                    "dropped matches starting on a paragraph separator"
                );
            }
        }

        let outcome = profiler.time_step("Annotation", || {
            self.annotator.annotate(&mut document.paragraphs, &issues)
        });
        let file = profiler.time_step("Serialize", || format.serialize(&document))?;
        let timings = profiler.finish(&input.name);

        tracing::info!(
            document = %input.name,
            format = format.name(),
            document_type = %classification.document_type,
            issues = issues.len(),
            annotated = outcome.annotated,
            paragraphs = document.paragraphs.len(),
            "📄 reviewed document"
        );

        let report = DocumentReport {
            name: input.name.clone(),
            document_type: classification.document_type,
            category: classification.category,
            file: Some(file),
            issues: issues.len(),
            annotated: outcome.annotated,
            skipped: outcome.skipped,
            status: ReviewStatus::Reviewed,
            input_hash: fingerprint(&input.bytes),
            timings,
        };
        Ok(DocumentReview { report, issues })
    }

    /// Review documents sequentially. A failing document is reported as
    /// failed with zero issues and never stops the batch.
    pub fn review_batch(&self, inputs: Vec<InputDocument>) -> BatchReport {
        let mut documents = Vec::with_capacity(inputs.len());
        let mut issues = Vec::new();

        for input in &inputs {
            match self.review_document(input) {
                Ok(review) => {
                    documents.push(review.report);
                    issues.extend(review.issues);
                }
                Err(e) => {
                    tracing::warn!(document = %input.name, error = %e, "❌ document review failed");
                    documents.push(DocumentReport::failed(input, &e));
                }
            }
        }

        let report = BatchReport {
            documents,
            issues,
            generated_at: Utc::now(),
        };
        tracing::info!(
            documents = report.documents.len(),
            failed = report.failed().count(),
            issues = report.total_issues(),
            high = report.count(Severity::High),
            "batch review complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{AnnotatableParagraph, Document, DocumentFormat, PlainTextFormat};

    fn text_input(name: &str, text: &str) -> InputDocument {
        InputDocument::new(name, text.as_bytes().to_vec())
    }

    fn reviewed_text(report: &DocumentReport) -> String {
        String::from_utf8(report.file.clone().unwrap()).unwrap()
    }

    #[test]
    fn test_profiler_disabled_records_nothing() {
        let mut profiler = StepProfiler::new(false);
        let value = profiler.time_step("noop", || 7);
        assert_eq!(value, 7);
        assert!(profiler.finish("doc").is_empty());

        let mut profiler = StepProfiler::new(true);
        profiler.time_step("work", || ());
        let timings = profiler.finish("doc");
        assert_eq!(timings.len(), 1);
        assert_eq!(timings[0].stage, "work");
        assert!(timings[0].millis >= 0.0);
    }

    #[test]
    fn test_profiling_reports_stage_timings() {
        let input = text_input("aoa.txt", "Articles of Association
Dubai Courts");
        let quiet = ReviewProcessor::new(ReviewConfig::default()).unwrap();
        assert!(quiet.review_document(&input).unwrap().report.timings.is_empty());

        let profiled = ReviewProcessor::new(ReviewConfig::default())
            .unwrap()
            .with_profiling(true);
        let report = profiled.review_document(&input).unwrap().report;
        let stages: Vec<&str> = report.timings.iter().map(|t| t.stage).collect();
        assert_eq!(
            stages,
            vec!["Parse", "Classification", "Rule detection", "Annotation", "Serialize"]
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["timings"][0]["stage"], "Parse");
    }

    #[test]
    fn test_fingerprint_is_sha256_hex() {
        assert_eq!(
            fingerprint(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_bad_config_fails_construction() {
        let mut config = ReviewConfig::default();
        config
            .rules
            .get_mut("General")
            .unwrap()
            .push(crate::config::RuleConfig {
                pattern: "(".to_string(),
                issue: "x".to_string(),
                severity: Severity::Low,
                regulation: "y".to_string(),
            });
        let err = ReviewProcessor::new(config).err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_review_document_classifies_and_annotates() {
        let processor = ReviewProcessor::new(ReviewConfig::default()).unwrap();
        let review = processor
            .review_document(&text_input(
                "aoa.txt",
                "Articles of Association\nThe company shall be governed by UAE Federal law.",
            ))
            .unwrap();

        assert_eq!(review.report.document_type, "Articles of Association (AoA)");
        assert_eq!(review.report.category.as_deref(), Some("Company Formation"));
        assert_eq!(review.report.status, ReviewStatus::Reviewed);
        assert_eq!(review.issues.len(), 1);
        assert_eq!(review.report.annotated, 1);
        assert_eq!(
            reviewed_text(&review.report),
            "Articles of Association\nThe company shall be governed by UAE Federal [ISSUE: Incorrect legal framework (ADGM has independent laws) | ADGM Companies Regulations 2020] law."
        );
    }

    #[test]
    fn test_separator_matches_dropped_by_default() {
        let mut config = ReviewConfig::default();
        config.rules.insert(
            "General".to_string(),
            vec![crate::config::RuleConfig {
                pattern: r"\s+Courts".to_string(),
                issue: "Spacing".to_string(),
                severity: Severity::Low,
                regulation: "Style".to_string(),
            }],
        );
        let input = text_input("notes.txt", "Dubai\nCourts");

        let review = ReviewProcessor::new(config.clone())
            .unwrap()
            .review_document(&input)
            .unwrap();
        assert_eq!(review.report.issues, 0);

        config.detection.skip_separator_matches = false;
        let review = ReviewProcessor::new(config)
            .unwrap()
            .review_document(&input)
            .unwrap();
        assert_eq!(review.report.issues, 1);
        assert_eq!(review.report.annotated, 0);
        assert_eq!(review.report.skipped.len(), 1);
        assert_eq!(reviewed_text(&review.report), "Dubai\nCourts");
    }

    #[test]
    fn test_batch_isolates_failures() {
        let processor = ReviewProcessor::new(ReviewConfig::default()).unwrap();
        let batch = processor.review_batch(vec![
            text_input("first.txt", "Disputes go to Dubai Courts."),
            InputDocument::new("broken.docx", b"not a zip archive".to_vec()),
            text_input("scan.pdf", "Dubai Courts"),
            text_input("last.txt", "Dubai Courts and Dubai Courts"),
        ]);

        assert_eq!(batch.documents.len(), 4);
        assert_eq!(batch.failed().count(), 2);
        assert_eq!(batch.total_issues(), 3);
        assert_eq!(batch.count(Severity::High), 3);
        assert_eq!(batch.severity_counts().total(), 3);

        let broken = &batch.documents[1];
        assert!(broken.is_failed());
        assert_eq!(broken.issues, 0);
        assert!(broken.file.is_none());
        assert_eq!(broken.input_hash, fingerprint(b"not a zip archive"));
        assert_eq!(batch.documents[3].issues, 2);
    }

    #[test]
    fn test_batch_checklist_uses_reviewed_documents() {
        let processor = ReviewProcessor::new(ReviewConfig::default()).unwrap();
        let batch = processor.review_batch(vec![text_input("aoa.txt", "Articles of Association")]);
        let checklist = batch.checklist(&processor.config().requirements);
        assert_eq!(checklist.len(), 1);
        assert_eq!(checklist[0].uploaded, vec!["Articles of Association (AoA)"]);
        assert_eq!(checklist[0].missing.len(), 7);
    }

    #[test]
    fn test_empty_document_has_no_issues() {
        let processor = ReviewProcessor::new(ReviewConfig::default()).unwrap();
        let review = processor.review_document(&text_input("empty.txt", "")).unwrap();
        assert_eq!(review.report.document_type, UNKNOWN_DOCUMENT);
        assert_eq!(review.report.issues, 0);
        let reparsed: Document = PlainTextFormat::new()
            .parse(review.report.file.as_deref().unwrap())
            .unwrap();
        assert!(reparsed.paragraphs.iter().all(|p| p.text().is_empty()));
    }
}
