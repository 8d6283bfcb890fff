use crate::checklist::ChecklistEntry;
use crate::config::ProcessRequirement;
use crate::error::{Result, ReviewError};
use crate::processor::{BatchReport, DocumentReport};
use crate::types::{Issue, SeverityCounts};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Download name of an annotated document
pub fn reviewed_file_name(name: &str) -> String {
    format!("Reviewed_{name}")
}

#[derive(Debug, Serialize)]
pub struct ReportSummary {
    pub generated_at: DateTime<Utc>,
    pub documents: usize,
    pub failed: usize,
    pub total_issues: usize,
    pub severity: SeverityCounts,
}

/// Serializable view of a batch: summary, per-document entries, every issue
/// and the document checklist
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub summary: ReportSummary,
    pub documents: &'a [DocumentReport],
    pub issues: &'a [Issue],
    pub checklist: Vec<ChecklistEntry>,
}

impl<'a> JsonReport<'a> {
    pub fn new(batch: &'a BatchReport, requirements: &[ProcessRequirement]) -> Self {
        Self {
            summary: ReportSummary {
                generated_at: batch.generated_at,
                documents: batch.documents.len(),
                failed: batch.failed().count(),
                total_issues: batch.total_issues(),
                severity: batch.severity_counts(),
            },
            documents: &batch.documents,
            issues: &batch.issues,
            checklist: batch.checklist(requirements),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ReviewError::Serialize(format!("cannot render report: {e}")))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        tracing::info!(path = %path.display(), "💾 report written");
        Ok(())
    }
}
