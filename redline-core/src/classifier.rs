use crate::config::{ClassifierEntry, UNKNOWN_DOCUMENT};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub document_type: String,
    pub category: Option<String>,
    /// Keyword that selected the entry, if any
    pub matched_keyword: Option<String>,
}

impl ClassificationResult {
    pub fn unknown() -> Self {
        Self {
            document_type: UNKNOWN_DOCUMENT.to_string(),
            category: None,
            matched_keyword: None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.matched_keyword.is_none()
    }
}

/// Keyword classifier over an ordered table. First entry with any keyword
/// occurring in the lower-cased text wins; there is no scoring.
pub struct DocumentClassifier {
    entries: Vec<ClassifierEntry>,
}

impl DocumentClassifier {
    pub fn new(entries: Vec<ClassifierEntry>) -> Self {
        // Keywords are compared against lower-cased text
        let entries = entries
            .into_iter()
            .map(|entry| ClassifierEntry {
                keywords: entry.keywords.iter().map(|k| k.to_lowercase()).collect(),
                ..entry
            })
            .collect();
        Self { entries }
    }

    pub fn classify(&self, text: &str) -> ClassificationResult {
        let text = text.to_lowercase();

        for entry in &self.entries {
            if let Some(keyword) = entry.keywords.iter().find(|k| text.contains(k.as_str())) {
                tracing::debug!(
                    document_type = %entry.label,
                    keyword = %keyword,
                    "classified document"
                );
                return ClassificationResult {
                    document_type: entry.label.clone(),
                    category: entry.category.clone(),
                    matched_keyword: Some(keyword.clone()),
                };
            }
        }

        tracing::debug!("no classifier keyword matched");
        ClassificationResult::unknown()
    }
}
