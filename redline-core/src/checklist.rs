use crate::config::ProcessRequirement;
use serde::Serialize;

/// Required documents for one corporate process versus what a batch supplied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistEntry {
    pub process: String,
    pub required: Vec<String>,
    pub uploaded: Vec<String>,
    pub missing: Vec<String>,
}

impl ChecklistEntry {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Build the checklist from `(document_type, category)` pairs of classified
/// documents.
///
/// Only processes that at least one document was classified into appear.
/// Requirement order is kept for both `uploaded` and `missing`.
pub fn build_checklist<'a, I>(requirements: &[ProcessRequirement], classified: I) -> Vec<ChecklistEntry>
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    let classified: Vec<(&str, Option<&str>)> = classified.into_iter().collect();

    requirements
        .iter()
        .filter(|req| {
            classified
                .iter()
                .any(|(_, category)| *category == Some(req.process.as_str()))
        })
        .map(|req| {
            let (uploaded, missing): (Vec<String>, Vec<String>) = req
                .documents
                .iter()
                .cloned()
                .partition(|doc| classified.iter().any(|(label, _)| *label == doc.as_str()));
            ChecklistEntry {
                process: req.process.clone(),
                required: req.documents.clone(),
                uploaded,
                missing,
            }
        })
        .collect()
}
