use crate::config::{ReviewConfig, RuleConfig, GENERAL_RULES_KEY};
use crate::error::{Result, ReviewError};
use crate::types::{Issue, Severity};
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;

/// A rule with its pattern compiled once at engine construction
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub group: String,
    pub regex: Regex,
    pub issue: String,
    pub severity: Severity,
    pub regulation: String,
}

impl CompiledRule {
    fn compile(group: &str, index: usize, rule: &RuleConfig, case_insensitive: bool) -> Result<Self> {
        let regex = RegexBuilder::new(&rule.pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| {
                ReviewError::Configuration(format!(
                    "rule {index} in group '{group}' has an invalid pattern '{}': {e}",
                    rule.pattern
                ))
            })?;
        Ok(Self {
            group: group.to_string(),
            regex,
            issue: rule.issue.clone(),
            severity: rule.severity,
            regulation: rule.regulation.clone(),
        })
    }

    /// Issues for every non-overlapping, leftmost match of this rule
    fn scan(&self, text: &str, doc_type: &str, issues: &mut Vec<Issue>) -> usize {
        let before = issues.len();
        for found in self.regex.find_iter(text) {
            // A zero-width match flags nothing and cannot be annotated
            if found.as_str().is_empty() {
                continue;
            }
            issues.push(Issue {
                document_type: doc_type.to_string(),
                issue: self.issue.clone(),
                severity: self.severity,
                suggestion: self.regulation.clone(),
                matched_text: found.as_str().to_string(),
                start_offset: found.start(),
            });
        }
        issues.len() - before
    }
}

/// Scans flattened document text against the configured rule table.
///
/// The rule set for a scan is the document type's own group followed by the
/// "General" group. Each rule contributes one issue per match; nothing is
/// deduplicated across rules, so two rules flagging the same span both report it.
pub struct RuleEngine {
    groups: HashMap<String, Vec<CompiledRule>>,
}

impl RuleEngine {
    pub fn new(config: &ReviewConfig) -> Result<Self> {
        let case_insensitive = config.detection.case_insensitive;
        let mut groups = HashMap::with_capacity(config.rules.len());
        for (group, rules) in &config.rules {
            let compiled = rules
                .iter()
                .enumerate()
                .map(|(index, rule)| CompiledRule::compile(group, index, rule, case_insensitive))
                .collect::<Result<Vec<_>>>()?;
            groups.insert(group.clone(), compiled);
        }

        tracing::debug!(
            groups = groups.len(),
            rules = groups.values().map(Vec::len).sum::<usize>(),
            "compiled rule table"
        );
        Ok(Self { groups })
    }

    /// Effective rules for a document type, in scan order
    pub fn rules_for<'a>(&'a self, doc_type: &str) -> impl Iterator<Item = &'a CompiledRule> + 'a {
        let specific = if doc_type == GENERAL_RULES_KEY {
            None
        } else {
            self.groups.get(doc_type)
        };
        specific
            .into_iter()
            .flatten()
            .chain(self.groups.get(GENERAL_RULES_KEY).into_iter().flatten())
    }

    pub fn rule_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Find every issue in `text` for a document of type `doc_type`.
    ///
    /// Issues come out grouped by rule in scan order, and by match position
    /// within a rule. The result is a pure function of the inputs.
    pub fn detect(&self, text: &str, doc_type: &str) -> Vec<Issue> {
        let mut issues = Vec::new();
        for rule in self.rules_for(doc_type) {
            let found = rule.scan(text, doc_type, &mut issues);
            if found > 0 {
                tracing::debug!(
                    group = %rule.group,
                    pattern = %rule.regex.as_str(),
                    matches = found,
                    "rule matched"
                );
            }
        }
        issues
    }
}
