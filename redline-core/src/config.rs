use crate::error::{Result, ReviewError};
use crate::types::{RgbColor, Severity};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;

/// Rule group appended to every scan regardless of document type
pub const GENERAL_RULES_KEY: &str = "General";

/// Label returned when no classifier entry matches
pub const UNKNOWN_DOCUMENT: &str = "Unknown Document";

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_alert_color() -> RgbColor {
    RgbColor::RED
}

fn default_comment_color() -> RgbColor {
    RgbColor::BLUE
}

/// Complete review configuration: classifier table, rule table, document
/// requirements and the detection/annotation knobs.
///
/// Injected into the processor at construction; never mutated while a batch runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Ordered classifier table - first entry with a matching keyword wins
    #[serde(default)]
    pub classifier: Vec<ClassifierEntry>,
    /// Rule groups keyed by document-type label, plus the reserved "General" group
    #[serde(default)]
    pub rules: HashMap<String, Vec<RuleConfig>>,
    /// Documents each corporate process expects to receive
    #[serde(default)]
    pub requirements: Vec<ProcessRequirement>,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub annotation: AnnotationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifierEntry {
    /// Document-type label, also the key into the rule table
    pub label: String,
    /// Process this document type belongs to (e.g. "Company Formation")
    #[serde(default)]
    pub category: Option<String>,
    /// Lower-case substrings; any one of them selects this entry
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleConfig {
    /// Regular expression searched in the flattened document text
    pub pattern: String,
    /// Human-readable description of the problem
    pub issue: String,
    pub severity: Severity,
    /// Citation surfaced to the reviewer as the suggestion
    pub regulation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessRequirement {
    pub process: String,
    pub documents: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Match rule patterns without regard to case
    #[serde(default = "default_true")]
    pub case_insensitive: bool,
    /// Drop matches that start on a paragraph separator. Such matches own no
    /// paragraph and could never be annotated.
    #[serde(default = "default_true")]
    pub skip_separator_matches: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            case_insensitive: true,
            skip_separator_matches: true,
        }
    }
}

/// How issues flagging the exact same span are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// One comment run per issue, in detection order
    #[default]
    Stack,
    /// A single comment run listing every issue
    Merge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationConfig {
    /// Color of the run holding the flagged text
    #[serde(default = "default_alert_color")]
    pub alert_color: RgbColor,
    /// Color of the italic comment run
    #[serde(default = "default_comment_color")]
    pub comment_color: RgbColor,
    #[serde(default)]
    pub overlap_policy: OverlapPolicy,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            alert_color: default_alert_color(),
            comment_color: default_comment_color(),
            overlap_policy: OverlapPolicy::default(),
        }
    }
}

impl ReviewConfig {
    /// Load config from file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ReviewError::Configuration(format!("cannot read config file {path}: {e}"))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse a YAML document into a config
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| ReviewError::Configuration(format!("malformed config: {e}")))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| ReviewError::Configuration(format!("cannot render config: {e}")))
    }

    /// Effective rule set for a document type: type-specific rules followed by
    /// the general rules
    pub fn rules_for<'a>(&'a self, doc_type: &str) -> impl Iterator<Item = &'a RuleConfig> + 'a {
        let specific = if doc_type == GENERAL_RULES_KEY {
            None
        } else {
            self.rules.get(doc_type)
        };
        specific
            .into_iter()
            .flatten()
            .chain(self.rules.get(GENERAL_RULES_KEY).into_iter().flatten())
    }

    /// Check every pattern compiles and every table entry is usable.
    pub fn validate(&self) -> Result<()> {
        for entry in &self.classifier {
            if entry.label.trim().is_empty() {
                return Err(ReviewError::Configuration(
                    "classifier entry with empty label".to_string(),
                ));
            }
            if entry.keywords.iter().any(|k| k.is_empty()) {
                return Err(ReviewError::Configuration(format!(
                    "classifier entry '{}' has an empty keyword",
                    entry.label
                )));
            }
        }

        for (group, rules) in &self.rules {
            for (index, rule) in rules.iter().enumerate() {
                if rule.pattern.is_empty() {
                    return Err(ReviewError::Configuration(format!(
                        "rule {index} in group '{group}' has an empty pattern"
                    )));
                }
                RegexBuilder::new(&rule.pattern)
                    .case_insensitive(self.detection.case_insensitive)
                    .build()
                    .map_err(|e| {
                        ReviewError::Configuration(format!(
                            "rule {index} in group '{group}' has an invalid pattern '{}': {e}",
                            rule.pattern
                        ))
                    })?;
            }
        }
        Ok(())
    }
}

impl Default for ReviewConfig {
    /// Built-in ADGM corporate-formation tables
    fn default() -> Self {
        let aoa_label = "Articles of Association (AoA)".to_string();

        let mut rules = HashMap::new();
        rules.insert(
            aoa_label.clone(),
            vec![
                RuleConfig {
                    pattern: r"UAE Federal".to_string(),
                    issue: "Incorrect legal framework (ADGM has independent laws)".to_string(),
                    severity: Severity::High,
                    regulation: "ADGM Companies Regulations 2020".to_string(),
                },
                RuleConfig {
                    pattern: r"AED|Dirham".to_string(),
                    issue: "Share capital must be denominated in USD".to_string(),
                    severity: Severity::Medium,
                    regulation: "ADGM Companies Regulations 2020".to_string(),
                },
            ],
        );
        // The jurisdiction rule applies to every document type, so it only lives here
        rules.insert(
            GENERAL_RULES_KEY.to_string(),
            vec![RuleConfig {
                pattern: r"Dubai Courts".to_string(),
                issue: "Incorrect jurisdiction (should be ADGM Courts)".to_string(),
                severity: Severity::High,
                regulation: "ADGM Courts Regulations 2015".to_string(),
            }],
        );

        Self {
            classifier: vec![ClassifierEntry {
                label: aoa_label,
                category: Some("Company Formation".to_string()),
                keywords: vec!["articles".to_string(), "association".to_string()],
            }],
            rules,
            requirements: vec![ProcessRequirement {
                process: "Company Formation".to_string(),
                documents: [
                    "Articles of Association (AoA)",
                    "Memorandum of Association (MoA/MoU)",
                    "Board Resolution Templates",
                    "Shareholder Resolution Templates",
                    "Incorporation Application Form",
                    "UBO Declaration Form",
                    "Register of Members and Directors",
                    "Change of Registered Address Notice",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            }],
            detection: DetectionConfig::default(),
            annotation: AnnotationConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ReviewConfig::default();
        config.validate().unwrap();
        assert_eq!(config.classifier.len(), 1);
        assert_eq!(
            config.classifier[0].category.as_deref(),
            Some("Company Formation")
        );
    }

    #[test]
    fn test_rules_for_puts_type_specific_first() {
        let config = ReviewConfig::default();
        let patterns: Vec<&str> = config
            .rules_for("Articles of Association (AoA)")
            .map(|r| r.pattern.as_str())
            .collect();
        assert_eq!(patterns, vec!["UAE Federal", "AED|Dirham", "Dubai Courts"]);

        let general_only: Vec<&str> = config
            .rules_for(UNKNOWN_DOCUMENT)
            .map(|r| r.pattern.as_str())
            .collect();
        assert_eq!(general_only, vec!["Dubai Courts"]);
    }

    #[test]
    fn test_general_label_is_not_applied_twice() {
        let config = ReviewConfig::default();
        assert_eq!(config.rules_for(GENERAL_RULES_KEY).count(), 1);
    }

    #[test]
    fn test_invalid_pattern_is_configuration_error() {
        let mut config = ReviewConfig::default();
        config.rules.insert(
            "Broken".to_string(),
            vec![RuleConfig {
                pattern: "(unclosed".to_string(),
                issue: "x".to_string(),
                severity: Severity::Low,
                regulation: "y".to_string(),
            }],
        );
        let err = config.validate().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("Broken"));
    }

    #[test]
    fn test_yaml_with_defaults_for_optional_sections() {
        let yaml = r##"
classifier:
  - label: Board Resolution
    keywords: [resolution, board]
rules:
  General:
    - pattern: "Dubai Courts"
      issue: "Incorrect jurisdiction"
      severity: High
      regulation: "ADGM Courts Regulations 2015"
annotation:
  overlap_policy: merge
  alert_color: "#AA0000"
"##;
        let config = ReviewConfig::from_yaml(yaml).unwrap();
        assert!(config.detection.case_insensitive);
        assert!(config.detection.skip_separator_matches);
        assert_eq!(config.annotation.overlap_policy, OverlapPolicy::Merge);
        assert_eq!(config.annotation.alert_color, RgbColor(0xAA, 0, 0));
        assert_eq!(config.annotation.comment_color, RgbColor::BLUE);
        assert_eq!(config.classifier[0].category, None);
        config.validate().unwrap();
    }

    #[test]
    fn test_malformed_yaml_is_configuration_error() {
        let err = ReviewConfig::from_yaml("rules: [not, a, map]").unwrap_err();
        assert!(err.is_configuration());

        let bad_color = "annotation:\n  alert_color: red\n";
        assert!(ReviewConfig::from_yaml(bad_color).is_err());
    }

    #[test]
    fn test_yaml_roundtrip_keeps_rule_order() {
        let config = ReviewConfig::default();
        let yaml = config.to_yaml().unwrap();
        let reloaded = ReviewConfig::from_yaml(&yaml).unwrap();
        assert_eq!(
            reloaded.rules["Articles of Association (AoA)"],
            config.rules["Articles of Association (AoA)"]
        );
        assert_eq!(reloaded.classifier, config.classifier);
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = ReviewConfig::load_from_file("/nonexistent/redline.yaml").unwrap_err();
        assert!(err.is_configuration());
    }
}
