use crate::error::ReviewError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordinal issue priority used for aggregate reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Every severity, lowest first
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => Err(ReviewError::Configuration(format!(
                "unknown severity '{other}'"
            ))),
        }
    }
}

/// A single rule match found in a document's flattened text.
///
/// `start_offset` is a byte offset into the flattened text, and
/// `matched_text == flattened[start_offset..start_offset + matched_text.len()]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub document_type: String,
    pub issue: String,
    pub severity: Severity,
    /// Regulation citation the reviewer should consult
    pub suggestion: String,
    pub matched_text: String,
    pub start_offset: usize,
}

impl Issue {
    /// Exclusive end offset of the match in the flattened text
    pub fn end_offset(&self) -> usize {
        self.start_offset + self.matched_text.len()
    }

    /// Inline comment text appended after the flagged span
    pub fn comment(&self) -> String {
        format!(" [ISSUE: {} | {}]", self.issue, self.suggestion)
    }
}

/// Per-severity issue totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl SeverityCounts {
    pub fn from_issues<'a>(issues: impl IntoIterator<Item = &'a Issue>) -> Self {
        let mut counts = Self::default();
        for issue in issues {
            counts.add(issue.severity);
        }
        counts
    }

    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Low => self.low += 1,
            Severity::Medium => self.medium += 1,
            Severity::High => self.high += 1,
        }
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Low => self.low,
            Severity::Medium => self.medium,
            Severity::High => self.high,
        }
    }

    pub fn total(&self) -> usize {
        self.low + self.medium + self.high
    }
}

/// 24-bit color used for run styling. Serialized as six hex digits ("FF0000"),
/// which is also how WordprocessingML stores `w:color`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RgbColor(pub u8, pub u8, pub u8);

impl RgbColor {
    pub const RED: RgbColor = RgbColor(0xFF, 0x00, 0x00);
    pub const BLUE: RgbColor = RgbColor(0x00, 0x00, 0xFF);

    pub fn to_hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

impl FromStr for RgbColor {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ReviewError::Configuration(format!(
                "invalid color '{s}', expected six hex digits like FF0000"
            )));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|e| ReviewError::Configuration(format!("invalid color '{s}': {e}")))
        };
        Ok(RgbColor(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for RgbColor {
    type Error = ReviewError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RgbColor> for String {
    fn from(color: RgbColor) -> Self {
        color.to_hex()
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
