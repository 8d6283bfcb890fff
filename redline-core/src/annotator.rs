//! Maps issues found in flattened text back onto paragraphs and rewrites the
//! touched paragraphs with styled runs.
//!
//! Every issue is located with a [`ParagraphIndex`] (binary search over the
//! paragraph region starts). Issues are then grouped per paragraph and merged
//! into an ordered list of non-overlapping spans, and each touched paragraph
//! is rebuilt exactly once:
//!
//! ```text
//! "AED 500,000 under Dubai Courts jurisdiction"
//!  [AED](alert) [ [ISSUE: ...]](comment) [ 500,000 under ](plain)
//!  [Dubai Courts](alert) [ [ISSUE: ...]](comment) [ jurisdiction](plain)
//! ```
//!
//! Overlap resolution is first-detected-wins. Spans identical to an accepted
//! span join it and are rendered according to [`OverlapPolicy`].

use crate::config::{AnnotationConfig, OverlapPolicy};
use crate::document::{AnnotatableParagraph, Run, RunStyle, PARAGRAPH_SEPARATOR};
use crate::types::Issue;
use serde::Serialize;
use std::collections::BTreeMap;

/// Sorted paragraph regions of a flattened document.
///
/// Paragraph `p` owns `[start(p), start(p) + len(p))`; consecutive regions are
/// separated by one separator byte.
#[derive(Debug, Clone, Default)]
pub struct ParagraphIndex {
    starts: Vec<usize>,
    lengths: Vec<usize>,
}

impl ParagraphIndex {
    /// Build from paragraph byte lengths in document order
    pub fn from_lengths(lengths: impl IntoIterator<Item = usize>) -> Self {
        let lengths: Vec<usize> = lengths.into_iter().collect();
        let mut starts = Vec::with_capacity(lengths.len());
        let mut cursor = 0;
        for len in &lengths {
            starts.push(cursor);
            cursor += len + PARAGRAPH_SEPARATOR.len_utf8();
        }
        Self { starts, lengths }
    }

    pub fn build<P: AnnotatableParagraph>(paragraphs: &[P]) -> Self {
        Self::from_lengths(paragraphs.iter().map(|p| p.text().len()))
    }

    /// Owning paragraph and paragraph-local offset for a flattened offset.
    /// Offsets on a separator, or past the end, own no paragraph.
    pub fn locate(&self, offset: usize) -> Option<(usize, usize)> {
        let next = self.starts.partition_point(|&start| start <= offset);
        let paragraph = next.checked_sub(1)?;
        let local = offset - self.starts[paragraph];
        (local < self.lengths[paragraph]).then_some((paragraph, local))
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Start offset falls on a separator, outside the text, or in a
    /// paragraph that cannot be rewritten
    Unmapped,
    /// Partially overlaps a span accepted earlier in detection order
    Overlap,
    /// Nothing to highlight
    EmptyMatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedIssue {
    pub issue: Issue,
    pub reason: SkipReason,
}

/// What an annotation pass did. Skipped issues remain detected issues; they
/// only lack an inline annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnnotationOutcome {
    /// Issues rendered inline
    pub annotated: usize,
    /// Paragraphs whose runs were rewritten
    pub paragraphs: usize,
    pub skipped: Vec<SkippedIssue>,
}

/// Paragraph-local highlight with the issues attached to it
#[derive(Debug)]
struct Span<'a> {
    start: usize,
    end: usize,
    issues: Vec<&'a Issue>,
}

impl Span<'_> {
    fn overlaps(&self, start: usize, end: usize) -> bool {
        start < self.end && self.start < end
    }
}

pub struct Annotator {
    alert: RunStyle,
    comment: RunStyle,
    policy: OverlapPolicy,
}

impl Annotator {
    pub fn new(config: &AnnotationConfig) -> Self {
        Self {
            alert: RunStyle::colored(config.alert_color),
            comment: RunStyle {
                color: Some(config.comment_color),
                italic: true,
            },
            policy: config.overlap_policy,
        }
    }

    /// Annotate `paragraphs` in place. Only paragraphs owning at least one
    /// accepted span are touched; an empty issue list changes nothing.
    pub fn annotate<P: AnnotatableParagraph>(
        &self,
        paragraphs: &mut [P],
        issues: &[Issue],
    ) -> AnnotationOutcome {
        let mut outcome = AnnotationOutcome::default();
        if issues.is_empty() {
            return outcome;
        }

        let texts: Vec<String> = paragraphs.iter().map(|p| p.text()).collect();
        let locked: Vec<bool> = paragraphs.iter().map(|p| p.is_locked()).collect();
        let index = ParagraphIndex::from_lengths(texts.iter().map(String::len));

        let mut plan: BTreeMap<usize, Vec<Span>> = BTreeMap::new();
        for issue in issues {
            match self.place(&index, &texts, &locked, issue, &mut plan) {
                Ok(()) => outcome.annotated += 1,
                Err(reason) => {
                    tracing::warn!(
                        issue = %issue.issue,
                        offset = issue.start_offset,
                        matched = %issue.matched_text,
                        ?reason,
                        "issue not annotated"
                    );
                    outcome.skipped.push(SkippedIssue {
                        issue: issue.clone(),
                        reason,
                    });
                }
            }
        }

        for (paragraph, mut spans) in plan {
            spans.sort_by_key(|span| span.start);
            let runs = self.render(&texts[paragraph], &spans);
            paragraphs[paragraph].replace_runs(runs);
            outcome.paragraphs += 1;
        }

        tracing::debug!(
            annotated = outcome.annotated,
            paragraphs = outcome.paragraphs,
            skipped = outcome.skipped.len(),
            "annotation pass complete"
        );
        outcome
    }

    fn place<'a>(
        &self,
        index: &ParagraphIndex,
        texts: &[String],
        locked: &[bool],
        issue: &'a Issue,
        plan: &mut BTreeMap<usize, Vec<Span<'a>>>,
    ) -> Result<(), SkipReason> {
        if issue.matched_text.is_empty() {
            return Err(SkipReason::EmptyMatch);
        }
        let (paragraph, start) = index
            .locate(issue.start_offset)
            .ok_or(SkipReason::Unmapped)?;
        if locked[paragraph] {
            return Err(SkipReason::Unmapped);
        }
        let text = &texts[paragraph];
        // A match running across a separator is highlighted up to its paragraph's end
        let end = (start + issue.matched_text.len()).min(text.len());
        if !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            return Err(SkipReason::Unmapped);
        }

        let spans = plan.entry(paragraph).or_default();
        if let Some(same) = spans.iter_mut().find(|s| s.start == start && s.end == end) {
            same.issues.push(issue);
            return Ok(());
        }
        if spans.iter().any(|s| s.overlaps(start, end)) {
            return Err(SkipReason::Overlap);
        }
        spans.push(Span {
            start,
            end,
            issues: vec![issue],
        });
        Ok(())
    }

    fn render(&self, text: &str, spans: &[Span]) -> Vec<Run> {
        let mut runs = Vec::with_capacity(spans.len() * 3 + 1);
        let mut cursor = 0;
        for span in spans {
            if span.start > cursor {
                runs.push(Run::plain(&text[cursor..span.start]));
            }
            runs.push(Run::styled(&text[span.start..span.end], self.alert));
            match self.policy {
                OverlapPolicy::Stack => {
                    runs.extend(
                        span.issues
                            .iter()
                            .map(|issue| Run::styled(issue.comment(), self.comment)),
                    );
                }
                OverlapPolicy::Merge => {
                    let body = span
                        .issues
                        .iter()
                        .map(|issue| format!("{} | {}", issue.issue, issue.suggestion))
                        .collect::<Vec<_>>()
                        .join("; ");
                    runs.push(Run::styled(format!(" [ISSUE: {body}]"), self.comment));
                }
            }
            cursor = span.end;
        }
        if cursor < text.len() {
            runs.push(Run::plain(&text[cursor..]));
        }
        runs
    }
}
