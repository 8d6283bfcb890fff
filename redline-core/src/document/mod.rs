//! Document model and container formats
//!
//! The review pipeline only ever sees [`Document`]: an ordered list of
//! paragraphs, each a sequence of styled runs. Container formats convert raw
//! bytes to and from that model.
//!
//! ```text
//! bytes (DOCX, TXT)
//!     ↓  DocumentFormat::parse
//! Document ──→ flattened text ──→ classifier / rule engine
//!     ↓  Annotator (replace_runs on touched paragraphs)
//! Document'
//!     ↓  DocumentFormat::serialize
//! bytes
//! ```

pub mod docx;
pub mod text;

use crate::error::{Result, ReviewError};
use crate::types::RgbColor;
use serde::{Deserialize, Serialize};

pub use docx::DocxFormat;
pub use text::{LineEnding, PlainTextFormat, TextLayout};

/// Joins paragraph texts in the flattened representation
pub const PARAGRAPH_SEPARATOR: char = '\n';

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStyle {
    pub color: Option<RgbColor>,
    pub italic: bool,
}

impl RunStyle {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn colored(color: RgbColor) -> Self {
        Self {
            color: Some(color),
            italic: false,
        }
    }

    pub fn is_plain(&self) -> bool {
        self.color.is_none() && !self.italic
    }
}

/// Contiguous styled span of text within a paragraph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    pub style: RunStyle,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: RunStyle::plain(),
        }
    }

    pub fn styled(text: impl Into<String>, style: RunStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// Minimal paragraph surface the annotator needs. Keeps the annotation
/// algorithm independent of any container library.
pub trait AnnotatableParagraph {
    /// Plain text of the paragraph (concatenation of its runs)
    fn text(&self) -> String;

    /// Replace the paragraph's whole run sequence
    fn replace_runs(&mut self, runs: Vec<Run>);

    /// Whether the container holds content a run rewrite would destroy
    fn is_locked(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    pub runs: Vec<Run>,
    /// Set once the run structure has been rewritten; containers only
    /// regenerate modified paragraphs
    #[serde(default)]
    pub modified: bool,
    /// Embedded objects, fields or links sit between the runs; the paragraph
    /// is read for detection but never rewritten
    #[serde(default)]
    pub locked: bool,
}

impl Paragraph {
    /// A freshly parsed paragraph is a single unstyled run
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let runs = if text.is_empty() {
            Vec::new()
        } else {
            vec![Run::plain(text)]
        };
        Self {
            runs,
            modified: false,
            locked: false,
        }
    }

    pub fn len(&self) -> usize {
        self.runs.iter().map(|r| r.text.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AnnotatableParagraph for Paragraph {
    fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    fn replace_runs(&mut self, runs: Vec<Run>) {
        self.runs = runs;
        self.modified = true;
    }

    fn is_locked(&self) -> bool {
        self.locked
    }
}

/// Container state a format keeps so it can write the document back
#[derive(Debug, Clone)]
pub enum ContainerState {
    /// Package parts and paragraph locations of a DOCX file
    Docx(docx::DocxSource),
    /// Byte-order mark and line endings of a text file
    Text(TextLayout),
}

/// Ordered sequence of paragraphs. Paragraph order defines the flattening
/// used for offset computation.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub paragraphs: Vec<Paragraph>,
    pub source: Option<ContainerState>,
}

impl Document {
    pub fn from_paragraphs<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paragraphs: texts.into_iter().map(Paragraph::from_text).collect(),
            source: None,
        }
    }

    /// Paragraph texts joined by [`PARAGRAPH_SEPARATOR`]
    pub fn flattened_text(&self) -> String {
        let mut flattened = String::with_capacity(
            self.paragraphs.iter().map(|p| p.len() + 1).sum::<usize>(),
        );
        for (index, paragraph) in self.paragraphs.iter().enumerate() {
            if index > 0 {
                flattened.push(PARAGRAPH_SEPARATOR);
            }
            for run in &paragraph.runs {
                flattened.push_str(&run.text);
            }
        }
        flattened
    }

    pub fn modified_paragraphs(&self) -> usize {
        self.paragraphs.iter().filter(|p| p.modified).count()
    }
}

/// Container format boundary: raw bytes in, [`Document`] out, and back.
pub trait DocumentFormat {
    fn parse(&self, bytes: &[u8]) -> Result<Document>;

    fn serialize(&self, document: &Document) -> Result<Vec<u8>>;

    /// Format name for logging
    fn name(&self) -> &str;

    /// Check if this format handles the given file name
    fn supports_file_name(&self, name: &str) -> bool;
}

fn extension_of(name: &str) -> Option<String> {
    std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Pick a container format from a document's file name
pub fn format_for_name(name: &str) -> Result<Box<dyn DocumentFormat>> {
    let formats: Vec<Box<dyn DocumentFormat>> =
        vec![Box::new(DocxFormat::new()), Box::new(PlainTextFormat::new())];
    formats
        .into_iter()
        .find(|format| format.supports_file_name(name))
        .ok_or_else(|| {
            ReviewError::Parse(format!(
                "unsupported document format for '{name}' (expected .docx, .txt or .md)"
            ))
        })
}
