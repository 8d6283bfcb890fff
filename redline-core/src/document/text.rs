use super::{ContainerState, Document, DocumentFormat, Paragraph, PARAGRAPH_SEPARATOR};
use crate::error::{Result, ReviewError};

const BOM: char = '\u{feff}';

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// How a text file was laid out on disk, restored when writing it back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextLayout {
    pub bom: bool,
    pub line_ending: LineEnding,
}

impl TextLayout {
    /// CRLF only when every line break in `text` is one; mixed files keep
    /// their carriage returns as paragraph text
    fn detect(text: &str) -> Self {
        let breaks = text.matches(PARAGRAPH_SEPARATOR).count();
        let crlf = text.matches("\r\n").count();
        Self {
            bom: false,
            line_ending: if breaks > 0 && breaks == crlf {
                LineEnding::CrLf
            } else {
                LineEnding::Lf
            },
        }
    }
}

/// Plain-text container: one paragraph per line.
///
/// Styling cannot be represented, so serialization writes run texts only and
/// annotation comments appear inline.
pub struct PlainTextFormat;

impl Default for PlainTextFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl PlainTextFormat {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentFormat for PlainTextFormat {
    fn parse(&self, bytes: &[u8]) -> Result<Document> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ReviewError::Parse(format!("text document is not valid UTF-8: {e}")))?;
        let (bom, text) = match text.strip_prefix(BOM) {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let layout = TextLayout {
            bom,
            ..TextLayout::detect(text)
        };

        let paragraphs = if text.is_empty() {
            Vec::new()
        } else {
            text.split(PARAGRAPH_SEPARATOR)
                .map(|line| match layout.line_ending {
                    LineEnding::CrLf => line.strip_suffix('\r').unwrap_or(line),
                    LineEnding::Lf => line,
                })
                .map(Paragraph::from_text)
                .collect()
        };
        Ok(Document {
            paragraphs,
            source: Some(ContainerState::Text(layout)),
        })
    }

    fn serialize(&self, document: &Document) -> Result<Vec<u8>> {
        let layout = match &document.source {
            Some(ContainerState::Text(layout)) => *layout,
            _ => TextLayout::default(),
        };

        let mut out = String::with_capacity(document.flattened_text().len() + 4);
        if layout.bom {
            out.push(BOM);
        }
        for (index, paragraph) in document.paragraphs.iter().enumerate() {
            if index > 0 {
                out.push_str(layout.line_ending.as_str());
            }
            for run in &paragraph.runs {
                out.push_str(&run.text);
            }
        }
        Ok(out.into_bytes())
    }

    fn name(&self) -> &str {
        "text"
    }

    fn supports_file_name(&self, name: &str) -> bool {
        matches!(
            super::extension_of(name).as_deref(),
            Some("txt") | Some("md")
        )
    }
}
