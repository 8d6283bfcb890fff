//! DOCX container support
//!
//! A DOCX file is a zip package; the body text lives in `word/document.xml`
//! as WordprocessingML. Reading keeps every package part verbatim and records
//! where each body-level `<w:p>` sits in the main part. Writing regenerates
//! only paragraphs whose runs were replaced, so untouched paragraphs (and every
//! other part) come out byte-identical.
//!
//! Paragraph text is read from runs that sit directly in the paragraph or in
//! a run container such as `w:hyperlink`. Text boxes, drawings and other
//! embedded content are skipped, and a paragraph holding anything the
//! regenerated markup could not reproduce is marked locked.

use super::{ContainerState, Document, DocumentFormat, Paragraph, Run};
use crate::error::{Result, ReviewError};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read, Write};
use std::ops::Range;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Package part holding the document body
pub const MAIN_PART: &str = "word/document.xml";

/// Largest uncompressed package part accepted by default
pub const DEFAULT_MAX_PART_BYTES: u64 = 256 * 1024 * 1024;

/// Upper bound on the buffer reserved from a part's declared size
const PREALLOCATION_LIMIT: u64 = 1024 * 1024;

/// Elements that may wrap a run without hiding its text
const RUN_CONTAINERS: &[&[u8]] = &[
    b"w:hyperlink",
    b"w:smartTag",
    b"w:ins",
    b"w:sdt",
    b"w:sdtContent",
    b"w:customXml",
    b"w:fldSimple",
];

/// Run children the regenerated markup reproduces
const RUN_CONTENT: &[&[u8]] = &[
    b"w:rPr",
    b"w:t",
    b"w:tab",
    b"w:br",
    b"w:cr",
    b"w:lastRenderedPageBreak",
];

/// Empty paragraph children copied verbatim into a regenerated paragraph
const PARAGRAPH_MARKERS: &[&[u8]] = &[b"w:bookmarkStart", b"w:bookmarkEnd", b"w:proofErr"];

/// Raw package part, kept so the document can be written back unchanged
#[derive(Debug, Clone)]
struct PackageEntry {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
    is_dir: bool,
}

/// Location of one body-level paragraph inside the main part
#[derive(Debug, Clone)]
struct ParagraphSlot {
    span: Range<usize>,
    /// Original `<w:p ...>` start tag (attributes such as rsid kept)
    open_tag: String,
    /// Original `<w:pPr>` element, so paragraph style survives a rewrite
    properties: Option<String>,
    /// Bookmark and proofing markers, re-emitted ahead of the new runs
    markers: Vec<String>,
}

/// Container state carried on a [`Document`] read from DOCX
#[derive(Debug, Clone)]
pub struct DocxSource {
    entries: Vec<PackageEntry>,
    main_xml: String,
    slots: Vec<ParagraphSlot>,
}

pub struct DocxFormat {
    max_part_bytes: u64,
}

impl Default for DocxFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl DocxFormat {
    pub fn new() -> Self {
        Self {
            max_part_bytes: DEFAULT_MAX_PART_BYTES,
        }
    }

    /// Reject packages with any part inflating past `limit` bytes
    pub fn with_max_part_bytes(mut self, limit: u64) -> Self {
        self.max_part_bytes = limit;
        self
    }
}

impl DocumentFormat for DocxFormat {
    fn parse(&self, bytes: &[u8]) -> Result<Document> {
        let entries = read_package(bytes, self.max_part_bytes)?;
        let main = entries
            .iter()
            .find(|entry| entry.name == MAIN_PART)
            .ok_or_else(|| ReviewError::Parse(format!("package has no {MAIN_PART}")))?;
        let main_xml = String::from_utf8(main.data.clone())
            .map_err(|e| ReviewError::Parse(format!("{MAIN_PART} is not valid UTF-8: {e}")))?;

        let (paragraphs, slots) = scan_body(&main_xml)?;
        tracing::debug!(
            parts = entries.len(),
            paragraphs = paragraphs.len(),
            locked = paragraphs.iter().filter(|p| p.locked).count(),
            "read DOCX package"
        );

        Ok(Document {
            paragraphs,
            source: Some(ContainerState::Docx(DocxSource {
                entries,
                main_xml,
                slots,
            })),
        })
    }

    fn serialize(&self, document: &Document) -> Result<Vec<u8>> {
        let Some(ContainerState::Docx(source)) = &document.source else {
            return Err(ReviewError::Serialize(
                "document was not read from a DOCX package".to_string(),
            ));
        };
        if source.slots.len() != document.paragraphs.len() {
            return Err(ReviewError::Serialize(format!(
                "paragraph count changed from {} to {}",
                source.slots.len(),
                document.paragraphs.len()
            )));
        }

        let main_xml = render_main_part(source, &document.paragraphs)?;
        write_package(&source.entries, &main_xml)
    }

    fn name(&self) -> &str {
        "docx"
    }

    fn supports_file_name(&self, name: &str) -> bool {
        super::extension_of(name).as_deref() == Some("docx")
    }
}

fn read_package(bytes: &[u8], max_part_bytes: u64) -> Result<Vec<PackageEntry>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ReviewError::Parse(format!("not a DOCX package: {e}")))?;

    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut file = archive
            .by_index(index)
            .map_err(|e| ReviewError::Parse(format!("unreadable package entry {index}: {e}")))?;
        let name = file.name().to_string();
        let compression = file.compression();
        let is_dir = file.is_dir();
        // The declared size comes from the archive and is not trusted
        let mut data = Vec::with_capacity(file.size().min(PREALLOCATION_LIMIT) as usize);
        (&mut file)
            .take(max_part_bytes.saturating_add(1))
            .read_to_end(&mut data)
            .map_err(|e| ReviewError::Parse(format!("cannot inflate {name}: {e}")))?;
        if data.len() as u64 > max_part_bytes {
            return Err(ReviewError::Parse(format!(
                "package part {name} exceeds {max_part_bytes} bytes"
            )));
        }
        entries.push(PackageEntry {
            name,
            data,
            compression,
            is_dir,
        });
    }
    Ok(entries)
}

fn write_package(entries: &[PackageEntry], main_xml: &str) -> Result<Vec<u8>> {
    let zip_err = |e: zip::result::ZipError| ReviewError::Serialize(e.to_string());

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for entry in entries {
        // Only stored and deflated parts are written back; anything exotic is re-deflated
        let compression = match entry.compression {
            CompressionMethod::Stored => CompressionMethod::Stored,
            _ => CompressionMethod::Deflated,
        };
        let options = FileOptions::default().compression_method(compression);
        if entry.is_dir {
            writer
                .add_directory(entry.name.clone(), options)
                .map_err(zip_err)?;
            continue;
        }
        writer.start_file(entry.name.clone(), options).map_err(zip_err)?;
        let data = if entry.name == MAIN_PART {
            main_xml.as_bytes()
        } else {
            entry.data.as_slice()
        };
        writer
            .write_all(data)
            .map_err(|e| ReviewError::Serialize(format!("cannot write {}: {e}", entry.name)))?;
    }
    let cursor = writer.finish().map_err(zip_err)?;
    Ok(cursor.into_inner())
}

/// Paragraph being collected while scanning
struct OpenParagraph {
    start: usize,
    /// Element stack depth at which the `<w:p>` opened
    depth: usize,
    open_tag: String,
    properties_start: Option<usize>,
    properties: Option<String>,
    markers: Vec<String>,
    text: String,
    locked: bool,
}

impl OpenParagraph {
    fn finish(self, end: usize) -> (Paragraph, ParagraphSlot) {
        let mut paragraph = Paragraph::from_text(self.text);
        paragraph.locked = self.locked;
        let slot = ParagraphSlot {
            span: self.start..end,
            open_tag: self.open_tag,
            properties: self.properties,
            markers: self.markers,
        };
        (paragraph, slot)
    }
}

fn parse_error(reader: &Reader<&[u8]>, e: impl std::fmt::Display) -> ReviewError {
    ReviewError::Parse(format!(
        "malformed {MAIN_PART} near byte {}: {e}",
        reader.buffer_position()
    ))
}

fn parent_is(stack: &[Vec<u8>], name: &[u8]) -> bool {
    stack.last().map(Vec::as_slice) == Some(name)
}

/// `path` lists the elements below the `w:p`. True when it ends in a run
/// reached only through run containers.
fn is_visible_run(path: &[Vec<u8>]) -> bool {
    match path.split_last() {
        Some((run, wrappers)) => {
            run.as_slice() == b"w:r"
                && wrappers
                    .iter()
                    .all(|w| RUN_CONTAINERS.contains(&w.as_slice()))
        }
        None => false,
    }
}

/// True inside a `w:t` of a visible run of the paragraph opened at `depth`
fn in_visible_text(stack: &[Vec<u8>], depth: usize) -> bool {
    match stack.split_last() {
        Some((last, parents)) if last.as_slice() == b"w:t" => {
            parents.get(depth + 1..).map_or(false, is_visible_run)
        }
        _ => false,
    }
}

/// Whether an element named `name` under `path` survives paragraph regeneration
fn survives_rewrite(path: &[Vec<u8>], name: &[u8]) -> bool {
    match path {
        [] => name == b"w:pPr" || name == b"w:r",
        [first, ..] if first.as_slice() == b"w:pPr" => true,
        [run] if run.as_slice() == b"w:r" => RUN_CONTENT.contains(&name),
        [run, props, ..] if run.as_slice() == b"w:r" && props.as_slice() == b"w:rPr" => true,
        _ => false,
    }
}

/// Walk the main part and collect body-level paragraphs with their spans.
/// Paragraphs nested in tables or text boxes are not part of the body sequence.
fn scan_body(xml: &str) -> Result<(Vec<Paragraph>, Vec<ParagraphSlot>)> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut current: Option<OpenParagraph> = None;
    let mut paragraphs = Vec::new();
    let mut slots = Vec::new();

    loop {
        let event_start = reader.buffer_position();
        let event = reader.read_event().map_err(|e| parse_error(&reader, e))?;
        let event_end = reader.buffer_position();

        match event {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                let opens_paragraph =
                    current.is_none() && name == b"w:p" && parent_is(&stack, b"w:body");
                if opens_paragraph {
                    current = Some(OpenParagraph {
                        start: event_start,
                        depth: stack.len(),
                        open_tag: xml[event_start..event_end].to_string(),
                        properties_start: None,
                        properties: None,
                        markers: Vec::new(),
                        text: String::new(),
                        locked: false,
                    });
                } else if let Some(p) = current.as_mut() {
                    let path = &stack[p.depth + 1..];
                    if name == b"w:pPr" && path.is_empty() {
                        p.properties_start = Some(event_start);
                    }
                    if !survives_rewrite(path, &name) {
                        p.locked = true;
                    }
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                let name = e.name();
                let name = name.as_ref();
                let empty_paragraph =
                    current.is_none() && name == b"w:p" && parent_is(&stack, b"w:body");
                if empty_paragraph {
                    let tag = &xml[event_start..event_end];
                    let open_tag = format!("{}>", tag.trim_end_matches("/>").trim_end());
                    paragraphs.push(Paragraph::from_text(""));
                    slots.push(ParagraphSlot {
                        span: event_start..event_end,
                        open_tag,
                        properties: None,
                        markers: Vec::new(),
                    });
                } else if let Some(p) = current.as_mut() {
                    let path = &stack[p.depth + 1..];
                    let raw = &xml[event_start..event_end];
                    if path.is_empty() && name == b"w:pPr" {
                        p.properties = Some(raw.to_string());
                    } else if path.is_empty() && PARAGRAPH_MARKERS.contains(&name) {
                        p.markers.push(raw.to_string());
                    } else if !survives_rewrite(path, name) {
                        p.locked = true;
                    }
                    if is_visible_run(path) {
                        match name {
                            b"w:tab" => p.text.push('\t'),
                            b"w:br" | b"w:cr" => p.text.push('\n'),
                            _ => {}
                        }
                    }
                }
            }
            Event::Text(t) => {
                if let Some(p) = current.as_mut() {
                    if in_visible_text(&stack, p.depth) {
                        let text = t.unescape().map_err(|e| parse_error(&reader, e))?;
                        p.text.push_str(&text);
                    }
                }
            }
            Event::CData(c) => {
                if let Some(p) = current.as_mut() {
                    if in_visible_text(&stack, p.depth) {
                        p.text.push_str(&String::from_utf8_lossy(&c));
                    }
                }
            }
            Event::End(e) => {
                stack.pop();
                let name = e.name();
                let name = name.as_ref();
                let closes_paragraph =
                    matches!(&current, Some(p) if name == b"w:p" && stack.len() == p.depth);
                if closes_paragraph {
                    if let Some(p) = current.take() {
                        let (paragraph, slot) = p.finish(event_end);
                        paragraphs.push(paragraph);
                        slots.push(slot);
                    }
                } else if let Some(p) = current.as_mut() {
                    if name == b"w:pPr" && stack.len() == p.depth + 1 {
                        if let Some(start) = p.properties_start.take() {
                            p.properties = Some(xml[start..event_end].to_string());
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if current.is_some() {
        return Err(ReviewError::Parse(format!(
            "{MAIN_PART} ended inside a paragraph"
        )));
    }
    Ok((paragraphs, slots))
}

fn render_main_part(source: &DocxSource, paragraphs: &[Paragraph]) -> Result<String> {
    let xml = &source.main_xml;
    let mut out = String::with_capacity(xml.len() + 1024);
    let mut cursor = 0;
    for (index, (slot, paragraph)) in source.slots.iter().zip(paragraphs).enumerate() {
        if !paragraph.modified {
            continue;
        }
        if paragraph.locked {
            return Err(ReviewError::Serialize(format!(
                "paragraph {index} holds embedded content and cannot be rewritten"
            )));
        }
        out.push_str(&xml[cursor..slot.span.start]);
        render_paragraph(&mut out, slot, paragraph);
        cursor = slot.span.end;
    }
    out.push_str(&xml[cursor..]);
    Ok(out)
}

fn render_paragraph(out: &mut String, slot: &ParagraphSlot, paragraph: &Paragraph) {
    out.push_str(&slot.open_tag);
    if let Some(properties) = &slot.properties {
        out.push_str(properties);
    }
    for marker in &slot.markers {
        out.push_str(marker);
    }
    for run in paragraph.runs.iter().filter(|r| !r.text.is_empty()) {
        render_run(out, run);
    }
    out.push_str("</w:p>");
}

fn render_run(out: &mut String, run: &Run) {
    out.push_str("<w:r>");
    if !run.style.is_plain() {
        // CT_RPr ordering: w:i precedes w:color
        out.push_str("<w:rPr>");
        if run.style.italic {
            out.push_str("<w:i/>");
        }
        if let Some(color) = run.style.color {
            out.push_str(&format!(r#"<w:color w:val="{}"/>"#, color.to_hex()));
        }
        out.push_str("</w:rPr>");
    }

    let mut pending = String::new();
    let flush = |out: &mut String, pending: &mut String| {
        if !pending.is_empty() {
            out.push_str(r#"<w:t xml:space="preserve">"#);
            out.push_str(&escape(pending.as_str()));
            out.push_str("</w:t>");
            pending.clear();
        }
    };
    for ch in run.text.chars() {
        match ch {
            '\t' => {
                flush(out, &mut pending);
                out.push_str("<w:tab/>");
            }
            '\n' => {
                flush(out, &mut pending);
                out.push_str("<w:br/>");
            }
            c => pending.push(c),
        }
    }
    flush(out, &mut pending);
    out.push_str("</w:r>");
}
