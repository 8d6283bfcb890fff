//! Shared fixtures: in-memory DOCX packages and the rule tables used by the
//! review scenarios.

#![allow(dead_code)]

use redline_core::config::{ClassifierEntry, ReviewConfig, RuleConfig};
use redline_core::Severity;
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const AOA: &str = "Articles of Association (AoA)";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#;

/// Minimal DOCX package with one body paragraph per entry
pub fn docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|text| {
            if text.is_empty() {
                "<w:p/>".to_string()
            } else {
                format!(
                    r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
                    quick_xml::escape::escape(*text)
                )
            }
        })
        .collect();
    docx_with_body(&body)
}

/// DOCX package whose `w:body` holds `body` verbatim
pub fn docx_with_body(body: &str) -> Vec<u8> {
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006" xmlns:wps="http://schemas.microsoft.com/office/word/2010/wordprocessingShape" xmlns:v="urn:schemas-microsoft-com:vml"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    );

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    writer.start_file("[Content_Types].xml", options).unwrap();
    writer.write_all(CONTENT_TYPES.as_bytes()).unwrap();
    writer.start_file("word/styles.xml", options).unwrap();
    writer.write_all(b"<w:styles/>").unwrap();
    writer.start_file("word/document.xml", options).unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

/// Raw bytes of one package part
pub fn part(package: &[u8], name: &str) -> Vec<u8> {
    let mut archive = ZipArchive::new(Cursor::new(package)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut data = Vec::new();
    file.read_to_end(&mut data).unwrap();
    data
}

pub fn rule(pattern: &str, issue: &str, severity: Severity, regulation: &str) -> RuleConfig {
    RuleConfig {
        pattern: pattern.to_string(),
        issue: issue.to_string(),
        severity,
        regulation: regulation.to_string(),
    }
}

/// AoA rules {UAE Federal: High, AED|Dirham: Medium}; General {Dubai Courts: High}
pub fn fixture_config() -> ReviewConfig {
    let rules = HashMap::from([
        (
            AOA.to_string(),
            vec![
                rule(
                    "UAE Federal",
                    "Incorrect legal framework",
                    Severity::High,
                    "ADGM Companies Regulations 2020",
                ),
                rule(
                    "AED|Dirham",
                    "Share capital must be denominated in USD",
                    Severity::Medium,
                    "ADGM Companies Regulations 2020",
                ),
            ],
        ),
        (
            "General".to_string(),
            vec![rule(
                "Dubai Courts",
                "Incorrect jurisdiction",
                Severity::High,
                "ADGM Courts Regulations 2015",
            )],
        ),
    ]);

    ReviewConfig {
        classifier: vec![ClassifierEntry {
            label: AOA.to_string(),
            category: Some("Company Formation".to_string()),
            keywords: vec!["articles".to_string(), "association".to_string()],
        }],
        rules,
        ..ReviewConfig::default()
    }
}
