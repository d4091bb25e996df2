//! Word package fixtures built in memory

#![allow(dead_code)]

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

pub const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

/// A 1x1 transparent PNG
pub const PNG_1X1: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

/// Zip the given parts in order
pub fn zip_parts(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, data) in parts {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A .docx with `body` as the content of `w:body`
pub fn docx(body: &str) -> Vec<u8> {
    docx_with(body, &[])
}

/// A .docx with extra parts (relationships, media)
pub fn docx_with(body: &str, extra: &[(&str, &[u8])]) -> Vec<u8> {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W_NS}" xmlns:r="{R_NS}"><w:body>{body}</w:body></w:document>"#
    );
    let mut parts: Vec<(&str, &[u8])> = vec![
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("word/document.xml", document.as_bytes()),
    ];
    parts.extend_from_slice(extra);
    zip_parts(&parts)
}

pub fn paragraph(style: Option<&str>, text: &str) -> String {
    let ppr = style
        .map(|s| format!(r#"<w:pPr><w:pStyle w:val="{s}"/></w:pPr>"#))
        .unwrap_or_default();
    if text.is_empty() {
        format!("<w:p>{ppr}</w:p>")
    } else {
        format!(r#"<w:p>{ppr}<w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
    }
}

pub fn heading(level: u8, text: &str) -> String {
    paragraph(Some(&format!("Heading{level}")), text)
}

fn cell(content: &str) -> String {
    format!("<w:tc>{content}</w:tc>")
}

/// First row: question text across three columns and the type code
pub fn question_row(text: &str, code: &str) -> String {
    format!(
        r#"<w:tr><w:trPr><w:tblHeader/></w:trPr><w:tc><w:tcPr><w:gridSpan w:val="3"/></w:tcPr>{}</w:tc>{}</w:tr>"#,
        paragraph(Some("Cell"), text),
        cell(&paragraph(Some("QFType"), code)),
    )
}

/// Column headings row
pub fn heading_row() -> String {
    format!(
        r#"<w:tr><w:trPr><w:tblHeader/></w:trPr>{}{}{}{}</w:tr>"#,
        cell(&paragraph(Some("Cell"), "")),
        cell(&paragraph(Some("TableHead"), "Answers")),
        cell(&paragraph(Some("TableHead"), "Feedback")),
        cell(&paragraph(Some("TableHead"), "Grade")),
    )
}

pub fn answer_row(marker: &str, text: &str, feedback: &str, grade: &str) -> String {
    format!(
        "<w:tr>{}{}{}{}</w:tr>",
        cell(&paragraph(Some("Cell"), marker)),
        cell(&paragraph(Some("Cell"), text)),
        cell(&paragraph(Some("Cell"), feedback)),
        cell(&paragraph(Some("Cell"), grade)),
    )
}

pub fn option_row(label: &str, value: &str) -> String {
    format!(
        "<w:tr>{}{}{}{}</w:tr>",
        cell(&paragraph(Some("Cell"), "")),
        cell(&paragraph(Some("TableRowHead"), label)),
        cell(&paragraph(Some("Cell"), value)),
        cell(&paragraph(Some("Cell"), "")),
    )
}

pub fn table(rows: &[String]) -> String {
    format!("<w:tbl>{}</w:tbl>", rows.concat())
}
