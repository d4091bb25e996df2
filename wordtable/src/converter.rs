//! Source format detection for imports
//!
//! The importer accepts Word 2007+ packages. A package whose body already is
//! Question XML (written by [`DocumentPackage::smuggle`]) skips the
//! transforms. Word 97-2003 binaries need an external converter that this
//! crate does not provide, so they are recognised and then rejected with a
//! message the user can act on.

use crate::error::UnsupportedFormat;
use crate::package::DocumentPackage;

/// OLE2 compound document signature (Word 97-2003 `.doc`)
const OLE2_SIGNATURE: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Bytes inspected for an HTML document masquerading as Word
const SNIFF_LEN: usize = 100;

/// Which converter handles an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentConverter {
    /// Word 2007+ package run through the three import passes
    WordMl,
    /// Package whose body part is a `<quiz>` document
    QuestionXmlPackage,
    /// Word 97-2003 binary document
    LegacyBinary,
}

impl DocumentConverter {
    /// Pick a converter from the file name, falling back to the content
    ///
    /// # Parameters
    /// * `name` - Original file name as uploaded
    /// * `bytes` - File content
    ///
    /// # Returns
    /// * `Ok(DocumentConverter)` - The converter to validate and run
    /// * `Err(UnsupportedFormat)` - Neither the name nor the content is a Word document
    pub fn detect(name: &str, bytes: &[u8]) -> Result<Self, UnsupportedFormat> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".docx") {
            return Ok(DocumentConverter::WordMl);
        }
        if lower.ends_with(".doc") {
            return Ok(DocumentConverter::LegacyBinary);
        }
        if DocumentPackage::is_zip(bytes) {
            Ok(DocumentConverter::WordMl)
        } else if is_ole2(bytes) {
            Ok(DocumentConverter::LegacyBinary)
        } else {
            Self::WordMl.validate(name, bytes)?;
            Err(UnsupportedFormat::Unrecognised(name.to_string()))
        }
    }

    /// Reject files this converter cannot read
    ///
    /// # Parameters
    /// * `name` - Original file name as uploaded
    /// * `bytes` - File content
    ///
    /// # Returns
    /// * `Ok(())` - The file may be converted
    /// * `Err(UnsupportedFormat)` - The file is XML, HTML or the wrong Word flavour
    pub fn validate(self, name: &str, bytes: &[u8]) -> Result<(), UnsupportedFormat> {
        let lower = name.to_ascii_lowercase();
        let owned = || name.to_string();

        if lower.ends_with(".xml") {
            return Err(UnsupportedFormat::Xml(owned()));
        }
        if lower.contains("htm") {
            return Err(UnsupportedFormat::Html(owned()));
        }
        let head = &bytes[..bytes.len().min(SNIFF_LEN)];
        if String::from_utf8_lossy(head)
            .to_ascii_lowercase()
            .contains("html")
        {
            return Err(UnsupportedFormat::HtmlDocument(owned()));
        }

        match self {
            DocumentConverter::WordMl | DocumentConverter::QuestionXmlPackage => {
                if is_ole2(bytes) || lower.ends_with(".doc") {
                    return Err(UnsupportedFormat::LegacyWord(owned()));
                }
            }
            DocumentConverter::LegacyBinary => {
                if lower.ends_with(".docx") {
                    return Err(UnsupportedFormat::Docx(owned()));
                }
            }
        }
        Ok(())
    }

    /// Switch to [`DocumentConverter::QuestionXmlPackage`] when the body is a quiz
    pub fn refine(self, package: &DocumentPackage) -> Self {
        if self == DocumentConverter::WordMl && body_is_quiz(package) {
            log::debug!("Package body is Question XML");
            DocumentConverter::QuestionXmlPackage
        } else {
            self
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DocumentConverter::WordMl => "wordml",
            DocumentConverter::QuestionXmlPackage => "questionxml",
            DocumentConverter::LegacyBinary => "legacy",
        }
    }
}

fn is_ole2(bytes: &[u8]) -> bool {
    bytes.starts_with(OLE2_SIGNATURE)
}

/// Root element of the body part is `<quiz>`
fn body_is_quiz(package: &DocumentPackage) -> bool {
    let text = package.body().text();
    let body = crate::xml::strip_declarations(&text);
    body.strip_prefix("<quiz")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c == '>' || c == '/' || c.is_whitespace())
}
