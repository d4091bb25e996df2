//! Error taxonomy for the conversion core
//!
//! Every failure a conversion can hit maps onto one [`ConversionError`]
//! variant. The variant decides the single user-facing notification
//! ([`ConversionError::user_message`]); the `Display` text and
//! [`ConversionError::debug_detail`] carry diagnostics (stylesheet names,
//! input snippets, archive entry names) and are only shown in verbose or
//! debug mode.

use crate::question::QuestionXmlError;
use thiserror::Error;

/// Source documents rejected before any conversion work starts
///
/// Each variant carries the file name as the user supplied it, because the
/// remedy differs per variant (re-save as .docx, stop uploading HTML, ...).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedFormat {
    /// A Question XML (or other XML) file was handed to the Word importer
    #[error("Files in XML format not supported: {0}")]
    Xml(String),

    /// The file name says HTML
    #[error("Files in HTML format not supported: {0}")]
    Html(String),

    /// The name says Word but the content is HTML (a "Save as Web Page" file)
    #[error("Incorrect Word format: please use File > Save As... to save {0} in native Word (.docx) format and import again")]
    HtmlDocument(String),

    /// A Word 2007+ package handed to the legacy binary importer
    #[error("Files in Word 2007 format not supported: {0}")]
    Docx(String),

    /// A Word 97-2003 binary file handed to the WordML importer
    #[error("Files in Word 2003 format not supported: {0}")]
    LegacyWord(String),

    /// Legacy binary documents can only be converted by the external service
    #[error("Word 2003 files need an external conversion service, which is not part of this converter: {0}")]
    LegacyConverterUnavailable(String),

    /// Neither a zip package nor a recognised Word file
    #[error("Unrecognised document format: {0}")]
    Unrecognised(String),
}

/// Errors reading or writing a zip document package
#[derive(Error, Debug)]
pub enum PackageFormatError {
    /// The bytes are not a zip container at all
    #[error("not a zip archive: {0}")]
    NotZip(#[source] zip::result::ZipError),

    /// An entry could not be decompressed or read
    #[error("corrupt archive entry '{name}': {reason}")]
    CorruptEntry { name: String, reason: String },

    /// No part fills the document body role
    #[error("package has no document body part")]
    MissingBody,

    /// A part was requested by path but is not in the package
    #[error("part not found: {0}")]
    MissingPart(String),

    /// Rebuilding the archive failed
    #[error("cannot write package: {0}")]
    Write(#[source] zip::result::ZipError),
}

/// A fragment could not be placed inside the composite document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("fragment '{role}' is not well-formed XML: {reason}")]
pub struct AssemblyError {
    /// Element name of the fragment role
    pub role: &'static str,
    /// Parser message for the rejected fragment
    pub reason: String,
}

/// Which way a conversion was running when it found nothing to convert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Import,
    Export,
}

/// Any failure of an import or export run
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error(transparent)]
    UnsupportedFormat(#[from] UnsupportedFormat),

    #[error("package format error: {0}")]
    PackageFormat(#[from] PackageFormatError),

    #[error("assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("no transform processor is configured")]
    TransformUnavailable,

    #[error("stylesheet {name} is not available")]
    StylesheetMissing { name: String },

    #[error("transformation with {stylesheet} failed: {message} (input: {snippet})")]
    Transform {
        stylesheet: String,
        message: String,
        snippet: String,
    },

    #[error("nothing to convert ({direction:?})")]
    NoContent { direction: Direction },

    #[error("question XML error: {0}")]
    QuestionXml(#[from] QuestionXmlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Longest input excerpt carried by [`ConversionError::Transform`]
pub const SNIPPET_LEN: usize = 200;

impl ConversionError {
    /// Build a transform failure, truncating the offending input
    pub fn transform(stylesheet: &str, message: impl Into<String>, input: &str) -> Self {
        ConversionError::Transform {
            stylesheet: stylesheet.to_string(),
            message: message.into(),
            snippet: snippet(input),
        }
    }

    /// The one-line notification shown to the person running the conversion
    ///
    /// Never contains stylesheet paths, byte offsets or input excerpts.
    pub fn user_message(&self) -> String {
        match self {
            ConversionError::UnsupportedFormat(e) => e.to_string(),
            ConversionError::PackageFormat(_) => {
                "Cannot read the Word file: it is damaged or not a Word document".to_string()
            }
            ConversionError::Assembly(_) => "Question import failed".to_string(),
            ConversionError::TransformUnavailable => {
                "A document transform processor is needed to convert this Word file".to_string()
            }
            ConversionError::StylesheetMissing { name } => {
                format!("Transform stylesheet {name} is not available")
            }
            ConversionError::Transform { stylesheet, .. } => {
                format!("Transformation failed ({stylesheet})")
            }
            ConversionError::NoContent {
                direction: Direction::Export,
            } => "No questions to export".to_string(),
            ConversionError::NoContent {
                direction: Direction::Import,
            } => "Question import failed: no questions found in the document".to_string(),
            ConversionError::QuestionXml(_) => "The question data could not be read".to_string(),
            ConversionError::Io(_) => "Cannot write to temporary file".to_string(),
        }
    }

    /// Full diagnostic text including the chain of underlying causes
    pub fn debug_detail(&self) -> String {
        let mut detail = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            detail.push_str(": ");
            detail.push_str(&cause.to_string());
            source = cause.source();
        }
        detail
    }

    /// Whether the failure is an operator/environment problem rather than a user one
    pub fn is_environment_error(&self) -> bool {
        matches!(
            self,
            ConversionError::TransformUnavailable | ConversionError::StylesheetMissing { .. }
        )
    }
}

/// First [`SNIPPET_LEN`] characters of `input`, newlines flattened
pub fn snippet(input: &str) -> String {
    let mut out: String = input
        .chars()
        .take(SNIPPET_LEN)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if input.chars().count() > SNIPPET_LEN {
        out.push_str("...");
    }
    out
}
