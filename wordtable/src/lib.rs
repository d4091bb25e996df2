//! wordtable - Word table question import and export
//!
//! Converts between Word documents written in the question table layout
//! and Question XML. Imports unpack a .docx package and run three
//! transform passes over it; exports run two passes and produce a `.doc`
//! file holding Word-compatible XHTML.

#![deny(unsafe_code)]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::all))]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod assembler;
pub mod config;
pub mod converter;
pub mod entities;
pub mod error;
pub mod host;
pub mod labels;
pub mod package;
pub mod params;
pub mod pipeline;
pub mod question;
pub mod sanitize;
pub mod scratch;
pub mod templates;
pub mod transform;
pub mod walker;
pub mod xml;

pub use config::ConverterConfig;
pub use error::{ConversionError, UnsupportedFormat};
pub use params::ConversionParameters;
pub use pipeline::{
    export_questions, import_batch, import_document, import_in_place, import_xhtml,
    ConversionContext, ExportedDocument,
};
