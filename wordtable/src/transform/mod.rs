//! Transform engine and the built-in stylesheets
//!
//! A conversion is a fixed list of passes. Each pass applies one stylesheet,
//! identified by [`StyleSheetRef`], to one assembled XML document plus the
//! run's [`ConversionParameters`], and yields a new XML/XHTML string. Passes
//! are pure functions of those three inputs; nothing is cached between them.
//!
//! Stylesheets are registered with a [`TransformEngine`] at start-up:
//! - [`wordml`]: WordML package parts to XHTML (import pass 1)
//! - [`cleanup`]: XHTML normalisation (import pass 2)
//! - [`questions`]: XHTML Word tables to Question XML (import pass 3)
//! - [`word_tables`]: Question XML to XHTML Word tables (export pass 1)
//! - [`word_html`]: XHTML merged into the Word HTML template (export pass 2)

pub mod cleanup;
mod layout;
pub mod questions;
pub mod word_html;
pub mod word_tables;
pub mod wordml;

use crate::error::ConversionError;
use crate::params::ConversionParameters;
use crate::question::Question;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// One transform program, by logical name
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StyleSheetRef {
    ImportPass1,
    ImportPass2,
    ImportPass3,
    ExportPass1,
    ExportPass2,
}

impl StyleSheetRef {
    pub const ALL: [StyleSheetRef; 5] = [
        StyleSheetRef::ImportPass1,
        StyleSheetRef::ImportPass2,
        StyleSheetRef::ImportPass3,
        StyleSheetRef::ExportPass1,
        StyleSheetRef::ExportPass2,
    ];

    /// Stable file name, used in diagnostics and debug artifacts
    pub fn file_name(self) -> &'static str {
        match self {
            StyleSheetRef::ImportPass1 => "wordml2xhtml_pass1.xsl",
            StyleSheetRef::ImportPass2 => "wordml2xhtml_pass2.xsl",
            StyleSheetRef::ImportPass3 => "xhtml2mqxml.xsl",
            StyleSheetRef::ExportPass1 => "mqxml2word_pass1.xsl",
            StyleSheetRef::ExportPass2 => "mqxml2word_pass2.xsl",
        }
    }
}

impl fmt::Display for StyleSheetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// A stylesheet rejected its input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct StylesheetError(pub String);

impl StylesheetError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A transform program: parsed input document plus parameters to output text
pub trait Stylesheet: Send + Sync {
    fn apply(
        &self,
        input: &roxmltree::Document,
        params: &ConversionParameters,
    ) -> Result<String, StylesheetError>;
}

/// Resolves [`StyleSheetRef`]s to stylesheets and runs them
pub struct TransformEngine {
    /// `None` when no processor is configured at all
    sheets: Option<BTreeMap<StyleSheetRef, Box<dyn Stylesheet>>>,
}

impl TransformEngine {
    /// Engine with all five built-in stylesheets
    pub fn builtin() -> Self {
        let mut engine = Self::empty();
        engine.register(StyleSheetRef::ImportPass1, Box::new(wordml::WordMlToXhtml));
        engine.register(StyleSheetRef::ImportPass2, Box::new(cleanup::XhtmlCleanup));
        engine.register(StyleSheetRef::ImportPass3, Box::new(questions::XhtmlToQuestions));
        engine.register(StyleSheetRef::ExportPass1, Box::new(word_tables::QuestionsToTables));
        engine.register(StyleSheetRef::ExportPass2, Box::new(word_html::WordHtmlDocument));
        engine
    }

    /// Engine with a processor but no stylesheets registered
    pub fn empty() -> Self {
        Self {
            sheets: Some(BTreeMap::new()),
        }
    }

    /// No processor: every run fails with [`ConversionError::TransformUnavailable`]
    pub fn disabled() -> Self {
        Self { sheets: None }
    }

    pub fn register(&mut self, sheet: StyleSheetRef, stylesheet: Box<dyn Stylesheet>) {
        match &mut self.sheets {
            Some(sheets) => {
                sheets.insert(sheet, stylesheet);
            }
            None => log::warn!("Ignoring {} on a disabled transform engine", sheet),
        }
    }

    pub fn is_available(&self) -> bool {
        self.sheets.is_some()
    }

    pub fn has(&self, sheet: StyleSheetRef) -> bool {
        self.sheets.as_ref().is_some_and(|s| s.contains_key(&sheet))
    }

    /// Apply one stylesheet to one document
    ///
    /// # Parameters
    /// * `input` - Complete XML document text
    /// * `sheet` - Stylesheet to apply
    /// * `params` - Parameters of the current run
    ///
    /// # Returns
    /// * `Ok(String)` - Transform output
    /// * `Err(ConversionError)` - No processor, unknown stylesheet, unparseable input or a stylesheet failure
    pub fn run(
        &self,
        input: &str,
        sheet: StyleSheetRef,
        params: &ConversionParameters,
    ) -> Result<String, ConversionError> {
        let sheets = self
            .sheets
            .as_ref()
            .ok_or(ConversionError::TransformUnavailable)?;
        let stylesheet = sheets
            .get(&sheet)
            .ok_or_else(|| ConversionError::StylesheetMissing {
                name: sheet.file_name().to_string(),
            })?;

        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let doc = roxmltree::Document::parse_with_options(input, options)
            .map_err(|e| ConversionError::transform(sheet.file_name(), e.to_string(), input))?;

        log::debug!("Running {} on {} bytes", sheet, input.len());
        let output = stylesheet
            .apply(&doc, params)
            .map_err(|e| ConversionError::transform(sheet.file_name(), e.0, input))?;
        log::debug!("{} produced {} bytes", sheet, output.len());
        Ok(output)
    }
}

impl Default for TransformEngine {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Whether export pass 1 has a Word table layout for the question
pub fn has_word_table(question: &Question) -> bool {
    layout::TypeCode::of(&question.kind).is_some()
}

/// Shared helpers for the built-in stylesheets
pub(crate) mod support {
    use super::StylesheetError;

    /// Direct child of the container root with local name `name`
    pub fn container_child<'a, 'input>(
        doc: &'a roxmltree::Document<'input>,
        name: &str,
    ) -> Option<roxmltree::Node<'a, 'input>> {
        let root = doc.root_element();
        if root.tag_name().name() == name {
            return Some(root);
        }
        root.children()
            .find(|n| n.is_element() && n.tag_name().name() == name)
    }

    pub fn require_child<'a, 'input>(
        doc: &'a roxmltree::Document<'input>,
        name: &str,
    ) -> Result<roxmltree::Node<'a, 'input>, StylesheetError> {
        container_child(doc, name)
            .ok_or_else(|| StylesheetError::new(format!("input has no <{name}> element")))
    }

    /// Original markup of the children of `node`, byte for byte
    pub fn inner_source<'input>(node: roxmltree::Node<'_, 'input>) -> &'input str {
        let (Some(first), Some(last)) = (node.first_child(), node.last_child()) else {
            return "";
        };
        &node.document().input_text()[first.range().start..last.range().end]
    }

    /// Labels shipped in the `<moodlelabels>` element, if any
    pub fn labels(doc: &roxmltree::Document) -> crate::labels::LabelDictionary {
        container_child(doc, "moodlelabels")
            .map(|n| crate::labels::LabelDictionary::from_element(&crate::xml::Element::from_node(n)))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl Stylesheet for Echo {
        fn apply(
            &self,
            input: &roxmltree::Document,
            _params: &ConversionParameters,
        ) -> Result<String, StylesheetError> {
            Ok(input.root_element().tag_name().name().to_string())
        }
    }

    struct Failing;

    impl Stylesheet for Failing {
        fn apply(
            &self,
            _input: &roxmltree::Document,
            _params: &ConversionParameters,
        ) -> Result<String, StylesheetError> {
            Err(StylesheetError::new("no questions element"))
        }
    }

    #[test]
    fn test_disabled_engine() {
        let engine = TransformEngine::disabled();
        let err = engine
            .run("<a/>", StyleSheetRef::ImportPass1, &ConversionParameters::default())
            .unwrap_err();
        assert!(matches!(err, ConversionError::TransformUnavailable));
        assert!(!engine.is_available());
    }

    #[test]
    fn test_missing_stylesheet() {
        let engine = TransformEngine::empty();
        let err = engine
            .run("<a/>", StyleSheetRef::ExportPass2, &ConversionParameters::default())
            .unwrap_err();
        match err {
            ConversionError::StylesheetMissing { name } => {
                assert_eq!(name, "mqxml2word_pass2.xsl")
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_run_and_failures() {
        let mut engine = TransformEngine::empty();
        engine.register(StyleSheetRef::ImportPass1, Box::new(Echo));
        engine.register(StyleSheetRef::ImportPass2, Box::new(Failing));
        let params = ConversionParameters::default();

        assert_eq!(
            engine
                .run("<container/>", StyleSheetRef::ImportPass1, &params)
                .unwrap(),
            "container"
        );

        match engine.run("<container>", StyleSheetRef::ImportPass1, &params) {
            Err(ConversionError::Transform {
                stylesheet, snippet, ..
            }) => {
                assert_eq!(stylesheet, "wordml2xhtml_pass1.xsl");
                assert_eq!(snippet, "<container>");
            }
            other => panic!("unexpected result {other:?}"),
        }

        match engine.run("<container/>", StyleSheetRef::ImportPass2, &params) {
            Err(ConversionError::Transform { message, .. }) => {
                assert_eq!(message, "no questions element")
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_builtin_registers_all() {
        let engine = TransformEngine::builtin();
        for sheet in StyleSheetRef::ALL {
            assert!(engine.has(sheet), "{sheet} not registered");
        }
    }
}
