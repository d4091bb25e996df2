//! Conversion pipeline
//!
//! Import and export runs are a sequence of stages:
//! 1. Validating: decide whether the input can be converted at all
//! 2. Unpacking: read the package (import) or clean the question HTML (export)
//! 3. Transforming: one stylesheet pass per entry of the [`PassPlan`]
//! 4. Finalizing: check for content and shape the result
//!
//! Every pass sees one assembled `<container>` document built from the
//! fragments its plan entry names. The output of a pass becomes the `Html`
//! fragment of the next one.

use crate::assembler::{FragmentRole, Fragments};
use crate::config::ConverterConfig;
use crate::converter::DocumentConverter;
use crate::entities;
use crate::error::{ConversionError, Direction, UnsupportedFormat};
use crate::host::{BuiltinCatalog, InstalledPlugins, QuestionTypeRegistry, StringSource};
use crate::labels::{LabelDictionary, LabelDictionaryBuilder, Release};
use crate::package::{DocumentPackage, NamedPackage};
use crate::params::{self, ConversionParameters};
use crate::question::{self, Question};
use crate::sanitize;
use crate::scratch::{ScratchArtifact, ScratchPolicy, EXPORT_PREFIX, IMPORT_PREFIX};
use crate::templates;
use crate::transform::{self, StyleSheetRef, TransformEngine};
use crate::xml::{self, escape_attr};
use base64::Engine as _;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// MIME type of exported documents
pub const EXPORT_MIME: &str = "application/msword";

/// Extension of exported documents, so Word opens them
pub const EXPORT_EXTENSION: &str = "doc";

/// Where a run currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Validating,
    Unpacking,
    Transforming(StyleSheetRef),
    Finalizing,
    Completed,
    Failed(String),
}

/// One pass: the stylesheet and the fragments assembled for it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassStep {
    pub sheet: StyleSheetRef,
    pub inputs: &'static [FragmentRole],
}

/// Ordered passes of one direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassPlan {
    pub direction: Direction,
    pub steps: &'static [PassStep],
}

/// Word package to Question XML
pub const IMPORT_PLAN: PassPlan = PassPlan {
    direction: Direction::Import,
    steps: &[
        PassStep {
            sheet: StyleSheetRef::ImportPass1,
            inputs: &[
                FragmentRole::Document,
                FragmentRole::Styles,
                FragmentRole::Relationships,
                FragmentRole::Images,
                FragmentRole::Labels,
            ],
        },
        PassStep {
            sheet: StyleSheetRef::ImportPass2,
            inputs: &[FragmentRole::Html, FragmentRole::Labels],
        },
        PassStep {
            sheet: StyleSheetRef::ImportPass3,
            inputs: &[FragmentRole::Html, FragmentRole::Images, FragmentRole::Labels],
        },
    ],
};

/// Question XML to Word HTML
pub const EXPORT_PLAN: PassPlan = PassPlan {
    direction: Direction::Export,
    steps: &[
        PassStep {
            sheet: StyleSheetRef::ExportPass1,
            inputs: &[FragmentRole::Quiz, FragmentRole::Labels],
        },
        PassStep {
            sheet: StyleSheetRef::ExportPass2,
            inputs: &[FragmentRole::Html, FragmentRole::Template, FragmentRole::Labels],
        },
    ],
};

/// Everything a run needs besides its input
pub struct ConversionContext {
    pub params: ConversionParameters,
    pub engine: TransformEngine,
    pub labels: LabelDictionary,
    pub scratch: ScratchPolicy,
    /// Word HTML template text; the built-in template when `None`
    pub template: Option<String>,
}

impl ConversionContext {
    /// Context with the built-in stylesheets, English strings and no plugins
    pub fn new(params: ConversionParameters) -> Self {
        let labels = build_labels(&params, &BuiltinCatalog::english(), &InstalledPlugins::none());
        Self {
            params,
            engine: TransformEngine::builtin(),
            labels,
            scratch: ScratchPolicy::disabled(),
            template: None,
        }
    }

    /// Context for a loaded configuration file
    ///
    /// # Parameters
    /// * `config` - Converter configuration
    ///
    /// # Returns
    /// * `Ok(ConversionContext)` - Ready to run
    /// * `Err(ConversionError)` - The configured template could not be read
    pub fn from_config(config: &ConverterConfig) -> Result<Self, ConversionError> {
        let params = config.parameters();
        let installed = InstalledPlugins::new(config.installed_qtypes.iter().cloned());
        let labels = build_labels(&params, &BuiltinCatalog::english(), &installed);

        let template = match &config.template_path {
            Some(path) => Some(templates::load_template(path)?),
            None => None,
        };
        let scratch = match &config.scratch_dir {
            Some(dir) => ScratchPolicy::new(dir, config.debug),
            None if config.debug => ScratchPolicy::system(true),
            None => ScratchPolicy::disabled(),
        };

        Ok(Self {
            params,
            engine: TransformEngine::builtin(),
            labels,
            scratch,
            template,
        })
    }

    /// Rebuild the labels from another string source and plugin set
    pub fn with_strings(
        mut self,
        strings: &dyn StringSource,
        installed: &dyn QuestionTypeRegistry,
    ) -> Self {
        self.labels = build_labels(&self.params, strings, installed);
        self
    }

    pub fn with_engine(mut self, engine: TransformEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_scratch(mut self, scratch: ScratchPolicy) -> Self {
        self.scratch = scratch;
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    fn template(&self) -> &str {
        self.template
            .as_deref()
            .unwrap_or(templates::default_template())
    }
}

impl Default for ConversionContext {
    fn default() -> Self {
        Self::new(ConverterConfig::default().parameters())
    }
}

/// Label dictionary for the locale and release named in `params`
fn build_labels(
    params: &ConversionParameters,
    strings: &dyn StringSource,
    installed: &dyn QuestionTypeRegistry,
) -> LabelDictionary {
    let locale = params.get_or(params::LANGUAGE, crate::host::DEFAULT_LOCALE);
    let release = params.get(params::RELEASE).and_then(Release::parse);
    LabelDictionaryBuilder::new(strings).build(locale, release, installed)
}

/// An exported Word document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedDocument {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// Convert an uploaded Word file to Question XML
///
/// # Parameters
/// * `name` - Original file name, used for format checks
/// * `bytes` - File content
/// * `ctx` - Parameters, stylesheets and labels of this run
///
/// # Returns
/// * `Ok(String)` - A `<quiz>` document with at least one question
/// * `Err(ConversionError)` - The file was rejected or a stage failed; no partial output
pub fn import_document(
    name: &str,
    bytes: &[u8],
    ctx: &ConversionContext,
) -> Result<String, ConversionError> {
    PipelineRun::new(ctx).import(name, bytes)
}

/// Import an uploaded Word file and store the result in its place
///
/// The Question XML is packaged as the body of a Word container under the
/// original file name. Importing that package again skips the transforms.
///
/// # Returns
/// * `Ok(NamedPackage)` - The replacement package, named like the upload
/// * `Err(ConversionError)` - As for [`import_document`]
pub fn import_in_place(
    name: &str,
    bytes: &[u8],
    ctx: &ConversionContext,
) -> Result<NamedPackage, ConversionError> {
    let quiz = import_document(name, bytes, ctx)?;
    Ok(DocumentPackage::smuggle(name, &quiz)?)
}

/// Convert Question XML to a Word document
///
/// # Parameters
/// * `name` - Base name for the exported file
/// * `question_xml` - A `<quiz>` document or a sequence of `<question>` elements
/// * `ctx` - Parameters, stylesheets, labels and template of this run
///
/// # Returns
/// * `Ok(ExportedDocument)` - `<name>.doc` containing Word-compatible XHTML
/// * `Err(ConversionError)` - No exportable questions or a stage failed
pub fn export_questions(
    name: &str,
    question_xml: &str,
    ctx: &ConversionContext,
) -> Result<ExportedDocument, ConversionError> {
    PipelineRun::new(ctx).export(name, question_xml)
}

/// Convert XHTML in the Word table layout to Question XML
///
/// Runs the cleanup and question recognition passes only; used for HTML
/// written by [`export_questions`].
pub fn import_xhtml(xhtml: &str, ctx: &ConversionContext) -> Result<String, ConversionError> {
    let mut run = PipelineRun::new(ctx);
    run.import_html(xhtml)
}

/// State and scratch files of one conversion
pub struct PipelineRun<'a> {
    ctx: &'a ConversionContext,
    history: Vec<RunState>,
    artifacts: Vec<ScratchArtifact>,
}

impl<'a> PipelineRun<'a> {
    pub fn new(ctx: &'a ConversionContext) -> Self {
        Self {
            ctx,
            history: vec![RunState::Validating],
            artifacts: Vec::new(),
        }
    }

    pub fn state(&self) -> &RunState {
        self.history.last().unwrap_or(&RunState::Validating)
    }

    /// Every state this run has been in, in order
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    /// Scratch files written so far
    pub fn artifacts(&self) -> &[ScratchArtifact] {
        &self.artifacts
    }

    fn advance(&mut self, next: RunState) {
        log::debug!("{:?} -> {:?}", self.state(), next);
        self.history.push(next);
    }

    /// Record a failure and hand the error back
    fn fail(&mut self, err: ConversionError) -> ConversionError {
        log::debug!("Run failed: {}", err.debug_detail());
        self.history.push(RunState::Failed(err.user_message()));
        err
    }

    /// Run a stage, moving to [`RunState::Failed`] if it errors
    fn guard<T>(
        &mut self,
        result: Result<T, ConversionError>,
    ) -> Result<T, ConversionError> {
        result.map_err(|e| self.fail(e))
    }

    /// Import a Word file
    pub fn import(&mut self, name: &str, bytes: &[u8]) -> Result<String, ConversionError> {
        log::info!("Importing {} ({} bytes)", name, bytes.len());
        let converter = self.guard(validate_import(name, bytes))?;

        self.advance(RunState::Unpacking);
        let package = match converter {
            DocumentConverter::LegacyBinary => {
                return Err(self.fail(
                    UnsupportedFormat::LegacyConverterUnavailable(name.to_string()).into(),
                ));
            }
            _ => self.guard(DocumentPackage::open(bytes).map_err(Into::into))?,
        };

        if converter.refine(&package) == DocumentConverter::QuestionXmlPackage {
            self.advance(RunState::Finalizing);
            let quiz = package.body().text();
            let questions = self.guard(question::parse_quiz(&quiz).map_err(Into::into))?;
            return self.finish_import(&questions);
        }

        let mut sources = BTreeMap::new();
        sources.insert(FragmentRole::Document, package.body().text());
        if let Some(styles) = package.styles() {
            sources.insert(FragmentRole::Styles, styles.text());
        }
        if let Some(rels) = package.relationships() {
            sources.insert(FragmentRole::Relationships, rels.text());
        }
        sources.insert(FragmentRole::Images, images_fragment(&package));
        sources.insert(FragmentRole::Labels, self.ctx.labels.to_xml());

        let output = self.run_plan(&IMPORT_PLAN, sources)?;
        self.finalize_import(&output)
    }

    /// Import XHTML already in the Word table layout
    fn import_html(&mut self, xhtml: &str) -> Result<String, ConversionError> {
        self.advance(RunState::Unpacking);
        let mut sources = BTreeMap::new();
        sources.insert(FragmentRole::Html, xhtml.to_string());
        sources.insert(FragmentRole::Labels, self.ctx.labels.to_xml());
        let plan = PassPlan {
            direction: Direction::Import,
            steps: &IMPORT_PLAN.steps[1..],
        };
        let output = self.run_plan(&plan, sources)?;
        self.finalize_import(&output)
    }

    fn finalize_import(&mut self, output: &str) -> Result<String, ConversionError> {
        self.advance(RunState::Finalizing);
        let questions = self.guard(question::parse_quiz(output).map_err(Into::into))?;
        self.finish_import(&questions)
    }

    fn finish_import(&mut self, questions: &[Question]) -> Result<String, ConversionError> {
        let count = questions.iter().filter(|q| !q.is_category()).count();
        if count == 0 {
            return Err(self.fail(ConversionError::NoContent {
                direction: Direction::Import,
            }));
        }
        log::info!("Imported {} questions", count);
        self.advance(RunState::Completed);
        Ok(question::write_quiz(questions))
    }

    /// Export questions to a Word document
    pub fn export(
        &mut self,
        name: &str,
        question_xml: &str,
    ) -> Result<ExportedDocument, ConversionError> {
        log::info!("Exporting {} ({} bytes)", name, question_xml.len());
        let body = xml::strip_declarations(question_xml);
        if body.trim().is_empty() {
            return Err(self.fail(ConversionError::NoContent {
                direction: Direction::Export,
            }));
        }

        self.advance(RunState::Unpacking);
        let cleaned = sanitize::clean_all_questions(body);
        let quiz = format!("<quiz>{}</quiz>", xml::strip_declarations(&cleaned));
        let questions = self.guard(question::parse_quiz(&quiz).map_err(Into::into))?;
        let count = questions.iter().filter(|q| transform::has_word_table(q)).count();
        if count == 0 {
            return Err(self.fail(ConversionError::NoContent {
                direction: Direction::Export,
            }));
        }

        let mut sources = BTreeMap::new();
        sources.insert(FragmentRole::Quiz, sanitize::protect_double_hyphens(&cleaned));
        sources.insert(FragmentRole::Template, self.ctx.template().to_string());
        sources.insert(FragmentRole::Labels, self.ctx.labels.to_xml());
        let output = self.run_plan(&EXPORT_PLAN, sources)?;

        self.advance(RunState::Finalizing);
        let restored = sanitize::restore_double_hyphens(&output);
        let document = xml::strip_declarations(&restored).to_string();
        log::info!("Exported {} questions", count);
        self.advance(RunState::Completed);

        Ok(ExportedDocument {
            file_name: export_file_name(name),
            mime: EXPORT_MIME,
            bytes: document.into_bytes(),
        })
    }

    /// Run the passes of `plan`, feeding each output into the next
    ///
    /// # Parameters
    /// * `plan` - Passes to run
    /// * `sources` - Initial fragments; `Html` is replaced after each pass
    ///
    /// # Returns
    /// * `Ok(String)` - Output of the last pass
    /// * `Err(ConversionError)` - Assembly, scratch or transform failure
    fn run_plan(
        &mut self,
        plan: &PassPlan,
        mut sources: BTreeMap<FragmentRole, String>,
    ) -> Result<String, ConversionError> {
        let prefix = match plan.direction {
            Direction::Import => IMPORT_PREFIX,
            Direction::Export => EXPORT_PREFIX,
        };
        let mut output = String::new();

        for step in plan.steps {
            self.advance(RunState::Transforming(step.sheet));

            let fragments = step
                .inputs
                .iter()
                .filter_map(|role| sources.get(role).map(|text| (*role, text)))
                .fold(Fragments::new(), |f, (role, text)| f.with(role, text.as_str()));
            let assembled = self.guard(fragments.wrap().map_err(Into::into))?;
            let assembled = entities::to_numeric_entities(&assembled);

            let stem = step.sheet.file_name().trim_end_matches(".xsl");
            if let Some(artifact) = self.guard(
                self.ctx
                    .scratch
                    .persist(prefix, stem, &assembled)
                    .map_err(Into::into),
            )? {
                self.artifacts.push(artifact);
            }

            output = self.guard(self.ctx.engine.run(&assembled, step.sheet, &self.ctx.params))?;
            sources.insert(FragmentRole::Html, output.clone());
        }
        Ok(output)
    }
}

/// Pick and validate the converter for an uploaded file
fn validate_import(name: &str, bytes: &[u8]) -> Result<DocumentConverter, ConversionError> {
    let converter = DocumentConverter::detect(name, bytes)?;
    converter.validate(name, bytes)?;
    log::debug!("Using {} converter for {}", converter.name(), name);
    Ok(converter)
}

/// `<images>` content: one base64 `<file>` per media part
fn images_fragment(package: &DocumentPackage) -> String {
    let mut out = String::new();
    for part in package.media() {
        let Some(media_type) = part.media_type else {
            continue;
        };
        out.push_str(&format!(
            r#"<file path="{}" name="{}" mime="{}" type="{}""#,
            escape_attr(&part.path),
            escape_attr(part.file_name()),
            media_type.mime(),
            media_type.name()
        ));
        if let Some((width, height)) = part.dimensions {
            out.push_str(&format!(r#" width="{width}" height="{height}""#));
        }
        out.push('>');
        out.push_str(&base64::engine::general_purpose::STANDARD.encode(&part.data));
        out.push_str("</file>");
    }
    out
}

/// `quiz.xml` → `quiz.doc`
fn export_file_name(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("questions");
    format!("{stem}.{EXPORT_EXTENSION}")
}

/// Result of importing one file of a batch
#[derive(Debug)]
pub struct BatchOutcome {
    pub source: PathBuf,
    pub result: Result<String, ConversionError>,
}

/// Import every file in `paths`
///
/// # Parameters
/// * `paths` - Word files to import
/// * `ctx` - Shared by every conversion
///
/// # Returns
/// One outcome per path, in the order given
pub fn import_batch(paths: &[PathBuf], ctx: &ConversionContext) -> Vec<BatchOutcome> {
    #[cfg(feature = "parallel")]
    let outcomes: Vec<BatchOutcome> = paths.par_iter().map(|p| import_file(p, ctx)).collect();

    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<BatchOutcome> = paths.iter().map(|p| import_file(p, ctx)).collect();

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if failed > 0 {
        log::warn!("{} of {} imports failed", failed, outcomes.len());
    }
    outcomes
}

fn import_file(path: &Path, ctx: &ConversionContext) -> BatchOutcome {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let result = std::fs::read(path)
        .map_err(ConversionError::from)
        .and_then(|bytes| import_document(&name, &bytes, ctx));
    BatchOutcome {
        source: path.to_path_buf(),
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{BODY_PART, CONTENT_TYPES_PART};

    const DESCRIPTION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<quiz>
<question type="category"><category><text>$course$/Top</text></category></question>
<question type="description">
<name><text>Intro</text></name>
<questiontext format="html"><text><![CDATA[<p>Read -- carefully</p>]]></text></questiontext>
<generalfeedback format="html"><text></text></generalfeedback>
<defaultgrade>0</defaultgrade>
<penalty>0</penalty>
<hidden>0</hidden>
</question>
</quiz>"#;

    #[test]
    fn test_plans_are_ordered() {
        let sheets: Vec<_> = IMPORT_PLAN.steps.iter().map(|s| s.sheet).collect();
        assert_eq!(
            sheets,
            [
                StyleSheetRef::ImportPass1,
                StyleSheetRef::ImportPass2,
                StyleSheetRef::ImportPass3
            ]
        );
        let sheets: Vec<_> = EXPORT_PLAN.steps.iter().map(|s| s.sheet).collect();
        assert_eq!(sheets, [StyleSheetRef::ExportPass1, StyleSheetRef::ExportPass2]);
    }

    #[test]
    fn test_export_states_and_output() {
        let ctx = ConversionContext::default();
        let mut run = PipelineRun::new(&ctx);
        let doc = run.export("quiz.xml", DESCRIPTION).unwrap();

        assert_eq!(doc.file_name, "quiz.doc");
        assert_eq!(doc.mime, "application/msword");
        let html = String::from_utf8(doc.bytes).unwrap();
        assert!(html.starts_with("<html"));
        assert!(html.contains("Read -- carefully"));
        assert!(html.contains("<h1 class=\"MsoHeading1\">Top</h1>"));

        assert_eq!(
            run.history(),
            [
                RunState::Validating,
                RunState::Unpacking,
                RunState::Transforming(StyleSheetRef::ExportPass1),
                RunState::Transforming(StyleSheetRef::ExportPass2),
                RunState::Finalizing,
                RunState::Completed,
            ]
        );
    }

    #[test]
    fn test_export_category_only_is_no_content() {
        let ctx = ConversionContext::default();
        let xml = r#"<quiz><question type="category"><category><text>$course$/A</text></category></question></quiz>"#;
        let mut run = PipelineRun::new(&ctx);
        let err = run.export("quiz.xml", xml).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::NoContent {
                direction: Direction::Export
            }
        ));
        assert!(matches!(run.state(), RunState::Failed(_)));

        assert!(export_questions("quiz.xml", "  ", &ctx).is_err());
    }

    #[test]
    fn test_export_without_table_layout_is_no_content() {
        let ctx = ConversionContext::default();
        let xml = r#"<quiz>
<question type="category"><category><text>$course$/A</text></category></question>
<question type="numerical">
  <name><text>Pi</text></name>
  <questiontext format="html"><text>Pi to two places?</text></questiontext>
  <answer fraction="100"><text>3.14</text><tolerance>0</tolerance></answer>
</question>
</quiz>"#;
        let err = export_questions("quiz.xml", xml, &ctx).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::NoContent {
                direction: Direction::Export
            }
        ));
    }

    #[test]
    fn test_import_in_place_keeps_name_and_questions() {
        let ctx = ConversionContext::default();
        let upload = DocumentPackage::smuggle("week1.docx", DESCRIPTION).unwrap();
        let stored = import_in_place("week1.docx", &upload.bytes, &ctx).unwrap();
        assert_eq!(stored.file_name, "week1.docx");

        let again = question::parse_quiz(&import_document("week1.docx", &stored.bytes, &ctx).unwrap())
            .unwrap();
        let first = question::parse_quiz(&import_document("week1.docx", &upload.bytes, &ctx).unwrap())
            .unwrap();
        assert_eq!(again, first);
    }

    #[test]
    fn test_disabled_engine() {
        let ctx = ConversionContext::default().with_engine(TransformEngine::disabled());
        let err = export_questions("quiz.xml", DESCRIPTION, &ctx).unwrap_err();
        assert!(matches!(err, ConversionError::TransformUnavailable));
        assert!(err.is_environment_error());
    }

    #[test]
    fn test_import_question_xml_package() {
        let bytes = DocumentPackage::write(&[
            (CONTENT_TYPES_PART, b"<Types/>".as_slice()),
            (BODY_PART, DESCRIPTION.as_bytes()),
        ])
        .unwrap();
        let ctx = ConversionContext::default();
        let mut run = PipelineRun::new(&ctx);
        let quiz = run.import("quiz.docx", &bytes).unwrap();
        assert!(quiz.contains(r#"<question type="description">"#));
        assert!(!run
            .history()
            .iter()
            .any(|s| matches!(s, RunState::Transforming(_))));
        assert_eq!(run.state(), &RunState::Completed);
    }

    #[test]
    fn test_import_legacy_binary_rejected() {
        let mut bytes = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
        bytes.resize(512, 0);
        let err = import_document("old.doc", &bytes, &ConversionContext::default()).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::UnsupportedFormat(UnsupportedFormat::LegacyConverterUnavailable(_))
        ));
    }

    #[test]
    fn test_import_not_a_zip() {
        let err = import_document("quiz.docx", b"not a zip", &ConversionContext::default())
            .unwrap_err();
        assert!(matches!(err, ConversionError::PackageFormat(_)));
    }

    #[test]
    fn test_scratch_files_written_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ConversionContext::default().with_scratch(ScratchPolicy::new(dir.path(), false));
        {
            let mut run = PipelineRun::new(&ctx);
            run.export("quiz.xml", DESCRIPTION).unwrap();
            assert_eq!(run.artifacts().len(), 2);
            assert!(run.artifacts().iter().all(|a| a.path().exists()));
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name("dir/My quiz.xml"), "My quiz.doc");
        assert_eq!(export_file_name(""), "questions.doc");
    }
}
