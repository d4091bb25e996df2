//! Question bank records and their Question XML form
//!
//! This is the shape the host question bank hands to the exporter and gets
//! back from the importer: a list of [`Question`] values, one per
//! `<question type="...">` element of a `<quiz>` document. Only the fields the
//! Word table convention can express are modelled; any other question type is
//! kept as raw XML so it survives a parse/write cycle untouched.

use crate::entities;
use crate::xml::{Element, Node};
use thiserror::Error;

/// Errors reading a Question XML document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuestionXmlError {
    #[error("malformed question XML: {0}")]
    Malformed(String),

    #[error("root element is <{0}>, expected <quiz>")]
    NotQuiz(String),

    #[error("question {index} has no type attribute")]
    MissingType { index: usize },

    #[error("invalid number '{value}' in <{field}>")]
    InvalidNumber { field: String, value: String },
}

/// Text format attribute of a rich text field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextFormat {
    #[default]
    Html,
    MoodleAuto,
    Plain,
    Markdown,
}

impl TextFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            TextFormat::Html => "html",
            TextFormat::MoodleAuto => "moodle_auto_format",
            TextFormat::Plain => "plain_text",
            TextFormat::Markdown => "markdown",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "moodle_auto_format" => TextFormat::MoodleAuto,
            "plain_text" => TextFormat::Plain,
            "markdown" => TextFormat::Markdown,
            _ => TextFormat::Html,
        }
    }
}

/// A file embedded in a rich text field (`<file name=".." encoding="base64">`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedFile {
    pub name: String,
    pub path: String,
    /// Base64 content, as stored in the XML
    pub data: String,
}

/// Formatted text plus the files its markup refers to
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RichText {
    pub text: String,
    pub format: TextFormat,
    pub files: Vec<EmbeddedFile>,
}

impl RichText {
    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: TextFormat::Html,
            files: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// One answer of a choice or short-answer question
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Answer {
    /// Grade percentage, -100..=100
    pub fraction: f64,
    pub text: RichText,
    pub feedback: RichText,
}

/// Feedback shown depending on how right the response was
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinedFeedback {
    pub correct: RichText,
    pub partially_correct: RichText,
    pub incorrect: RichText,
}

/// Question / answer pair of a matching question
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubQuestion {
    pub text: RichText,
    pub answer: String,
}

/// Type-specific part of a question
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionKind {
    /// Pseudo-question selecting the category for the questions after it
    Category { path: String },
    Description,
    Essay {
        response_lines: u32,
        grader_info: RichText,
    },
    MultiChoice {
        single: bool,
        shuffle: bool,
        numbering: String,
        answers: Vec<Answer>,
        feedback: CombinedFeedback,
    },
    TrueFalse {
        answers: Vec<Answer>,
    },
    ShortAnswer {
        case_sensitive: bool,
        answers: Vec<Answer>,
    },
    Matching {
        shuffle: bool,
        subquestions: Vec<SubQuestion>,
        feedback: CombinedFeedback,
    },
    /// Embedded-answers question; the answers live in the question text
    Cloze,
    /// Any other type, kept verbatim
    Unsupported { type_name: String, raw: String },
}

impl QuestionKind {
    /// Value of the `type` attribute
    pub fn type_name(&self) -> &str {
        match self {
            QuestionKind::Category { .. } => "category",
            QuestionKind::Description => "description",
            QuestionKind::Essay { .. } => "essay",
            QuestionKind::MultiChoice { .. } => "multichoice",
            QuestionKind::TrueFalse { .. } => "truefalse",
            QuestionKind::ShortAnswer { .. } => "shortanswer",
            QuestionKind::Matching { .. } => "matching",
            QuestionKind::Cloze => "cloze",
            QuestionKind::Unsupported { type_name, .. } => type_name,
        }
    }
}

/// One question bank record
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub name: String,
    pub kind: QuestionKind,
    pub questiontext: RichText,
    pub generalfeedback: RichText,
    pub defaultgrade: f64,
    pub penalty: f64,
    pub hidden: bool,
    pub tags: Vec<String>,
}

impl Question {
    /// A question of `kind` with the bank's default grade and penalty
    pub fn new(name: impl Into<String>, kind: QuestionKind) -> Self {
        let defaultgrade = default_grade(&kind);
        let penalty = match kind {
            QuestionKind::TrueFalse { .. } => 1.0,
            QuestionKind::Description | QuestionKind::Essay { .. } => 0.0,
            _ => 0.3333333,
        };
        Self {
            name: name.into(),
            kind,
            questiontext: RichText::default(),
            generalfeedback: RichText::default(),
            defaultgrade,
            penalty,
            hidden: false,
            tags: Vec::new(),
        }
    }

    pub fn category(path: impl Into<String>) -> Self {
        Self::new(
            String::new(),
            QuestionKind::Category { path: path.into() },
        )
    }

    pub fn is_category(&self) -> bool {
        matches!(self.kind, QuestionKind::Category { .. })
    }

    /// Type and name; what must survive a Word round trip
    pub fn identity(&self) -> (String, String) {
        (self.kind.type_name().to_string(), self.name.clone())
    }
}

/// Descriptions carry no marks; everything else defaults to one
pub fn default_grade(kind: &QuestionKind) -> f64 {
    match kind {
        QuestionKind::Description | QuestionKind::Category { .. } => 0.0,
        _ => 1.0,
    }
}

/// Parse a `<quiz>` document into question records
///
/// # Parameters
/// * `xml` - Question XML text; named HTML entities are accepted
///
/// # Returns
/// * `Ok(Vec<Question>)` - Questions in document order
/// * `Err(QuestionXmlError)` - The text is not XML, or not a quiz
pub fn parse_quiz(xml: &str) -> Result<Vec<Question>, QuestionXmlError> {
    let normalized = entities::to_numeric_entities(xml);
    let doc = roxmltree::Document::parse(&normalized)
        .map_err(|e| QuestionXmlError::Malformed(e.to_string()))?;
    let root = doc.root_element();
    if root.tag_name().name() != "quiz" {
        return Err(QuestionXmlError::NotQuiz(
            root.tag_name().name().to_string(),
        ));
    }

    questions_from_node(root)
}

/// Question records for the `<question>` children of an already parsed node
pub fn questions_from_node(quiz: roxmltree::Node) -> Result<Vec<Question>, QuestionXmlError> {
    let source = quiz.document().input_text();
    let mut questions = Vec::new();
    for (index, node) in quiz
        .children()
        .filter(|n| n.has_tag_name("question"))
        .enumerate()
    {
        questions.push(parse_question(node, index, source)?);
    }
    log::debug!("Parsed {} questions", questions.len());
    Ok(questions)
}

fn parse_question(
    node: roxmltree::Node,
    index: usize,
    source: &str,
) -> Result<Question, QuestionXmlError> {
    let type_name = node
        .attribute("type")
        .ok_or(QuestionXmlError::MissingType { index })?;

    let kind = match type_name {
        "category" => QuestionKind::Category {
            path: child(node, "category")
                .map(text_child)
                .unwrap_or_default(),
        },
        "description" => QuestionKind::Description,
        "essay" => QuestionKind::Essay {
            response_lines: number(node, "responsefieldlines")?.map_or(15, |v| v as u32),
            grader_info: rich_text(node, "graderinfo"),
        },
        "multichoice" => QuestionKind::MultiChoice {
            single: flag(node, "single", true),
            shuffle: flag(node, "shuffleanswers", true),
            numbering: child(node, "answernumbering")
                .and_then(|n| n.text())
                .unwrap_or("abc")
                .trim()
                .to_string(),
            answers: answers(node)?,
            feedback: combined_feedback(node),
        },
        "truefalse" => QuestionKind::TrueFalse {
            answers: answers(node)?,
        },
        "shortanswer" => QuestionKind::ShortAnswer {
            case_sensitive: flag(node, "usecase", false),
            answers: answers(node)?,
        },
        "matching" => QuestionKind::Matching {
            shuffle: flag(node, "shuffleanswers", true),
            subquestions: node
                .children()
                .filter(|n| n.has_tag_name("subquestion"))
                .map(|n| SubQuestion {
                    text: read_rich_text(n),
                    answer: child(n, "answer").map(text_child).unwrap_or_default(),
                })
                .collect(),
            feedback: combined_feedback(node),
        },
        "cloze" => QuestionKind::Cloze,
        other => QuestionKind::Unsupported {
            type_name: other.to_string(),
            raw: source[node.range()].to_string(),
        },
    };

    let defaultgrade = number(node, "defaultgrade")?.unwrap_or_else(|| default_grade(&kind));
    let mut question = Question::new(
        child(node, "name").map(text_child).unwrap_or_default(),
        kind,
    );
    question.questiontext = rich_text(node, "questiontext");
    question.generalfeedback = rich_text(node, "generalfeedback");
    question.defaultgrade = defaultgrade;
    if let Some(penalty) = number(node, "penalty")? {
        question.penalty = penalty;
    }
    question.hidden = flag(node, "hidden", false);
    question.tags = child(node, "tags")
        .map(|tags| {
            tags.children()
                .filter(|n| n.has_tag_name("tag"))
                .map(text_child)
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();
    Ok(question)
}

fn child<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

/// Text of the `<text>` child, trimmed
fn text_child(node: roxmltree::Node) -> String {
    child(node, "text")
        .map(|t| t.text().unwrap_or_default().trim().to_string())
        .unwrap_or_default()
}

fn rich_text(node: roxmltree::Node, name: &str) -> RichText {
    child(node, name).map(read_rich_text).unwrap_or_default()
}

fn read_rich_text(node: roxmltree::Node) -> RichText {
    let text = child(node, "text")
        .map(|t| {
            t.children()
                .filter_map(|c| c.text())
                .collect::<String>()
                .trim()
                .to_string()
        })
        .unwrap_or_default();
    let files = node
        .children()
        .filter(|n| n.has_tag_name("file"))
        .map(|f| EmbeddedFile {
            name: f.attribute("name").unwrap_or_default().to_string(),
            path: f.attribute("path").unwrap_or("/").to_string(),
            data: f.text().unwrap_or_default().trim().to_string(),
        })
        .collect();
    RichText {
        text,
        format: TextFormat::parse(node.attribute("format").unwrap_or("html")),
        files,
    }
}

fn number(node: roxmltree::Node, name: &str) -> Result<Option<f64>, QuestionXmlError> {
    let Some(value) = child(node, name).and_then(|n| n.text()) else {
        return Ok(None);
    };
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<f64>()
        .map(Some)
        .map_err(|_| QuestionXmlError::InvalidNumber {
            field: name.to_string(),
            value: value.to_string(),
        })
}

fn flag(node: roxmltree::Node, name: &str, default: bool) -> bool {
    match child(node, name).and_then(|n| n.text()).map(str::trim) {
        Some("1") | Some("true") => true,
        Some("0") | Some("false") => false,
        _ => default,
    }
}

fn answers(node: roxmltree::Node) -> Result<Vec<Answer>, QuestionXmlError> {
    node.children()
        .filter(|n| n.has_tag_name("answer"))
        .map(|a| {
            let raw = a.attribute("fraction").unwrap_or("0");
            let fraction = raw
                .trim()
                .parse::<f64>()
                .map_err(|_| QuestionXmlError::InvalidNumber {
                    field: "answer".to_string(),
                    value: raw.to_string(),
                })?;
            Ok(Answer {
                fraction,
                text: read_rich_text(a),
                feedback: rich_text(a, "feedback"),
            })
        })
        .collect()
}

fn combined_feedback(node: roxmltree::Node) -> CombinedFeedback {
    CombinedFeedback {
        correct: rich_text(node, "correctfeedback"),
        partially_correct: rich_text(node, "partiallycorrectfeedback"),
        incorrect: rich_text(node, "incorrectfeedback"),
    }
}

/// Serialise questions as a `<quiz>` document (no XML declaration)
pub fn write_quiz(questions: &[Question]) -> String {
    let mut quiz = Element::new("quiz");
    for question in questions {
        quiz.push(Node::Text("\n".to_string()));
        quiz.push(question_element(question));
    }
    quiz.push(Node::Text("\n".to_string()));
    quiz.to_xml()
}

/// Element form of one question
pub fn question_element(question: &Question) -> Node {
    let mut el = Element::new("question").attr("type", question.kind.type_name());

    match &question.kind {
        QuestionKind::Category { path } => {
            el.push(Element::new("category").child(text_element(path)));
            return el.into();
        }
        QuestionKind::Unsupported { raw, .. } => return Node::Raw(raw.clone()),
        _ => {}
    }

    el.push(Element::new("name").child(text_element(&question.name)));
    el.push(rich_text_element("questiontext", &question.questiontext));
    el.push(rich_text_element("generalfeedback", &question.generalfeedback));
    el.push(Element::new("defaultgrade").text(format_number(question.defaultgrade)));
    el.push(Element::new("penalty").text(format_number(question.penalty)));
    el.push(Element::new("hidden").text(if question.hidden { "1" } else { "0" }));

    match &question.kind {
        QuestionKind::Essay {
            response_lines,
            grader_info,
        } => {
            el.push(Element::new("responseformat").text("editor"));
            el.push(Element::new("responsefieldlines").text(response_lines.to_string()));
            el.push(Element::new("attachments").text("0"));
            el.push(rich_text_element("graderinfo", grader_info));
        }
        QuestionKind::MultiChoice {
            single,
            shuffle,
            numbering,
            answers,
            feedback,
        } => {
            el.push(Element::new("single").text(single.to_string()));
            el.push(Element::new("shuffleanswers").text(shuffle.to_string()));
            el.push(Element::new("answernumbering").text(numbering.as_str()));
            push_combined_feedback(&mut el, feedback);
            push_answers(&mut el, answers);
        }
        QuestionKind::TrueFalse { answers } => push_answers(&mut el, answers),
        QuestionKind::ShortAnswer {
            case_sensitive,
            answers,
        } => {
            el.push(Element::new("usecase").text(if *case_sensitive { "1" } else { "0" }));
            push_answers(&mut el, answers);
        }
        QuestionKind::Matching {
            shuffle,
            subquestions,
            feedback,
        } => {
            el.push(Element::new("shuffleanswers").text(shuffle.to_string()));
            push_combined_feedback(&mut el, feedback);
            for sub in subquestions {
                let mut node = rich_text_element("subquestion", &sub.text);
                node.push(Element::new("answer").child(text_element(&sub.answer)));
                el.push(node);
            }
        }
        _ => {}
    }

    if !question.tags.is_empty() {
        let mut tags = Element::new("tags");
        for tag in &question.tags {
            tags.push(Element::new("tag").child(text_element(tag)));
        }
        el.push(tags);
    }
    el.into()
}

fn text_element(text: &str) -> Element {
    Element::new("text").text(text)
}

fn rich_text_element(name: &str, rich: &RichText) -> Element {
    let mut text = Element::new("text");
    if !rich.text.is_empty() {
        text.push(Node::CData(rich.text.clone()));
    }
    let mut el = Element::new(name)
        .attr("format", rich.format.as_str())
        .child(text);
    for file in &rich.files {
        el.push(
            Element::new("file")
                .attr("name", file.name.as_str())
                .attr("path", file.path.as_str())
                .attr("encoding", "base64")
                .text(file.data.as_str()),
        );
    }
    el
}

fn push_answers(el: &mut Element, answers: &[Answer]) {
    for answer in answers {
        let mut node = rich_text_element("answer", &answer.text);
        node.set_attr("fraction", format_number(answer.fraction));
        node.push(rich_text_element("feedback", &answer.feedback));
        el.push(node);
    }
}

fn push_combined_feedback(el: &mut Element, feedback: &CombinedFeedback) {
    el.push(rich_text_element("correctfeedback", &feedback.correct));
    el.push(rich_text_element(
        "partiallycorrectfeedback",
        &feedback.partially_correct,
    ));
    el.push(rich_text_element("incorrectfeedback", &feedback.incorrect));
}

/// Shortest decimal form: `1`, `0.5`, `33.33333`
pub fn format_number(value: f64) -> String {
    let text = format!("{value:.7}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}
