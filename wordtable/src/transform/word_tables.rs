//! Export pass 1: Question XML to XHTML Word tables
//!
//! Categories become level 1 headings; every other question becomes a
//! level 2 heading followed by one table in the layout described in
//! [`super::layout`]. Questions whose type has no table form are skipped.

use super::layout::{
    self, OptionRow, TypeCode, CLASS_CELL, CLASS_HEAD, CLASS_ROW_HEAD, CLASS_TYPE, COLUMN_WIDTHS,
    NBSP, TEXT_WIDTH,
};
use super::support::{self, require_child};
use super::{Stylesheet, StylesheetError};
use crate::entities;
use crate::labels::LabelDictionary;
use crate::package::MediaType;
use crate::params::ConversionParameters;
use crate::question::{self, format_number, CombinedFeedback, EmbeddedFile, Question, QuestionKind, RichText};
use crate::sanitize::PLUGINFILE_PREFIX;
use crate::xml::{self, Element, Node};

const BLOCKS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "blockquote", "pre",
];

/// The export pass 1 stylesheet
pub struct QuestionsToTables;

impl Stylesheet for QuestionsToTables {
    fn apply(
        &self,
        input: &roxmltree::Document,
        params: &ConversionParameters,
    ) -> Result<String, StylesheetError> {
        let mut quiz = require_child(input, "quiz")?;
        if let Some(inner) = quiz.children().find(|n| n.has_tag_name("quiz")) {
            quiz = inner;
        }
        let questions = question::questions_from_node(quiz)
            .map_err(|e| StylesheetError::new(e.to_string()))?;
        let labels = support::labels(input);

        let writer = TableWriter {
            labels: &labels,
            direction: params.text_direction().as_str(),
        };
        let mut body = String::new();
        for question in &questions {
            writer.write(question, &mut body);
        }
        Ok(format!("<html><head/><body>{body}</body></html>"))
    }
}

struct TableWriter<'a> {
    labels: &'a LabelDictionary,
    direction: &'a str,
}

impl TableWriter<'_> {
    fn write(&self, question: &Question, out: &mut String) {
        match &question.kind {
            QuestionKind::Category { path } => {
                let name = path.strip_prefix("$course$/").unwrap_or(path);
                Element::new("h1")
                    .attr("class", "MsoHeading1")
                    .text(name)
                    .write_to(out);
                out.push('\n');
            }
            kind => match TypeCode::of(kind) {
                Some(code) => self.table(question, code, out),
                None => log::warn!(
                    "Question '{}' of type {} cannot be written as a Word table, skipping it",
                    question.name,
                    kind.type_name()
                ),
            },
        }
    }

    fn table(&self, question: &Question, code: TypeCode, out: &mut String) {
        Element::new("h2")
            .attr("class", "MsoHeading2")
            .text(question.name.as_str())
            .write_to(out);
        out.push_str(r#"<p class="MsoBodyText"/><div class="TableDiv">"#);
        out.push_str(&format!(r#"<table border="1" dir="{}">"#, self.direction));

        out.push_str("<thead>\n");
        let text = cell_content(rich_nodes(&question.questiontext));
        push_row(
            out,
            Element::new("tr")
                .child(wide_cell(text))
                .child(cell(COLUMN_WIDTHS[3], vec![para(CLASS_TYPE, code.as_str()).into()])),
        );
        let mut heads = Element::new("tr").child(nbsp_cell(COLUMN_WIDTHS[0]));
        for (head, width) in code.column_heads().iter().zip(&COLUMN_WIDTHS[1..]) {
            let text = head.map_or_else(|| NBSP.to_string(), |h| layout::plain_label(self.labels, h));
            heads.push(cell(width, vec![para(CLASS_HEAD, text).into()]));
        }
        push_row(out, heads);
        out.push_str("</thead><tbody>\n");

        for row in self.answer_rows(question) {
            push_row(out, row);
        }
        out.push('\n');

        for &option in code.option_rows() {
            let label = layout::plain_label(self.labels, option.labels()[0]);
            let row = Element::new("tr")
                .child(nbsp_cell(COLUMN_WIDTHS[0]))
                .child(
                    Element::new("th")
                        .attr("style", format!("width: {}", COLUMN_WIDTHS[1]))
                        .child(para(CLASS_ROW_HEAD, layout::row_heading(&label))),
                )
                .child(cell(COLUMN_WIDTHS[2], self.option_value(question, option)))
                .child(nbsp_cell(COLUMN_WIDTHS[3]));
            push_row(out, row);
        }

        let instructions = Element::new("i").with_children(self.label_markup(code.instructions()));
        push_row(
            out,
            Element::new("tr")
                .child(wide_cell(vec![Element::new("p")
                    .attr("class", CLASS_CELL)
                    .child(instructions)
                    .into()]))
                .child(nbsp_cell(COLUMN_WIDTHS[3])),
        );

        out.push_str("</tbody></table></div>");
        para("MsoNormal", NBSP).write_to(out);
        out.push('\n');
    }

    fn answer_rows(&self, question: &Question) -> Vec<Element> {
        let answer_row = |index: usize, text: Vec<Node>, feedback: Vec<Node>, grade: Option<f64>| {
            let grade = grade.map_or_else(|| NBSP.to_string(), format_number);
            Element::new("tr")
                .child(cell(COLUMN_WIDTHS[0], vec![para(CLASS_CELL, marker(index)).into()]))
                .child(cell(COLUMN_WIDTHS[1], cell_content(text)))
                .child(cell(COLUMN_WIDTHS[2], cell_content(feedback)))
                .child(cell(COLUMN_WIDTHS[3], vec![para(CLASS_CELL, grade).into()]))
        };

        match &question.kind {
            QuestionKind::MultiChoice { answers, .. } | QuestionKind::ShortAnswer { answers, .. } => {
                answers
                    .iter()
                    .enumerate()
                    .map(|(i, a)| {
                        answer_row(i, rich_nodes(&a.text), rich_nodes(&a.feedback), Some(a.fraction))
                    })
                    .collect()
            }
            QuestionKind::TrueFalse { answers } => answers
                .iter()
                .enumerate()
                .map(|(i, a)| {
                    let id = if a.text.text.trim().eq_ignore_ascii_case("true") {
                        "true"
                    } else {
                        "false"
                    };
                    let text = layout::plain_label(self.labels, ("qtype_truefalse", id));
                    answer_row(i, vec![Node::Text(text)], rich_nodes(&a.feedback), Some(a.fraction))
                })
                .collect(),
            QuestionKind::Matching { subquestions, .. } => subquestions
                .iter()
                .enumerate()
                .map(|(i, sub)| {
                    answer_row(i, rich_nodes(&sub.text), vec![Node::Text(sub.answer.clone())], None)
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    fn option_value(&self, question: &Question, option: OptionRow) -> Vec<Node> {
        let text = |s: String| cell_content(vec![Node::Text(s)]);
        let yes_no = |on: bool| {
            let id = if on { "yes" } else { "no" };
            text(layout::plain_label(self.labels, ("moodle", id)))
        };
        let combined = match &question.kind {
            QuestionKind::MultiChoice { feedback, .. } | QuestionKind::Matching { feedback, .. } => {
                Some(feedback)
            }
            _ => None,
        };
        let combined_part = |pick: fn(&CombinedFeedback) -> &RichText| {
            cell_content(combined.map(|f| rich_nodes(pick(f))).unwrap_or_default())
        };

        match option {
            OptionRow::GeneralFeedback => cell_content(rich_nodes(&question.generalfeedback)),
            OptionRow::DefaultMark => text(format_number(question.defaultgrade)),
            OptionRow::Penalty => text(format!("{}%", format_number(question.penalty * 100.0))),
            OptionRow::Shuffle => match &question.kind {
                QuestionKind::MultiChoice { shuffle, .. } | QuestionKind::Matching { shuffle, .. } => {
                    yes_no(*shuffle)
                }
                _ => text(String::new()),
            },
            OptionRow::Numbering => match &question.kind {
                QuestionKind::MultiChoice { numbering, .. } => text(numbering.clone()),
                _ => text(String::new()),
            },
            OptionRow::CaseSensitive => match &question.kind {
                QuestionKind::ShortAnswer { case_sensitive, .. } => yes_no(*case_sensitive),
                _ => text(String::new()),
            },
            OptionRow::CorrectFeedback => combined_part(|f| &f.correct),
            OptionRow::PartiallyCorrectFeedback => combined_part(|f| &f.partially_correct),
            OptionRow::IncorrectFeedback => combined_part(|f| &f.incorrect),
            OptionRow::Tags => text(question.tags.join(", ")),
        }
    }

    /// Label markup as nodes, or the `[[id]]` placeholder
    fn label_markup(&self, (group, id): (&str, &str)) -> Vec<Node> {
        match self.labels.get(group, id) {
            Some(markup) => xml::parse_fragment(markup)
                .unwrap_or_else(|_| vec![Node::Text(markup.to_string())]),
            None => vec![Node::Text(format!("[[{id}]]"))],
        }
    }
}

fn push_row(out: &mut String, row: Element) {
    row.write_to(out);
    out.push('\n');
}

fn marker(index: usize) -> String {
    let letter = char::from(b'A' + (index % 26) as u8);
    match index / 26 {
        0 => letter.to_string(),
        n => format!("{letter}{n}"),
    }
}

fn para(class: &str, text: impl Into<String>) -> Element {
    Element::new("p").attr("class", class).text(text)
}

fn cell(width: &str, content: Vec<Node>) -> Element {
    Element::new("td")
        .attr("style", format!("width: {width}"))
        .with_children(content)
}

fn nbsp_cell(width: &str) -> Element {
    cell(width, vec![para(CLASS_CELL, NBSP).into()])
}

/// The question text and instructions cell spanning three columns
fn wide_cell(content: Vec<Node>) -> Element {
    Element::new("td")
        .attr("colspan", "3")
        .attr("style", format!("width: {TEXT_WIDTH}"))
        .with_children(content)
}

/// Rich text markup as nodes, with referenced images inlined
fn rich_nodes(rich: &RichText) -> Vec<Node> {
    if rich.is_empty() {
        return Vec::new();
    }
    let markup = entities::to_numeric_entities(&rich.text);
    let mut nodes = match xml::parse_fragment(&markup) {
        Ok(nodes) => nodes,
        Err(e) => {
            log::warn!("Rich text is not well-formed ({}), writing it as text", e);
            return vec![Node::Text(rich.text.clone())];
        }
    };
    embed_images(&mut nodes, &rich.files);
    nodes
}

fn embed_images(nodes: &mut [Node], files: &[EmbeddedFile]) {
    for node in nodes {
        let Node::Element(el) = node else {
            continue;
        };
        if el.name == "img" {
            let Some(name) = el.get_attr("src").and_then(|s| s.strip_prefix(PLUGINFILE_PREFIX)) else {
                continue;
            };
            match files.iter().find(|f| f.name == name) {
                Some(file) => {
                    let mime = MediaType::from_path(&file.name).map_or("image/png", MediaType::mime);
                    let src = format!("data:{mime};base64,{}", file.data);
                    el.set_attr("src", src);
                }
                None => log::warn!("Image {} has no embedded file", name),
            }
        } else {
            embed_images(&mut el.children, files);
        }
    }
}

/// Group cell content into `<p class="Cell">` paragraphs
fn cell_content(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::new();
    let mut inline: Vec<Node> = Vec::new();

    let flush = |inline: &mut Vec<Node>, out: &mut Vec<Node>| {
        if !inline.is_empty() {
            out.push(
                Element::new("p")
                    .attr("class", CLASS_CELL)
                    .with_children(std::mem::take(inline))
                    .into(),
            );
        }
    };

    for node in nodes {
        match node {
            Node::Element(el) if el.name == "table" => {
                flush(&mut inline, &mut out);
                out.push(el.into());
            }
            Node::Element(el) if BLOCKS.contains(&el.name.as_str()) => {
                flush(&mut inline, &mut out);
                out.push(
                    Element::new("p")
                        .attr("class", CLASS_CELL)
                        .with_children(el.children)
                        .into(),
                );
            }
            Node::Text(t) if inline.is_empty() && t.trim().is_empty() => {}
            Node::Comment(_) => {}
            other => inline.push(other),
        }
    }
    flush(&mut inline, &mut out);

    if out.is_empty() {
        out.push(para(CLASS_CELL, NBSP).into());
    }
    out
}
