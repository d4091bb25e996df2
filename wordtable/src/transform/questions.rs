//! Import pass 3: XHTML Word tables to Question XML
//!
//! Walks the cleaned body in document order. A level 1 heading selects the
//! category for the questions after it; a level 2 heading names the question
//! whose table follows. Tables without a preceding heading, and tables whose
//! type code is unknown, are skipped.

use super::layout::{self, OptionRow, TypeCode, CLASS_HEAD, CLASS_ROW_HEAD, NBSP};
use super::support::{self, container_child, require_child};
use super::{Stylesheet, StylesheetError};
use crate::labels::LabelDictionary;
use crate::params::ConversionParameters;
use crate::question::{
    self, Answer, CombinedFeedback, EmbeddedFile, Question, QuestionKind, RichText, SubQuestion,
};
use crate::sanitize::PLUGINFILE_PREFIX;
use crate::xml::{self, Element, Node};
use std::collections::HashMap;

/// The import pass 3 stylesheet
pub struct XhtmlToQuestions;

impl Stylesheet for XhtmlToQuestions {
    fn apply(
        &self,
        input: &roxmltree::Document,
        _params: &ConversionParameters,
    ) -> Result<String, StylesheetError> {
        let html = require_child(input, "html")?;
        let body = html
            .children()
            .find(|n| n.has_tag_name("body"))
            .unwrap_or(html);
        let body = Element::from_node(body);

        let reader = TableReader {
            labels: support::labels(input),
            images: container_child(input, "images")
                .map(image_data)
                .unwrap_or_default(),
        };
        let mut questions = Vec::new();
        let mut heading = None;
        reader.walk(&body, &mut heading, &mut questions);

        log::debug!("Recognised {} questions", questions.len());
        Ok(question::write_quiz(&questions))
    }
}

/// Base64 data of the extracted images, by file name
fn image_data(images: roxmltree::Node) -> HashMap<String, String> {
    images
        .children()
        .filter(|n| n.has_tag_name("file"))
        .filter_map(|n| {
            Some((
                n.attribute("name")?.to_string(),
                n.text().unwrap_or_default().trim().to_string(),
            ))
        })
        .collect()
}

/// Text of an element with runs of whitespace (including no-break spaces) collapsed
fn plain(element: &Element) -> String {
    element
        .text_content()
        .replace(NBSP, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn has_image(element: &Element) -> bool {
    element
        .elements()
        .any(|e| e.name == "img" || has_image(e))
}

fn has_para_class(cell: &Element, class: &str) -> bool {
    cell.elements()
        .any(|p| p.name == "p" && p.get_attr("class") == Some(class))
}

fn cells(row: &Element) -> Vec<&Element> {
    row.elements()
        .filter(|c| c.name == "td" || c.name == "th")
        .collect()
}

/// Table rows in order, flagged when they sit in `<thead>`
fn rows(table: &Element) -> Vec<(&Element, bool)> {
    let mut rows = Vec::new();
    for child in table.elements() {
        match child.name.as_str() {
            "tr" => rows.push((child, false)),
            "thead" => rows.extend(child.elements().filter(|r| r.name == "tr").map(|r| (r, true))),
            "tbody" | "tfoot" => {
                rows.extend(child.elements().filter(|r| r.name == "tr").map(|r| (r, false)))
            }
            _ => {}
        }
    }
    rows
}

/// Markup of a cell: a lone paragraph is unwrapped, paragraph classes dropped
fn cell_html(cell: &Element) -> String {
    if plain(cell).is_empty() && !has_image(cell) {
        return String::new();
    }
    let content: Vec<&Node> = cell
        .children
        .iter()
        .filter(|n| !matches!(n, Node::Text(t) if t.trim().is_empty()))
        .collect();

    let mut out = String::new();
    match content.as_slice() {
        [Node::Element(p)] if p.name == "p" => xml::write_nodes(&p.children, &mut out),
        _ => {
            let mut nodes = cell.children.clone();
            strip_paragraph_classes(&mut nodes);
            xml::write_nodes(&nodes, &mut out);
        }
    }
    out.trim().to_string()
}

fn strip_paragraph_classes(nodes: &mut [Node]) {
    for node in nodes {
        if let Node::Element(el) = node {
            if el.name == "p" {
                el.attrs.retain(|(k, _)| k != "class");
            }
            strip_paragraph_classes(&mut el.children);
        }
    }
}

/// `@@PLUGINFILE@@` names referenced by `<img>` elements
fn referenced_images(nodes: &[Node], names: &mut Vec<String>) {
    for node in nodes {
        if let Node::Element(el) = node {
            if let Some(name) = el
                .get_attr("src")
                .and_then(|src| src.strip_prefix(PLUGINFILE_PREFIX))
            {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
            referenced_images(&el.children, names);
        }
    }
}

/// "33.3%" and "33.3" are percentages, "0.333" is a fraction
fn parse_penalty(text: &str) -> Option<f64> {
    let text = text.trim();
    let (number, percent) = match text.strip_suffix('%') {
        Some(number) => (number.trim(), true),
        None => (text, false),
    };
    let value = number.parse::<f64>().ok()?;
    Some(if percent || value > 1.0 { value / 100.0 } else { value })
}

/// Grade column value; blank means zero
fn parse_grade(text: &str) -> f64 {
    let text = text.trim().trim_end_matches('%').trim();
    if text.is_empty() {
        return 0.0;
    }
    text.parse::<f64>().unwrap_or_else(|_| {
        log::warn!("Grade '{}' is not a number, using 0", text);
        0.0
    })
}

struct TableReader {
    labels: LabelDictionary,
    images: HashMap<String, String>,
}

impl TableReader {
    fn walk(&self, parent: &Element, heading: &mut Option<String>, out: &mut Vec<Question>) {
        for child in parent.elements() {
            match child.name.as_str() {
                "h1" => {
                    let name = plain(child);
                    *heading = None;
                    if name.is_empty() {
                        continue;
                    }
                    let path = if name.starts_with('$') {
                        name
                    } else {
                        format!("$course$/{name}")
                    };
                    out.push(Question::category(path));
                }
                "h2" => *heading = Some(plain(child)),
                "table" => match heading.take() {
                    Some(name) => out.extend(self.question(name, child)),
                    None => log::debug!("Skipping a table without a question heading"),
                },
                "div" | "section" | "body" => self.walk(child, heading, out),
                _ => {}
            }
        }
    }

    fn question(&self, name: String, table: &Element) -> Option<Question> {
        let rows = rows(table);
        let ((first, _), rest) = rows.split_first()?;
        let first = cells(first);
        let code_text = first.last().map(|c| plain(c)).unwrap_or_default();
        let Some(code) = TypeCode::parse(&code_text) else {
            log::warn!("Question '{}' has unknown type code '{}', skipping it", name, code_text);
            return None;
        };
        let questiontext = match first.as_slice() {
            [text, _, ..] => self.rich(text),
            _ => RichText::default(),
        };

        let mut options: Vec<(OptionRow, &Element)> = Vec::new();
        let mut answer_rows: Vec<Vec<&Element>> = Vec::new();
        for &(row, in_head) in rest {
            let cells = cells(row);
            if in_head || cells.iter().any(|c| has_para_class(c, CLASS_HEAD)) {
                continue;
            }
            if let Some(index) = cells
                .iter()
                .position(|c| c.name == "th" || has_para_class(c, CLASS_ROW_HEAD))
            {
                let label = plain(cells[index]);
                match (OptionRow::recognise(&label, &self.labels), cells.get(index + 1)) {
                    (Some(option), Some(value)) => options.push((option, *value)),
                    (Some(_), None) => {}
                    (None, _) => log::debug!("Ignoring unknown row '{}' in '{}'", label, name),
                }
                continue;
            }
            let spans_text = cells
                .first()
                .and_then(|c| c.get_attr("colspan"))
                .and_then(|s| s.parse::<u32>().ok())
                .is_some_and(|span| span >= 3);
            if spans_text {
                continue;
            }
            if cells.iter().all(|c| plain(c).is_empty() && !has_image(c)) {
                continue;
            }
            answer_rows.push(cells);
        }

        let option = |wanted: OptionRow| {
            options
                .iter()
                .find(|(o, _)| *o == wanted)
                .map(|(_, cell)| *cell)
        };
        let rich_option = |wanted| option(wanted).map(|c| self.rich(c)).unwrap_or_default();
        let yes_no = |wanted| option(wanted).and_then(|c| self.yes_no(&plain(c)));
        let combined = || CombinedFeedback {
            correct: rich_option(OptionRow::CorrectFeedback),
            partially_correct: rich_option(OptionRow::PartiallyCorrectFeedback),
            incorrect: rich_option(OptionRow::IncorrectFeedback),
        };

        let kind = match code {
            TypeCode::Description => QuestionKind::Description,
            TypeCode::Essay => QuestionKind::Essay {
                response_lines: 15,
                grader_info: RichText::default(),
            },
            TypeCode::MultiChoice | TypeCode::MultiAnswer => QuestionKind::MultiChoice {
                single: code == TypeCode::MultiChoice,
                shuffle: yes_no(OptionRow::Shuffle).unwrap_or(true),
                numbering: option(OptionRow::Numbering)
                    .map(plain)
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| "abc".to_string()),
                answers: self.answers(&answer_rows),
                feedback: combined(),
            },
            TypeCode::TrueFalse => QuestionKind::TrueFalse {
                answers: self.true_false_answers(&answer_rows),
            },
            TypeCode::ShortAnswer => QuestionKind::ShortAnswer {
                case_sensitive: yes_no(OptionRow::CaseSensitive).unwrap_or(false),
                answers: self.answers(&answer_rows),
            },
            TypeCode::Matching => QuestionKind::Matching {
                shuffle: yes_no(OptionRow::Shuffle).unwrap_or(true),
                subquestions: answer_rows
                    .iter()
                    .filter_map(|cells| {
                        let text = self.rich(cells.get(1)?);
                        let answer = cells.get(2).map(|c| plain(c)).unwrap_or_default();
                        (!text.is_empty() || !answer.is_empty())
                            .then_some(SubQuestion { text, answer })
                    })
                    .collect(),
                feedback: combined(),
            },
            TypeCode::Cloze => QuestionKind::Cloze,
        };

        let mut question = Question::new(name, kind);
        question.questiontext = questiontext;
        question.generalfeedback = rich_option(OptionRow::GeneralFeedback);
        if code != TypeCode::Description {
            if let Some(mark) = option(OptionRow::DefaultMark).and_then(|c| plain(c).parse().ok()) {
                question.defaultgrade = mark;
            }
        }
        if let Some(penalty) = option(OptionRow::Penalty).and_then(|c| parse_penalty(&plain(c))) {
            question.penalty = penalty;
        }
        question.tags = option(OptionRow::Tags)
            .map(|c| {
                plain(c)
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Some(question)
    }

    fn answers(&self, rows: &[Vec<&Element>]) -> Vec<Answer> {
        rows.iter()
            .filter_map(|cells| {
                let text = self.rich(cells.get(1)?);
                if text.is_empty() {
                    return None;
                }
                Some(Answer {
                    fraction: cells.get(3).map_or(0.0, |c| parse_grade(&plain(c))),
                    text,
                    feedback: cells.get(2).map(|c| self.rich(c)).unwrap_or_default(),
                })
            })
            .collect()
    }

    fn true_false_answers(&self, rows: &[Vec<&Element>]) -> Vec<Answer> {
        let is_label = |text: &str, id: &'static str| {
            text.eq_ignore_ascii_case(id)
                || text.eq_ignore_ascii_case(&layout::plain_label(&self.labels, ("qtype_truefalse", id)))
        };
        rows.iter()
            .filter_map(|cells| {
                let text = plain(cells.get(1)?);
                let value = if is_label(&text, "true") {
                    "true"
                } else if is_label(&text, "false") {
                    "false"
                } else {
                    log::warn!("True/false answer '{}' is neither true nor false", text);
                    return None;
                };
                Some(Answer {
                    fraction: cells.get(3).map_or(0.0, |c| parse_grade(&plain(c))),
                    text: RichText::html(value),
                    feedback: cells.get(2).map(|c| self.rich(c)).unwrap_or_default(),
                })
            })
            .collect()
    }

    fn yes_no(&self, text: &str) -> Option<bool> {
        let text = text.trim().to_lowercase();
        let matches = |id: &str, words: &[&str]| {
            words.contains(&text.as_str())
                || self
                    .labels
                    .plain("moodle", id)
                    .is_some_and(|label| label.to_lowercase() == text)
        };
        if matches("yes", &["yes", "y", "1", "true"]) {
            Some(true)
        } else if matches("no", &["no", "n", "0", "false"]) {
            Some(false)
        } else {
            None
        }
    }

    /// Cell content as rich text, with the referenced images attached
    fn rich(&self, cell: &Element) -> RichText {
        let mut text = RichText::html(cell_html(cell));
        let mut names = Vec::new();
        referenced_images(&cell.children, &mut names);
        for name in names {
            match self.images.get(&name) {
                Some(data) => text.files.push(EmbeddedFile {
                    name,
                    path: "/".to_string(),
                    data: data.clone(),
                }),
                None => log::warn!("Image {} is referenced but was not extracted", name),
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{BuiltinCatalog, InstalledPlugins};
    use crate::labels::LabelDictionaryBuilder;
    use crate::transform::{StyleSheetRef, TransformEngine};

    fn import(body: &str, extra: &str) -> Vec<Question> {
        let catalog = BuiltinCatalog::english();
        let labels =
            LabelDictionaryBuilder::new(&catalog).build("en", None, &InstalledPlugins::none());
        let input = format!(
            "<container><html><body>{body}</body></html>{extra}{}</container>",
            labels.to_xml()
        );
        let xml = TransformEngine::builtin()
            .run(&input, StyleSheetRef::ImportPass3, &ConversionParameters::default())
            .unwrap();
        question::parse_quiz(&xml).unwrap()
    }

    fn row(cells: &[&str]) -> String {
        let cells: String = cells
            .iter()
            .map(|c| format!("<td><p class=\"Cell\">{c}</p></td>"))
            .collect();
        format!("<tr>{cells}</tr>")
    }

    fn option(label: &str, value: &str) -> String {
        format!(
            "<tr><td><p class=\"Cell\"/></td><th><p class=\"TableRowHead\">{label}</p></th><td><p class=\"Cell\">{value}</p></td><td/></tr>"
        )
    }

    #[test]
    fn test_category_and_description() {
        let body = format!(
            "<h1>Week 1</h1><h2>A description</h2><table><tbody>{}{}</tbody></table>",
            "<tr><td colspan=\"3\"><p class=\"Cell\">The question text.</p></td><td><p class=\"QFType\">DE</p></td></tr>",
            option("Tags:", "tagDescription, tagTest"),
        );
        let questions = import(&body, "");
        assert_eq!(questions.len(), 2);
        assert_eq!(
            questions[0].kind,
            QuestionKind::Category {
                path: "$course$/Week 1".to_string()
            }
        );
        let q = &questions[1];
        assert_eq!(q.kind, QuestionKind::Description);
        assert_eq!(q.name, "A description");
        assert_eq!(q.questiontext.text, "The question text.");
        assert_eq!(q.defaultgrade, 0.0);
        assert_eq!(q.tags, vec!["tagDescription", "tagTest"]);
    }

    #[test]
    fn test_multichoice_table() {
        let body = format!(
            "<h2>Capital</h2><table><thead>{}{}</thead><tbody>{}{}{}{}{}{}</tbody></table>",
            "<tr><td colspan=\"3\"><p class=\"Cell\">Capital of <b>France</b>?</p></td><td><p class=\"QFType\">MC</p></td></tr>",
            "<tr><td/><td><p class=\"TableHead\">Answers</p></td><td/><td/></tr>",
            row(&["A", "Paris", "Yes", "100"]),
            row(&["B", "Lyon", "", "0"]),
            row(&["", "", "", ""]),
            option("General feedback:", "Think of the Seine."),
            option("Shuffle the choices?", "No"),
            option("Penalty factor:", "50%"),
        );
        let questions = import(&body, "");
        assert_eq!(questions.len(), 1);
        let q = &questions[0];
        assert_eq!(q.questiontext.text, "Capital of <b>France</b>?");
        assert_eq!(q.generalfeedback.text, "Think of the Seine.");
        assert_eq!(q.penalty, 0.5);
        match &q.kind {
            QuestionKind::MultiChoice {
                single,
                shuffle,
                answers,
                ..
            } => {
                assert!(*single);
                assert!(!*shuffle);
                assert_eq!(answers.len(), 2);
                assert_eq!(answers[0].text.text, "Paris");
                assert_eq!(answers[0].fraction, 100.0);
                assert_eq!(answers[0].feedback.text, "Yes");
                assert!(answers[1].feedback.is_empty());
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_true_false_and_short_answer() {
        let body = format!(
            "<h2>Sky</h2><table>{}{}{}</table><h2>Colour</h2><table>{}{}{}</table>",
            "<tr><td colspan=\"3\">The sky is blue.</td><td>TF</td></tr>",
            row(&["A", "True", "Right", "100"]),
            row(&["B", "False", "Wrong", "0"]),
            "<tr><td colspan=\"3\">Colour of grass?</td><td>SA</td></tr>",
            row(&["A", "green", "", "100%"]),
            option("Case sensitivity", "Yes"),
        );
        let questions = import(&body, "");
        assert_eq!(questions.len(), 2);
        match &questions[0].kind {
            QuestionKind::TrueFalse { answers } => {
                assert_eq!(answers[0].text.text, "true");
                assert_eq!(answers[0].fraction, 100.0);
                assert_eq!(answers[1].text.text, "false");
            }
            other => panic!("unexpected kind {other:?}"),
        }
        match &questions[1].kind {
            QuestionKind::ShortAnswer {
                case_sensitive,
                answers,
            } => {
                assert!(*case_sensitive);
                assert_eq!(answers[0].text.text, "green");
                assert_eq!(answers[0].fraction, 100.0);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_referenced_images_attached() {
        let body = "<h2>Chart</h2><table><tr><td colspan=\"3\"><p><img src=\"@@PLUGINFILE@@/image1.png\" alt=\"c\"/></p></td><td>ES</td></tr></table>";
        let images = r#"<images><file path="word/media/image1.png" name="image1.png" mime="image/png">QUJD</file></images>"#;
        let questions = import(body, images);
        let text = &questions[0].questiontext;
        assert_eq!(text.text, r#"<img src="@@PLUGINFILE@@/image1.png" alt="c"/>"#);
        assert_eq!(text.files.len(), 1);
        assert_eq!(text.files[0].name, "image1.png");
        assert_eq!(text.files[0].data, "QUJD");
    }

    #[test]
    fn test_skips_unknown_code_and_orphan_tables() {
        let body = "<table><tr><td>x</td><td>MC</td></tr></table><h2>N</h2><table><tr><td>1+1</td><td>NUM</td></tr></table>";
        assert!(import(body, "").is_empty());
    }

    #[test]
    fn test_penalty_forms() {
        assert_eq!(parse_penalty("25%"), Some(0.25));
        assert_eq!(parse_penalty("50"), Some(0.5));
        assert_eq!(parse_penalty("0.1"), Some(0.1));
        assert_eq!(parse_penalty("n/a"), None);
    }
}
