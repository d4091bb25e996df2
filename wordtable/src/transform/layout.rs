//! The Word table convention shared by export pass 1 and import pass 3
//!
//! Every question is one four-column table under a level 2 heading:
//!
//! | row            | col 1  | col 2        | col 3    | col 4  |
//! |----------------|--------|--------------|----------|--------|
//! | question       | text (colspan 3)                | type   |
//! | column heads   |        | e.g. Answers | Feedback | Grade  |
//! | answers        | A, B.. | answer       | feedback | grade  |
//! | options        |        | label (th)   | value    |        |
//! | instructions   | text (colspan 3)                |        |

use crate::labels::LabelDictionary;
use crate::question::QuestionKind;

pub const NBSP: &str = "\u{a0}";

pub const COLUMN_WIDTHS: [&str; 4] = ["1.0cm", "5.0cm", "6.0cm", "1.0cm"];
/// Width of the three merged columns
pub const TEXT_WIDTH: &str = "12.0cm";

pub const CLASS_CELL: &str = "Cell";
pub const CLASS_TYPE: &str = "QFType";
pub const CLASS_HEAD: &str = "TableHead";
pub const CLASS_ROW_HEAD: &str = "TableRowHead";

/// Question type code in the top right cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCode {
    Description,
    Essay,
    MultiChoice,
    MultiAnswer,
    TrueFalse,
    ShortAnswer,
    Matching,
    Cloze,
}

type LabelRef = (&'static str, &'static str);

impl TypeCode {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeCode::Description => "DE",
            TypeCode::Essay => "ES",
            TypeCode::MultiChoice => "MC",
            TypeCode::MultiAnswer => "MA",
            TypeCode::TrueFalse => "TF",
            TypeCode::ShortAnswer => "SA",
            TypeCode::Matching => "MAT",
            TypeCode::Cloze => "CL",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        Some(match code.trim().to_ascii_uppercase().as_str() {
            "DE" => TypeCode::Description,
            "ES" => TypeCode::Essay,
            "MC" => TypeCode::MultiChoice,
            "MA" => TypeCode::MultiAnswer,
            "TF" => TypeCode::TrueFalse,
            "SA" => TypeCode::ShortAnswer,
            "MAT" => TypeCode::Matching,
            "CL" => TypeCode::Cloze,
            _ => return None,
        })
    }

    /// Code for a question kind; `None` for kinds without a table form
    pub fn of(kind: &QuestionKind) -> Option<Self> {
        Some(match kind {
            QuestionKind::Description => TypeCode::Description,
            QuestionKind::Essay { .. } => TypeCode::Essay,
            QuestionKind::MultiChoice { single: true, .. } => TypeCode::MultiChoice,
            QuestionKind::MultiChoice { single: false, .. } => TypeCode::MultiAnswer,
            QuestionKind::TrueFalse { .. } => TypeCode::TrueFalse,
            QuestionKind::ShortAnswer { .. } => TypeCode::ShortAnswer,
            QuestionKind::Matching { .. } => TypeCode::Matching,
            QuestionKind::Cloze => TypeCode::Cloze,
            QuestionKind::Category { .. } | QuestionKind::Unsupported { .. } => return None,
        })
    }

    /// Label shown in the last row
    pub fn instructions(self) -> LabelRef {
        match self {
            TypeCode::Description => ("qformat_wordtable", "description_instructions"),
            TypeCode::Essay => ("qformat_wordtable", "essay_instructions"),
            TypeCode::MultiChoice | TypeCode::MultiAnswer => {
                ("qformat_wordtable", "multichoice_instructions")
            }
            TypeCode::TrueFalse => ("qformat_wordtable", "truefalse_instructions"),
            TypeCode::ShortAnswer => ("qtype_shortanswer", "filloutoneanswer"),
            TypeCode::Matching => ("qtype_match", "filloutthreeqsandtwoas"),
            TypeCode::Cloze => ("qformat_wordtable", "cloze_instructions"),
        }
    }

    /// Headings of columns 2 to 4
    pub fn column_heads(self) -> [Option<LabelRef>; 3] {
        match self {
            TypeCode::MultiChoice
            | TypeCode::MultiAnswer
            | TypeCode::TrueFalse
            | TypeCode::ShortAnswer => [
                Some(("quiz", "answers")),
                Some(("quiz", "feedback")),
                Some(("moodle", "grade")),
            ],
            TypeCode::Matching => [Some(("question", "questions")), Some(("quiz", "answers")), None],
            TypeCode::Description | TypeCode::Essay | TypeCode::Cloze => [None, None, None],
        }
    }

    /// Option rows, in table order
    pub fn option_rows(self) -> &'static [OptionRow] {
        use OptionRow::*;
        match self {
            TypeCode::Description => &[Tags],
            TypeCode::Essay => &[GeneralFeedback, DefaultMark, Tags],
            TypeCode::MultiChoice | TypeCode::MultiAnswer => &[
                GeneralFeedback,
                DefaultMark,
                Penalty,
                Shuffle,
                Numbering,
                CorrectFeedback,
                PartiallyCorrectFeedback,
                IncorrectFeedback,
                Tags,
            ],
            TypeCode::TrueFalse | TypeCode::Cloze => {
                &[GeneralFeedback, DefaultMark, Penalty, Tags]
            }
            TypeCode::ShortAnswer => &[GeneralFeedback, DefaultMark, Penalty, CaseSensitive, Tags],
            TypeCode::Matching => &[
                GeneralFeedback,
                DefaultMark,
                Penalty,
                Shuffle,
                CorrectFeedback,
                PartiallyCorrectFeedback,
                IncorrectFeedback,
                Tags,
            ],
        }
    }
}

/// A labelled row below the answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionRow {
    GeneralFeedback,
    DefaultMark,
    Penalty,
    Shuffle,
    Numbering,
    CaseSensitive,
    CorrectFeedback,
    PartiallyCorrectFeedback,
    IncorrectFeedback,
    Tags,
}

impl OptionRow {
    pub const ALL: [OptionRow; 10] = [
        OptionRow::GeneralFeedback,
        OptionRow::DefaultMark,
        OptionRow::Penalty,
        OptionRow::Shuffle,
        OptionRow::Numbering,
        OptionRow::CaseSensitive,
        OptionRow::CorrectFeedback,
        OptionRow::PartiallyCorrectFeedback,
        OptionRow::IncorrectFeedback,
        OptionRow::Tags,
    ];

    /// Labels that name this row; the first one is written on export
    pub fn labels(self) -> &'static [LabelRef] {
        match self {
            OptionRow::GeneralFeedback => &[("quiz", "generalfeedback")],
            OptionRow::DefaultMark => &[("question", "defaultmark"), ("quiz", "defaultgrade")],
            OptionRow::Penalty => &[
                ("quiz", "penaltyfactor"),
                ("question", "penaltyforeachincorrecttry"),
            ],
            OptionRow::Shuffle => &[("qtype_multichoice", "shuffleanswers"), ("quiz", "shuffle")],
            OptionRow::Numbering => &[("qtype_multichoice", "answernumbering")],
            OptionRow::CaseSensitive => &[("quiz", "casesensitive")],
            OptionRow::CorrectFeedback => &[("qtype_multichoice", "correctfeedback")],
            OptionRow::PartiallyCorrectFeedback => {
                &[("qtype_multichoice", "partiallycorrectfeedback")]
            }
            OptionRow::IncorrectFeedback => &[("qtype_multichoice", "incorrectfeedback")],
            OptionRow::Tags => &[("moodle", "tags")],
        }
    }

    /// Row whose label matches `text`, ignoring case and a trailing colon
    pub fn recognise(text: &str, labels: &LabelDictionary) -> Option<Self> {
        let wanted = normalise_label(text);
        if wanted.is_empty() {
            return None;
        }
        Self::ALL.into_iter().find(|row| {
            row.labels().iter().any(|(group, id)| {
                labels
                    .plain(group, id)
                    .is_some_and(|label| normalise_label(&label) == wanted)
            })
        })
    }
}

/// Label as it appears in a row heading: "Tags:" but "Shuffle the choices?"
pub fn row_heading(label: &str) -> String {
    let label = label.trim();
    if label.ends_with('?') || label.ends_with(':') {
        label.to_string()
    } else {
        format!("{label}:")
    }
}

fn normalise_label(text: &str) -> String {
    text.trim()
        .trim_end_matches(':')
        .trim()
        .to_lowercase()
}

/// Plain label text, or the `[[id]]` placeholder for a missing string
pub fn plain_label(labels: &LabelDictionary, (group, id): LabelRef) -> String {
    labels
        .plain(group, id)
        .unwrap_or_else(|| format!("[[{id}]]"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{BuiltinCatalog, InstalledPlugins};
    use crate::labels::{LabelDictionaryBuilder, Release};

    fn labels() -> LabelDictionary {
        let catalog = BuiltinCatalog::english();
        LabelDictionaryBuilder::new(&catalog).build(
            "en",
            Some(Release::new(3, 9)),
            &InstalledPlugins::none(),
        )
    }

    #[test]
    fn test_type_codes() {
        for code in ["DE", "ES", "MC", "MA", "TF", "SA", "MAT", "CL"] {
            assert_eq!(TypeCode::parse(code).map(TypeCode::as_str), Some(code));
        }
        assert_eq!(TypeCode::parse(" mc "), Some(TypeCode::MultiChoice));
        assert_eq!(TypeCode::parse("NUM"), None);
    }

    #[test]
    fn test_row_headings() {
        assert_eq!(row_heading("Tags"), "Tags:");
        assert_eq!(row_heading("Shuffle the choices?"), "Shuffle the choices?");
    }

    #[test]
    fn test_recognise_rows() {
        let labels = labels();
        assert_eq!(OptionRow::recognise("Tags:", &labels), Some(OptionRow::Tags));
        assert_eq!(
            OptionRow::recognise("general FEEDBACK", &labels),
            Some(OptionRow::GeneralFeedback)
        );
        assert_eq!(
            OptionRow::recognise("Default question grade:", &labels),
            Some(OptionRow::DefaultMark)
        );
        assert_eq!(OptionRow::recognise("Colour:", &labels), None);
        assert_eq!(OptionRow::recognise(" ", &labels), None);
    }
}
