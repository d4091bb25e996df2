//! Label dictionary embedded into every transform input
//!
//! Transform passes render headings such as "General feedback:" and the
//! per-type instructions in the language of the person running the
//! conversion. They cannot call back into the host, so the strings are looked
//! up beforehand and shipped inside the composite document as
//! `<moodlelabels><data name="group_id"><value>...</value></data></moodlelabels>`.
//!
//! Which strings are included is decided by [`LABEL_RULES`]: later host
//! releases add fields, and optional question type plugins contribute their
//! own labels only when installed.

use crate::host::{QuestionTypeRegistry, StringSource};
use crate::sanitize::HtmlSanitizer;
use crate::xml::escape_attr;
use std::collections::HashSet;
use std::fmt;

/// Host release as `major.minor`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Release {
    pub major: u32,
    pub minor: u32,
}

impl Release {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse the leading `major.minor` of a release string
    ///
    /// Accepts the forms hosts report, e.g. "3.9", "3.9.2+ (Build: 20201016)", "4.1".
    pub fn parse(text: &str) -> Option<Self> {
        let mut numbers = text
            .trim()
            .split(|c: char| !c.is_ascii_digit())
            .filter(|s| !s.is_empty());
        let major = numbers.next()?.parse().ok()?;
        let minor = numbers.next().and_then(|n| n.parse().ok()).unwrap_or(0);
        Some(Self { major, minor })
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// One row of the label feature table
#[derive(Debug, Clone, Copy)]
pub struct LabelRule {
    /// Earliest release that has these fields; `None` for all releases
    pub min_release: Option<Release>,
    /// Question type plugin that must be installed; `None` for core strings
    pub requires_plugin: Option<&'static str>,
    pub group: &'static str,
    pub ids: &'static [&'static str],
}

impl LabelRule {
    const fn core(group: &'static str, ids: &'static [&'static str]) -> Self {
        Self {
            min_release: None,
            requires_plugin: None,
            group,
            ids,
        }
    }

    fn applies(&self, release: Option<Release>, installed: &dyn QuestionTypeRegistry) -> bool {
        let release_ok = match (self.min_release, release) {
            (None, _) => true,
            (Some(min), Some(current)) => current >= min,
            (Some(_), None) => false,
        };
        let plugin_ok = self
            .requires_plugin
            .map_or(true, |plugin| installed.is_installed(plugin));
        release_ok && plugin_ok
    }
}

/// Labels by release and plugin, in output order
pub const LABEL_RULES: &[LabelRule] = &[
    LabelRule::core("assignment", &["uploaderror", "uploadafile", "uploadfiletoobig"]),
    LabelRule::core("grades", &["item"]),
    LabelRule::core(
        "moodle",
        &[
            "categoryname", "no", "yes", "feedback", "format", "formathtml", "formatmarkdown",
            "formatplain", "formattext", "grade", "question", "tags", "uploadserverlimit",
            "uploadedfile",
        ],
    ),
    LabelRule::core(
        "qformat_wordtable",
        &[
            "cloze_instructions", "description_instructions", "essay_instructions",
            "multichoice_instructions", "truefalse_instructions",
        ],
    ),
    LabelRule::core("qtype_calculated", &["addmoreanswerblanks"]),
    LabelRule::core("qtype_match", &["blanksforxmorequestions", "filloutthreeqsandtwoas"]),
    LabelRule::core(
        "qtype_multichoice",
        &[
            "answerhowmany", "answernumbering", "answersingleno", "answersingleyes", "choiceno",
            "correctfeedback", "fillouttwochoices", "incorrectfeedback",
            "partiallycorrectfeedback", "shuffleanswers",
        ],
    ),
    LabelRule::core("qtype_shortanswer", &["addmoreanswerblanks", "filloutoneanswer"]),
    LabelRule::core("qtype_truefalse", &["false", "true"]),
    LabelRule::core(
        "question",
        &[
            "addmorechoiceblanks", "category", "combinedfeedback", "defaultmark", "fillincorrect",
            "flagged", "flagthisquestion", "incorrect", "partiallycorrect", "questions",
            "questionx", "questioncategory", "questiontext", "specificfeedback",
            "shownumpartscorrect", "shownumpartscorrectwhenfinished",
        ],
    ),
    LabelRule::core(
        "quiz",
        &[
            "answer", "answers", "casesensitive", "choice", "correct", "correctanswers",
            "defaultgrade", "feedback", "generalfeedback", "incorrect", "penaltyfactor", "shuffle",
        ],
    ),
    LabelRule {
        min_release: Some(Release::new(2, 5)),
        requires_plugin: None,
        group: "question",
        ids: &["hintn", "hints", "penaltyforeachincorrecttry", "clearwrongparts"],
    },
    LabelRule {
        min_release: Some(Release::new(2, 5)),
        requires_plugin: None,
        group: "qformat_wordtable",
        ids: &["cloze_distractor_column_label", "cloze_mcformat_label"],
    },
    LabelRule {
        min_release: Some(Release::new(2, 7)),
        requires_plugin: None,
        group: "qtype_essay",
        ids: &[
            "responseformat", "responsefieldlines", "attachments", "graderinfo",
            "responsetemplate",
        ],
    },
    LabelRule {
        min_release: Some(Release::new(3, 6)),
        requires_plugin: None,
        group: "question",
        ids: &["idnumber"],
    },
    LabelRule {
        min_release: None,
        requires_plugin: Some("gapselect"),
        group: "qtype_gapselect",
        ids: &["choices", "group", "errorblankchoice"],
    },
    LabelRule {
        min_release: None,
        requires_plugin: Some("ddimageortext"),
        group: "qtype_ddimageortext",
        ids: &["draggableitem", "dropzone", "bgimage"],
    },
    LabelRule {
        min_release: None,
        requires_plugin: Some("ddmarker"),
        group: "qtype_ddmarker",
        ids: &["marker", "dropzones", "shape_circle"],
    },
    LabelRule {
        min_release: None,
        requires_plugin: Some("ordering"),
        group: "qtype_ordering",
        ids: &["layouttype", "selecttype", "numberingstyle"],
    },
];

/// One localised label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub group: String,
    pub id: String,
    /// Sanitized XHTML text
    pub text: String,
}

impl Label {
    /// `group_id`, the `name` of the `<data>` element
    pub fn key(&self) -> String {
        format!("{}_{}", self.group, self.id)
    }
}

/// Ordered label set for one conversion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelDictionary {
    labels: Vec<Label>,
}

impl LabelDictionary {
    pub fn get(&self, group: &str, id: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|l| l.group == group && l.id == id)
            .map(|l| l.text.as_str())
    }

    /// Label text by its `group_id` key
    pub fn by_key(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|l| l.key() == key)
            .map(|l| l.text.as_str())
    }

    /// Label text with markup removed, for matching against document text
    pub fn plain(&self, group: &str, id: &str) -> Option<String> {
        let text = self.get(group, id)?;
        Some(match crate::xml::parse_fragment(text) {
            Ok(nodes) => {
                let mut holder = crate::xml::Element::new("value");
                holder.children = nodes;
                holder.text_content()
            }
            Err(_) => text.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.labels.iter()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Serialise as a `<moodlelabels>` fragment
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<moodlelabels>\n");
        for label in &self.labels {
            out.push_str("<data name=\"");
            out.push_str(&escape_attr(&label.key()));
            out.push_str("\"><value>");
            out.push_str(&label.text);
            out.push_str("</value></data>\n");
        }
        out.push_str("</moodlelabels>");
        out
    }

    /// Read labels back from a parsed `<moodlelabels>` element
    ///
    /// Keys are split after a known group prefix; values keep their
    /// inline markup.
    pub fn from_element(element: &crate::xml::Element) -> Self {
        let labels = element
            .elements()
            .filter(|e| e.name == "data")
            .filter_map(|data| {
                let key = data.get_attr("name")?;
                let (group, id) = split_key(key);
                let text = data
                    .find("value")
                    .map(|v| {
                        let mut markup = String::new();
                        crate::xml::write_nodes(&v.children, &mut markup);
                        markup
                    })
                    .unwrap_or_default();
                Some(Label {
                    group: group.to_string(),
                    id: id.to_string(),
                    text,
                })
            })
            .collect();
        Self { labels }
    }
}

fn split_key(key: &str) -> (&str, &str) {
    for rule in LABEL_RULES {
        if let Some(id) = key
            .strip_prefix(rule.group)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return (rule.group, id);
        }
    }
    key.split_once('_').unwrap_or(("", key))
}

/// Builds a [`LabelDictionary`] from a string source
pub struct LabelDictionaryBuilder<'a> {
    strings: &'a dyn StringSource,
}

impl<'a> LabelDictionaryBuilder<'a> {
    pub fn new(strings: &'a dyn StringSource) -> Self {
        Self { strings }
    }

    /// Collect the labels for one locale, release and plugin set
    ///
    /// # Parameters
    /// * `locale` - Language of the strings (falls back per the string source)
    /// * `release` - Host release; `None` includes only ungated rows
    /// * `installed` - Optional question types present on the host
    ///
    /// # Returns
    /// The same dictionary, in the same order, for the same three inputs
    pub fn build(
        &self,
        locale: &str,
        release: Option<Release>,
        installed: &dyn QuestionTypeRegistry,
    ) -> LabelDictionary {
        let mut seen: HashSet<(&str, &str)> = HashSet::new();
        let mut labels = Vec::new();

        for rule in LABEL_RULES.iter().filter(|r| r.applies(release, installed)) {
            for &id in rule.ids {
                if !seen.insert((rule.group, id)) {
                    continue;
                }
                let text = match self.strings.get_string(locale, rule.group, id) {
                    Some(text) => HtmlSanitizer::clean(&text),
                    None => {
                        log::debug!("Missing string {}/{} for {}", rule.group, id, locale);
                        format!("[[{id}]]")
                    }
                };
                labels.push(Label {
                    group: rule.group.to_string(),
                    id: id.to_string(),
                    text,
                });
            }
        }

        log::debug!(
            "Built {} labels for locale {} (release {})",
            labels.len(),
            locale,
            release.map_or_else(|| "unknown".to_string(), |r| r.to_string())
        );
        LabelDictionary { labels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{BuiltinCatalog, InstalledPlugins};

    fn build(release: Option<Release>, plugins: &InstalledPlugins) -> LabelDictionary {
        let catalog = BuiltinCatalog::english();
        LabelDictionaryBuilder::new(&catalog).build("en", release, plugins)
    }

    #[test]
    fn test_release_parse() {
        assert_eq!(Release::parse("3.9.2+ (Build: 20201016)"), Some(Release::new(3, 9)));
        assert_eq!(Release::parse("4"), Some(Release::new(4, 0)));
        assert_eq!(Release::parse("unknown"), None);
        assert!(Release::new(3, 10) > Release::new(3, 9));
    }

    #[test]
    fn test_build_is_deterministic() {
        let plugins = InstalledPlugins::new(["gapselect"]);
        let first = build(Release::parse("3.9"), &plugins);
        let second = build(Release::parse("3.9"), &plugins);
        assert_eq!(first, second);
        assert_eq!(first.to_xml(), second.to_xml());
    }

    #[test]
    fn test_release_gating() {
        let none = InstalledPlugins::none();
        let old = build(Some(Release::new(2, 4)), &none);
        let new = build(Some(Release::new(3, 6)), &none);
        assert!(old.get("question", "hints").is_none());
        assert!(old.get("question", "idnumber").is_none());
        assert_eq!(new.get("question", "hints"), Some("Hints"));
        assert_eq!(new.get("question", "idnumber"), Some("ID number"));
        assert!(new.len() > old.len());
    }

    #[test]
    fn test_plugin_gating() {
        let without = build(None, &InstalledPlugins::none());
        let with = build(None, &InstalledPlugins::new(["qtype_ordering"]));
        assert!(without.get("qtype_ordering", "layouttype").is_none());
        assert_eq!(with.get("qtype_ordering", "layouttype"), Some("Layout of items"));
        assert!(with.get("qtype_gapselect", "choices").is_none());
    }

    #[test]
    fn test_values_are_sanitized_xhtml() {
        let labels = build(None, &InstalledPlugins::none());
        assert_eq!(
            labels.get("qformat_wordtable", "cloze_instructions"),
            Some("Use <strong>bold</strong> for dropdown menu items and <em>italic</em> for text field items.")
        );
        assert_eq!(labels.get("quiz", "generalfeedback"), Some("General feedback"));
        let xml = labels.to_xml();
        assert!(xml.contains(r#"<data name="qtype_truefalse_true"><value>True</value></data>"#));
        assert!(roxmltree::Document::parse(&xml).is_ok());
    }

    #[test]
    fn test_missing_string_placeholder() {
        struct Empty;
        impl StringSource for Empty {
            fn get_string(&self, _: &str, _: &str, _: &str) -> Option<String> {
                None
            }
        }
        let labels =
            LabelDictionaryBuilder::new(&Empty).build("en", None, &InstalledPlugins::none());
        assert_eq!(labels.get("grades", "item"), Some("[[item]]"));
    }

    #[test]
    fn test_read_back_from_element() {
        let labels = build(None, &InstalledPlugins::none());
        let xml = labels.to_xml();
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let element = crate::xml::Element::from_node(doc.root_element());
        let parsed = LabelDictionary::from_element(&element);
        assert_eq!(parsed.get("qtype_multichoice", "shuffleanswers"), Some("Shuffle the choices?"));
        assert_eq!(parsed.by_key("moodle_tags"), Some("Tags"));
        assert_eq!(
            parsed.get("qformat_wordtable", "cloze_instructions"),
            labels.get("qformat_wordtable", "cloze_instructions")
        );
        assert_eq!(
            parsed.plain("qformat_wordtable", "cloze_instructions").as_deref(),
            Some("Use bold for dropdown menu items and italic for text field items.")
        );
    }
}
