//! Allow-list HTML cleanup for question text fields
//!
//! Question text pasted from Word arrives full of proprietary markup: `o:p`
//! paragraphs, `font` tags, conditional comments, `mso-` styles and soft
//! hyphens. [`HtmlSanitizer::clean`] reduces a fragment to a small set of
//! character-level and table elements and guarantees the result parses as an
//! XHTML body fragment.

use crate::entities;
use crate::xml;
use percent_encoding::percent_decode_str;
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Elements that survive cleaning
pub const ALLOWED_TAGS: &[&str] = &[
    "b", "br", "em", "i", "img", "strong", "sub", "sup", "u", "table", "tbody", "td", "th",
    "thead", "tr", "p",
];

/// Elements written as `<x/>` and never given content
const VOID_TAGS: &[&str] = &["br", "img"];

/// Elements dropped together with everything inside them
const OPAQUE_TAGS: &[&str] = &["script", "style", "head", "title", "xml"];

/// Prefix of in-bank file references inside `src` attributes
pub const PLUGINFILE_PREFIX: &str = "@@PLUGINFILE@@/";

/// Stands in for `--` while text passes through the transforms
pub const DOUBLE_HYPHEN_PLACEHOLDER: &str = "\u{E02D}";

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<!--.*?-->|<!\[CDATA\[.*?\]\]>|<![^>]*>|<\?.*?\?>|<(/?)([A-Za-z][A-Za-z0-9:_.-]*)((?:\s+[^\s=/>]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+))?)*)\s*(/?)>"#,
    )
    .expect("valid tag pattern")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s=/>]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+)))?"#)
        .expect("valid attribute pattern")
});

static ENTITY_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^&(?:#([0-9]{1,7})|#[xX]([0-9A-Fa-f]{1,6})|amp|lt|gt|quot|apos);")
        .expect("valid entity pattern")
});

static SOFT_HYPHEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x{AD}|&shy;|&#173;|&#[xX]0*[aA][dD];").expect("valid soft hyphen pattern")
});

static QUESTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<question\s+type="([^"]*)"[^>]*>.*?</question>"#)
        .expect("valid question pattern")
});

static CDATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("valid CDATA pattern"));

/// The allow-list HTML cleaner
pub struct HtmlSanitizer;

impl HtmlSanitizer {
    /// Reduce an HTML fragment to well-formed XHTML using the allow-list
    ///
    /// Never fails: when the cleaned markup still does not parse, the
    /// entity-normalised text is returned with every `<` escaped.
    ///
    /// # Parameters
    /// * `fragment` - HTML as stored in a question text field
    ///
    /// # Returns
    /// A body fragment that parses as XML
    pub fn clean(fragment: &str) -> String {
        let text = strip_soft_hyphens(fragment);
        let text = entities::to_numeric_entities(&text);

        let cleaned = strip_to_allow_list(&text);
        if xml::is_well_formed_fragment(&cleaned) {
            return cleaned;
        }

        log::warn!(
            "Sanitized HTML is still not well-formed, falling back to escaped text: {}",
            crate::error::snippet(fragment)
        );
        escape_loose(&text)
    }
}

fn strip_to_allow_list(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut open: Vec<String> = Vec::new();
    let mut skipping: Option<String> = None;
    let mut last = 0;

    for caps in TOKEN.captures_iter(input) {
        let Some(whole) = caps.get(0) else { continue };
        if skipping.is_none() {
            out.push_str(&escape_loose(&input[last..whole.start()]));
        }
        last = whole.end();

        // Comments, declarations, processing instructions
        let Some(raw_name) = caps.get(2) else {
            if skipping.is_none() && whole.as_str().starts_with("<![CDATA[") {
                let inner = &whole.as_str()[9..whole.as_str().len() - 3];
                out.push_str(&xml::escape_text(inner));
            }
            continue;
        };

        let name = raw_name.as_str().to_ascii_lowercase();
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let self_closing = caps.get(4).is_some_and(|m| !m.as_str().is_empty());

        if let Some(skip) = &skipping {
            if closing && *skip == name {
                skipping = None;
            }
            continue;
        }

        // Word namespace elements (o:p, v:shape, w:sdt) and script-like content
        if name.contains(':') || OPAQUE_TAGS.contains(&name.as_str()) {
            if !closing && !self_closing {
                skipping = Some(name);
            }
            continue;
        }

        if !ALLOWED_TAGS.contains(&name.as_str()) {
            continue;
        }

        if VOID_TAGS.contains(&name.as_str()) {
            if !closing {
                out.push('<');
                out.push_str(&name);
                out.push_str(&allowed_attributes(&name, caps.get(3).map_or("", |m| m.as_str())));
                out.push_str("/>");
            }
            continue;
        }

        if closing {
            if let Some(pos) = open.iter().rposition(|t| *t == name) {
                for tag in open.drain(pos..).rev() {
                    out.push_str("</");
                    out.push_str(&tag);
                    out.push('>');
                }
            }
            continue;
        }

        out.push('<');
        out.push_str(&name);
        out.push_str(&allowed_attributes(&name, caps.get(3).map_or("", |m| m.as_str())));
        if self_closing {
            out.push_str("/>");
        } else {
            out.push('>');
            open.push(name);
        }
    }

    if skipping.is_none() {
        out.push_str(&escape_loose(&input[last..]));
    }
    for tag in open.into_iter().rev() {
        out.push_str("</");
        out.push_str(&tag);
        out.push('>');
    }
    out
}

fn allowed_attributes(tag: &str, raw: &str) -> String {
    let allowed: &[&str] = match tag {
        "img" => &["src", "alt", "width", "height"],
        "td" | "th" => &["colspan", "rowspan"],
        _ => return String::new(),
    };

    let mut out = String::new();
    let mut seen: Vec<String> = Vec::new();
    for caps in ATTRIBUTE.captures_iter(raw) {
        let name = caps[1].to_ascii_lowercase();
        if !allowed.contains(&name.as_str()) || seen.contains(&name) {
            continue;
        }
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map_or("", |m| m.as_str());
        let value = if tag == "img" && name == "src" {
            decode_pluginfile_src(value)
        } else {
            value.to_string()
        };
        out.push(' ');
        out.push_str(&name);
        out.push_str("=\"");
        out.push_str(&escape_loose(&value).replace('"', "&quot;"));
        out.push('"');
        seen.push(name);
    }
    out
}

/// URL-decode the file name after `@@PLUGINFILE@@/`
///
/// Names in `<file name="...">` are stored plain, so `my%20pic.png` and
/// `my+pic.png` must both become `my pic.png` to match.
pub fn decode_pluginfile_src(src: &str) -> String {
    let Some(name) = src.strip_prefix(PLUGINFILE_PREFIX) else {
        return src.to_string();
    };
    let name = name.replace("&amp;", "&").replace('+', " ");
    let decoded = percent_decode_str(&name).decode_utf8_lossy();
    format!("{PLUGINFILE_PREFIX}{decoded}")
}

/// Remove U+00AD in literal and entity form
pub fn strip_soft_hyphens(input: &str) -> String {
    SOFT_HYPHEN.replace_all(input, "").into_owned()
}

/// Escape `<`, `>` and any `&` that does not start a valid XML reference
fn escape_loose(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        match c {
            '&' if is_valid_reference(&text[i..]) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Whether `text` starts with a reference an XML parser accepts
fn is_valid_reference(text: &str) -> bool {
    let Some(caps) = ENTITY_REF.captures(text) else {
        return false;
    };
    let code = match (caps.get(1), caps.get(2)) {
        (Some(dec), _) => dec.as_str().parse::<u32>().ok(),
        (_, Some(hex)) => u32::from_str_radix(hex.as_str(), 16).ok(),
        _ => return true,
    };
    code.and_then(char::from_u32)
        .is_some_and(|c| matches!(c, '\t' | '\n' | '\r') || c >= ' ')
}

/// Replace every `--` with a placeholder that no XML processor objects to
pub fn protect_double_hyphens(input: &str) -> String {
    input.replace("--", DOUBLE_HYPHEN_PLACEHOLDER)
}

/// Undo [`protect_double_hyphens`]
pub fn restore_double_hyphens(input: &str) -> String {
    input.replace(DOUBLE_HYPHEN_PLACEHOLDER, "--")
}

/// Clean the HTML inside every CDATA section of every non-category question
///
/// Works on the serialised Question XML so the surrounding markup is kept
/// byte for byte. Text outside `<question>` elements is dropped, as the
/// exporter wraps the result in its own `<quiz>` element.
pub fn clean_all_questions(question_xml: &str) -> String {
    if !QUESTION.is_match(question_xml) {
        return question_xml.to_string();
    }

    let mut out = String::with_capacity(question_xml.len());
    for caps in QUESTION.captures_iter(question_xml) {
        let whole = &caps[0];
        if &caps[1] == "category" {
            out.push_str(whole);
            out.push('\n');
            continue;
        }
        let cleaned = CDATA.replace_all(whole, |c: &Captures| {
            format!("<![CDATA[{}]]>", HtmlSanitizer::clean(&c[1]))
        });
        out.push_str(&cleaned);
        out.push('\n');
    }
    out
}
