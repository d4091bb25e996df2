//! Export pass 2: question tables merged into the Word HTML template
//!
//! Works on text rather than a tree: the template is copied byte for byte
//! apart from four edits (`lang`/`dir` on `<html>`, the `<title>`, the
//! metadata block before `</head>` and the question tables before
//! `</body>`). Word is sensitive to template details it never documents, so
//! nothing else is touched.

use super::support::{container_child, inner_source, require_child};
use super::{Stylesheet, StylesheetError};
use crate::params::{self, ConversionParameters};
use crate::xml::{escape_attr, escape_text};

/// The export pass 2 stylesheet
pub struct WordHtmlDocument;

impl Stylesheet for WordHtmlDocument {
    fn apply(
        &self,
        input: &roxmltree::Document,
        params: &ConversionParameters,
    ) -> Result<String, StylesheetError> {
        let template = require_child(input, "htmltemplate")?;
        let template = if template.has_children() && template.children().any(|n| n.is_element()) {
            inner_source(template).to_string()
        } else {
            template.text().unwrap_or_default().to_string()
        };
        if template.trim().is_empty() {
            return Err(StylesheetError::new("HTML template is empty"));
        }

        let html = container_child(input, "html")
            .ok_or_else(|| StylesheetError::new("input has no <html> element"))?;
        let body = html
            .children()
            .find(|n| n.has_tag_name("body"))
            .ok_or_else(|| StylesheetError::new("<html> has no <body> element"))?;
        let tables = inner_source(body).trim_end();

        let mut out = set_root_attributes(&template, params);
        out = set_title(&out, params.get_or(params::COURSE_NAME, ""));
        out = insert_before_last(&out, "</head>", &metadata(params), false).unwrap_or(out);
        Ok(insert_before_last(&out, "</body>", tables, true)
            .unwrap_or_else(|| format!("{out}{tables}")))
    }
}

/// Add `lang` and `dir` to the opening `<html` tag
fn set_root_attributes(template: &str, params: &ConversionParameters) -> String {
    let Some(start) = template.find("<html") else {
        return template.to_string();
    };
    let tag_end = template[start..]
        .find('>')
        .map_or(template.len(), |i| start + i);
    let tag = &template[start..tag_end];

    let mut extra = String::new();
    if !tag.contains(" lang=") {
        extra.push_str(&format!(
            r#" lang="{}""#,
            escape_attr(params.get_or(params::LANGUAGE, "en"))
        ));
    }
    if !tag.contains(" dir=") {
        extra.push_str(&format!(r#" dir="{}""#, params.text_direction().as_str()));
    }

    let insert_at = start + "<html".len();
    format!("{}{}{}", &template[..insert_at], extra, &template[insert_at..])
}

fn set_title(template: &str, title: &str) -> String {
    if title.is_empty() {
        return template.to_string();
    }
    match (template.find("<title>"), template.find("</title>")) {
        (Some(open), Some(close)) if open < close => format!(
            "{}<title>{}{}",
            &template[..open],
            escape_text(title),
            &template[close..]
        ),
        _ => template.to_string(),
    }
}

/// `<meta>` elements and the Word document properties block
fn metadata(params: &ConversionParameters) -> String {
    let mut out = String::new();
    for (name, key) in [
        ("moodleCourseID", params::COURSE_ID),
        ("moodleLanguage", params::LANGUAGE),
        ("moodleRelease", params::RELEASE),
        ("moodleURL", params::BASE_URL),
        ("moodleUsername", params::USERNAME),
        ("moodleCountry", params::COUNTRY),
    ] {
        if let Some(value) = params.get(key).filter(|v| !v.is_empty()) {
            out.push_str(&format!(
                r#"<meta name="{name}" content="{}"/>"#,
                escape_attr(value)
            ));
            out.push('\n');
        }
    }

    out.push_str("<xml><o:DocumentProperties>");
    for (element, key) in [
        ("o:Title", params::COURSE_NAME),
        ("o:Author", params::AUTHOR_NAME),
        ("o:LastAuthor", params::AUTHOR_NAME),
        ("o:Description", params::PLUGIN_NAME),
        ("o:Company", params::BASE_URL),
    ] {
        if let Some(value) = params.get(key).filter(|v| !v.is_empty()) {
            out.push_str(&format!("<{element}>{}</{element}>", escape_text(value)));
        }
    }
    out.push_str("</o:DocumentProperties></xml>\n");
    out
}

/// Insert `content` before the last `marker`
///
/// With `skip_whitespace` the content goes before the whitespace that
/// precedes the marker, so the template's own indentation stays after it.
fn insert_before_last(
    text: &str,
    marker: &str,
    content: &str,
    skip_whitespace: bool,
) -> Option<String> {
    let index = text.rfind(marker)?;
    let index = if skip_whitespace {
        text[..index].trim_end().len()
    } else {
        index
    };
    Some(format!("{}{}{}", &text[..index], content, &text[index..]))
}
