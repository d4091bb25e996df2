//! Composite document assembly
//!
//! Transform passes see exactly one input document. Everything a pass needs
//! (the body, its styles, image data, the label dictionary, the HTML template)
//! is wrapped as sibling children of a single `<container>` root by
//! [`wrap`]. Child order is fixed by [`FragmentRole`], never by insertion
//! order.

use crate::error::AssemblyError;
use crate::xml;
use std::collections::BTreeMap;

/// Root element of every assembled document
pub const CONTAINER: &str = "container";

const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Slot a fragment occupies in the container, in output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FragmentRole {
    /// WordML document body
    Document,
    /// Question XML (`<question>` elements, or a whole `<quiz>`)
    Quiz,
    /// Intermediate XHTML; the fragment brings its own `<html>` root
    Html,
    Styles,
    Relationships,
    /// Base64 image data
    Images,
    /// Word HTML template with the CSS styles
    Template,
    /// Serialised label dictionary
    Labels,
}

impl FragmentRole {
    pub const ALL: [FragmentRole; 8] = [
        FragmentRole::Document,
        FragmentRole::Quiz,
        FragmentRole::Html,
        FragmentRole::Styles,
        FragmentRole::Relationships,
        FragmentRole::Images,
        FragmentRole::Template,
        FragmentRole::Labels,
    ];

    /// Name of the wrapping element; `None` when the fragment is injected bare
    pub fn element_name(self) -> Option<&'static str> {
        match self {
            FragmentRole::Document => Some("document"),
            FragmentRole::Quiz => Some("quiz"),
            FragmentRole::Html => None,
            FragmentRole::Styles => Some("styles"),
            FragmentRole::Relationships => Some("relationships"),
            FragmentRole::Images => Some("images"),
            FragmentRole::Template => Some("htmltemplate"),
            FragmentRole::Labels => None,
        }
    }

    /// Label used in errors and logs
    pub fn name(self) -> &'static str {
        match self {
            FragmentRole::Html => "html",
            FragmentRole::Labels => "moodlelabels",
            other => other.element_name().unwrap_or("fragment"),
        }
    }

    /// Whether a malformed fragment may be carried as an opaque CDATA blob
    pub fn allows_opaque(self) -> bool {
        matches!(self, FragmentRole::Template)
    }
}

/// Wrap named fragments into one `<container>` document
///
/// # Parameters
/// * `fragments` - Fragment text per role; roles may be absent
///
/// # Returns
/// * `Ok(String)` - A single well-formed document with one XML declaration
/// * `Err(AssemblyError)` - A fragment that is not well-formed and cannot be wrapped opaquely
pub fn wrap(fragments: &BTreeMap<FragmentRole, String>) -> Result<String, AssemblyError> {
    let mut out = String::from(DECLARATION);
    out.push('\n');
    out.push('<');
    out.push_str(CONTAINER);
    out.push('>');

    for (role, fragment) in fragments {
        let body = xml::strip_declarations(fragment);
        let well_formed = xml::is_well_formed_fragment(body);

        out.push('\n');
        match role.element_name() {
            Some(name) => {
                out.push('<');
                out.push_str(name);
                out.push('>');
                if well_formed {
                    out.push_str(body);
                } else if role.allows_opaque() && !body.contains("]]>") {
                    log::debug!("Wrapping {} fragment as opaque text", role.name());
                    out.push_str("<![CDATA[");
                    out.push_str(body);
                    out.push_str("]]>");
                } else {
                    return Err(rejection(*role, body));
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            None if well_formed => out.push_str(body),
            None => return Err(rejection(*role, body)),
        }
    }

    out.push('\n');
    out.push_str("</");
    out.push_str(CONTAINER);
    out.push('>');
    Ok(out)
}

fn rejection(role: FragmentRole, body: &str) -> AssemblyError {
    let reason = match xml::parse_fragment(body) {
        Err(e) => e.to_string(),
        Ok(_) => "cannot be wrapped".to_string(),
    };
    AssemblyError {
        role: role.name(),
        reason,
    }
}

/// Convenience builder for the fragment map
#[derive(Debug, Default, Clone)]
pub struct Fragments {
    map: BTreeMap<FragmentRole, String>,
}

impl Fragments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, role: FragmentRole, fragment: impl Into<String>) -> Self {
        self.map.insert(role, fragment.into());
        self
    }

    pub fn wrap(&self) -> Result<String, AssemblyError> {
        wrap(&self.map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_order_and_single_declaration() {
        let doc = Fragments::new()
            .with(FragmentRole::Labels, "<moodlelabels/>")
            .with(FragmentRole::Quiz, "<?xml version=\"1.0\"?><question type=\"essay\"/>")
            .with(FragmentRole::Template, "<html><body/></html>")
            .wrap()
            .unwrap();

        assert_eq!(doc.matches("<?xml").count(), 1);
        assert!(doc.starts_with("<?xml"));
        let quiz = doc.find("<quiz>").unwrap();
        let template = doc.find("<htmltemplate>").unwrap();
        let labels = doc.find("<moodlelabels/>").unwrap();
        assert!(quiz < template && template < labels);
        assert!(roxmltree::Document::parse(&doc).is_ok());
    }

    #[test]
    fn test_html_injected_without_wrapper() {
        let doc = Fragments::new()
            .with(FragmentRole::Html, "<html><body><p>x</p></body></html>")
            .wrap()
            .unwrap();
        assert!(doc.contains("<container>\n<html><body>"));
    }

    #[test]
    fn test_malformed_template_wrapped_opaquely() {
        let doc = Fragments::new()
            .with(FragmentRole::Template, "<html><body><br></body></html>")
            .wrap()
            .unwrap();
        assert!(doc.contains("<htmltemplate><![CDATA[<html><body><br></body></html>]]></htmltemplate>"));
        assert!(roxmltree::Document::parse(&doc).is_ok());
    }

    #[test]
    fn test_malformed_body_rejected() {
        let err = Fragments::new()
            .with(FragmentRole::Document, "<w:body><w:p></w:body>")
            .wrap()
            .unwrap_err();
        assert_eq!(err.role, "document");
        assert!(!err.reason.is_empty());
    }

    #[test]
    fn test_empty_map() {
        let doc = wrap(&BTreeMap::new()).unwrap();
        assert!(roxmltree::Document::parse(&doc).is_ok());
    }
}
