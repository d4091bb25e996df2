//! Embedded Word HTML templates
//!
//! Export pass 2 merges the question tables into a Word HTML template that
//! carries the paragraph and table styles. The default template is compiled
//! into the binary; a custom one can be loaded from disk.

use std::path::Path;

/// Template metadata for display and lookup
#[derive(Debug, Clone)]
pub struct TemplateInfo {
    /// Template identifier (e.g., "wordfile")
    pub id: &'static str,
    /// One-line description shown by the CLI
    pub description: &'static str,
    /// XHTML template text
    pub content: &'static str,
}

/// Identifier of the template used when none is configured
pub const DEFAULT_TEMPLATE: &str = "wordfile";

/// Get all available templates
pub fn get_all_templates() -> Vec<TemplateInfo> {
    vec![TemplateInfo {
        id: DEFAULT_TEMPLATE,
        description: "Word 2010 question tables with the wordtable paragraph styles",
        content: include_str!("templates/wordfile_template.html"),
    }]
}

/// Get a template by ID
///
/// # Parameters
/// * `id` - Template identifier, case-insensitive
///
/// # Returns
/// * `Some(TemplateInfo)` - Template information if found
/// * `None` - No template found matching the given identifier
pub fn get_template(id: &str) -> Option<TemplateInfo> {
    get_all_templates()
        .into_iter()
        .find(|t| t.id.eq_ignore_ascii_case(id))
}

/// The built-in default template text
pub fn default_template() -> &'static str {
    include_str!("templates/wordfile_template.html")
}

/// Load a custom template from disk
///
/// # Parameters
/// * `path` - Path to an XHTML template file
///
/// # Returns
/// * `Ok(String)` - Template text
/// * `Err(std::io::Error)` - The file could not be read
pub fn load_template(path: &Path) -> Result<String, std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    if !content.contains("</body>") {
        log::warn!(
            "Template {} has no </body> tag; questions will be appended at the end",
            path.display()
        );
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_is_well_formed() {
        let template = default_template();
        assert!(roxmltree::Document::parse(template).is_ok());
        assert!(template.ends_with("<body>\n  </body>\n</html>\n"));
    }

    #[test]
    fn test_get_template() {
        assert!(get_template("WordFile").is_some());
        assert!(get_template("nonexistent").is_none());
        assert_eq!(get_all_templates().len(), 1);
    }

    #[test]
    fn test_load_template_missing_file() {
        assert!(load_template(Path::new("/nonexistent/template.html")).is_err());
    }
}
