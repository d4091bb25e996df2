//! Conversion parameters shared by every transform pass
//!
//! One [`ConversionParameters`] value is built per pipeline run and handed to
//! each pass by shared reference. Passes read the names they care about and
//! ignore the rest; nothing downstream can change a value set upstream.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const COURSE_ID: &str = "course_id";
pub const COURSE_NAME: &str = "course_name";
pub const AUTHOR_NAME: &str = "author_name";
pub const COUNTRY: &str = "moodle_country";
pub const LANGUAGE: &str = "moodle_language";
pub const TEXT_DIRECTION: &str = "moodle_textdirection";
pub const RELEASE: &str = "moodle_release";
pub const BASE_URL: &str = "moodle_url";
pub const USERNAME: &str = "moodle_username";
pub const DEBUG_FLAG: &str = "debug_flag";
pub const PLUGIN_NAME: &str = "pluginname";
pub const HEADING_LEVEL: &str = "heading1stylelevel";
pub const IMAGE_HANDLING: &str = "imagehandling";

/// Writing direction of the host locale
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

impl TextDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            TextDirection::Ltr => "ltr",
            TextDirection::Rtl => "rtl",
        }
    }
}

/// How images found in a Word document are written into the XHTML
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageHandling {
    /// Inline `data:` URIs
    #[default]
    Embedded,
    /// `@@PLUGINFILE@@/<name>` references plus `<file>` elements
    Referenced,
}

impl ImageHandling {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageHandling::Embedded => "embedded",
            ImageHandling::Referenced => "referenced",
        }
    }

    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("referenced") {
            ImageHandling::Referenced
        } else {
            ImageHandling::Embedded
        }
    }
}

/// Flat, ordered name/value set passed to every transform pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionParameters {
    values: BTreeMap<String, String>,
}

impl ConversionParameters {
    /// Start building a parameter set
    pub fn builder() -> ParametersBuilder {
        ParametersBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Value of `name`, or `default` when unset or empty
    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        match self.get(name) {
            Some(v) if !v.is_empty() => v,
            _ => default,
        }
    }

    /// Boolean view of a parameter (`1`, `true`, `yes` are true)
    pub fn flag(&self, name: &str) -> bool {
        matches!(
            self.get(name).map(str::to_ascii_lowercase).as_deref(),
            Some("1") | Some("true") | Some("yes")
        )
    }

    pub fn text_direction(&self) -> TextDirection {
        if self.get(TEXT_DIRECTION) == Some("rtl") {
            TextDirection::Rtl
        } else {
            TextDirection::Ltr
        }
    }

    pub fn image_handling(&self) -> ImageHandling {
        ImageHandling::parse(self.get_or(IMAGE_HANDLING, "embedded"))
    }

    /// Word heading level that maps onto question-bank level 1 (categories)
    pub fn heading_level(&self) -> u8 {
        self.get(HEADING_LEVEL)
            .and_then(|v| v.parse::<u8>().ok())
            .filter(|level| (1..=6).contains(level))
            .unwrap_or(1)
    }

    pub fn debug(&self) -> bool {
        self.flag(DEBUG_FLAG)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Builder for [`ConversionParameters`]; the only way to set values
#[derive(Debug, Default)]
pub struct ParametersBuilder {
    values: BTreeMap<String, String>,
}

impl ParametersBuilder {
    pub fn set(mut self, name: &str, value: impl Into<String>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn build(self) -> ConversionParameters {
        ConversionParameters {
            values: self.values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_missing_values() {
        let params = ConversionParameters::builder().build();
        assert_eq!(params.text_direction(), TextDirection::Ltr);
        assert_eq!(params.image_handling(), ImageHandling::Embedded);
        assert_eq!(params.heading_level(), 1);
        assert!(!params.debug());
    }

    #[test]
    fn test_typed_views() {
        let params = ConversionParameters::builder()
            .set(TEXT_DIRECTION, "rtl")
            .set(IMAGE_HANDLING, "referenced")
            .set(HEADING_LEVEL, "2")
            .set(DEBUG_FLAG, "1")
            .build();
        assert_eq!(params.text_direction(), TextDirection::Rtl);
        assert_eq!(params.image_handling(), ImageHandling::Referenced);
        assert_eq!(params.heading_level(), 2);
        assert!(params.debug());
    }

    #[test]
    fn test_out_of_range_heading_level() {
        let params = ConversionParameters::builder()
            .set(HEADING_LEVEL, "9")
            .build();
        assert_eq!(params.heading_level(), 1);
    }

    #[test]
    fn test_iteration_is_ordered() {
        let params = ConversionParameters::builder()
            .set(LANGUAGE, "en")
            .set(COURSE_ID, "7")
            .build();
        let names: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec![COURSE_ID, LANGUAGE]);
    }
}
