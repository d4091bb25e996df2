//! Converter configuration from wordtable.toml

use crate::host::DEFAULT_LOCALE;
use crate::params::{self, ConversionParameters, ImageHandling, TextDirection};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE: &str = "wordtable.toml";

/// Main converter configuration from wordtable.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Identifier of the course the questions belong to
    pub course_id: String,

    /// Course name, used as the Word document title
    pub course_name: String,

    /// Person running the conversion
    pub author: Person,

    /// Language of labels and headings (e.g., "en")
    pub language: String,

    /// Two-letter country code written into the document metadata
    pub country: String,

    pub text_direction: TextDirection,

    /// Host release, gates which labels are produced (e.g., "4.1")
    pub moodle_release: String,

    /// Site address written into the document properties
    pub moodle_url: String,

    /// Plugin display name written into the document description
    pub plugin_name: String,

    /// Word heading level that starts a question category
    pub heading1_style_level: u8,

    pub image_handling: ImageHandling,

    /// Word version the exported document targets
    pub word_target: String,

    /// Optional question types installed on the host (e.g., "gapselect")
    pub installed_qtypes: Vec<String>,

    /// Custom Word HTML template; the built-in one is used when unset
    pub template_path: Option<PathBuf>,

    /// Directory for intermediate documents; unset disables them
    pub scratch_dir: Option<PathBuf>,

    /// Keep intermediate documents and log transform detail
    pub debug: bool,
}

/// Person information (author of the conversion)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Person {
    /// Person's full name
    pub name: String,

    /// Login name on the host
    pub username: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            course_id: "0".to_string(),
            course_name: "Moodle questions".to_string(),
            author: Person::default(),
            language: DEFAULT_LOCALE.to_string(),
            country: String::new(),
            text_direction: TextDirection::Ltr,
            moodle_release: "4.1".to_string(),
            moodle_url: String::new(),
            plugin_name: "Microsoft Word 2010 table format (wordtable)".to_string(),
            heading1_style_level: 1,
            image_handling: ImageHandling::Embedded,
            word_target: "2010".to_string(),
            installed_qtypes: Vec::new(),
            template_path: None,
            scratch_dir: None,
            debug: false,
        }
    }
}

impl ConverterConfig {
    /// Load configuration from a wordtable.toml file
    ///
    /// # Parameters
    /// * `path` - Path to the wordtable.toml configuration file
    ///
    /// # Returns
    /// * `Ok(ConverterConfig)` - Successfully loaded configuration; missing keys take defaults
    /// * `Err(ConfigError)` - Error reading or parsing the configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path)?;
        let config: ConverterConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise the defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            log::debug!(
                "No configuration at {}, using defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    /// Save configuration to a wordtable.toml file
    ///
    /// # Parameters
    /// * `path` - Path where the wordtable.toml file will be written
    ///
    /// # Returns
    /// * `Ok(())` - Successfully saved configuration
    /// * `Err(ConfigError)` - Error serializing or writing the configuration file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// The parameter set handed to every transform pass
    pub fn parameters(&self) -> ConversionParameters {
        ConversionParameters::builder()
            .set(params::COURSE_ID, &self.course_id)
            .set(params::COURSE_NAME, &self.course_name)
            .set(params::AUTHOR_NAME, &self.author.name)
            .set(params::COUNTRY, &self.country)
            .set(params::LANGUAGE, &self.language)
            .set(params::TEXT_DIRECTION, self.text_direction.as_str())
            .set(params::RELEASE, &self.moodle_release)
            .set(params::BASE_URL, &self.moodle_url)
            .set(params::USERNAME, &self.author.username)
            .set(params::DEBUG_FLAG, if self.debug { "1" } else { "0" })
            .set(params::PLUGIN_NAME, &self.plugin_name)
            .set(
                params::HEADING_LEVEL,
                self.heading1_style_level.to_string(),
            )
            .set(params::IMAGE_HANDLING, self.image_handling.as_str())
            .build()
    }
}

/// Errors that can occur when loading or saving converter configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
