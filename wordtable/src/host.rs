//! Services the conversion core asks its host for
//!
//! The core never reaches into ambient host state. Localised strings and the
//! set of installed question types are provided through the two traits below;
//! [`BuiltinCatalog`] and [`InstalledPlugins`] are the defaults used by the
//! command line tool.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

/// Localised UI strings keyed by `(group, id)`
pub trait StringSource {
    /// Text for `id` in `group`, or `None` when the string is not defined
    fn get_string(&self, locale: &str, group: &str, id: &str) -> Option<String>;
}

/// Reports which optional question type plugins are present
pub trait QuestionTypeRegistry {
    /// `qtype` is the plugin name without prefix (e.g., "gapselect")
    fn is_installed(&self, qtype: &str) -> bool;
}

const ENGLISH_STRINGS: &str = include_str!("lang/en.toml");

/// Fallback language for every lookup
pub const DEFAULT_LOCALE: &str = "en";

type Catalog = BTreeMap<String, BTreeMap<String, String>>;

/// String tables compiled into the binary, with per-locale overrides
///
/// Lookup order is the exact locale (`pt_br`), its parent language (`pt`),
/// then English.
#[derive(Debug, Clone, Default)]
pub struct BuiltinCatalog {
    locales: BTreeMap<String, Catalog>,
}

#[derive(Deserialize)]
#[serde(transparent)]
struct CatalogFile(Catalog);

impl BuiltinCatalog {
    /// The embedded English strings
    pub fn english() -> Self {
        let mut catalog = Self::default();
        if let Err(e) = catalog.add_locale(DEFAULT_LOCALE, ENGLISH_STRINGS) {
            log::error!("Embedded English strings are invalid: {}", e);
        }
        catalog
    }

    /// Add (or replace) the strings of one locale from TOML text
    ///
    /// # Parameters
    /// * `locale` - Locale code (e.g., "fr", "pt_br")
    /// * `toml_text` - Tables named after string groups, keys are string ids
    ///
    /// # Returns
    /// * `Ok(())` - Strings were added
    /// * `Err(toml::de::Error)` - The TOML could not be parsed
    pub fn add_locale(&mut self, locale: &str, toml_text: &str) -> Result<(), toml::de::Error> {
        let CatalogFile(strings) = toml::from_str(toml_text)?;
        self.locales.insert(locale.to_lowercase(), strings);
        Ok(())
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.locales.keys().map(String::as_str)
    }

    fn lookup(&self, locale: &str, group: &str, id: &str) -> Option<&String> {
        self.locales.get(locale)?.get(group)?.get(id)
    }
}

impl StringSource for BuiltinCatalog {
    fn get_string(&self, locale: &str, group: &str, id: &str) -> Option<String> {
        let locale = locale.to_lowercase();
        let parent = locale.split(['_', '-']).next().unwrap_or(&locale).to_string();
        let found = [locale.as_str(), parent.as_str(), DEFAULT_LOCALE]
            .into_iter()
            .find_map(|l| self.lookup(l, group, id))
            .cloned();
        found
    }
}

/// A fixed set of installed question type plugins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledPlugins {
    names: BTreeSet<String>,
}

impl InstalledPlugins {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| normalize_qtype(&n.into()))
                .collect(),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl QuestionTypeRegistry for InstalledPlugins {
    fn is_installed(&self, qtype: &str) -> bool {
        self.names.contains(&normalize_qtype(qtype))
    }
}

/// `qtype_gapselect` and `gapselect` name the same plugin
fn normalize_qtype(name: &str) -> String {
    let name = name.trim().to_lowercase();
    name.strip_prefix("qtype_").map(str::to_string).unwrap_or(name)
}
