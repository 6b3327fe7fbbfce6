//! Locale identifiers and the configured locale table.
//!
//! A locale identifier has the shape `language[_REGION]` (e.g. `de_DE`). The
//! first two characters form the language subtag used both for display-name
//! lookups and for deriving localized field keys.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// A locale identifier such as `en_GB` or `de`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locale(String);

impl Locale {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The two-letter language subtag (`"de"` for `de_DE`).
    ///
    /// Identifiers shorter than two characters are returned whole.
    pub fn subtag(&self) -> &str {
        match self.0.char_indices().nth(2) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Locale {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Locale {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Locale {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Tokens that identify a locale on an incoming request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionBinding {
    /// Value of the `lang` query parameter that selects this locale
    #[serde(default)]
    pub query: String,

    /// Top-level domain label that selects this locale (`de` for `example.de`)
    #[serde(default)]
    pub domain: String,
}

impl DetectionBinding {
    pub fn new(query: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            domain: domain.into(),
        }
    }
}

/// How the locale is inferred from a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum DetectionStrategy {
    /// `?lang=<token>` query parameter
    #[default]
    #[serde(rename = "query")]
    ByQuery,

    /// Host name suffix `.<token>`
    #[serde(rename = "domain")]
    ByDomain,
}

impl From<String> for DetectionStrategy {
    fn from(value: String) -> Self {
        match value.trim() {
            "domain" => DetectionStrategy::ByDomain,
            // Anything unrecognised behaves like the query strategy
            _ => DetectionStrategy::ByQuery,
        }
    }
}

/// Ordered table of configured locales.
///
/// Declaration order is significant: it is the iteration order used when
/// matching detection tokens, expanding schemas and listing languages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocaleConfig(IndexMap<Locale, DetectionBinding>);

impl LocaleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a locale, keeping the position of an existing entry with the same key.
    pub fn insert(&mut self, locale: impl Into<Locale>, binding: DetectionBinding) {
        self.0.insert(locale.into(), binding);
    }

    pub fn with(mut self, locale: impl Into<Locale>, binding: DetectionBinding) -> Self {
        self.insert(locale, binding);
        self
    }

    pub fn get(&self, locale: &str) -> Option<&DetectionBinding> {
        self.0.get(locale)
    }

    /// The configured key equal to `locale`, if any.
    pub fn key(&self, locale: &str) -> Option<&Locale> {
        self.0.get_key_value(locale).map(|(key, _)| key)
    }

    pub fn contains(&self, locale: &str) -> bool {
        self.0.contains_key(locale)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Locale, &DetectionBinding)> {
        self.0.iter()
    }

    pub fn locales(&self) -> impl Iterator<Item = &Locale> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
