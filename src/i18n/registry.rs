//! Language registry: display names for language subtags.
//!
//! This module provides the built-in language-name lookup used for menu
//! labels and localized field labels. It uses a singleton pattern with
//! `OnceLock` so the table is built once and shared read-only.

use std::sync::OnceLock;

/// Lookup of human-readable language names by two-letter subtag.
///
/// Hosts with their own language data (e.g. a CLDR-backed service) implement
/// this trait and hand it to [`crate::i18n::I18n`].
pub trait LanguageNames: Send + Sync {
    /// Display name for `subtag`, or `None` if the subtag is unknown.
    fn display_name(&self, subtag: &str) -> Option<String>;
}

/// Metadata for a known language.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// ISO 639-1 language code (e.g., "en", "de")
    pub code: &'static str,

    /// English name of the language (e.g., "English", "German")
    pub name: &'static str,
}

/// Global language registry singleton.
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

/// Global registry instance (initialized lazily)
static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the global language registry instance.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: default_languages(),
        })
    }

    /// Get a language by its ISO 639-1 code, ignoring ASCII case.
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages
            .iter()
            .find(|lang| lang.code.eq_ignore_ascii_case(code))
    }

}

impl LanguageNames for LanguageRegistry {
    fn display_name(&self, subtag: &str) -> Option<String> {
        self.get_by_code(subtag).map(|lang| lang.name.to_string())
    }
}

fn lang(code: &'static str, name: &'static str) -> LanguageConfig {
    LanguageConfig { code, name }
}

/// Languages known to the built-in registry.
fn default_languages() -> Vec<LanguageConfig> {
    vec![
        lang("ar", "Arabic"),
        lang("bg", "Bulgarian"),
        lang("ca", "Catalan"),
        lang("cs", "Czech"),
        lang("da", "Danish"),
        lang("de", "German"),
        lang("el", "Greek"),
        lang("en", "English"),
        lang("es", "Spanish"),
        lang("et", "Estonian"),
        lang("fa", "Persian"),
        lang("fi", "Finnish"),
        lang("fr", "French"),
        lang("he", "Hebrew"),
        lang("hr", "Croatian"),
        lang("hu", "Hungarian"),
        lang("id", "Indonesian"),
        lang("is", "Icelandic"),
        lang("it", "Italian"),
        lang("ja", "Japanese"),
        lang("ko", "Korean"),
        lang("lt", "Lithuanian"),
        lang("lv", "Latvian"),
        lang("nb", "Norwegian Bokmål"),
        lang("nl", "Dutch"),
        lang("nn", "Norwegian Nynorsk"),
        lang("pl", "Polish"),
        lang("pt", "Portuguese"),
        lang("ro", "Romanian"),
        lang("ru", "Russian"),
        lang("sk", "Slovak"),
        lang("sl", "Slovenian"),
        lang("sr", "Serbian"),
        lang("sv", "Swedish"),
        lang("th", "Thai"),
        lang("tr", "Turkish"),
        lang("uk", "Ukrainian"),
        lang("vi", "Vietnamese"),
        lang("zh", "Chinese"),
    ]
}
