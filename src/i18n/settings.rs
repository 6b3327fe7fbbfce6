//! The extension's own settings block (`extensions/i18n`).

use crate::i18n::{DetectionBinding, DetectionStrategy, Locale, LocaleConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Configured locales and the detection strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct I18nSettings {
    #[serde(default)]
    pub locales: LocaleConfig,

    #[serde(default)]
    pub detection: DetectionStrategy,
}

impl I18nSettings {
    /// Settings used when none are configured: only the default locale,
    /// detected by its language subtag in the query or by the top-level label
    /// of the server name.
    pub fn defaults(default_locale: &Locale, server_name: &str) -> Self {
        let binding = DetectionBinding::new(query_token(default_locale), domain_token(server_name));
        Self {
            locales: LocaleConfig::new().with(default_locale.clone(), binding),
            detection: DetectionStrategy::ByQuery,
        }
    }
}

/// Leading lowercase letters of the locale, at most two (`en_GB` → `en`).
fn query_token(locale: &Locale) -> String {
    locale
        .as_str()
        .chars()
        .take(2)
        .take_while(|c| c.is_ascii_lowercase())
        .collect()
}

/// Trailing lowercase label of the server name (`www.example.org` → `org`).
fn domain_token(server_name: &str) -> String {
    static TLD: OnceLock<Regex> = OnceLock::new();
    let re = TLD.get_or_init(|| Regex::new(r"[a-z]+$").expect("static regex"));
    re.find(server_name)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_derive_tokens() {
        let settings = I18nSettings::defaults(&Locale::new("en_GB"), "www.example.org");
        assert_eq!(settings.detection, DetectionStrategy::ByQuery);
        assert_eq!(settings.locales.len(), 1);
        let binding = settings.locales.get("en_GB").unwrap();
        assert_eq!(binding.query, "en");
        assert_eq!(binding.domain, "org");
    }

    #[test]
    fn test_defaults_with_ip_server_name() {
        let settings = I18nSettings::defaults(&Locale::new("nl_NL"), "127.0.0.1");
        assert_eq!(settings.locales.get("nl_NL").unwrap().domain, "");
    }

    #[test]
    fn test_settings_from_yaml() {
        let settings: I18nSettings = serde_yaml::from_str(
            r#"
locales:
  en_GB: { query: en, domain: com }
  de_DE: { query: de, domain: de }
detection: domain
"#,
        )
        .unwrap();
        assert_eq!(settings.detection, DetectionStrategy::ByDomain);
        assert_eq!(settings.locales.len(), 2);
    }

    #[test]
    fn test_settings_missing_detection_defaults_to_query() {
        let settings: I18nSettings =
            serde_yaml::from_str("locales: { en: { query: en } }").unwrap();
        assert_eq!(settings.detection, DetectionStrategy::ByQuery);
    }
}
