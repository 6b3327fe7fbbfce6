//! Active locale resolution.
//!
//! Signals are consulted in a fixed order and the first one that yields a
//! value is taken:
//!
//! 1. the configured detection strategy (`?lang=` token or host suffix)
//! 2. the locale stored in the session
//! 3. the `bolt_locale` cookie
//! 4. the default locale
//!
//! A value that is not one of the configured locales is replaced by the
//! default, so an unknown locale can never become active.

use crate::i18n::{DetectionStrategy, Locale, LocaleConfig};
use std::fmt;
use tracing::debug;

/// Name of the cookie that remembers the visitor's locale.
pub const LOCALE_COOKIE: &str = "bolt_locale";

/// Session key under which the locale is stored.
pub const SESSION_KEY: &str = "locale";

/// Name of the query parameter read by the query detection strategy.
pub const QUERY_PARAM: &str = "lang";

/// Request-derived inputs to locale resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocaleSignals<'a> {
    /// Value of the `lang` query parameter
    pub query: Option<&'a str>,
    /// Request host name, with or without port
    pub host: Option<&'a str>,
    /// Locale previously stored in the session
    pub session: Option<&'a str>,
    /// Value of the locale cookie
    pub cookie: Option<&'a str>,
}

/// Which signal determined the active locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocaleSource {
    Detection,
    Session,
    Cookie,
    Default,
}

impl fmt::Display for LocaleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LocaleSource::Detection => "detection",
            LocaleSource::Session => "session",
            LocaleSource::Cookie => "cookie",
            LocaleSource::Default => "default",
        };
        f.write_str(name)
    }
}

/// The locale in effect for one request.
///
/// Only [`LocaleResolver::resolve`] constructs it, so it is always one of the
/// configured locales (or the default).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveLocale {
    locale: Locale,
    source: LocaleSource,
}

impl ActiveLocale {
    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn source(&self) -> LocaleSource {
        self.source
    }

    pub fn as_str(&self) -> &str {
        self.locale.as_str()
    }

    pub fn subtag(&self) -> &str {
        self.locale.subtag()
    }
}

/// Resolves the active locale from request signals.
#[derive(Debug, Clone, Copy)]
pub struct LocaleResolver<'a> {
    locales: &'a LocaleConfig,
    detection: DetectionStrategy,
    default_locale: &'a Locale,
}

impl<'a> LocaleResolver<'a> {
    pub fn new(
        locales: &'a LocaleConfig,
        detection: DetectionStrategy,
        default_locale: &'a Locale,
    ) -> Self {
        Self {
            locales,
            detection,
            default_locale,
        }
    }

    pub fn resolve(&self, signals: &LocaleSignals<'_>) -> ActiveLocale {
        if let Some(locale) = self.detect(signals) {
            return ActiveLocale {
                locale: locale.clone(),
                source: LocaleSource::Detection,
            };
        }

        let stored = [
            (signals.session, LocaleSource::Session),
            (signals.cookie, LocaleSource::Cookie),
        ]
        .into_iter()
        .find_map(|(value, source)| non_empty(value).map(|value| (value, source)));

        match stored {
            Some((value, source)) => match self.locales.key(value) {
                Some(locale) => ActiveLocale {
                    locale: locale.clone(),
                    source,
                },
                None => {
                    debug!(
                        "Rejecting unknown locale '{}' from {}, using default {}",
                        value, source, self.default_locale
                    );
                    self.fallback()
                }
            },
            None => self.fallback(),
        }
    }

    /// Match the request against the configured detection strategy.
    ///
    /// When several locales share a token the first declared one wins.
    pub fn detect(&self, signals: &LocaleSignals<'_>) -> Option<&'a Locale> {
        match self.detection {
            DetectionStrategy::ByQuery => {
                let lang = non_empty(signals.query)?;
                self.locales
                    .iter()
                    .find(|(_, binding)| binding.query == lang)
                    .map(|(locale, _)| locale)
            }
            DetectionStrategy::ByDomain => {
                let host = normalize_host(non_empty(signals.host)?);
                self.locales
                    .iter()
                    .find(|(_, binding)| host_matches_domain(&host, &binding.domain))
                    .map(|(locale, _)| locale)
            }
        }
    }

    fn fallback(&self) -> ActiveLocale {
        ActiveLocale {
            locale: self.default_locale.clone(),
            source: LocaleSource::Default,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Lower-case the host and drop any `:port` suffix.
fn normalize_host(host: &str) -> String {
    let host = match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    };
    host.to_ascii_lowercase()
}

/// `true` when `host` ends with `.<domain>`.
fn host_matches_domain(host: &str, domain: &str) -> bool {
    if domain.is_empty() {
        return false;
    }
    host.strip_suffix(&domain.to_ascii_lowercase())
        .is_some_and(|rest| rest.ends_with('.'))
}
