//! Remembering the active locale across requests.
//!
//! After resolution the locale is written back to the session and the locale
//! cookie when they are missing or stale, and non-default locales are pushed
//! into the runtime configuration. The core only decides *what* to write; the
//! host owns the session backend and emits the actual `Set-Cookie` header.

use crate::config::ConfigStore;
use crate::i18n::{Locale, LOCALE_COOKIE};
use chrono::{DateTime, Duration, Utc};
use tracing::warn;

/// Configuration keys for the cookie policy.
pub const COOKIES_LIFETIME_KEY: &str = "general/cookies_lifetime";
pub const COOKIES_DOMAIN_KEY: &str = "general/cookies_domain";
pub const COOKIES_HTTPS_ONLY_KEY: &str = "general/cookies_https_only";

/// Two weeks, used when no lifetime is configured.
pub const DEFAULT_COOKIE_LIFETIME_SECS: i64 = 1_209_600;

/// Key/value session storage for the current visitor.
pub trait SessionStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
}

/// Called when a request runs under a locale other than the default, so
/// locale-sensitive subsystems can be re-initialised.
pub trait LocaleHook: Send + Sync {
    fn locale_changed(&self, locale: &Locale);
}

/// Lifetime, domain and transport policy for the locale cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePolicy {
    pub lifetime_secs: i64,
    pub domain: Option<String>,
    pub https_only: bool,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self {
            lifetime_secs: DEFAULT_COOKIE_LIFETIME_SECS,
            domain: None,
            https_only: false,
        }
    }
}

impl CookiePolicy {
    /// Read the policy from `general/cookies_*`, defaulting missing entries.
    pub fn from_store<C: ConfigStore + ?Sized>(store: &C) -> Self {
        let defaults = Self::default();
        Self {
            lifetime_secs: store
                .get_i64(COOKIES_LIFETIME_KEY)
                .unwrap_or(defaults.lifetime_secs),
            domain: store
                .get_str(COOKIES_DOMAIN_KEY)
                .filter(|domain| !domain.is_empty()),
            https_only: store
                .get_bool(COOKIES_HTTPS_ONLY_KEY)
                .unwrap_or(defaults.https_only),
        }
    }
}

/// A locale cookie the host should send to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleCookie {
    pub value: String,
    pub expires: DateTime<Utc>,
    pub max_age_secs: i64,
    pub domain: Option<String>,
    pub secure: bool,
}

impl LocaleCookie {
    /// A lifetime whose expiry falls outside the representable date range
    /// is replaced by [`DEFAULT_COOKIE_LIFETIME_SECS`].
    pub fn new(locale: &Locale, policy: &CookiePolicy, now: DateTime<Utc>) -> Self {
        let (expires, max_age_secs) = match expiry(now, policy.lifetime_secs) {
            Some(expires) => (expires, policy.lifetime_secs),
            None => {
                warn!(
                    "Cookie lifetime of {}s is out of range, using {}s",
                    policy.lifetime_secs, DEFAULT_COOKIE_LIFETIME_SECS
                );
                let expires = expiry(now, DEFAULT_COOKIE_LIFETIME_SECS).unwrap_or(now);
                (expires, DEFAULT_COOKIE_LIFETIME_SECS)
            }
        };

        Self {
            value: locale.to_string(),
            expires,
            max_age_secs,
            domain: policy.domain.clone(),
            secure: policy.https_only,
        }
    }

    pub fn name(&self) -> &'static str {
        LOCALE_COOKIE
    }

    /// Value for a `Set-Cookie` header. The cookie is always HTTP-only and
    /// scoped to the whole site.
    pub fn header_value(&self) -> String {
        let mut header = format!(
            "{}={}; Expires={}; Max-Age={}; Path=/",
            LOCALE_COOKIE,
            self.value,
            self.expires.format("%a, %d %b %Y %H:%M:%S GMT"),
            self.max_age_secs
        );
        if let Some(domain) = &self.domain {
            header.push_str("; Domain=");
            header.push_str(domain);
        }
        if self.secure {
            header.push_str("; Secure");
        }
        header.push_str("; HttpOnly");
        header
    }
}

fn expiry(now: DateTime<Utc>, lifetime_secs: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(lifetime_secs).and_then(|lifetime| now.checked_add_signed(lifetime))
}

/// What [`crate::i18n::I18n::persist`] wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistOutcome {
    /// The runtime configuration now carries the non-default locale
    pub config_updated: bool,
    /// The session value was missing or stale and has been rewritten
    pub session_written: bool,
    /// Cookie to send, when the incoming one was missing or stale
    pub cookie: Option<LocaleCookie>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_cookie_policy_from_store() {
        let store = SiteConfig::from_yaml_str(
            r#"
general:
  cookies_lifetime: 3600
  cookies_domain: example.com
  cookies_https_only: true
"#,
        )
        .unwrap();
        let policy = CookiePolicy::from_store(&store);
        assert_eq!(policy.lifetime_secs, 3600);
        assert_eq!(policy.domain.as_deref(), Some("example.com"));
        assert!(policy.https_only);
    }

    #[test]
    fn test_cookie_policy_defaults() {
        let store = SiteConfig::from_yaml_str("general: { cookies_domain: '' }").unwrap();
        assert_eq!(CookiePolicy::from_store(&store), CookiePolicy::default());
    }

    #[test]
    fn test_cookie_header_value_full() {
        let policy = CookiePolicy {
            lifetime_secs: 60,
            domain: Some("example.com".to_string()),
            https_only: true,
        };
        let cookie = LocaleCookie::new(&Locale::new("de_DE"), &policy, now());
        assert_eq!(
            cookie.header_value(),
            "bolt_locale=de_DE; Expires=Sun, 01 Mar 2026 12:01:00 GMT; Max-Age=60; \
             Path=/; Domain=example.com; Secure; HttpOnly"
        );
    }

    #[test]
    fn test_cookie_header_value_minimal() {
        let cookie = LocaleCookie::new(&Locale::new("fr"), &CookiePolicy::default(), now());
        let header = cookie.header_value();
        assert!(header.starts_with("bolt_locale=fr; "));
        assert!(!header.contains("Domain="));
        assert!(!header.contains("Secure"));
        assert!(header.ends_with("HttpOnly"));
    }

    #[test]
    fn test_out_of_range_lifetime_uses_default() {
        let store =
            SiteConfig::from_yaml_str("general: { cookies_lifetime: 9000000000000000 }").unwrap();
        let policy = CookiePolicy::from_store(&store);
        assert_eq!(policy.lifetime_secs, 9_000_000_000_000_000);

        let cookie = LocaleCookie::new(&Locale::new("de"), &policy, now());
        assert_eq!(cookie.max_age_secs, DEFAULT_COOKIE_LIFETIME_SECS);
        assert_eq!(cookie.expires, Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap());
        assert!(cookie.header_value().contains("Max-Age=1209600;"));
    }

    #[test]
    fn test_negative_overflowing_lifetime_uses_default() {
        let policy = CookiePolicy {
            lifetime_secs: i64::MIN,
            ..CookiePolicy::default()
        };
        let cookie = LocaleCookie::new(&Locale::new("fr"), &policy, now());
        assert_eq!(cookie.max_age_secs, DEFAULT_COOKIE_LIFETIME_SECS);
    }
}
