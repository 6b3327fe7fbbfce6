//! Locale resolution and localized content projection.
//!
//! This module decides which locale a request runs under and which stored
//! value of a logical field is shown for it.
//!
//! # Architecture
//!
//! - `locale`: Locale identifiers, detection tokens and the ordered locale table
//! - `resolver`: Picks the active locale from query/host, session, cookie or default
//! - `persist`: Session, cookie and runtime-config write-back after resolution
//! - `schema`: Expands content-type fields into per-locale variants
//! - `field`: Typed field values and the localized-or-original field fallback
//! - `registry`: Built-in language display names
//! - `settings`: The `extensions/i18n` settings block
//! - `engine`: `I18n`, the shared entry point tying the above together
//!
//! # Example
//!
//! ```rust,ignore
//! use site_i18n::i18n::{I18n, LocaleSignals};
//!
//! let i18n = I18n::from_store(&site_config, "example.com");
//! let active = i18n.resolve(&LocaleSignals {
//!     query: Some("de"),
//!     ..Default::default()
//! });
//! ```

mod engine;
mod field;
mod locale;
mod persist;
mod registry;
mod resolver;
mod schema;
mod settings;

pub use engine::{I18n, CONTENT_TYPES_KEY, DEFAULT_LOCALE, LOCALE_KEY, SETTINGS_KEY};
pub use field::{resolve_field, ContentRecord, FieldValue, LocalizedFieldKey, Markup};
pub use locale::{DetectionBinding, DetectionStrategy, Locale, LocaleConfig};
pub use persist::{
    CookiePolicy, LocaleCookie, LocaleHook, PersistOutcome, SessionStore,
    DEFAULT_COOKIE_LIFETIME_SECS,
};
pub use registry::{LanguageConfig, LanguageNames, LanguageRegistry};
pub use resolver::{
    ActiveLocale, LocaleResolver, LocaleSignals, LocaleSource, LOCALE_COOKIE, QUERY_PARAM,
    SESSION_KEY,
};
pub use schema::{ContentType, ContentTypes, FieldSpec, SchemaLocalizer};
pub use settings::I18nSettings;
