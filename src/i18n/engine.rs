//! Process-wide localization state and the per-request entry points.

use crate::config::ConfigStore;
use crate::i18n::{
    ActiveLocale, ContentTypes, CookiePolicy, DetectionBinding, DetectionStrategy, I18nSettings,
    LanguageNames, LanguageRegistry, Locale, LocaleConfig, LocaleCookie, LocaleHook,
    LocaleResolver, LocaleSignals, PersistOutcome, SchemaLocalizer, SessionStore, SESSION_KEY,
};
use chrono::{DateTime, Utc};
use serde_yaml::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Locale used when `general/locale` is not configured.
pub const DEFAULT_LOCALE: &str = "en_GB";

/// Configuration key of the active (and default) locale.
pub const LOCALE_KEY: &str = "general/locale";

/// Configuration key of the content-type registry.
pub const CONTENT_TYPES_KEY: &str = "contenttypes";

/// Configuration key of the extension's settings block.
pub const SETTINGS_KEY: &str = "extensions/i18n";

/// Immutable localization configuration shared by all requests.
///
/// Nothing here changes after construction; the active locale of a request
/// lives in an [`ActiveLocale`] value that callers pass around explicitly.
pub struct I18n {
    settings: I18nSettings,
    default_locale: Locale,
    names: Arc<dyn LanguageNames>,
    hooks: Vec<Arc<dyn LocaleHook>>,
}

impl I18n {
    /// Build from explicit settings.
    ///
    /// A default locale missing from the locale table is appended to it so
    /// the resolver can never produce a locale outside the table.
    pub fn new(mut settings: I18nSettings, default_locale: Locale) -> Self {
        if !settings.locales.contains(default_locale.as_str()) {
            warn!(
                "Default locale {} is not among the configured locales, adding it",
                default_locale
            );
            let binding = DetectionBinding::new(default_locale.subtag(), "");
            settings.locales.insert(default_locale.clone(), binding);
        }

        Self {
            settings,
            default_locale,
            names: Arc::new(RegistryNames),
            hooks: Vec::new(),
        }
    }

    /// Build from the site configuration: `general/locale` and the
    /// `extensions/i18n` block, falling back to defaults derived from
    /// `server_name` when the block is missing or malformed.
    pub fn from_store<C: ConfigStore + ?Sized>(store: &C, server_name: &str) -> Self {
        let default_locale = store
            .get_str(LOCALE_KEY)
            .filter(|locale| !locale.is_empty())
            .map(Locale::from)
            .unwrap_or_else(|| Locale::new(DEFAULT_LOCALE));

        let settings = match store.get(SETTINGS_KEY) {
            Some(raw) => match serde_yaml::from_value::<I18nSettings>(raw) {
                Ok(settings) if !settings.locales.is_empty() => settings,
                Ok(_) => {
                    warn!("No locales configured in {}, using defaults", SETTINGS_KEY);
                    I18nSettings::defaults(&default_locale, server_name)
                }
                Err(e) => {
                    warn!("Invalid {} settings, using defaults: {}", SETTINGS_KEY, e);
                    I18nSettings::defaults(&default_locale, server_name)
                }
            },
            None => I18nSettings::defaults(&default_locale, server_name),
        };

        info!(
            "Localization configured with {} locale(s), default {}, detection {:?}",
            settings.locales.len(),
            default_locale,
            settings.detection
        );

        Self::new(settings, default_locale)
    }

    pub fn with_language_names(mut self, names: Arc<dyn LanguageNames>) -> Self {
        self.names = names;
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn LocaleHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn locales(&self) -> &LocaleConfig {
        &self.settings.locales
    }

    pub fn detection(&self) -> DetectionStrategy {
        self.settings.detection
    }

    pub fn default_locale(&self) -> &Locale {
        &self.default_locale
    }

    pub fn resolver(&self) -> LocaleResolver<'_> {
        LocaleResolver::new(
            &self.settings.locales,
            self.settings.detection,
            &self.default_locale,
        )
    }

    /// Determine the active locale for one request.
    pub fn resolve(&self, signals: &LocaleSignals<'_>) -> ActiveLocale {
        let active = self.resolver().resolve(signals);
        debug!("Resolved locale {} from {}", active.locale(), active.source());
        active
    }

    /// Write the active locale back to the runtime configuration, the
    /// session and (via the returned cookie) the client.
    pub fn persist<C, S>(
        &self,
        active: &ActiveLocale,
        config: &mut C,
        session: &mut S,
        incoming_cookie: Option<&str>,
        now: DateTime<Utc>,
    ) -> PersistOutcome
    where
        C: ConfigStore + ?Sized,
        S: SessionStore + ?Sized,
    {
        let locale = active.locale();
        let mut outcome = PersistOutcome::default();

        if locale != &self.default_locale {
            config.set(LOCALE_KEY, Value::from(locale.as_str()));
            for hook in &self.hooks {
                hook.locale_changed(locale);
            }
            outcome.config_updated = true;
        }

        if session.get(SESSION_KEY).as_deref() != Some(locale.as_str()) {
            session.set(SESSION_KEY, locale.to_string());
            outcome.session_written = true;
        }

        if incoming_cookie != Some(locale.as_str()) {
            let policy = CookiePolicy::from_store(&*config);
            outcome.cookie = Some(LocaleCookie::new(locale, &policy, now));
        }

        outcome
    }

    pub fn schema_localizer(&self) -> SchemaLocalizer<'_> {
        SchemaLocalizer::new(
            &self.settings.locales,
            &self.default_locale,
            self.names.as_ref(),
        )
    }

    /// Replace `contenttypes` in `store` with its localized expansion.
    ///
    /// Returns the number of generated fields. Missing or malformed content
    /// types are left as they are.
    pub fn localize_content_types<C: ConfigStore + ?Sized>(&self, store: &mut C) -> usize {
        let Some(raw) = store.get(CONTENT_TYPES_KEY) else {
            debug!("No content types configured, nothing to localize");
            return 0;
        };

        let types: ContentTypes = match serde_yaml::from_value(raw) {
            Ok(types) => types,
            Err(e) => {
                warn!("Skipping localization of malformed content types: {}", e);
                return 0;
            }
        };

        let expanded = self.schema_localizer().localize(&types);
        let generated = field_count(&expanded) - field_count(&types);

        match serde_yaml::to_value(&expanded) {
            Ok(value) => {
                store.set(CONTENT_TYPES_KEY, value);
                info!(
                    "Added {} localized field(s) across {} content type(s)",
                    generated,
                    expanded.len()
                );
                generated
            }
            Err(e) => {
                warn!("Failed to store localized content types: {}", e);
                0
            }
        }
    }

    /// Human-readable name of `locale`'s language (`de_DE` → `German`).
    pub fn language_name(&self, locale: &Locale) -> String {
        self.names
            .display_name(locale.subtag())
            .unwrap_or_else(|| locale.subtag().to_string())
    }
}

fn field_count(types: &ContentTypes) -> usize {
    types.values().map(|content_type| content_type.fields.len()).sum()
}

/// Adapter so the static registry can sit behind an `Arc<dyn LanguageNames>`.
struct RegistryNames;

impl LanguageNames for RegistryNames {
    fn display_name(&self, subtag: &str) -> Option<String> {
        LanguageRegistry::get().display_name(subtag)
    }
}
