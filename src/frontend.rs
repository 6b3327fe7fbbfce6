//! Template-facing functions for one request.
//!
//! [`TemplateContext`] bundles the shared [`I18n`] state with the request's
//! [`ActiveLocale`] and the host collaborators, and exposes the helpers that
//! templates call: language names and switch links, the language menu,
//! localized navigation menus and localized field access.

use crate::config::ConfigStore;
use crate::i18n::{
    resolve_field, ActiveLocale, ContentRecord, DetectionBinding, DetectionStrategy, FieldValue,
    I18n, Locale, Markup, QUERY_PARAM,
};
use crate::menu::{select_menu, MenuBuilder};
use crate::path::fix_path;
use crate::render::{RenderError, Renderer, LANGUAGE_MENU_TEMPLATE, MENU_TEMPLATE};
use crate::routing::RouteResolver;
use crate::storage::ContentStorage;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::warn;
use url::Url;

/// URL pieces of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePaths {
    /// Site root path, e.g. `/`
    pub root: String,
    /// Path of the current page, e.g. `/page/about`
    pub current: String,
    /// Scheme and host, e.g. `https://example.com`
    pub host_url: String,
}

/// Host services the template functions rely on.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub config: &'a dyn ConfigStore,
    pub renderer: &'a dyn Renderer,
    pub storage: &'a dyn ContentStorage,
    pub routes: &'a dyn RouteResolver,
}

/// Entry for the administration "switch language" menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminMenuOption {
    pub label: String,
    pub link: String,
    pub icon: &'static str,
}

pub struct TemplateContext<'a> {
    i18n: &'a I18n,
    active: &'a ActiveLocale,
    paths: &'a SitePaths,
    services: Collaborators<'a>,
}

impl<'a> TemplateContext<'a> {
    pub fn new(
        i18n: &'a I18n,
        active: &'a ActiveLocale,
        paths: &'a SitePaths,
        services: Collaborators<'a>,
    ) -> Self {
        Self {
            i18n,
            active,
            paths,
            services,
        }
    }

    pub fn active(&self) -> &ActiveLocale {
        self.active
    }

    /// Display name of `locale`, or of the active locale.
    pub fn language_name(&self, locale: Option<&str>) -> String {
        self.i18n.language_name(&self.target_locale(locale))
    }

    /// Link that switches the visitor to `locale` (or the active locale).
    ///
    /// With query detection this is the current path plus `?lang=<token>`;
    /// with domain detection the host's top-level label is swapped for the
    /// locale's domain token. Unknown locales link to the active locale.
    pub fn language_link(&self, locale: Option<&str>) -> String {
        let binding = self.binding_for(locale);

        let link = match self.i18n.detection() {
            DetectionStrategy::ByQuery => {
                format!("{}?{}={}", self.paths.current, QUERY_PARAM, binding.query)
            }
            DetectionStrategy::ByDomain => format!(
                "{}{}",
                replace_top_level_domain(&self.paths.host_url, &binding.domain),
                self.paths.current
            ),
        };

        fix_path(&link)
    }

    /// Rendered list of all configured locales with the active one marked.
    pub fn language_menu(&self) -> Result<Markup, RenderError> {
        let locales: Vec<Value> = self
            .i18n
            .locales()
            .locales()
            .map(|locale| {
                json!({
                    "locale": locale.as_str(),
                    "name": self.i18n.language_name(locale),
                    "link": self.language_link(Some(locale.as_str())),
                    "current": locale == self.active.locale(),
                })
            })
            .collect();

        let data = json!({
            "locales": locales,
            "current": self.active.as_str(),
        });
        self.services
            .renderer
            .render(LANGUAGE_MENU_TEMPLATE, &data)
    }

    /// Render the menu `identifier` (or the first declared menu) with every
    /// item's link resolved and localized titles filled in from content.
    ///
    /// `params` are passed on to the template but never replace the built-in
    /// `name`, `menu` and `locale` entries.
    pub fn localized_menu(
        &self,
        identifier: Option<&str>,
        template: Option<&str>,
        params: Option<&Map<String, Value>>,
    ) -> Result<Markup, RenderError> {
        let (name, items) = select_menu(self.services.config, identifier);
        let builder = MenuBuilder::new(
            &self.paths.root,
            self.active.locale(),
            self.services.storage,
            self.services.routes,
        );
        let menu = builder.build(items);

        let menu = serde_json::to_value(&menu).unwrap_or_else(|e| {
            warn!("Menu '{}' could not be prepared for rendering: {}", name, e);
            Value::Array(Vec::new())
        });

        let mut data = Map::new();
        data.insert("name".to_string(), Value::from(name));
        data.insert("menu".to_string(), menu);
        data.insert("locale".to_string(), Value::from(self.active.as_str()));
        if let Some(params) = params {
            for (key, value) in params {
                data.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }

        self.services
            .renderer
            .render(template.unwrap_or(MENU_TEMPLATE), &Value::Object(data))
    }

    /// The localized value of `field`, falling back to the original.
    pub fn localized_field<R>(&self, record: &R, field: &str) -> Option<FieldValue>
    where
        R: ContentRecord + ?Sized,
    {
        resolve_field(record, field, self.active.locale())
    }

    /// "Switch to <Language>" entries for every locale except the active one.
    pub fn admin_menu_options(&self) -> Vec<AdminMenuOption> {
        self.i18n
            .locales()
            .locales()
            .filter(|locale| *locale != self.active.locale())
            .map(|locale| AdminMenuOption {
                label: format!("Switch to {}", self.i18n.language_name(locale)),
                link: self.language_link(Some(locale.as_str())),
                icon: "fa:flag",
            })
            .collect()
    }

    fn target_locale(&self, locale: Option<&str>) -> Locale {
        match locale {
            Some(locale) if !locale.is_empty() => Locale::new(locale),
            _ => self.active.locale().clone(),
        }
    }

    fn binding_for(&self, locale: Option<&str>) -> DetectionBinding {
        let requested = locale.and_then(|locale| self.i18n.locales().get(locale));
        match requested.or_else(|| self.i18n.locales().get(self.active.as_str())) {
            Some(binding) => binding.clone(),
            None => DetectionBinding::default(),
        }
    }
}

/// Replace the last label of the host in `host_url` with `domain`.
///
/// `https://example.com:8080` with `de` becomes `https://example.de:8080`.
/// Credentials, port and path survive. Hosts without a dot, IP addresses,
/// unparseable URLs and empty tokens are left unchanged.
fn replace_top_level_domain(host_url: &str, domain: &str) -> String {
    let unchanged = host_url.trim_end_matches('/').to_string();
    if domain.is_empty() {
        return unchanged;
    }

    let mut url = match Url::parse(host_url) {
        Ok(url) => url,
        Err(e) => {
            warn!("Cannot swap domain of host URL '{}': {}", host_url, e);
            return unchanged;
        }
    };
    let Some((name, _)) = url.domain().and_then(|host| host.rsplit_once('.')) else {
        return unchanged;
    };

    let host = format!("{}.{}", name, domain);
    if let Err(e) = url.set_host(Some(&host)) {
        warn!("Invalid localized host '{}': {}", host, e);
        return unchanged;
    }
    url.as_str().trim_end_matches('/').to_string()
}
