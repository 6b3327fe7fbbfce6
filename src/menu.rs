//! Menu loading and link resolution with localized titles.

use crate::config::ConfigStore;
use crate::i18n::{ContentRecord, FieldValue, Locale, LocalizedFieldKey};
use crate::path::fix_path;
use crate::routing::RouteResolver;
use crate::storage::{ContentStorage, Record};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::sync::OnceLock;
use tracing::warn;

/// Configuration key holding all menus.
pub const MENU_KEY: &str = "menu";

/// Menu path that always links to the site root.
const HOMEPAGE: &str = "homepage";

/// One entry of a navigation menu.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// `homepage`, a content reference like `pages/1`, or a plain path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Named route, resolved through a [`RouteResolver`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub param: IndexMap<String, Value>,

    /// Query string appended to route links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub submenu: Vec<MenuItem>,

    /// Content record the item points at, once resolved
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub record: Option<Record>,

    /// Any other keys, including localized `label_<subtag>`/`title_<subtag>`
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl MenuItem {
    fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

impl ContentRecord for MenuItem {
    fn value(&self, field: &str) -> Option<FieldValue> {
        let known = match field {
            "label" => self.label.as_deref(),
            "title" => self.title.as_deref(),
            "path" => self.path.as_deref(),
            "link" => self.link.as_deref(),
            _ => return self.extra.get(field).cloned().map(FieldValue::from),
        };
        known.map(FieldValue::from)
    }
}

/// Load the menu named `identifier`, or the first declared menu.
///
/// Returns the lower-cased menu name and its items. Missing or malformed menu
/// data yields an empty menu.
pub fn select_menu<C: ConfigStore + ?Sized>(
    store: &C,
    identifier: Option<&str>,
) -> (String, Vec<MenuItem>) {
    let menus = match store.get(MENU_KEY) {
        Some(Value::Mapping(menus)) => menus,
        _ => return (String::new(), Vec::new()),
    };

    let requested = identifier
        .filter(|id| !id.is_empty())
        .and_then(|id| menus.get(id).map(|menu| (id.to_string(), menu)));

    let (name, raw) = match requested {
        Some(found) => found,
        None => match menus.iter().next() {
            Some((key, menu)) => (key.as_str().unwrap_or_default().to_string(), menu),
            None => return (String::new(), Vec::new()),
        },
    };

    let items = match raw {
        Value::Sequence(entries) => entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                match serde_yaml::from_value::<MenuItem>(entry.clone()) {
                    Ok(item) => Some(item),
                    Err(e) => {
                        warn!("Skipping malformed item {} of menu '{}': {}", index, name, e);
                        None
                    }
                }
            })
            .collect(),
        _ => Vec::new(),
    };

    (name.to_lowercase(), items)
}

/// Resolves menu item links for one request.
pub struct MenuBuilder<'a> {
    root: &'a str,
    active: &'a Locale,
    storage: &'a dyn ContentStorage,
    routes: &'a dyn RouteResolver,
}

impl<'a> MenuBuilder<'a> {
    pub fn new(
        root: &'a str,
        active: &'a Locale,
        storage: &'a dyn ContentStorage,
        routes: &'a dyn RouteResolver,
    ) -> Self {
        Self {
            root,
            active,
            storage,
            routes,
        }
    }

    /// Resolve every item and, recursively, every submenu.
    pub fn build(&self, items: Vec<MenuItem>) -> Vec<MenuItem> {
        items.into_iter().map(|item| self.resolve_item(item)).collect()
    }

    /// Give `item` a `link`, and fill labels from the content it points at.
    pub fn resolve_item(&self, mut item: MenuItem) -> MenuItem {
        let submenu = std::mem::take(&mut item.submenu);
        item.submenu = self.build(submenu);

        if item.path.as_deref() == Some(HOMEPAGE) {
            item.link = Some(self.root.to_string());
        } else if let Some(route) = &item.route {
            let params = item
                .param
                .iter()
                .map(|(name, value)| (name.clone(), scalar_to_string(value)))
                .collect();
            let add = item.add.as_deref().unwrap_or_default();
            item.link = Some(self.routes.path(route, &params, add));
        } else if let Some(path) = item.path.clone() {
            let record = if is_content_reference(&path) {
                self.storage.get_content(&path)
            } else {
                None
            };

            match record {
                Some(record) => self.apply_record(&mut item, record),
                // Anything else is linked as given
                None => item.link = Some(fix_path(&format!("{}{}", self.root, path))),
            }
        }

        item
    }

    fn apply_record(&self, item: &mut MenuItem, record: Record) {
        if is_blank(&item.label) {
            item.label = Some(non_empty_text(record.value("title")));
        }
        if is_blank(&item.title) {
            item.title = Some(non_empty_text(record.value("subtitle")));
        }

        self.overlay_localized(item, &record, "title", "label");
        self.overlay_localized(item, &record, "subtitle", "title");

        item.link = Some(record.link().to_string());
        item.record = Some(record);
    }

    /// Copy `<source>_<subtag>` from the record into `<target>_<subtag>` on
    /// the item unless the item already sets it.
    fn overlay_localized(&self, item: &mut MenuItem, record: &Record, source: &str, target: &str) {
        let source_key = LocalizedFieldKey::new(source, self.active);
        let target_key = LocalizedFieldKey::new(target, self.active);

        let Some(value) = record
            .value(source_key.as_str())
            .filter(|value| *value != FieldValue::Null)
        else {
            return;
        };

        if item
            .extra_str(target_key.as_str())
            .is_some_and(|existing| !existing.is_empty())
        {
            return;
        }

        item.extra.insert(
            target_key.into_string(),
            Value::from(non_empty_text(Some(value))),
        );
    }
}

/// `true` for `type/id` shaped paths such as `pages/1` or `entries/hello-world`.
fn is_content_reference(path: &str) -> bool {
    static CONTENT_PATH: OnceLock<Regex> = OnceLock::new();
    CONTENT_PATH
        .get_or_init(|| Regex::new(r"(?i)^[a-z0-9_-]+/[a-z0-9_-]+$").expect("static regex"))
        .is_match(path)
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

fn non_empty_text(value: Option<FieldValue>) -> String {
    match value {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => String::new(),
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => serde_yaml::to_string(other)
            .unwrap_or_default()
            .trim()
            .to_string(),
    }
}
