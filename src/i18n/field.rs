//! Field values, localized field keys and the render-time field fallback.

use crate::i18n::Locale;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Name of the locale-specific variant of a field: `<base>_<subtag>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalizedFieldKey {
    key: String,
}

impl LocalizedFieldKey {
    pub fn new(base: &str, locale: &Locale) -> Self {
        Self {
            key: format!("{}_{}", base, locale.subtag()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Whether `name` already carries the suffix for `locale`.
    pub fn is_localized_name(name: &str, locale: &Locale) -> bool {
        name.strip_suffix(locale.subtag())
            .is_some_and(|rest| rest.ends_with('_'))
    }

    pub fn into_string(self) -> String {
        self.key
    }
}

impl fmt::Display for LocalizedFieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Already-rendered markup (HTML).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Markup(String);

impl Markup {
    pub fn new(html: impl Into<String>) -> Self {
        Self(html.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored field value as exposed by a content record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Markup(Markup),
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Whether the value counts as missing for fallback purposes.
    ///
    /// Zero-length markup is empty just like an empty string. Booleans and
    /// numbers are always present values.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(text) => text.is_empty(),
            FieldValue::Markup(markup) => markup.is_empty(),
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Bool(_) | FieldValue::Integer(_) | FieldValue::Float(_) => false,
        }
    }

    /// Text content for string-like values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Markup(markup) => Some(markup.as_str()),
            _ => None,
        }
    }

    /// Wrap string content as markup, leaving other values untouched.
    pub fn into_markup(self) -> FieldValue {
        match self {
            FieldValue::Text(text) => FieldValue::Markup(Markup::new(text)),
            other => other,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Bool(value) => write!(f, "{}", value),
            FieldValue::Integer(value) => write!(f, "{}", value),
            FieldValue::Float(value) => write!(f, "{}", value),
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Markup(markup) => f.write_str(markup.as_str()),
            FieldValue::List(items) => {
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

impl From<Markup> for FieldValue {
    fn from(markup: Markup) -> Self {
        FieldValue::Markup(markup)
    }
}

impl From<serde_yaml::Value> for FieldValue {
    fn from(value: serde_yaml::Value) -> Self {
        use serde_yaml::Value;

        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => FieldValue::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => FieldValue::Text(s),
            Value::Sequence(items) => {
                FieldValue::List(items.into_iter().map(FieldValue::from).collect())
            }
            // Nested mappings are flattened to their YAML text
            Value::Mapping(_) | Value::Tagged(_) => {
                FieldValue::Text(serde_yaml::to_string(&value).unwrap_or_default())
            }
        }
    }
}

impl From<&serde_json::Value> for FieldValue {
    fn from(value: &serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => FieldValue::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => FieldValue::Text(s.clone()),
            Value::Array(items) => FieldValue::List(items.iter().map(FieldValue::from).collect()),
            Value::Object(_) => FieldValue::Text(value.to_string()),
        }
    }
}

/// Read access to the stored values of a content (or menu) record.
pub trait ContentRecord {
    fn value(&self, field: &str) -> Option<FieldValue>;
}

impl ContentRecord for IndexMap<String, FieldValue> {
    fn value(&self, field: &str) -> Option<FieldValue> {
        self.get(field).cloned()
    }
}

impl ContentRecord for serde_json::Map<String, serde_json::Value> {
    fn value(&self, field: &str) -> Option<FieldValue> {
        self.get(field).map(FieldValue::from)
    }
}

/// Resolve `field` of `record` for the active locale.
///
/// Returns the `<field>_<subtag>` value when it exists and is not empty,
/// otherwise the base value as stored (which may itself be absent or empty).
/// No further fallback chain is consulted.
pub fn resolve_field<R>(record: &R, field: &str, active: &Locale) -> Option<FieldValue>
where
    R: ContentRecord + ?Sized,
{
    if !LocalizedFieldKey::is_localized_name(field, active) {
        let key = LocalizedFieldKey::new(field, active);
        if let Some(localized) = record.value(key.as_str()) {
            if !localized.is_empty() {
                return Some(localized);
            }
        }
    }

    record.value(field)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(entries: &[(&str, FieldValue)]) -> IndexMap<String, FieldValue> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    // ==================== LocalizedFieldKey Tests ====================

    #[test]
    fn test_localized_key_uses_subtag() {
        let key = LocalizedFieldKey::new("title", &Locale::new("de_DE"));
        assert_eq!(key.as_str(), "title_de");
    }

    #[test]
    fn test_localized_key_is_deterministic() {
        let locale = Locale::new("fr_FR");
        assert_eq!(
            LocalizedFieldKey::new("body", &locale),
            LocalizedFieldKey::new("body", &locale)
        );
    }

    #[test]
    fn test_is_localized_name() {
        let de = Locale::new("de_DE");
        assert!(LocalizedFieldKey::is_localized_name("title_de", &de));
        assert!(!LocalizedFieldKey::is_localized_name("title", &de));
        assert!(!LocalizedFieldKey::is_localized_name("titlede", &de));
        assert!(!LocalizedFieldKey::is_localized_name("de", &de));
    }

    // ==================== Emptiness Tests ====================

    #[test]
    fn test_empty_markup_counts_as_empty() {
        assert!(FieldValue::Markup(Markup::new("")).is_empty());
        assert!(!FieldValue::Markup(Markup::new("<p>x</p>")).is_empty());
    }

    #[test]
    fn test_scalar_emptiness() {
        assert!(FieldValue::Null.is_empty());
        assert!(FieldValue::Text(String::new()).is_empty());
        assert!(FieldValue::List(vec![]).is_empty());
        assert!(!FieldValue::Bool(false).is_empty());
        assert!(!FieldValue::Integer(0).is_empty());
    }

    // ==================== resolve_field Tests ====================

    #[test]
    fn test_resolve_field_prefers_localized_value() {
        let rec = record(&[("title", "Hello".into()), ("title_de", "Hallo".into())]);
        let value = resolve_field(&rec, "title", &Locale::new("de_DE"));
        assert_eq!(value, Some(FieldValue::from("Hallo")));
    }

    #[test]
    fn test_resolve_field_falls_back_when_localized_missing() {
        let rec = record(&[("title", "Hello".into())]);
        let value = resolve_field(&rec, "title", &Locale::new("de_DE"));
        assert_eq!(value, Some(FieldValue::from("Hello")));
    }

    #[test]
    fn test_resolve_field_falls_back_when_localized_empty() {
        let rec = record(&[("title", "Hello".into()), ("title_de", "".into())]);
        let value = resolve_field(&rec, "title", &Locale::new("de_DE"));
        assert_eq!(value, Some(FieldValue::from("Hello")));
    }

    #[test]
    fn test_resolve_field_falls_back_when_localized_markup_empty() {
        let rec = record(&[
            ("body", Markup::new("<p>Hi</p>").into()),
            ("body_de", Markup::new("").into()),
        ]);
        let value = resolve_field(&rec, "body", &Locale::new("de_DE"));
        assert_eq!(value, Some(FieldValue::Markup(Markup::new("<p>Hi</p>"))));
    }

    #[test]
    fn test_resolve_field_returns_empty_base_as_is() {
        let rec = record(&[("title", "".into())]);
        let value = resolve_field(&rec, "title", &Locale::new("fr"));
        assert_eq!(value, Some(FieldValue::from("")));
    }

    #[test]
    fn test_resolve_field_absent_everywhere() {
        let rec = record(&[]);
        assert_eq!(resolve_field(&rec, "title", &Locale::new("fr")), None);
    }

    #[test]
    fn test_resolve_field_no_third_locale_fallback() {
        let rec = record(&[("title_fr", "Bonjour".into())]);
        assert_eq!(resolve_field(&rec, "title", &Locale::new("de_DE")), None);
    }

    #[test]
    fn test_resolve_field_already_suffixed_name() {
        let rec = record(&[("title_de", "Hallo".into()), ("title_de_de", "x".into())]);
        let value = resolve_field(&rec, "title_de", &Locale::new("de_DE"));
        assert_eq!(value, Some(FieldValue::from("Hallo")));
    }

    #[test]
    fn test_resolve_field_on_json_object() {
        let json = serde_json::json!({"label": "Home", "label_nl": "Thuis"});
        let map = json.as_object().unwrap();
        let value = resolve_field(map, "label", &Locale::new("nl_NL"));
        assert_eq!(value, Some(FieldValue::from("Thuis")));
    }

    // ==================== Conversion Tests ====================

    #[test]
    fn test_from_yaml_scalars() {
        let value: serde_yaml::Value = serde_yaml::from_str("[1, 2.5, true, ~, text]").unwrap();
        assert_eq!(
            FieldValue::from(value),
            FieldValue::List(vec![
                FieldValue::Integer(1),
                FieldValue::Float(2.5),
                FieldValue::Bool(true),
                FieldValue::Null,
                FieldValue::from("text"),
            ])
        );
    }

    #[test]
    fn test_display_list() {
        let list = FieldValue::List(vec!["a".into(), FieldValue::Integer(2)]);
        assert_eq!(list.to_string(), "a, 2");
    }
}
