//! Content-type schema expansion.
//!
//! Fields flagged with `i18n: true` get one sibling field per non-default
//! locale (`title` → `title_de`, `title_fr`), labelled with the language name.
//! Fields that `uses` a localizable sibling (e.g. a slug built from the title)
//! are expanded as well so each variant points at its own locale's sibling.

use crate::i18n::{LanguageNames, Locale, LocaleConfig, LocalizedFieldKey};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::debug;

const FIELDS_KEY: &str = "fields";
const LABEL_KEY: &str = "label";
const I18N_KEY: &str = "i18n";
const LOCALIZABLE_KEY: &str = "localizable";
const USES_KEY: &str = "uses";

/// Definition of a single content-type field.
///
/// Parsing never fails: properties with an unexpected shape stay in
/// [`FieldSpec::extra`] under their own key, and a definition that is not a
/// mapping at all is carried through verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub struct FieldSpec {
    pub label: Option<String>,

    /// Whether per-locale variants of this field are stored
    pub localizable: bool,

    /// Sibling fields this field is derived from
    pub uses: Option<Vec<String>>,

    /// Every other property (`type`, `class`, `values`, ...) in declaration order
    pub extra: IndexMap<String, Value>,

    raw: Option<Value>,
}

impl FieldSpec {
    /// Label shown for the field: the configured one, else the capitalized name.
    pub fn display_label(&self, name: &str) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => capitalize(name),
        }
    }

    /// The `type` property, if any.
    pub fn field_type(&self) -> Option<&str> {
        self.extra.get("type").and_then(|value| value.as_str())
    }

    /// Whether the definition was something other than a mapping.
    pub fn is_opaque(&self) -> bool {
        self.raw.is_some()
    }
}

impl From<Value> for FieldSpec {
    fn from(value: Value) -> Self {
        let Some(properties) = string_keyed(&value) else {
            return Self {
                raw: Some(value),
                ..Self::default()
            };
        };

        let mut spec = Self::default();
        for (key, value) in properties {
            let recognized = match (key.as_str(), &value) {
                (LABEL_KEY, Value::String(label)) => {
                    spec.label = Some(label.clone());
                    true
                }
                (I18N_KEY | LOCALIZABLE_KEY, Value::Bool(flag)) => {
                    spec.localizable |= *flag;
                    true
                }
                (USES_KEY, uses) => {
                    spec.uses = parse_uses(uses);
                    spec.uses.is_some()
                }
                _ => false,
            };
            if !recognized {
                spec.extra.insert(key, value);
            }
        }
        spec
    }
}

impl From<FieldSpec> for Value {
    fn from(spec: FieldSpec) -> Self {
        if let Some(raw) = spec.raw {
            return raw;
        }

        let mut mapping = Mapping::new();
        if let Some(label) = spec.label {
            mapping.insert(LABEL_KEY.into(), label.into());
        }
        if spec.localizable {
            mapping.insert(I18N_KEY.into(), true.into());
        }
        if let Some(uses) = spec.uses {
            mapping.insert(USES_KEY.into(), uses.into());
        }
        for (key, value) in spec.extra {
            if !mapping.contains_key(key.as_str()) {
                mapping.insert(key.into(), value);
            }
        }
        Value::Mapping(mapping)
    }
}

/// `uses` may be written as a single field name or a list of names.
fn parse_uses(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(name) => Some(vec![name.clone()]),
        Value::Sequence(names) => names
            .iter()
            .map(|name| name.as_str().map(str::to_string))
            .collect(),
        _ => None,
    }
}

/// The entries of `value` if it is a mapping with only string keys.
fn string_keyed(value: &Value) -> Option<Vec<(String, Value)>> {
    value
        .as_mapping()?
        .iter()
        .map(|(key, value)| Some((key.as_str()?.to_string(), value.clone())))
        .collect()
}

/// A content type: its ordered fields plus all other settings untouched.
///
/// Parsed as leniently as [`FieldSpec`]. A `fields` entry that is not a
/// mapping of names stays in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub struct ContentType {
    pub fields: IndexMap<String, FieldSpec>,

    pub extra: IndexMap<String, Value>,

    raw: Option<Value>,
}

impl ContentType {
    /// The same content type with `fields` replaced.
    pub fn with_fields(&self, fields: IndexMap<String, FieldSpec>) -> Self {
        Self {
            fields,
            extra: self.extra.clone(),
            raw: self.raw.clone(),
        }
    }
}

impl From<Value> for ContentType {
    fn from(value: Value) -> Self {
        let Some(properties) = string_keyed(&value) else {
            return Self {
                raw: Some(value),
                ..Self::default()
            };
        };

        let mut content_type = Self::default();
        for (key, value) in properties {
            if key == FIELDS_KEY {
                if let Some(fields) = string_keyed(&value) {
                    content_type.fields = fields
                        .into_iter()
                        .map(|(name, spec)| (name, FieldSpec::from(spec)))
                        .collect();
                    continue;
                }
            }
            content_type.extra.insert(key, value);
        }
        content_type
    }
}

impl From<ContentType> for Value {
    fn from(content_type: ContentType) -> Self {
        if let Some(raw) = content_type.raw {
            return raw;
        }

        let mut mapping = Mapping::new();
        if !content_type.extra.contains_key(FIELDS_KEY) {
            let fields: Mapping = content_type
                .fields
                .into_iter()
                .map(|(name, spec)| (Value::from(name), Value::from(spec)))
                .collect();
            mapping.insert(FIELDS_KEY.into(), Value::Mapping(fields));
        }
        for (key, value) in content_type.extra {
            mapping.insert(key.into(), value);
        }
        Value::Mapping(mapping)
    }
}

/// The content-type registry keyed by content-type name.
pub type ContentTypes = IndexMap<String, ContentType>;

/// Expands content-type schemas into per-locale field variants.
pub struct SchemaLocalizer<'a> {
    locales: &'a LocaleConfig,
    default_locale: &'a Locale,
    names: &'a dyn LanguageNames,
}

impl<'a> SchemaLocalizer<'a> {
    pub fn new(
        locales: &'a LocaleConfig,
        default_locale: &'a Locale,
        names: &'a dyn LanguageNames,
    ) -> Self {
        Self {
            locales,
            default_locale,
            names,
        }
    }

    /// Expand every content type. The input is left untouched.
    pub fn localize(&self, types: &ContentTypes) -> ContentTypes {
        types
            .iter()
            .map(|(name, content_type)| {
                let expanded = content_type.with_fields(self.localize_fields(&content_type.fields));
                (name.clone(), expanded)
            })
            .collect()
    }

    /// Expand one field list.
    ///
    /// Original fields are always kept. A generated key never replaces a
    /// field that already exists, whether declared in the input or generated
    /// for an earlier locale.
    pub fn localize_fields(
        &self,
        fields: &IndexMap<String, FieldSpec>,
    ) -> IndexMap<String, FieldSpec> {
        let mut expanded = IndexMap::with_capacity(fields.len());

        for (name, spec) in fields {
            expanded
                .entry(name.clone())
                .or_insert_with(|| spec.clone());

            let original_label = spec.display_label(name);

            for locale in self.locales.locales() {
                if locale == self.default_locale {
                    continue;
                }

                let (uses, has_localized_dependency) =
                    rewrite_uses(spec.uses.as_deref(), fields, locale);

                // Unlocalized fields map onto themselves, which already exist
                if !(spec.localizable || has_localized_dependency) {
                    continue;
                }

                let key = LocalizedFieldKey::new(name, locale);
                if fields.contains_key(key.as_str()) || expanded.contains_key(key.as_str()) {
                    debug!("Keeping existing field '{}' for locale {}", key, locale);
                    continue;
                }

                let mut variant = spec.clone();
                variant.label = Some(format!(
                    "{} ({})",
                    original_label,
                    self.display_name(locale)
                ));
                variant.localizable = false;
                variant.uses = uses;
                for key in [LABEL_KEY, I18N_KEY, LOCALIZABLE_KEY] {
                    variant.extra.shift_remove(key);
                }

                expanded.insert(key.into_string(), variant);
            }
        }

        expanded
    }

    fn display_name(&self, locale: &Locale) -> String {
        self.names
            .display_name(locale.subtag())
            .unwrap_or_else(|| locale.subtag().to_string())
    }
}

/// Point `uses` entries at the `locale` variants of localizable siblings.
///
/// Returns the rewritten list and whether anything changed. References to
/// unknown fields are left alone.
fn rewrite_uses(
    uses: Option<&[String]>,
    fields: &IndexMap<String, FieldSpec>,
    locale: &Locale,
) -> (Option<Vec<String>>, bool) {
    let Some(uses) = uses else {
        return (None, false);
    };

    let mut changed = false;
    let rewritten = uses
        .iter()
        .map(|target| match fields.get(target) {
            Some(sibling) if sibling.localizable => {
                changed = true;
                LocalizedFieldKey::new(target, locale).into_string()
            }
            _ => target.clone(),
        })
        .collect();

    (Some(rewritten), changed)
}

/// Upper-case the first character (`"title"` → `"Title"`).
fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::{DetectionBinding, LanguageRegistry};

    fn locales() -> LocaleConfig {
        LocaleConfig::new()
            .with("en", DetectionBinding::new("en", "com"))
            .with("de_DE", DetectionBinding::new("de", "de"))
            .with("fr_FR", DetectionBinding::new("fr", "fr"))
    }

    fn fields(yaml: &str) -> IndexMap<String, FieldSpec> {
        serde_yaml::from_str(yaml).expect("valid field yaml")
    }

    fn expand(yaml: &str) -> IndexMap<String, FieldSpec> {
        let locales = locales();
        let default = Locale::new("en");
        let localizer = SchemaLocalizer::new(&locales, &default, LanguageRegistry::get());
        localizer.localize_fields(&fields(yaml))
    }

    fn keys(expanded: &IndexMap<String, FieldSpec>) -> Vec<&str> {
        expanded.keys().map(String::as_str).collect()
    }

    // ==================== Deserialization Tests ====================

    #[test]
    fn test_field_spec_reads_i18n_flag() {
        let spec: FieldSpec = serde_yaml::from_str("{ type: text, i18n: true }").unwrap();
        assert!(spec.localizable);
        assert_eq!(spec.field_type(), Some("text"));
    }

    #[test]
    fn test_field_spec_accepts_localizable_alias() {
        let spec: FieldSpec = serde_yaml::from_str("{ type: text, localizable: true }").unwrap();
        assert!(spec.localizable);
    }

    #[test]
    fn test_field_spec_uses_single_name() {
        let spec: FieldSpec = serde_yaml::from_str("{ type: slug, uses: title }").unwrap();
        assert_eq!(spec.uses, Some(vec!["title".to_string()]));
    }

    #[test]
    fn test_field_spec_serialization_drops_false_flag() {
        let spec: FieldSpec = serde_yaml::from_str("{ type: text }").unwrap();
        let yaml = serde_yaml::to_string(&spec).unwrap();
        assert!(!yaml.contains("i18n"));
        assert!(yaml.contains("type: text"));
    }

    #[test]
    fn test_non_bool_i18n_is_not_localizable_and_kept() {
        let spec: FieldSpec = serde_yaml::from_str("{ type: html, i18n: 'yes' }").unwrap();
        assert!(!spec.localizable);
        assert_eq!(spec.extra["i18n"], Value::from("yes"));

        let yaml = serde_yaml::to_string(&spec).unwrap();
        assert!(yaml.contains("i18n: 'yes'") || yaml.contains("i18n: yes"));
    }

    #[test]
    fn test_unexpected_label_and_uses_are_kept() {
        let spec: FieldSpec = serde_yaml::from_str("{ type: slug, label: 5, uses: 5 }").unwrap();
        assert_eq!(spec.label, None);
        assert_eq!(spec.uses, None);
        assert_eq!(spec.extra["label"], Value::from(5));
        assert_eq!(spec.extra["uses"], Value::from(5));
        assert_eq!(spec.display_label("slug"), "Slug");
    }

    #[test]
    fn test_uses_list_with_non_string_is_kept() {
        let spec: FieldSpec = serde_yaml::from_str("{ uses: [title, 3] }").unwrap();
        assert_eq!(spec.uses, None);
        assert!(spec.extra.contains_key("uses"));
    }

    #[test]
    fn test_non_mapping_field_round_trips() {
        let spec: FieldSpec = serde_yaml::from_str("just text").unwrap();
        assert!(spec.is_opaque());
        assert!(!spec.localizable);
        assert_eq!(serde_yaml::to_value(&spec).unwrap(), Value::from("just text"));
    }

    #[test]
    fn test_content_type_with_list_fields_keeps_them() {
        let content_type: ContentType =
            serde_yaml::from_str("{ name: Odd, fields: [title, body] }").unwrap();
        assert!(content_type.fields.is_empty());

        let value = serde_yaml::to_value(&content_type).unwrap();
        let expected: Value = serde_yaml::from_str("{ name: Odd, fields: [title, body] }").unwrap();
        assert_eq!(value, expected);
    }

    // ==================== Expansion Tests ====================

    #[test]
    fn test_localizable_field_expands_per_non_default_locale() {
        let expanded = expand("title: { type: text, i18n: true }");
        assert_eq!(keys(&expanded), vec!["title", "title_de", "title_fr"]);
        assert_eq!(expanded["title_de"].label.as_deref(), Some("Title (German)"));
        assert_eq!(expanded["title_fr"].label.as_deref(), Some("Title (French)"));
        assert_eq!(expanded["title_de"].field_type(), Some("text"));
        assert!(!expanded["title_de"].localizable);
        assert!(expanded["title"].localizable);
    }

    #[test]
    fn test_explicit_label_is_suffixed() {
        let expanded = expand("teaser: { type: html, label: Intro text, i18n: true }");
        assert_eq!(
            expanded["teaser_fr"].label.as_deref(),
            Some("Intro text (French)")
        );
    }

    #[test]
    fn test_plain_field_is_not_duplicated() {
        let expanded = expand("image: { type: image }");
        assert_eq!(keys(&expanded), vec!["image"]);
        assert_eq!(expanded["image"].label, None);
    }

    #[test]
    fn test_uses_localizable_sibling_expands_dependent_field() {
        let expanded = expand(
            r#"
title: { type: text, i18n: true }
slug: { type: slug, uses: title }
"#,
        );
        assert_eq!(
            keys(&expanded),
            vec!["title", "title_de", "title_fr", "slug", "slug_de", "slug_fr"]
        );
        assert_eq!(expanded["slug"].uses, Some(vec!["title".to_string()]));
        assert_eq!(expanded["slug_de"].uses, Some(vec!["title_de".to_string()]));
        assert_eq!(expanded["slug_fr"].label.as_deref(), Some("Slug (French)"));
    }

    #[test]
    fn test_uses_mixed_targets_only_rewrites_localizable() {
        let expanded = expand(
            r#"
title: { type: text, i18n: true }
date: { type: date }
slug: { type: slug, uses: [title, date] }
"#,
        );
        assert_eq!(
            expanded["slug_de"].uses,
            Some(vec!["title_de".to_string(), "date".to_string()])
        );
    }

    #[test]
    fn test_uses_missing_target_is_tolerated() {
        let expanded = expand("slug: { type: slug, uses: [nonexistent] }");
        assert_eq!(keys(&expanded), vec!["slug"]);
        assert_eq!(expanded["slug"].uses, Some(vec!["nonexistent".to_string()]));
    }

    #[test]
    fn test_explicit_field_beats_generated_key() {
        let expanded = expand(
            r#"
title: { type: text, i18n: true }
title_de: { type: text, label: Hand written }
"#,
        );
        assert_eq!(keys(&expanded), vec!["title", "title_fr", "title_de"]);
        assert_eq!(expanded["title_de"].label.as_deref(), Some("Hand written"));
    }

    #[test]
    fn test_shared_subtag_first_locale_wins() {
        let locales = locales().with("de_AT", DetectionBinding::new("at", "at"));
        let default = Locale::new("en");
        let localizer = SchemaLocalizer::new(&locales, &default, LanguageRegistry::get());
        let expanded = localizer.localize_fields(&fields("title: { i18n: true }"));
        assert_eq!(keys(&expanded), vec!["title", "title_de", "title_fr"]);
    }

    #[test]
    fn test_unknown_language_uses_subtag_as_name() {
        let locales = LocaleConfig::new()
            .with("en", DetectionBinding::new("en", "com"))
            .with("xx_XX", DetectionBinding::new("xx", "xx"));
        let default = Locale::new("en");
        let localizer = SchemaLocalizer::new(&locales, &default, LanguageRegistry::get());
        let expanded = localizer.localize_fields(&fields("title: { i18n: true }"));
        assert_eq!(expanded["title_xx"].label.as_deref(), Some("Title (xx)"));
    }

    #[test]
    fn test_localize_is_deterministic() {
        let types: ContentTypes = serde_yaml::from_str(
            r#"
pages:
  name: Pages
  fields:
    title: { type: text, i18n: true }
    slug: { type: slug, uses: title }
    body: { type: html, i18n: true }
"#,
        )
        .unwrap();
        let locales = locales();
        let default = Locale::new("en");
        let localizer = SchemaLocalizer::new(&locales, &default, LanguageRegistry::get());

        let first = localizer.localize(&types);
        let second = localizer.localize(&types);
        assert_eq!(first, second);
        assert_eq!(first["pages"].extra["name"], serde_yaml::Value::from("Pages"));
        assert_eq!(first["pages"].fields.len(), 9);
    }

    #[test]
    fn test_localize_twice_adds_nothing() {
        let types: ContentTypes =
            serde_yaml::from_str("pages: { fields: { title: { i18n: true } } }").unwrap();
        let locales = locales();
        let default = Locale::new("en");
        let localizer = SchemaLocalizer::new(&locales, &default, LanguageRegistry::get());

        let once = localizer.localize(&types);
        let twice = localizer.localize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_generated_label_replaces_unexpected_label() {
        let expanded = expand("title: { type: text, label: 7, i18n: true }");
        assert_eq!(expanded["title_de"].label.as_deref(), Some("Title (German)"));
        assert!(!expanded["title_de"].extra.contains_key("label"));
        assert_eq!(expanded["title"].extra["label"], Value::from(7));
    }

    #[test]
    fn test_one_bad_field_does_not_block_other_types() {
        let types: ContentTypes = serde_yaml::from_str(
            r#"
pages:
  fields:
    title: { type: text, i18n: true }
news:
  fields:
    teaser: { type: html, i18n: "yes" }
    body: [not, a, mapping]
    intro: { type: text, i18n: true }
"#,
        )
        .unwrap();
        let locales = locales();
        let default = Locale::new("en");
        let localizer = SchemaLocalizer::new(&locales, &default, LanguageRegistry::get());

        let expanded = localizer.localize(&types);
        assert_eq!(
            keys(&expanded["pages"].fields),
            vec!["title", "title_de", "title_fr"]
        );
        assert_eq!(
            keys(&expanded["news"].fields),
            vec!["teaser", "body", "intro", "intro_de", "intro_fr"]
        );
        assert_eq!(expanded["news"].fields["teaser"].extra["i18n"], Value::from("yes"));
        assert!(expanded["news"].fields["body"].is_opaque());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("title"), "Title");
        assert_eq!(capitalize("über"), "Über");
        assert_eq!(capitalize(""), "");
    }
}
