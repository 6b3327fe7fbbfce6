use crate::session::{DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL_SECS};
use anyhow::{Context, Result};
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Process configuration for the reference server and tools.
#[derive(Debug, Clone)]
pub struct Config {
    // Site
    pub site_config_path: PathBuf,
    pub content_path: Option<PathBuf>,
    pub server_name: String,

    // Server
    pub port: u16,
    pub host_url: String,

    // Sessions
    pub session_ttl_secs: i64,
    pub max_sessions: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);

        Ok(Self {
            // Site
            site_config_path: std::env::var("SITE_CONFIG")
                .map(PathBuf::from)
                .context("SITE_CONFIG not set")?,
            content_path: std::env::var("CONTENT_PATH").ok().map(PathBuf::from),
            server_name: std::env::var("SERVER_NAME").unwrap_or_else(|_| "localhost".to_string()),

            // Server
            port,
            host_url: std::env::var("HOST_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),

            // Sessions
            session_ttl_secs: std::env::var("SESSION_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SESSION_TTL_SECS),
            max_sessions: std::env::var("MAX_SESSIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_SESSIONS),
        })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{origin} must be a mapping at the top level")]
    NotAMapping { origin: String },
}

/// Generic configuration access by slash-separated key (`general/locale`).
pub trait ConfigStore {
    fn get(&self, path: &str) -> Option<Value>;
    fn set(&mut self, path: &str, value: Value);

    fn get_str(&self, path: &str) -> Option<String> {
        self.get(path)
            .and_then(|value| value.as_str().map(str::to_string))
    }

    fn get_i64(&self, path: &str) -> Option<i64> {
        self.get(path).and_then(|value| value.as_i64())
    }

    fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(|value| value.as_bool())
    }
}

/// Site configuration backed by a YAML document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteConfig {
    root: Mapping,
}

impl SiteConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw, &path.display().to_string())
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        Self::parse(raw, "inline configuration")
    }

    fn parse(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })?;

        match value {
            Value::Mapping(root) => Ok(Self { root }),
            // An empty file parses as null
            Value::Null => Ok(Self::default()),
            _ => Err(ConfigError::NotAMapping {
                origin: origin.to_string(),
            }),
        }
    }
}

impl ConfigStore for SiteConfig {
    fn get(&self, path: &str) -> Option<Value> {
        let mut segments = segments(path);
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            current = current.as_mapping()?.get(segment)?;
        }
        Some(current.clone())
    }

    fn set(&mut self, path: &str, value: Value) {
        let keys: Vec<&str> = segments(path).collect();
        let Some((last, parents)) = keys.split_last() else {
            return;
        };

        let mut current = &mut self.root;
        for key in parents {
            let entry = current
                .entry(Value::from(*key))
                .or_insert_with(|| Value::Mapping(Mapping::new()));
            if !entry.is_mapping() {
                *entry = Value::Mapping(Mapping::new());
            }
            current = match entry {
                Value::Mapping(mapping) => mapping,
                _ => unreachable!("entry was just made a mapping"),
            };
        }
        current.insert(Value::from(*last), value);
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// Per-request view of a shared configuration.
///
/// Reads fall through to the base; writes stay in the overlay, so one
/// request's runtime settings are invisible to every other request.
#[derive(Debug)]
pub struct LayeredConfig<'a, C: ConfigStore + ?Sized> {
    base: &'a C,
    overrides: HashMap<String, Value>,
}

impl<'a, C: ConfigStore + ?Sized> LayeredConfig<'a, C> {
    pub fn new(base: &'a C) -> Self {
        Self {
            base,
            overrides: HashMap::new(),
        }
    }

    /// Keys written during this request.
    pub fn overridden(&self) -> impl Iterator<Item = &str> {
        self.overrides.keys().map(String::as_str)
    }
}

impl<C: ConfigStore + ?Sized> ConfigStore for LayeredConfig<'_, C> {
    fn get(&self, path: &str) -> Option<Value> {
        let key = segments(path).collect::<Vec<_>>().join("/");
        match self.overrides.get(&key) {
            Some(value) => Some(value.clone()),
            None => self.base.get(&key),
        }
    }

    fn set(&mut self, path: &str, value: Value) {
        let key = segments(path).collect::<Vec<_>>().join("/");
        self.overrides.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const SITE: &str = r#"
general:
  locale: en_GB
  branding:
    path: /bolt
  cookies_lifetime: 1209600
menu:
  main:
    - { label: Home, path: homepage }
"#;

    // ==================== Config::from_env Tests ====================

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        std::env::set_var("SITE_CONFIG", "/tmp/site.yml");
        std::env::remove_var("CONTENT_PATH");
        std::env::remove_var("SERVER_NAME");
        std::env::remove_var("PORT");
        std::env::remove_var("HOST_URL");

        let config = Config::from_env().expect("Should load");
        assert_eq!(config.site_config_path, PathBuf::from("/tmp/site.yml"));
        assert_eq!(config.content_path, None);
        assert_eq!(config.server_name, "localhost");
        assert_eq!(config.port, 8080);
        assert_eq!(config.host_url, "http://localhost:8080");

        std::env::remove_var("SITE_CONFIG");
    }

    #[test]
    #[serial]
    fn test_from_env_requires_site_config() {
        std::env::remove_var("SITE_CONFIG");
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("SITE_CONFIG"));
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_port_falls_back() {
        std::env::set_var("SITE_CONFIG", "site.yml");
        std::env::set_var("PORT", "not-a-port");
        std::env::remove_var("HOST_URL");

        let config = Config::from_env().expect("Should load");
        assert_eq!(config.port, 8080);

        std::env::remove_var("SITE_CONFIG");
        std::env::remove_var("PORT");
    }

    // ==================== SiteConfig Tests ====================

    #[test]
    fn test_get_nested_path() {
        let site = SiteConfig::from_yaml_str(SITE).unwrap();
        assert_eq!(site.get_str("general/locale").as_deref(), Some("en_GB"));
        assert_eq!(site.get_str("general/branding/path").as_deref(), Some("/bolt"));
        assert_eq!(site.get_i64("general/cookies_lifetime"), Some(1_209_600));
        assert!(site.get("general/missing").is_none());
        assert!(site.get("general/locale/deeper").is_none());
    }

    #[test]
    fn test_set_creates_intermediate_mappings() {
        let mut site = SiteConfig::default();
        site.set("extensions/i18n/detection", Value::from("domain"));
        assert_eq!(
            site.get_str("extensions/i18n/detection").as_deref(),
            Some("domain")
        );
    }

    #[test]
    fn test_set_replaces_scalar_parent() {
        let mut site = SiteConfig::from_yaml_str("general: 5").unwrap();
        site.set("general/locale", Value::from("de_DE"));
        assert_eq!(site.get_str("general/locale").as_deref(), Some("de_DE"));
    }

    #[test]
    fn test_empty_document_is_empty_config() {
        let site = SiteConfig::from_yaml_str("").unwrap();
        assert_eq!(site, SiteConfig::default());
    }

    #[test]
    fn test_non_mapping_document_is_rejected() {
        let err = SiteConfig::from_yaml_str("- a\n- b").unwrap_err();
        assert!(matches!(err, ConfigError::NotAMapping { .. }));
    }

    #[test]
    fn test_invalid_yaml_is_rejected() {
        let err = SiteConfig::from_yaml_str("general: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SiteConfig::load(Path::new("/nonexistent/site.yml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/site.yml"));
    }

    // ==================== LayeredConfig Tests ====================

    #[test]
    fn test_layered_reads_through_and_isolates_writes() {
        let site = SiteConfig::from_yaml_str(SITE).unwrap();
        let mut layered = LayeredConfig::new(&site);

        assert_eq!(layered.get_str("general/locale").as_deref(), Some("en_GB"));
        layered.set("/general/locale/", Value::from("de_DE"));
        assert_eq!(layered.get_str("general/locale").as_deref(), Some("de_DE"));
        assert_eq!(layered.overridden().collect::<Vec<_>>(), vec!["general/locale"]);

        // The shared base is untouched
        assert_eq!(site.get_str("general/locale").as_deref(), Some("en_GB"));
    }
}
