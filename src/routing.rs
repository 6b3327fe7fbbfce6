//! Named-route URL generation for menu items.

use crate::config::ConfigStore;
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::warn;

/// Configuration key holding the route table.
pub const ROUTING_KEY: &str = "routing";

/// Generates the URL path of a named route.
pub trait RouteResolver: Send + Sync {
    /// Path for `route` with `params` filled in and `add` appended as query.
    fn path(&self, route: &str, params: &IndexMap<String, String>, add: &str) -> String;
}

#[derive(Debug, Deserialize)]
struct RouteEntry {
    path: String,
}

/// Route table of `{placeholder}` path patterns.
///
/// Parameters without a placeholder are appended as query arguments, like
/// most URL generators do.
#[derive(Debug, Clone, Default)]
pub struct PatternRoutes {
    root: String,
    routes: IndexMap<String, String>,
}

impl PatternRoutes {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            routes: IndexMap::new(),
        }
    }

    pub fn with_route(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.routes.insert(name.into(), pattern.into());
        self
    }

    /// Read `routing: { <name>: { path: <pattern> } }` from the store.
    pub fn from_store<C: ConfigStore + ?Sized>(store: &C, root: impl Into<String>) -> Self {
        let mut routes = Self::new(root);
        let Some(raw) = store.get(ROUTING_KEY) else {
            return routes;
        };

        match serde_yaml::from_value::<IndexMap<String, RouteEntry>>(raw) {
            Ok(entries) => {
                for (name, entry) in entries {
                    routes.routes.insert(name, entry.path);
                }
            }
            Err(e) => warn!("Ignoring malformed route table: {}", e),
        }
        routes
    }
}

impl RouteResolver for PatternRoutes {
    fn path(&self, route: &str, params: &IndexMap<String, String>, add: &str) -> String {
        let Some(pattern) = self.routes.get(route) else {
            warn!("Unknown route '{}', linking to site root", route);
            return self.root.clone();
        };

        let mut path = pattern.clone();
        let mut query: Vec<String> = Vec::new();
        for (name, value) in params {
            let placeholder = format!("{{{}}}", name);
            if path.contains(&placeholder) {
                path = path.replace(&placeholder, value);
            } else {
                query.push(format!("{}={}", name, value));
            }
        }

        if !add.is_empty() {
            query.push(add.to_string());
        }
        if !query.is_empty() {
            path.push('?');
            path.push_str(&query.join("&"));
        }
        path
    }
}
