use anyhow::{Context, Result};
use site_i18n::config::{Config, ConfigStore, SiteConfig};
use site_i18n::i18n::{ContentTypes, I18n, CONTENT_TYPES_KEY};
use site_i18n::render::HtmlRenderer;
use site_i18n::routing::PatternRoutes;
use site_i18n::server::{self, AppState};
use site_i18n::session::SessionManager;
use site_i18n::storage::MemoryStorage;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("site_i18n=info".parse()?),
        )
        .init();

    info!("Starting localized site server");

    // Load configuration from environment
    let config = Config::from_env()?;

    // Step 1: Load the site configuration and localize its content types
    let mut site = SiteConfig::load(&config.site_config_path)
        .with_context(|| format!("Failed to load {}", config.site_config_path.display()))?;
    let i18n = I18n::from_store(&site, &config.server_name);
    i18n.localize_content_types(&mut site);

    // Step 2: Load content against the localized schema
    let types: ContentTypes = match site.get(CONTENT_TYPES_KEY) {
        Some(raw) => serde_yaml::from_value(raw).context("Invalid content types")?,
        None => ContentTypes::new(),
    };
    let storage = match &config.content_path {
        Some(path) => MemoryStorage::load(path, &types)
            .with_context(|| format!("Failed to load content from {}", path.display()))?,
        None => MemoryStorage::new(),
    };
    info!("Loaded {} content record(s)", storage.len());

    // Step 3: Serve
    let state = AppState {
        i18n: Arc::new(i18n),
        storage: Arc::new(storage),
        routes: Arc::new(PatternRoutes::from_store(&site, "/")),
        renderer: Arc::new(HtmlRenderer),
        site: Arc::new(site),
        sessions: SessionManager::with_limits(config.session_ttl_secs, config.max_sessions),
        host_url: config.host_url.clone(),
    };

    server::serve(state, config.port).await
}
