//! Print the localized content types of a site configuration.
//!
//! Usage:
//!   cargo run --bin localize-schema                    # Uses SITE_CONFIG
//!   cargo run --bin localize-schema -- config.yml      # Explicit file
//!
//! Optional environment variables:
//! - SERVER_NAME (defaults to localhost), used to derive default locales

use anyhow::{Context, Result};
use site_i18n::config::{ConfigStore, SiteConfig};
use site_i18n::i18n::{I18n, CONTENT_TYPES_KEY};
use std::path::PathBuf;
use tracing::info;

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("site_i18n=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => std::env::var("SITE_CONFIG")
            .map(PathBuf::from)
            .context("SITE_CONFIG not set and no file given")?,
    };
    let server_name = std::env::var("SERVER_NAME").unwrap_or_else(|_| "localhost".to_string());

    let mut site = SiteConfig::load(&path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    let i18n = I18n::from_store(&site, &server_name);
    let generated = i18n.localize_content_types(&mut site);
    info!("{} localized field(s) generated", generated);

    let types = site.get(CONTENT_TYPES_KEY).unwrap_or_default();
    let yaml = serde_yaml::to_string(&types).context("Failed to serialize content types")?;
    print!("{}", yaml);
    Ok(())
}
