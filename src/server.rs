//! Reference HTTP host: resolves the locale per request and renders pages.

use crate::config::{ConfigStore, LayeredConfig, SiteConfig};
use crate::frontend::{Collaborators, SitePaths, TemplateContext};
use crate::i18n::{
    FieldValue, I18n, LocaleSignals, SessionStore, CONTENT_TYPES_KEY, LOCALE_COOKIE, LOCALE_KEY,
    QUERY_PARAM, SESSION_KEY,
};
use crate::render::{escape_html, RenderError, Renderer, PAGE_TEMPLATE};
use crate::routing::RouteResolver;
use crate::session::{cookie_value, SessionManager, SESSION_COOKIE};
use crate::storage::{ContentStorage, Record};
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::{
        header::{CONTENT_LANGUAGE, COOKIE, HOST, SET_COOKIE},
        HeaderMap, HeaderName, HeaderValue, StatusCode, Uri,
    },
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

/// Configuration key naming the content record served at `/`.
pub const HOMEPAGE_KEY: &str = "homepage";

/// Everything a request handler needs. The site configuration already has
/// its content types localized.
#[derive(Clone)]
pub struct AppState {
    pub i18n: Arc<I18n>,
    pub site: Arc<SiteConfig>,
    pub storage: Arc<dyn ContentStorage>,
    pub routes: Arc<dyn RouteResolver>,
    pub renderer: Arc<dyn Renderer>,
    pub sessions: SessionManager,
    pub host_url: String,
}

/// The parts of an HTTP request a page depends on.
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    pub path: String,
    pub lang: Option<String>,
    pub host: Option<String>,
    pub cookies: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PageResponse {
    pub status: StatusCode,
    pub html: String,
    pub content_language: String,
    pub set_cookies: Vec<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/_i18n/contenttypes", get(content_types))
        .fallback(page)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on http://{}", addr);
    axum::serve(listener, router(state))
        .await
        .context("Server error")?;
    Ok(())
}

async fn health() -> &'static str {
    "OK"
}

/// The localized content-type registry, as JSON.
async fn content_types(State(state): State<Arc<AppState>>) -> Response {
    match state.site.get(CONTENT_TYPES_KEY) {
        Some(types) => Json(types).into_response(),
        None => Json(json!({})).into_response(),
    }
}

async fn page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let header = |name: HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };

    let request = PageRequest {
        path: uri.path().to_string(),
        lang: query.get(QUERY_PARAM).cloned(),
        host: header(HOST),
        cookies: header(COOKIE),
    };

    match render_page(&state, &request, Utc::now()) {
        Ok(page) => page.into_response(),
        Err(e) => {
            error!("Failed to render {}: {}", request.path, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

impl IntoResponse for PageResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, Html(self.html)).into_response();
        let headers = response.headers_mut();

        for cookie in &self.set_cookies {
            if let Ok(value) = HeaderValue::from_str(cookie) {
                headers.append(SET_COOKIE, value);
            }
        }
        if let Ok(value) = HeaderValue::from_str(&self.content_language) {
            headers.insert(CONTENT_LANGUAGE, value);
        }
        response
    }
}

/// Resolve the locale for `request`, persist it and render the page.
pub fn render_page(
    state: &AppState,
    request: &PageRequest,
    now: DateTime<Utc>,
) -> Result<PageResponse, RenderError> {
    let cookies = request.cookies.as_deref().unwrap_or_default();
    let mut session = state
        .sessions
        .open(cookie_value(cookies, SESSION_COOKIE), now);
    let stored = session.get(SESSION_KEY);
    let incoming_cookie = cookie_value(cookies, LOCALE_COOKIE);

    let active = state.i18n.resolve(&LocaleSignals {
        query: request.lang.as_deref(),
        host: request.host.as_deref(),
        session: stored.as_deref(),
        cookie: incoming_cookie,
    });

    let mut config = LayeredConfig::new(state.site.as_ref());
    let outcome = state
        .i18n
        .persist(&active, &mut config, &mut session, incoming_cookie, now);
    let stored_session = state.sessions.save(&session, now);

    let mut set_cookies = Vec::new();
    if session.is_new() && stored_session {
        set_cookies.push(session.cookie_header());
    }
    if let Some(cookie) = &outcome.cookie {
        set_cookies.push(cookie.header_value());
    }

    let paths = SitePaths {
        root: "/".to_string(),
        current: request.path.clone(),
        host_url: state.host_url.clone(),
    };
    let ctx = TemplateContext::new(
        &state.i18n,
        &active,
        &paths,
        Collaborators {
            config: &config,
            renderer: state.renderer.as_ref(),
            storage: state.storage.as_ref(),
            routes: state.routes.as_ref(),
        },
    );

    let record = find_page_record(state, &config, &request.path);
    let (status, title, body) = match &record {
        Some(record) => (
            StatusCode::OK,
            ctx.localized_field(record, "title")
                .map(|title| title.to_string())
                .unwrap_or_default(),
            body_html(ctx.localized_field(record, "body")),
        ),
        None => {
            debug!("No content at {}", request.path);
            (StatusCode::NOT_FOUND, "Page not found".to_string(), String::new())
        }
    };

    let data = json!({
        "locale": active.as_str(),
        "title": title,
        "body": body,
        "language_menu": ctx.language_menu()?.into_string(),
        "menu": ctx.localized_menu(None, None, None)?.into_string(),
    });
    let html = state.renderer.render(PAGE_TEMPLATE, &data)?;

    // The overlay carries the request's locale when it differs from the default
    let content_language = config
        .get_str(LOCALE_KEY)
        .unwrap_or_else(|| active.as_str().to_string())
        .replace('_', "-");

    Ok(PageResponse {
        status,
        html: html.into_string(),
        content_language,
        set_cookies,
    })
}

fn find_page_record<C: ConfigStore + ?Sized>(
    state: &AppState,
    config: &C,
    path: &str,
) -> Option<Record> {
    let path = path.trim_end_matches('/');
    if path.is_empty() {
        return config
            .get_str(HOMEPAGE_KEY)
            .and_then(|reference| state.storage.get_content(&reference));
    }
    state.storage.find_by_link(path)
}

/// Markup is inserted as is; plain text is escaped into a paragraph.
fn body_html(value: Option<FieldValue>) -> String {
    match value {
        Some(FieldValue::Markup(markup)) => markup.into_string(),
        Some(value) if !value.is_empty() => format!("<p>{}</p>", escape_html(&value.to_string())),
        _ => String::new(),
    }
}
