//! Template rendering.
//!
//! The localization core only hands a template name and a data object to a
//! [`Renderer`]. [`HtmlRenderer`] is the small built-in implementation used by
//! the reference server; it knows the language menu, navigation menu and page
//! templates.

use crate::i18n::{resolve_field, Locale, Markup};
use serde_json::{Map, Value};
use thiserror::Error;

pub const LANGUAGE_MENU_TEMPLATE: &str = "_sub_langmenu.html";
pub const MENU_TEMPLATE: &str = "_sub_menu.html";
pub const PAGE_TEMPLATE: &str = "page.html";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown template '{0}'")]
    UnknownTemplate(String),

    #[error("template '{template}' is missing '{field}'")]
    MissingData {
        template: &'static str,
        field: &'static str,
    },
}

/// Renders a named template with a data object into markup.
pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, data: &Value) -> Result<Markup, RenderError>;
}

/// Built-in HTML templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn render(&self, template: &str, data: &Value) -> Result<Markup, RenderError> {
        let html = match template {
            LANGUAGE_MENU_TEMPLATE => render_language_menu(data)?,
            MENU_TEMPLATE => render_menu(data)?,
            PAGE_TEMPLATE => render_page(data),
            other => return Err(RenderError::UnknownTemplate(other.to_string())),
        };
        Ok(Markup::new(html))
    }
}

/// `{ locales: [{locale, name, link, current}], current }`
fn render_language_menu(data: &Value) -> Result<String, RenderError> {
    let locales = data
        .get("locales")
        .and_then(Value::as_array)
        .ok_or(RenderError::MissingData {
            template: LANGUAGE_MENU_TEMPLATE,
            field: "locales",
        })?;

    let mut html = String::from("<ul class=\"i18n-langmenu\">\n");
    for entry in locales {
        let locale = Locale::new(str_field(entry, "locale"));
        let class = if entry.get("current").and_then(Value::as_bool) == Some(true) {
            " class=\"current\""
        } else {
            ""
        };
        html.push_str(&format!(
            "<li{}><a href=\"{}\" hreflang=\"{}\">{}</a></li>\n",
            class,
            escape_html(str_field(entry, "link")),
            escape_html(locale.subtag()),
            escape_html(str_field(entry, "name")),
        ));
    }
    html.push_str("</ul>");
    Ok(html)
}

/// `{ name, menu: [items], locale }`
fn render_menu(data: &Value) -> Result<String, RenderError> {
    let items = data
        .get("menu")
        .and_then(Value::as_array)
        .ok_or(RenderError::MissingData {
            template: MENU_TEMPLATE,
            field: "menu",
        })?;
    let name = data.get("name").and_then(Value::as_str).unwrap_or_default();
    let locale = Locale::new(data.get("locale").and_then(Value::as_str).unwrap_or_default());

    let mut html = String::new();
    render_menu_items(&mut html, items, &format!("menu {}", name), &locale);
    Ok(html)
}

fn render_menu_items(html: &mut String, items: &[Value], class: &str, locale: &Locale) {
    html.push_str(&format!("<ul class=\"{}\">", escape_html(class.trim())));
    for item in items {
        let Some(fields) = item.as_object() else {
            continue;
        };
        let label = localized_text(fields, "label", locale);
        let title = localized_text(fields, "title", locale);
        let link = fields.get("link").and_then(Value::as_str).unwrap_or("#");

        html.push_str("<li>");
        if title.is_empty() {
            html.push_str(&format!(
                "<a href=\"{}\">{}</a>",
                escape_html(link),
                escape_html(&label)
            ));
        } else {
            html.push_str(&format!(
                "<a href=\"{}\" title=\"{}\">{}</a>",
                escape_html(link),
                escape_html(&title),
                escape_html(&label)
            ));
        }
        if let Some(submenu) = fields.get("submenu").and_then(Value::as_array) {
            render_menu_items(html, submenu, "submenu", locale);
        }
        html.push_str("</li>");
    }
    html.push_str("</ul>");
}

/// `{ locale, title, body, language_menu, menu }`; markup fields are inserted verbatim.
fn render_page(data: &Value) -> String {
    let locale = Locale::new(str_field(data, "locale"));
    format!(
        "<!DOCTYPE html>\n<html lang=\"{lang}\">\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body>\n<nav>{languages}</nav>\n<nav>{menu}</nav>\n<main>\n<h1>{title}</h1>\n{body}\n</main>\n</body>\n</html>\n",
        lang = escape_html(locale.subtag()),
        title = escape_html(str_field(data, "title")),
        languages = str_field(data, "language_menu"),
        menu = str_field(data, "menu"),
        body = str_field(data, "body"),
    )
}

fn localized_text(fields: &Map<String, Value>, field: &str, locale: &Locale) -> String {
    resolve_field(fields, field, locale)
        .map(|value| value.to_string())
        .unwrap_or_default()
}

fn str_field<'a>(data: &'a Value, field: &str) -> &'a str {
    data.get(field).and_then(Value::as_str).unwrap_or_default()
}

/// Escape the five HTML special characters.
pub fn escape_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}
