//! Locale resolution and localized content for content-managed websites.
//!
//! The [`i18n`] module holds the localization core. The remaining modules form
//! a small reference host around it: configuration, content storage, menus,
//! routing, rendering and an axum server.

pub mod config;
pub mod frontend;
pub mod i18n;
pub mod menu;
pub mod path;
pub mod render;
pub mod routing;
pub mod server;
pub mod session;
pub mod storage;
