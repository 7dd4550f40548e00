//! Theme preference read from the `@sora/theme` cookie.

use crate::i18n::cookie::cookie_value;
use axum::http::header::COOKIE;
use axum::http::HeaderMap;

pub const THEME_COOKIE: &str = "@sora/theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    /// Parse a cookie value; anything unrecognized means `System`.
    pub fn parse(value: &str) -> Theme {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Theme::Light,
            "dark" => Theme::Dark,
            _ => Theme::System,
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Theme {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|header| cookie_value(header, THEME_COOKIE))
            .map(Theme::parse)
            .unwrap_or_default()
    }

    /// Class applied to the root element. Only an explicit dark choice
    /// forces the dark palette.
    pub fn root_class(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light | Theme::System => "",
        }
    }
}
