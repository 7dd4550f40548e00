//! Server-side locale detection.
//!
//! Order, first match wins:
//! 1. the `locale` cookie, if it names a registered locale
//! 2. the `Accept-Language` header, in listed order (q-values ignored)
//! 3. the default locale

use crate::i18n::cookie::locale_from_cookie_header;
use crate::i18n::{Locale, LocaleRegistry};
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{ACCEPT_LANGUAGE, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use std::convert::Infallible;

/// Pick the first supported locale from an `Accept-Language` value.
///
/// Weights are dropped, not sorted by: `fr-FR;q=0.1, en` yields `fr-FR`.
pub fn match_accept_language(header: &str) -> Option<Locale> {
    let registry = LocaleRegistry::get();
    header
        .split(',')
        .filter_map(|entry| entry.split(';').next())
        .find_map(|candidate| registry.match_language(candidate))
}

/// Resolve the effective locale from an optional cookie header and an
/// optional `Accept-Language` header. Never fails.
pub fn detect_locale(cookie_header: Option<&str>, accept_language: Option<&str>) -> Locale {
    cookie_header
        .and_then(locale_from_cookie_header)
        .or_else(|| accept_language.and_then(match_accept_language))
        .unwrap_or_else(|| LocaleRegistry::get().default_locale())
}

/// Resolve the effective locale from request headers.
///
/// Multiple `Cookie` headers are all consulted, in order.
pub fn detect_from_headers(headers: &HeaderMap) -> Locale {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(locale_from_cookie_header);
    if let Some(locale) = from_cookie {
        return locale;
    }

    let accept_language = headers
        .get(ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok());
    detect_locale(None, accept_language)
}

/// Extractor yielding the locale detected for the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLocale(pub Locale);

#[async_trait]
impl<S> FromRequestParts<S> for RequestLocale
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestLocale(detect_from_headers(&parts.headers)))
    }
}
