//! Request-time locale negotiation.
//!
//! A page request may carry `?lang=<tag>`. The negotiator resolves it to a
//! canonical locale (exact tag, then alias), and always redirects to the same
//! URL without the parameter. The `locale` cookie is only set when the value
//! resolved; unknown values are dropped silently.

use crate::i18n::cookie::locale_set_cookie;
use crate::i18n::{Locale, LocaleRegistry};
use axum::extract::Request;
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tracing::{debug, warn};
use url::form_urlencoded;

/// Query parameter carrying a locale override.
pub const LANG_PARAM: &str = "lang";

/// Path prefixes the negotiator never touches.
const EXCLUDED_PREFIXES: [&str; 5] = ["/api", "/i18n", "/health", "/_next", "/favicon.ico"];

/// Decision taken for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Negotiation {
    /// No override present; continue to the handler.
    PassThrough,
    /// Redirect to `location`, persisting `locale` when it resolved.
    Redirect {
        location: String,
        locale: Option<Locale>,
    },
}

/// Resolve an override value to a canonical locale.
pub fn resolve_override(value: &str) -> Option<Locale> {
    let registry = LocaleRegistry::get();
    let normalized = value.trim().to_lowercase();
    registry
        .by_tag(&normalized)
        .or_else(|| registry.resolve_alias(&normalized))
}

/// Whether requests to `path` are subject to negotiation.
pub fn is_negotiated_path(path: &str) -> bool {
    !EXCLUDED_PREFIXES.iter().any(|prefix| {
        path == *prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

fn is_lang_param(name: &str) -> bool {
    name.eq_ignore_ascii_case(LANG_PARAM)
}

/// Decide what to do with a request for `path` with raw `query`.
pub fn negotiate(path: &str, query: Option<&str>) -> Negotiation {
    let Some(query) = query else {
        return Negotiation::PassThrough;
    };

    let pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    // An empty `lang=` counts as no override at all.
    let Some((_, value)) = pairs
        .iter()
        .find(|(name, value)| is_lang_param(name) && !value.trim().is_empty())
    else {
        return Negotiation::PassThrough;
    };
    let locale = resolve_override(value);

    let remaining = pairs.iter().filter(|(name, _)| !is_lang_param(name));
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut has_remaining = false;
    for (name, value) in remaining {
        serializer.append_pair(name, value);
        has_remaining = true;
    }

    let location = if has_remaining {
        format!("{}?{}", path, serializer.finish())
    } else {
        path.to_string()
    };

    Negotiation::Redirect { location, locale }
}

/// Axum middleware applying [`negotiate`] to page requests.
pub async fn locale_negotiation(request: Request, next: Next) -> Response {
    let path = request.uri().path();
    if !is_negotiated_path(path) {
        return next.run(request).await;
    }

    match negotiate(path, request.uri().query()) {
        Negotiation::PassThrough => next.run(request).await,
        Negotiation::Redirect { location, locale } => redirect_response(&location, locale),
    }
}

fn redirect_response(location: &str, locale: Option<Locale>) -> Response {
    let Ok(location_header) = HeaderValue::from_str(location) else {
        warn!("Unable to build redirect location from '{}'", location);
        return StatusCode::BAD_REQUEST.into_response();
    };

    let mut response = StatusCode::TEMPORARY_REDIRECT.into_response();
    response.headers_mut().insert(LOCATION, location_header);

    match locale {
        Some(locale) => {
            debug!("Negotiated locale override: {}", locale);
            if let Ok(cookie) = HeaderValue::from_str(&locale_set_cookie(locale, Utc::now())) {
                response.headers_mut().insert(SET_COOKIE, cookie);
            }
        }
        None => debug!("Dropping unrecognized locale override"),
    }

    response
}
