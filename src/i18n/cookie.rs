//! The `locale` cookie: reading it from a `Cookie` header and building the
//! `Set-Cookie` value written by the negotiator and the client store.

use crate::i18n::{Locale, LocaleRegistry};
use chrono::{DateTime, Duration, Utc};

/// Cookie carrying the negotiated locale tag.
pub const LOCALE_COOKIE: &str = "locale";

/// One year, in seconds.
pub const LOCALE_COOKIE_MAX_AGE: i64 = 31_536_000;

/// Find a cookie value in a raw `Cookie` header (`a=1; b=2`).
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"'))
}

/// Read the `locale` cookie, accepting only registered tags.
pub fn locale_from_cookie_header(header: &str) -> Option<Locale> {
    cookie_value(header, LOCALE_COOKIE).and_then(|tag| LocaleRegistry::get().by_tag(tag))
}

/// `Set-Cookie` value for the server-side redirect.
pub fn locale_set_cookie(locale: Locale, now: DateTime<Utc>) -> String {
    let expires = now + Duration::seconds(LOCALE_COOKIE_MAX_AGE);
    format!(
        "{}={}; Path=/; Max-Age={}; Expires={}; SameSite=Strict",
        LOCALE_COOKIE,
        locale.tag(),
        LOCALE_COOKIE_MAX_AGE,
        expires.format("%a, %d %b %Y %H:%M:%S GMT")
    )
}

/// `document.cookie` assignment used by the client locale store.
pub fn locale_document_cookie(locale: Locale) -> String {
    format!(
        "{}={}; path=/; max-age={}; SameSite=Strict",
        LOCALE_COOKIE,
        locale.tag(),
        LOCALE_COOKIE_MAX_AGE
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_cookie_value_finds_named_pair() {
        let header = "@sora/theme=dark; locale=fr-FR; other=1";
        assert_eq!(cookie_value(header, "locale"), Some("fr-FR"));
        assert_eq!(cookie_value(header, "@sora/theme"), Some("dark"));
        assert_eq!(cookie_value(header, "missing"), None);
    }

    #[test]
    fn test_cookie_value_does_not_match_prefix() {
        assert_eq!(cookie_value("xlocale=ja-JP", "locale"), None);
    }

    #[test]
    fn test_locale_from_cookie_header_validates() {
        assert_eq!(locale_from_cookie_header("locale=zh-HK"), Some(Locale::ZhHk));
        assert_eq!(locale_from_cookie_header("locale=xx-ZZ"), None);
        assert_eq!(locale_from_cookie_header(""), None);
    }

    #[test]
    fn test_set_cookie_attributes() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let cookie = locale_set_cookie(Locale::EnUs, now);
        assert_eq!(
            cookie,
            "locale=en-US; Path=/; Max-Age=31536000; Expires=Sat, 02 Jan 2027 03:04:05 GMT; SameSite=Strict"
        );
    }

    #[test]
    fn test_document_cookie() {
        assert_eq!(
            locale_document_cookie(Locale::Original),
            "locale=und; path=/; max-age=31536000; SameSite=Strict"
        );
    }
}
