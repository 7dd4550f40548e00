//! HTTP surface: the translation endpoint, the page shell and a health probe.

use crate::config::Config;
use crate::i18n::negotiate::LANG_PARAM;
use crate::i18n::{
    is_valid_namespace_name, locale_negotiation, FsNamespaceSource, Locale, LocaleRegistry,
    RequestLocale, ServerTranslator, SourceError,
};
use crate::kv::KvClient;
use crate::theme::Theme;
use crate::values::{IcpRecord, SiteValueCache, SiteValues};
use axum::extract::{Path, State};
use axum::http::header::CACHE_CONTROL;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{middleware, Json, Router};
use chrono::{Datelike, Utc};
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

/// Caching policy for served namespaces.
pub const NAMESPACE_CACHE_CONTROL: &str = "public, max-age=3600, stale-while-revalidate=86400";

/// Footer copy rendered on the page shell, in display order.
const FOOTER_KEYS: [&str; 15] = [
    "footer.about.label",
    "footer.about.me",
    "footer.about.site",
    "footer.about.project",
    "footer.more.label",
    "footer.more.repos",
    "footer.more.opensource",
    "footer.more.sponsor",
    "footer.contact.label",
    "footer.contact.github",
    "footer.contact.email",
    "footer.contact.status",
    "footer.legal.rss",
    "footer.legal.sitemap",
    "footer.legal.subscribe",
];

const DEFAULT_TITLE: &str = "貓窝";
const DEFAULT_DESCRIPTION: &str = "服务器在睡大觉";
const DEFAULT_QUOTE: &str = "The server is busy dreaming of code.";
const DEFAULT_INCEPTION: u64 = 2021;
const DEFAULT_OWNER: &str = "Canmi";

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub translator: Arc<ServerTranslator>,
    pub site_values: Arc<SiteValueCache>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        let source = Arc::new(FsNamespaceSource::new(config.locales_dir.clone()));
        let kv = KvClient::new(&config.api_base_url, config.api_timeout);
        Self {
            translator: Arc::new(ServerTranslator::new(source)),
            site_values: Arc::new(SiteValueCache::new(
                kv,
                config.site_value_keys.clone(),
                config.site_values_ttl,
            )),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/i18n/:namespace", get(namespace_json))
        .fallback(not_found)
        .layer(middleware::from_fn(locale_negotiation))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "status": "error", "message": message }))).into_response()
}

/// `GET /i18n/{namespace}`: the raw namespace tree.
async fn namespace_json(State(state): State<AppState>, Path(namespace): Path<String>) -> Response {
    if !is_valid_namespace_name(&namespace) {
        return error_response(StatusCode::BAD_REQUEST, "Invalid namespace format");
    }

    match state.translator.namespace(&namespace).await {
        Ok(tree) => (
            StatusCode::OK,
            [(CACHE_CONTROL, NAMESPACE_CACHE_CONTROL)],
            Json(tree.tree().clone()),
        )
            .into_response(),
        Err(SourceError::NotFound(_)) => {
            debug!("Translation namespace '{}' not found", namespace);
            error_response(StatusCode::NOT_FOUND, "Translation namespace not found")
        }
        Err(SourceError::InvalidName(_)) => {
            error_response(StatusCode::BAD_REQUEST, "Invalid namespace format")
        }
        Err(e) => {
            error!("Error loading translation namespace '{}': {}", namespace, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// Everything the page shell shows.
#[derive(Debug, Clone, PartialEq)]
pub struct PageModel {
    pub locale: Locale,
    pub theme: Theme,
    pub values: SiteValues,
    pub footer: Vec<String>,
    pub powered_by: String,
    pub year: i32,
}

async fn index(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
    headers: HeaderMap,
) -> Html<String> {
    let t = state.translator.for_locale(locale);

    let (values, footer, powered_by) = tokio::join!(
        state.site_values.get(),
        join_all(FOOTER_KEYS.iter().map(|key| t.t(key))),
        t.t("footer.legal.powered"),
    );

    Html(render_page(&PageModel {
        locale,
        theme: Theme::from_headers(&headers),
        values,
        footer,
        powered_by,
        year: Utc::now().year(),
    }))
}

/// Render the page shell as HTML.
pub fn render_page(page: &PageModel) -> String {
    let values = &page.values;
    let title = values.string("site.navbar.title").unwrap_or(DEFAULT_TITLE);
    let description = values
        .string("site.navbar.description")
        .unwrap_or(DEFAULT_DESCRIPTION);
    let quote = values.string("owner.quote").unwrap_or(DEFAULT_QUOTE);
    let owner = values.string("owner.name").unwrap_or(DEFAULT_OWNER);
    let inception = values.number("site.inception").unwrap_or(DEFAULT_INCEPTION);

    let links: String = page
        .footer
        .iter()
        .map(|label| format!("<li>{}</li>", escape_html(label)))
        .collect();

    let class = match page.theme.root_class() {
        "" => String::new(),
        class => format!(" class=\"{}\"", class),
    };

    format!(
        "<!DOCTYPE html>\n<html lang=\"{lang}\"{class}>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n<header><a href=\"/\"><h1>{title}</h1><p>{description}</p></a></header>\n<main><blockquote>{quote}</blockquote></main>\n<footer>\n<ul>{links}</ul>\n<p>© {inception}-{year} {owner}.{icp}</p>\n<p>{powered}</p>\n{switcher}\n</footer>\n</body>\n</html>\n",
        lang = page.locale.html_lang(),
        class = class,
        title = escape_html(title),
        description = escape_html(description),
        quote = escape_html(quote),
        links = links,
        inception = inception,
        year = page.year,
        owner = escape_html(owner),
        icp = render_icp(&values.icp_records("site.icp")),
        powered = escape_html(&page.powered_by),
        switcher = render_locale_switcher(page.locale),
    )
}

/// ICP filings, each preceded by a separator. Empty when there are none.
fn render_icp(records: &[IcpRecord]) -> String {
    records
        .iter()
        .map(|record| {
            format!(
                " | <a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>",
                escape_html(&record.url),
                escape_html(&record.text)
            )
        })
        .collect()
}

/// One `?lang=` link per registered locale, in registry order. The
/// negotiator turns a click into the `locale` cookie.
fn render_locale_switcher(active: Locale) -> String {
    let items: String = LocaleRegistry::get()
        .list()
        .iter()
        .map(|config| {
            let current = if config.locale == active {
                " aria-current=\"true\""
            } else {
                ""
            };
            format!(
                "<a href=\"?{param}={tag}\" hreflang=\"{tag}\" title=\"{name}\"{current}>{native}</a>",
                param = LANG_PARAM,
                tag = config.locale.tag(),
                name = escape_html(config.name),
                current = current,
                native = escape_html(config.native_name),
            )
        })
        .collect();
    format!("<nav class=\"locale-switcher\">{}</nav>", items)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page() -> PageModel {
        PageModel {
            locale: Locale::ZhHk,
            theme: Theme::Dark,
            values: SiteValues::new(),
            footer: vec!["About".to_string(), "Me & You".to_string()],
            powered_by: "Powered by Sora & Cloudfaro.".to_string(),
            year: 2026,
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">'&'</a>"), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_render_page_shell_defaults() {
        let html = render_page(&page());
        assert!(html.contains("<html lang=\"zh-HK\" class=\"dark\">"));
        assert!(html.contains(&format!("<title>{}</title>", DEFAULT_TITLE)));
        assert!(html.contains(&format!("<p>{}</p>", DEFAULT_DESCRIPTION)));
        assert!(html.contains(&format!("<blockquote>{}</blockquote>", DEFAULT_QUOTE)));
        assert!(html.contains("<li>Me &amp; You</li>"));
        assert!(html.contains("<p>© 2021-2026 Canmi.</p>"));
    }

    #[test]
    fn test_render_page_uses_site_values() {
        let mut page = page();
        page.theme = Theme::System;
        page.locale = Locale::Original;
        page.values.insert("site.navbar.title", json!("Sora <dev>"));
        page.values.insert("site.navbar.description", json!(""));
        page.values.insert("owner.quote", json!("stay curious"));
        page.values.insert("owner.name", json!("Sora"));
        page.values.insert("site.inception", json!(2019));

        let html = render_page(&page);
        assert!(html.contains("<html lang=\"und\">"));
        assert!(html.contains("<title>Sora &lt;dev&gt;</title>"));
        // Empty strings fall back like unset values
        assert!(html.contains(&format!("<p>{}</p>", DEFAULT_DESCRIPTION)));
        assert!(html.contains("<blockquote>stay curious</blockquote>"));
        assert!(html.contains("© 2019-2026 Sora."));
    }

    #[test]
    fn test_render_page_icp_array() {
        let mut page = page();
        page.values.insert(
            "site.icp",
            json!([
                { "text": "沪ICP备2025141863号", "url": "https://beian.miit.gov.cn/" },
                { "text": "萌ICP备202421033号", "url": "https://icp.gov.moe/?keyword=202421033" }
            ]),
        );

        let html = render_page(&page);
        assert!(html.contains(
            "Canmi. | <a href=\"https://beian.miit.gov.cn/\" target=\"_blank\" rel=\"noopener noreferrer\">沪ICP备2025141863号</a> | <a href=\"https://icp.gov.moe/?keyword=202421033\""
        ));
    }

    #[test]
    fn test_render_page_icp_non_array_renders_nothing() {
        for value in [json!("沪ICP备2025141863号"), json!([]), json!({ "text": "x" })] {
            let mut page = page();
            page.values.insert("site.icp", value);
            let html = render_page(&page);
            assert!(html.contains("<p>© 2021-2026 Canmi.</p>"));
            assert!(!html.contains("noopener"));
        }
    }

    #[test]
    fn test_locale_switcher_lists_every_locale() {
        let html = render_page(&page());
        for config in LocaleRegistry::get().list() {
            assert!(html.contains(&format!("href=\"?lang={}\"", config.locale.tag())));
        }
        assert!(html.contains(
            "<a href=\"?lang=zh-HK\" hreflang=\"zh-HK\" title=\"Chinese (Hong Kong)\" aria-current=\"true\">繁體中文</a>"
        ));
        assert!(html.contains(
            "<a href=\"?lang=ja-JP\" hreflang=\"ja-JP\" title=\"Japanese\">日本語</a>"
        ));
        assert_eq!(html.matches("aria-current").count(), 1);
    }
}
