use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Keys the page shell reads from the remote configuration API.
pub const DEFAULT_SITE_VALUE_KEYS: [&str; 6] = [
    "site.navbar.title",
    "site.navbar.description",
    "owner.quote",
    "owner.name",
    "site.inception",
    "site.icp",
];

#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,

    // Translations
    pub locales_dir: PathBuf,
    pub preload_namespaces: Vec<String>,

    // Remote configuration API
    pub api_base_url: String,
    pub api_timeout: Duration,

    // Site values shown on every page, and how long a fetched set is reused
    pub site_value_keys: Vec<String>,
    pub site_values_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            // Server
            port: match std::env::var("PORT") {
                Ok(port) => port.parse().context("PORT must be a valid port number")?,
                Err(_) => 3000,
            },

            // Translations
            locales_dir: std::env::var("LOCALES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("locales")),
            preload_namespaces: std::env::var("PRELOAD_NAMESPACES")
                .map(|v| parse_list(&v))
                .unwrap_or_else(|_| vec!["footer".to_string()]),

            // Remote configuration API (NEXT_PUBLIC_API kept for old deployments)
            api_base_url: std::env::var("API_BASE_URL")
                .or_else(|_| std::env::var("NEXT_PUBLIC_API"))
                .unwrap_or_else(|_| "https://api.canmi.net".to_string()),
            api_timeout: Duration::from_secs(
                std::env::var("API_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),

            site_value_keys: std::env::var("SITE_VALUE_KEYS")
                .map(|v| parse_list(&v))
                .unwrap_or_else(|_| DEFAULT_SITE_VALUE_KEYS.iter().map(|k| k.to_string()).collect()),
            site_values_ttl: Duration::from_secs(
                std::env::var("SITE_VALUES_TTL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(300),
            ),
        })
    }
}

/// Split a comma-separated list, dropping blanks.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
