//! Site values prefetched from the remote configuration API.
//!
//! Every configured key is fetched concurrently. A key that fails (HTTP
//! error, timeout, malformed base64) is logged and left out; the page
//! renders with whatever arrived. [`SiteValueCache`] keeps one fetched set
//! for a fixed time so page renders do not hit the backend each time.

use crate::kv::KvClient;
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// How long a fetched set of site values is reused.
pub const DEFAULT_SITE_VALUES_TTL: Duration = Duration::from_secs(300);

/// One ICP filing shown in the footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcpRecord {
    pub text: String,
    pub url: String,
}

/// Values keyed by their dotted configuration key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteValues {
    values: HashMap<String, Value>,
}

impl SiteValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Value rendered as display text. Strings are used as-is, other JSON
    /// values are serialized; null is treated as absent.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.values.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// A non-empty string value. Other JSON types and `""` count as unset.
    pub fn string(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// A non-zero unsigned number.
    pub fn number(&self, key: &str) -> Option<u64> {
        self.values
            .get(key)
            .and_then(Value::as_u64)
            .filter(|n| *n != 0)
    }

    /// ICP filings stored under `key` as `[{"text": .., "url": ..}]`.
    ///
    /// Anything that is not a non-empty array yields nothing. Entries
    /// without a text are skipped; a missing url becomes `#`.
    pub fn icp_records(&self, key: &str) -> Vec<IcpRecord> {
        let Some(Value::Array(items)) = self.values.get(key) else {
            return Vec::new();
        };

        items
            .iter()
            .filter_map(|item| {
                let text = item.get("text")?.as_str()?.trim();
                if text.is_empty() {
                    return None;
                }
                let url = item.get("url").and_then(Value::as_str).unwrap_or("#");
                Some(IcpRecord {
                    text: text.to_string(),
                    url: url.to_string(),
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Fetch `keys` in parallel and keep the ones that succeeded.
pub async fn fetch_site_values<S: AsRef<str>>(client: &KvClient, keys: &[S]) -> SiteValues {
    let fetches = keys.iter().map(|key| async move {
        let key = key.as_ref();
        match client.get_value(key).await {
            Ok(response) => Some((key.to_string(), response.data.value)),
            Err(e) => {
                warn!("Failed to fetch site value \"{}\": {}", key, e);
                None
            }
        }
    });

    let mut values = SiteValues::new();
    for (key, value) in join_all(fetches).await.into_iter().flatten() {
        values.insert(key, value);
    }
    debug!("Fetched {}/{} site values", values.len(), keys.len());
    values
}

struct CachedValues {
    fetched_at: Instant,
    values: SiteValues,
}

/// Site values shared by every page render, refetched once `ttl` expires.
///
/// The lock is held while a refresh runs, so concurrent renders wait for
/// one fetch instead of each starting their own.
pub struct SiteValueCache {
    client: KvClient,
    keys: Vec<String>,
    ttl: Duration,
    entry: Mutex<Option<CachedValues>>,
}

impl SiteValueCache {
    pub fn new(client: KvClient, keys: Vec<String>, ttl: Duration) -> Self {
        Self {
            client,
            keys,
            ttl,
            entry: Mutex::new(None),
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Current values, fetching them if nothing fresh is cached.
    pub async fn get(&self) -> SiteValues {
        let mut entry = self.entry.lock().await;
        if let Some(cached) = entry.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return cached.values.clone();
            }
        }

        let values = fetch_site_values(&self.client, self.keys.as_slice()).await;
        *entry = Some(CachedValues {
            fetched_at: Instant::now(),
            values: values.clone(),
        });
        values
    }

    /// Drop the cached set; the next `get` refetches.
    pub async fn invalidate(&self) {
        *self.entry.lock().await = None;
    }
}
