//! Client locale store.
//!
//! Persists the visitor's locale choice in durable client storage (the
//! analogue of browser local storage) and keeps the `locale` cookie in step
//! with it, so the server-side detector and the client agree on the next
//! request. Changing locale is always a full navigation through `?lang=`.

use crate::i18n::cookie::locale_document_cookie;
use crate::i18n::negotiate::LANG_PARAM;
use crate::i18n::{Locale, LocaleRegistry};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{error, warn};
use url::Url;

/// Storage key holding the JSON-encoded locale tag.
pub const LOCALE_STORAGE_KEY: &str = "@sora/locale";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage file {path} is not a JSON object")]
    Corrupt { path: PathBuf },

    #[error("Failed to encode storage: {0}")]
    Encode(#[from] serde_json::Error),
}

/// String key-value storage that survives sessions.
pub trait LocaleStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Storage that lives as long as the value.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocaleStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .items
            .lock()
            .ok()
            .and_then(|items| items.get(key).cloned()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Ok(mut items) = self.items.lock() {
            items.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }
}

/// Storage backed by a single JSON object file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<Map<String, Value>, StorageError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(StorageError::Corrupt {
                path: self.path.clone(),
            }),
        }
    }
}

impl LocaleStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .read_all()?
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        // A corrupt file is replaced rather than blocking writes forever.
        let mut items = self.read_all().unwrap_or_default();
        items.insert(key.to_string(), Value::String(value.to_string()));
        let encoded = serde_json::to_string_pretty(&Value::Object(items))?;
        std::fs::write(&self.path, encoded).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Result of initialising the store for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleSync {
    pub locale: Locale,
    /// Cookie assignment refreshing the `locale` cookie.
    pub cookie: String,
    /// Whether the locale was detected (first visit) rather than stored.
    pub first_visit: bool,
}

/// Client-side locale persistence.
pub struct ClientLocaleStore<S: LocaleStorage> {
    storage: S,
}

impl<S: LocaleStorage> ClientLocaleStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Stored locale, if present and still registered.
    pub fn stored_locale(&self) -> Option<Locale> {
        let raw = match self.storage.get_item(LOCALE_STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                error!("Error reading locale from storage: {}", e);
                return None;
            }
        };

        let Ok(tag) = serde_json::from_str::<String>(&raw) else {
            warn!("Ignoring malformed stored locale: {}", raw);
            return None;
        };
        LocaleRegistry::get().by_tag(&tag)
    }

    /// Persist `locale`. Failures are logged.
    pub fn store(&self, locale: Locale) {
        let result = serde_json::to_string(locale.tag())
            .map_err(StorageError::from)
            .and_then(|encoded| self.storage.set_item(LOCALE_STORAGE_KEY, &encoded));
        if let Err(e) = result {
            error!("Error setting locale in storage: {}", e);
        }
    }

    /// Read the stored locale or, on a first visit, detect one from the
    /// browser language and store it. Always returns a fresh cookie.
    pub fn initialize(&self, browser_language: Option<&str>) -> LocaleSync {
        let (locale, first_visit) = match self.stored_locale() {
            Some(locale) => (locale, false),
            None => {
                let locale = detect_browser_locale(browser_language);
                self.store(locale);
                (locale, true)
            }
        };

        LocaleSync {
            locale,
            cookie: locale_document_cookie(locale),
            first_visit,
        }
    }

    /// Persist the locale the server rendered with.
    pub fn adopt(&self, locale: Locale) {
        if self.stored_locale() != Some(locale) {
            self.store(locale);
        }
    }

    /// Persist `locale` and return the URL to navigate to. The page is
    /// reloaded with `?lang=` so the server re-renders in the new locale.
    pub fn change_locale(&self, current: &Url, locale: Locale) -> Url {
        self.store(locale);
        navigation_url(current, locale)
    }
}

/// Best guess for a first visit: exact, then primary subtag, then default.
pub fn detect_browser_locale(browser_language: Option<&str>) -> Locale {
    let registry = LocaleRegistry::get();
    browser_language
        .and_then(|language| registry.match_language(language))
        .unwrap_or_else(|| registry.default_locale())
}

/// `current` with `lang` set to `locale`, replacing any existing value.
pub fn navigation_url(current: &Url, locale: Locale) -> Url {
    let pairs: Vec<(String, String)> = current
        .query_pairs()
        .filter(|(name, _)| name != LANG_PARAM)
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    let mut url = current.clone();
    {
        let mut query = url.query_pairs_mut();
        query.clear();
        query.extend_pairs(pairs);
        query.append_pair(LANG_PARAM, locale.tag());
    }
    url
}
