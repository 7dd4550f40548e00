//! Server-side translator.
//!
//! Owns a process-wide namespace cache in front of a [`NamespaceSource`].
//! Namespaces are loaded lazily on first lookup and kept for the lifetime of
//! the translator; a locale change only changes which storage key is read.

use crate::i18n::{Locale, MissReason, Namespace, NamespaceSource, SourceError, Translation, TranslationKey};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Namespace cache keyed by namespace name.
///
/// Check-then-populate without a load guard: two callers missing at the same
/// time may both load, and the last insert wins. Loads are idempotent.
#[derive(Debug, Default)]
pub struct NamespaceCache {
    entries: RwLock<HashMap<String, Arc<Namespace>>>,
}

impl NamespaceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, namespace: &str) -> Option<Arc<Namespace>> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(namespace).cloned())
    }

    pub fn insert(&self, namespace: &str, tree: Namespace) -> Arc<Namespace> {
        let tree = Arc::new(tree);
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(namespace.to_string(), Arc::clone(&tree));
        }
        tree
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.get(namespace).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolves dotted keys for server-rendered pages.
pub struct ServerTranslator {
    source: Arc<dyn NamespaceSource>,
    cache: NamespaceCache,
}

impl ServerTranslator {
    pub fn new(source: Arc<dyn NamespaceSource>) -> Self {
        Self {
            source,
            cache: NamespaceCache::new(),
        }
    }

    pub fn cache(&self) -> &NamespaceCache {
        &self.cache
    }

    /// Load a namespace through the cache.
    pub async fn namespace(&self, namespace: &str) -> Result<Arc<Namespace>, SourceError> {
        if let Some(tree) = self.cache.get(namespace) {
            return Ok(tree);
        }

        let tree = self.source.load(namespace).await?;
        debug!("Cached translation namespace '{}'", namespace);
        Ok(self.cache.insert(namespace, tree))
    }

    /// Resolve `key` for `locale`. Never fails; misses carry the key.
    pub async fn translate(&self, locale: Locale, key: &str) -> Translation {
        let Some(parsed) = TranslationKey::parse(key) else {
            warn!(
                "Invalid translation key format: \"{}\". Expected \"namespace.path.to.value\"",
                key
            );
            return Translation::missing(key, MissReason::InvalidKey);
        };

        match self.namespace(parsed.namespace()).await {
            Ok(tree) => tree.resolve(&parsed, locale),
            Err(e) => {
                warn!("Error loading translation namespace \"{}\": {}", parsed.namespace(), e);
                Translation::missing(key, MissReason::NamespaceUnavailable)
            }
        }
    }

    /// Shorthand for `translate(..).into_string()`.
    pub async fn t(&self, locale: Locale, key: &str) -> String {
        self.translate(locale, key).await.into_string()
    }

    /// Load several namespaces concurrently. Failures are logged and dropped;
    /// returns the names that loaded.
    pub async fn preload<S: AsRef<str>>(&self, namespaces: &[S]) -> Vec<String> {
        let loads = namespaces.iter().map(|namespace| async move {
            let namespace = namespace.as_ref();
            match self.namespace(namespace).await {
                Ok(_) => Some(namespace.to_string()),
                Err(e) => {
                    warn!("Failed to preload namespace '{}': {}", namespace, e);
                    None
                }
            }
        });

        join_all(loads).await.into_iter().flatten().collect()
    }

    /// Bind a locale for repeated lookups during one render.
    pub fn for_locale(&self, locale: Locale) -> LocalizedTranslator<'_> {
        LocalizedTranslator {
            translator: self,
            locale,
        }
    }
}

/// A translator bound to the locale of the current request.
#[derive(Clone, Copy)]
pub struct LocalizedTranslator<'a> {
    translator: &'a ServerTranslator,
    locale: Locale,
}

impl LocalizedTranslator<'_> {
    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub async fn t(&self, key: &str) -> String {
        self.translator.t(self.locale, key).await
    }

    pub async fn translate(&self, key: &str) -> Translation {
        self.translator.translate(self.locale, key).await
    }
}
