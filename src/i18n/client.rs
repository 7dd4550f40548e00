//! Client translation cache.
//!
//! One [`ClientTranslationCache`] lives for a page session. It owns the
//! namespace cache, the in-flight registry and the per-namespace subscriber
//! lists. Two ways to resolve a key:
//!
//! - [`ClientTranslationCache::translate`] loads the namespace if needed and
//!   resolves once it is available.
//! - [`ClientTranslationCache::translate_sync`] never waits. On a miss it
//!   subscribes the caller, kicks off a background load and returns the key;
//!   the subscriber fires once that load completes.
//!
//! During server rendering nothing is fetched and misses return the key.

use crate::i18n::{
    Locale, MissReason, Namespace, NamespaceSource, Translation, TranslationKey,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Where the cache is being used from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderContext {
    /// Interactive session; background fetches are allowed.
    Browser,
    /// Server rendering; fetching is unsafe, misses return the key.
    Server,
}

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to a component's re-render trigger.
///
/// Identity is the handle, not the closure: clones of one subscriber are
/// the same subscriber, two `Subscriber::new` calls are different ones.
#[derive(Clone)]
pub struct Subscriber {
    id: u64,
    callback: Arc<dyn Fn() + Send + Sync>,
}

impl Subscriber {
    pub fn new(callback: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            id: NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed),
            callback: Arc::new(callback),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    fn notify(&self) {
        (self.callback)();
    }
}

impl PartialEq for Subscriber {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Subscriber {}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").field("id", &self.id).finish()
    }
}

#[derive(Default)]
struct CacheState {
    namespaces: HashMap<String, Arc<Namespace>>,
    /// Namespaces with a fetch in flight, each with a completion signal.
    loading: HashMap<String, Arc<Notify>>,
    waiting: HashMap<String, Vec<Subscriber>>,
}

/// Outcome of trying to start a load.
enum LoadStart {
    Cached(Arc<Namespace>),
    InFlight(Arc<Notify>),
    Started,
}

/// Session-scoped translation cache.
#[derive(Clone)]
pub struct ClientTranslationCache {
    source: Arc<dyn NamespaceSource>,
    context: RenderContext,
    state: Arc<Mutex<CacheState>>,
}

impl ClientTranslationCache {
    pub fn new(source: Arc<dyn NamespaceSource>, context: RenderContext) -> Self {
        Self {
            source,
            context,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    pub fn context(&self) -> RenderContext {
        self.context
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        // A panicking subscriber must not take translations down with it.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_cached(&self, namespace: &str) -> bool {
        self.state().namespaces.contains_key(namespace)
    }

    pub fn is_loading(&self, namespace: &str) -> bool {
        self.state().loading.contains_key(namespace)
    }

    /// Number of subscribers waiting on `namespace`.
    pub fn waiting(&self, namespace: &str) -> usize {
        self.state()
            .waiting
            .get(namespace)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Whether the load signalled by `done` is still the one in flight.
    fn still_loading(&self, namespace: &str, done: &Arc<Notify>) -> bool {
        self.state()
            .loading
            .get(namespace)
            .is_some_and(|current| Arc::ptr_eq(current, done))
    }

    fn cached(&self, namespace: &str) -> Option<Arc<Namespace>> {
        self.state().namespaces.get(namespace).cloned()
    }

    fn begin_load(&self, namespace: &str) -> LoadStart {
        let mut state = self.state();
        if let Some(tree) = state.namespaces.get(namespace) {
            return LoadStart::Cached(Arc::clone(tree));
        }
        if let Some(done) = state.loading.get(namespace) {
            return LoadStart::InFlight(Arc::clone(done));
        }
        state
            .loading
            .insert(namespace.to_string(), Arc::new(Notify::new()));
        LoadStart::Started
    }

    /// Fetch a namespace whose load was started by `begin_load`, publish it,
    /// and notify subscribers.
    async fn complete_load(&self, namespace: &str) -> Option<Arc<Namespace>> {
        let result = self.source.load(namespace).await;

        let (tree, done, subscribers) = {
            let mut state = self.state();
            let done = state.loading.remove(namespace);
            match result {
                Ok(tree) => {
                    let tree = Arc::new(tree);
                    state
                        .namespaces
                        .insert(namespace.to_string(), Arc::clone(&tree));
                    let subscribers = state.waiting.remove(namespace).unwrap_or_default();
                    (Some(tree), done, subscribers)
                }
                Err(e) => {
                    warn!("Translation API failed for namespace '{}': {}", namespace, e);
                    (None, done, Vec::new())
                }
            }
        };

        if let Some(done) = done {
            done.notify_waiters();
        }
        if !subscribers.is_empty() {
            debug!(
                "Namespace '{}' loaded, notifying {} subscriber(s)",
                namespace,
                subscribers.len()
            );
        }
        for subscriber in subscribers {
            subscriber.notify();
        }

        tree
    }

    /// Load a namespace, waiting on an in-flight load instead of starting a
    /// second one. `None` in server rendering or when the load failed.
    pub async fn load_namespace(&self, namespace: &str) -> Option<Arc<Namespace>> {
        if self.context == RenderContext::Server {
            return None;
        }

        match self.begin_load(namespace) {
            LoadStart::Cached(tree) => Some(tree),
            LoadStart::Started => {
                // The fetch runs on its own task so a dropped caller cannot
                // strand the in-flight entry.
                let handle = self.spawn_load(namespace)?;
                match handle.await {
                    Ok(tree) => tree,
                    Err(e) => {
                        error!("Load task for namespace '{}' failed: {}", namespace, e);
                        self.abandon_load(namespace);
                        None
                    }
                }
            }
            LoadStart::InFlight(done) => {
                // Register before re-checking so a completion in between is seen.
                let notified = done.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.still_loading(namespace, &done) {
                    notified.await;
                }
                self.cached(namespace)
            }
        }
    }

    /// Start loading `namespace` in the background, if nothing is cached or
    /// in flight. Returns whether a load was started.
    pub fn preload(&self, namespace: &str) -> bool {
        if self.context == RenderContext::Server {
            return false;
        }
        match self.begin_load(namespace) {
            LoadStart::Started => self.spawn_load(namespace).is_some(),
            LoadStart::Cached(_) | LoadStart::InFlight(_) => false,
        }
    }

    /// Run a load started by `begin_load` on a background task.
    fn spawn_load(&self, namespace: &str) -> Option<JoinHandle<Option<Arc<Namespace>>>> {
        let Ok(handle) = Handle::try_current() else {
            error!("No async runtime to load namespace '{}'", namespace);
            self.abandon_load(namespace);
            return None;
        };

        let cache = self.clone();
        let namespace = namespace.to_string();
        Some(handle.spawn(async move { cache.complete_load(&namespace).await }))
    }

    /// Forget a load that will never complete: wake async waiters and drop
    /// the subscribers queued for it.
    fn abandon_load(&self, namespace: &str) {
        let done = {
            let mut state = self.state();
            state.waiting.remove(namespace);
            state.loading.remove(namespace)
        };
        if let Some(done) = done {
            done.notify_waiters();
        }
    }

    /// Resolve `key`, loading its namespace if needed.
    pub async fn translate(&self, locale: Locale, key: &str) -> Translation {
        let Some(parsed) = TranslationKey::parse(key) else {
            return Translation::missing(key, MissReason::InvalidKey);
        };

        match self.load_namespace(parsed.namespace()).await {
            Some(tree) => tree.resolve(&parsed, locale),
            None => Translation::missing(key, MissReason::NamespaceUnavailable),
        }
    }

    /// Resolve `key` without waiting.
    ///
    /// On a cache miss in a browser context `subscriber` is added to the
    /// namespace's waiting list (at most once) and a background load starts
    /// unless one is already running. The key is returned meanwhile.
    pub fn translate_sync(&self, locale: Locale, key: &str, subscriber: &Subscriber) -> Translation {
        let Some(parsed) = TranslationKey::parse(key) else {
            return Translation::missing(key, MissReason::InvalidKey);
        };
        let namespace = parsed.namespace();

        if self.context == RenderContext::Server {
            return match self.cached(namespace) {
                Some(tree) => tree.resolve(&parsed, locale),
                None => Translation::missing(key, MissReason::NamespaceUnavailable),
            };
        }

        let start_load = {
            let mut state = self.state();
            if let Some(tree) = state.namespaces.get(namespace) {
                return tree.resolve(&parsed, locale);
            }

            let waiting = state.waiting.entry(namespace.to_string()).or_default();
            if !waiting.contains(subscriber) {
                waiting.push(subscriber.clone());
            }

            if state.loading.contains_key(namespace) {
                false
            } else {
                state
                    .loading
                    .insert(namespace.to_string(), Arc::new(Notify::new()));
                true
            }
        };

        if start_load {
            self.spawn_load(namespace);
        }

        Translation::missing(key, MissReason::NamespaceUnavailable)
    }
}
