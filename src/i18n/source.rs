//! Namespace sources: where translation trees come from.
//!
//! The server translator reads `{locales_dir}/{namespace}.json` from disk,
//! the client cache fetches `GET {origin}/i18n/{namespace}`, and tests use
//! an in-memory map. All three sit behind [`NamespaceSource`].

use crate::i18n::Namespace;
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading a namespace.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Invalid namespace name: '{0}'")]
    InvalidName(String),

    #[error("Translation namespace not found: {0}")]
    NotFound(String),

    #[error("Failed to read translation file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed translation namespace '{namespace}': {source}")]
    Parse {
        namespace: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Translation request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Translation API returned HTTP {status} for namespace '{namespace}'")]
    Status { namespace: String, status: u16 },
}

/// Check a namespace name against `^[a-zA-Z0-9_-]+$`.
///
/// # Arguments
/// * `namespace` - The first segment of a translation key, or the path
///   segment of an `/i18n/{namespace}` request
///
/// # Returns
/// `true` only for non-empty ASCII letters, digits, `_` and `-`. Dots,
/// slashes and anything else that could escape the locales directory fail.
pub fn is_valid_namespace_name(namespace: &str) -> bool {
    static NAMESPACE_PATTERN: OnceLock<Regex> = OnceLock::new();
    NAMESPACE_PATTERN
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("namespace pattern is valid"))
        .is_match(namespace)
}

/// Something that can produce a parsed namespace by name.
#[async_trait]
pub trait NamespaceSource: Send + Sync {
    /// Load and parse one namespace.
    ///
    /// # Errors
    /// * `SourceError::InvalidName` when the name fails validation
    /// * `SourceError::NotFound` when no such namespace exists
    /// * any other variant for I/O, transport, status or JSON failures
    async fn load(&self, namespace: &str) -> Result<Namespace, SourceError>;
}

/// Loads `{dir}/{namespace}.json` from the filesystem.
#[derive(Debug, Clone)]
pub struct FsNamespaceSource {
    dir: PathBuf,
}

impl FsNamespaceSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{}.json", namespace))
    }
}

#[async_trait]
impl NamespaceSource for FsNamespaceSource {
    async fn load(&self, namespace: &str) -> Result<Namespace, SourceError> {
        // The name becomes part of a path, so nothing outside the pattern.
        if !is_valid_namespace_name(namespace) {
            return Err(SourceError::InvalidName(namespace.to_string()));
        }

        let path = self.path_for(namespace);
        debug!("Loading translation namespace from {}", path.display());

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SourceError::NotFound(namespace.to_string()));
            }
            Err(source) => return Err(SourceError::Io { path, source }),
        };

        Namespace::from_json(&content).map_err(|source| SourceError::Parse {
            namespace: namespace.to_string(),
            source,
        })
    }
}

/// Fetches namespaces from the site's own `/i18n/{namespace}` endpoint.
#[derive(Debug, Clone)]
pub struct HttpNamespaceSource {
    client: reqwest::Client,
    origin: String,
}

impl HttpNamespaceSource {
    /// `origin` is the site origin, e.g. `https://canmi.net`.
    pub fn new(client: reqwest::Client, origin: impl Into<String>) -> Self {
        let origin = origin.into();
        Self {
            client,
            origin: origin.trim_end_matches('/').to_string(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }
}

#[async_trait]
impl NamespaceSource for HttpNamespaceSource {
    async fn load(&self, namespace: &str) -> Result<Namespace, SourceError> {
        if !is_valid_namespace_name(namespace) {
            return Err(SourceError::InvalidName(namespace.to_string()));
        }

        let url = format!("{}/i18n/{}", self.origin, namespace);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                namespace: namespace.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        Namespace::from_json(&body).map_err(|source| SourceError::Parse {
            namespace: namespace.to_string(),
            source,
        })
    }
}

/// In-memory namespaces, counting every load.
#[derive(Debug, Default)]
pub struct MemoryNamespaceSource {
    namespaces: HashMap<String, Namespace>,
    loads: AtomicUsize,
}

impl MemoryNamespaceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, namespace: &str, tree: serde_json::Value) -> Self {
        self.namespaces
            .insert(namespace.to_string(), Namespace::new(tree));
        self
    }

    /// Number of `load` calls served so far, including misses.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl NamespaceSource for MemoryNamespaceSource {
    async fn load(&self, namespace: &str) -> Result<Namespace, SourceError> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.namespaces
            .get(namespace)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(namespace.to_string()))
    }
}
