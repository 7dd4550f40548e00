//! Translation namespaces, keys and resolution outcomes.
//!
//! A namespace is a JSON tree loaded from one file. Leaves are translation
//! values: objects mapping storage keys (`en_US`, `raw`, ...) to strings.
//! A key such as `footer.link.about` names the namespace (`footer`) and the
//! path to a leaf (`link.about`).

use crate::i18n::Locale;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Storage key consulted after the active locale.
const FALLBACK_STORAGE_KEY: &str = "en_US";
/// Storage key of the untranslated source text.
const RAW_STORAGE_KEY: &str = "raw";

/// A parsed translation namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(Value);

impl Namespace {
    pub fn new(tree: Value) -> Self {
        Self(tree)
    }

    /// Parse a namespace from JSON text.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text).map(Self)
    }

    /// The raw JSON tree.
    pub fn tree(&self) -> &Value {
        &self.0
    }

    /// Walk `path` from the root. Returns the node reached, if any.
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        path.iter()
            .try_fold(&self.0, |node, segment| node.as_object()?.get(segment.as_ref()))
    }

    /// Resolve a parsed key against this namespace for `locale`.
    pub fn resolve(&self, key: &TranslationKey, locale: Locale) -> Translation {
        let Some(node) = self.lookup(key.path.as_slice()) else {
            return Translation::missing(&key.raw, MissReason::PathNotFound);
        };
        let Some(value) = node.as_object() else {
            return Translation::missing(&key.raw, MissReason::NotALeaf);
        };

        // current locale -> en_US -> raw -> key
        [locale.storage_key(), FALLBACK_STORAGE_KEY, RAW_STORAGE_KEY]
            .into_iter()
            .find_map(|storage_key| {
                value
                    .get(storage_key)
                    .and_then(Value::as_str)
                    .filter(|text| !text.is_empty())
                    .map(|text| Translation::Found {
                        text: text.to_string(),
                        source: storage_key,
                    })
            })
            .unwrap_or_else(|| Translation::missing(&key.raw, MissReason::NoValue))
    }
}

/// A dotted translation key split into namespace and leaf path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationKey {
    raw: String,
    namespace: String,
    path: Vec<String>,
}

impl TranslationKey {
    /// Parse `namespace.path.to.leaf`. Keys with fewer than two segments
    /// are invalid.
    pub fn parse(key: &str) -> Option<Self> {
        let mut segments = key.split('.');
        let namespace = segments.next()?.to_string();
        let path: Vec<String> = segments.map(str::to_string).collect();
        if path.is_empty() {
            return None;
        }
        Some(Self {
            raw: key.to_string(),
            namespace,
            path,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Why a key fell back to itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    /// Fewer than two dot-separated segments.
    InvalidKey,
    /// The namespace could not be loaded (missing, malformed, transport).
    NamespaceUnavailable,
    PathNotFound,
    /// The path ends on something that is not an object.
    NotALeaf,
    /// The leaf has no usable string for the locale, `en_US` or `raw`.
    NoValue,
}

/// Outcome of resolving a translation key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    Found {
        text: String,
        /// Storage key the text was read from.
        source: &'static str,
    },
    Missing {
        key: String,
        reason: MissReason,
    },
}

impl Translation {
    pub fn missing(key: &str, reason: MissReason) -> Self {
        Translation::Missing {
            key: key.to_string(),
            reason,
        }
    }

    /// Text to render: the translation, or the key itself.
    pub fn as_str(&self) -> &str {
        match self {
            Translation::Found { text, .. } => text,
            Translation::Missing { key, .. } => key,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Translation::Found { text, .. } => text,
            Translation::Missing { key, .. } => key,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Translation::Found { .. })
    }
}

impl fmt::Display for Translation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
