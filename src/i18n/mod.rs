//! Internationalization (i18n): locale resolution and translation delivery.
//!
//! # Architecture
//!
//! - `locale`: the closed set of supported locales and their storage keys
//! - `registry`: locale metadata and the override alias table
//! - `negotiate`: `?lang=` middleware that persists an override as a cookie
//! - `detect`: cookie / `Accept-Language` / default detection per request
//! - `namespace`: translation trees, dotted keys and the fallback chain
//! - `source`: where namespaces come from (filesystem, HTTP, memory)
//! - `translator`: server-side translator with a process-wide cache
//! - `client`: session cache with async and non-blocking lookups
//! - `store`: durable client-side locale preference synced to the cookie
//!
//! # Example
//!
//! ```rust,ignore
//! use sora_site::i18n::{FsNamespaceSource, Locale, ServerTranslator};
//!
//! let translator = ServerTranslator::new(Arc::new(FsNamespaceSource::new("locales")));
//! let about = translator.t(Locale::FrFr, "footer.link.about").await;
//! ```

mod client;
pub mod cookie;
mod detect;
mod locale;
mod namespace;
pub mod negotiate;
mod registry;
mod source;
mod store;
mod translator;

pub use client::{ClientTranslationCache, RenderContext, Subscriber};
pub use detect::{detect_from_headers, detect_locale, match_accept_language, RequestLocale};
pub use locale::{Locale, UnknownLocale};
pub use namespace::{MissReason, Namespace, Translation, TranslationKey};
pub use negotiate::{locale_negotiation, negotiate, resolve_override, Negotiation};
pub use registry::{LocaleConfig, LocaleRegistry};
pub use source::{
    is_valid_namespace_name, FsNamespaceSource, HttpNamespaceSource, MemoryNamespaceSource,
    NamespaceSource, SourceError,
};
pub use store::{
    detect_browser_locale, navigation_url, ClientLocaleStore, FileStorage, LocaleStorage,
    LocaleSync, MemoryStorage, StorageError, LOCALE_STORAGE_KEY,
};
pub use translator::{LocalizedTranslator, NamespaceCache, ServerTranslator};
