//! Locale registry: single source of truth for supported locales.
//!
//! The registry holds the ordered locale list with display metadata and the
//! alias table used when negotiating a `?lang=` override. It is a lazily
//! initialised singleton behind `OnceLock` and immutable afterwards.

use crate::i18n::Locale;
use std::sync::OnceLock;

/// Display metadata for a supported locale.
#[derive(Debug, Clone)]
pub struct LocaleConfig {
    pub locale: Locale,

    /// English name (e.g. "French")
    pub name: &'static str,

    /// Native name (e.g. "Français")
    pub native_name: &'static str,
}

/// Global locale registry singleton.
pub struct LocaleRegistry {
    locales: Vec<LocaleConfig>,
    aliases: Vec<(&'static str, Locale)>,
}

static REGISTRY: OnceLock<LocaleRegistry> = OnceLock::new();

impl LocaleRegistry {
    /// Get the global registry instance.
    ///
    /// The registry is built on first call; later calls return the same
    /// instance.
    pub fn get() -> &'static LocaleRegistry {
        REGISTRY.get_or_init(|| LocaleRegistry {
            locales: default_locales(),
            aliases: default_aliases(),
        })
    }

    /// All locale configurations, in registry order.
    pub fn list(&self) -> &[LocaleConfig] {
        &self.locales
    }

    /// Get the configuration for a locale.
    pub fn config(&self, locale: Locale) -> Option<&LocaleConfig> {
        self.locales.iter().find(|config| config.locale == locale)
    }

    /// Default locale.
    pub fn default_locale(&self) -> Locale {
        Locale::DEFAULT
    }

    /// The "original/raw" sentinel locale.
    pub fn original(&self) -> Locale {
        Locale::Original
    }

    /// Check whether a canonical tag is supported (ASCII case-insensitive).
    pub fn is_supported(&self, tag: &str) -> bool {
        self.by_tag(tag).is_some()
    }

    /// Find a registered locale by canonical tag.
    ///
    /// # Arguments
    /// * `tag` - A BCP 47 tag such as "fr-FR"; ASCII case and surrounding
    ///   whitespace are ignored
    ///
    /// # Returns
    /// * `Some(Locale)` if the tag is registered
    /// * `None` for anything else, including aliases like "fr"
    pub fn by_tag(&self, tag: &str) -> Option<Locale> {
        let tag = tag.trim();
        self.locales
            .iter()
            .map(|config| config.locale)
            .find(|locale| locale.tag().eq_ignore_ascii_case(tag))
    }

    /// Resolve a short alias to a canonical locale.
    ///
    /// # Arguments
    /// * `alias` - An already lower-cased override value (e.g. "zh",
    ///   "original", "en_us")
    ///
    /// # Returns
    /// * `Some(Locale)` if the alias is in the table
    /// * `None` otherwise; canonical tags are not aliases
    pub fn resolve_alias(&self, alias: &str) -> Option<Locale> {
        self.aliases
            .iter()
            .find(|(name, _)| *name == alias)
            .map(|(_, locale)| *locale)
    }

    /// Match a language preference against the registry.
    ///
    /// Exact tag match first (with `_` read as `-`), then the first
    /// registered locale sharing the candidate's primary subtag.
    ///
    /// # Arguments
    /// * `candidate` - One language range, e.g. an `Accept-Language` entry
    ///   without its weight or a browser language like "zh_TW"
    ///
    /// # Returns
    /// * `Some(Locale)` on an exact or primary-subtag match
    /// * `None` for empty input, `*`, or an unsupported language
    pub fn match_language(&self, candidate: &str) -> Option<Locale> {
        let candidate = candidate.trim().replace('_', "-");
        if candidate.is_empty() || candidate == "*" {
            return None;
        }

        if let Some(locale) = self.by_tag(&candidate) {
            return Some(locale);
        }

        let primary = candidate.split('-').next().unwrap_or_default();
        if primary.is_empty() {
            return None;
        }
        self.locales
            .iter()
            .map(|config| config.locale)
            .find(|locale| locale.primary_subtag().eq_ignore_ascii_case(primary))
    }
}

/// Supported locales in display and matching order.
fn default_locales() -> Vec<LocaleConfig> {
    vec![
        LocaleConfig {
            locale: Locale::Original,
            name: "Original",
            native_name: "Original",
        },
        LocaleConfig {
            locale: Locale::EnUs,
            name: "English (US)",
            native_name: "English (US)",
        },
        LocaleConfig {
            locale: Locale::EnGb,
            name: "English (UK)",
            native_name: "English (UK)",
        },
        LocaleConfig {
            locale: Locale::ZhCn,
            name: "Chinese (Simplified)",
            native_name: "简体中文",
        },
        LocaleConfig {
            locale: Locale::ZhHk,
            name: "Chinese (Hong Kong)",
            native_name: "繁體中文",
        },
        LocaleConfig {
            locale: Locale::EsEs,
            name: "Spanish",
            native_name: "Español",
        },
        LocaleConfig {
            locale: Locale::FrFr,
            name: "French",
            native_name: "Français",
        },
        LocaleConfig {
            locale: Locale::JaJp,
            name: "Japanese",
            native_name: "日本語",
        },
    ]
}

/// Short and informal spellings accepted in `?lang=` overrides.
fn default_aliases() -> Vec<(&'static str, Locale)> {
    let mut aliases = vec![
        ("en", Locale::EnUs),
        ("zh", Locale::ZhCn),
        ("es", Locale::EsEs),
        ("fr", Locale::FrFr),
        ("ja", Locale::JaJp),
        ("original", Locale::Original),
        ("orig", Locale::Original),
        ("raw", Locale::Original),
        ("source", Locale::Original),
        ("none", Locale::Original),
    ];
    // en_us, zh_cn, ...
    aliases.extend([
        ("en_us", Locale::EnUs),
        ("en_gb", Locale::EnGb),
        ("zh_cn", Locale::ZhCn),
        ("zh_hk", Locale::ZhHk),
        ("es_es", Locale::EsEs),
        ("fr_fr", Locale::FrFr),
        ("ja_jp", Locale::JaJp),
    ]);
    aliases
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_get_returns_singleton() {
        let registry1 = LocaleRegistry::get();
        let registry2 = LocaleRegistry::get();
        assert!(std::ptr::eq(registry1, registry2));
    }

    #[test]
    fn test_registry_lists_every_locale_in_order() {
        let listed: Vec<_> = LocaleRegistry::get().list().iter().map(|c| c.locale).collect();
        assert_eq!(listed, Locale::ALL.to_vec());
    }

    #[test]
    fn test_every_locale_has_config() {
        let registry = LocaleRegistry::get();
        for locale in Locale::ALL {
            assert!(registry.config(locale).is_some(), "missing {}", locale);
        }
    }

    #[test]
    fn test_native_names() {
        let registry = LocaleRegistry::get();
        assert_eq!(registry.config(Locale::EsEs).unwrap().native_name, "Español");
        assert_eq!(registry.config(Locale::JaJp).unwrap().native_name, "日本語");
    }

    // ==================== Alias Tests ====================

    #[test]
    fn test_resolve_alias_bare_language() {
        let registry = LocaleRegistry::get();
        assert_eq!(registry.resolve_alias("en"), Some(Locale::EnUs));
        assert_eq!(registry.resolve_alias("zh"), Some(Locale::ZhCn));
    }

    #[test]
    fn test_resolve_alias_original_synonyms() {
        let registry = LocaleRegistry::get();
        for alias in ["original", "raw", "source"] {
            assert_eq!(registry.resolve_alias(alias), Some(Locale::Original));
        }
    }

    #[test]
    fn test_resolve_alias_unknown() {
        assert_eq!(LocaleRegistry::get().resolve_alias("xx-zz"), None);
    }

    // ==================== Matching Tests ====================

    #[test]
    fn test_match_language_exact() {
        assert_eq!(LocaleRegistry::get().match_language("fr-FR"), Some(Locale::FrFr));
    }

    #[test]
    fn test_match_language_underscore() {
        assert_eq!(LocaleRegistry::get().match_language("zh_HK"), Some(Locale::ZhHk));
    }

    #[test]
    fn test_match_language_primary_subtag_uses_registry_order() {
        let registry = LocaleRegistry::get();
        assert_eq!(registry.match_language("en"), Some(Locale::EnUs));
        assert_eq!(registry.match_language("en-AU"), Some(Locale::EnUs));
        assert_eq!(registry.match_language("zh-TW"), Some(Locale::ZhCn));
    }

    #[test]
    fn test_match_language_rejects_wildcard_and_empty() {
        let registry = LocaleRegistry::get();
        assert_eq!(registry.match_language("*"), None);
        assert_eq!(registry.match_language("  "), None);
        assert_eq!(registry.match_language("de-DE"), None);
    }
}
