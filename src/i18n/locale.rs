//! Locale type: the closed set of locales the site is translated into.
//!
//! Each locale has a canonical tag (used in cookies, URLs and the `lang`
//! attribute) and a storage key (used inside translation JSON files). The
//! mapping between the two is total because it is an exhaustive match.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A supported locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locale {
    /// Untranslated source text ("und").
    Original,
    EnUs,
    EnGb,
    ZhCn,
    ZhHk,
    EsEs,
    FrFr,
    JaJp,
}

/// Error returned when a string is not a canonical locale tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown locale tag: '{0}'")]
pub struct UnknownLocale(pub String);

impl Locale {
    /// All locales, in registry order.
    pub const ALL: [Locale; 8] = [
        Locale::Original,
        Locale::EnUs,
        Locale::EnGb,
        Locale::ZhCn,
        Locale::ZhHk,
        Locale::EsEs,
        Locale::FrFr,
        Locale::JaJp,
    ];

    /// Locale used when nothing else matches.
    pub const DEFAULT: Locale = Locale::EnUs;

    /// Canonical tag (e.g. "en-US").
    pub fn tag(&self) -> &'static str {
        match self {
            Locale::Original => "und",
            Locale::EnUs => "en-US",
            Locale::EnGb => "en-GB",
            Locale::ZhCn => "zh-CN",
            Locale::ZhHk => "zh-HK",
            Locale::EsEs => "es-ES",
            Locale::FrFr => "fr-FR",
            Locale::JaJp => "ja-JP",
        }
    }

    /// Key under which this locale's string is stored in a translation value.
    pub fn storage_key(&self) -> &'static str {
        match self {
            Locale::Original => "raw",
            Locale::EnUs => "en_US",
            Locale::EnGb => "en_GB",
            Locale::ZhCn => "zh_CN",
            Locale::ZhHk => "zh_HK",
            Locale::EsEs => "es_ES",
            Locale::FrFr => "fr_FR",
            Locale::JaJp => "ja_JP",
        }
    }

    /// Value for the HTML `lang` attribute.
    pub fn html_lang(&self) -> &'static str {
        self.tag()
    }

    /// Primary language subtag (e.g. "en" for "en-GB").
    pub fn primary_subtag(&self) -> &'static str {
        let tag = self.tag();
        tag.split('-').next().unwrap_or(tag)
    }

    /// Whether this is the untranslated sentinel.
    pub fn is_original(&self) -> bool {
        matches!(self, Locale::Original)
    }

    /// Look up a locale by canonical tag, ignoring ASCII case.
    pub fn from_tag(tag: &str) -> Option<Locale> {
        let tag = tag.trim();
        Locale::ALL
            .into_iter()
            .find(|locale| locale.tag().eq_ignore_ascii_case(tag))
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale::DEFAULT
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locale::from_tag(s).ok_or_else(|| UnknownLocale(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    // ==================== Storage Key Tests ====================

    #[test]
    fn test_storage_keys_are_distinct() {
        let keys: HashSet<_> = Locale::ALL.iter().map(|l| l.storage_key()).collect();
        assert_eq!(keys.len(), Locale::ALL.len());
    }

    #[test]
    fn test_hyphenated_tags_map_to_underscored_keys() {
        for locale in Locale::ALL {
            if locale.is_original() {
                continue;
            }
            assert_ne!(locale.tag(), locale.storage_key());
            assert_eq!(locale.tag().replace('-', "_"), locale.storage_key());
        }
    }

    #[test]
    fn test_original_maps_to_raw() {
        assert_eq!(Locale::Original.tag(), "und");
        assert_eq!(Locale::Original.storage_key(), "raw");
        assert_eq!(Locale::Original.html_lang(), "und");
    }

    // ==================== Parsing Tests ====================

    #[test]
    fn test_from_tag_exact() {
        assert_eq!(Locale::from_tag("fr-FR"), Some(Locale::FrFr));
        assert_eq!(Locale::from_tag("und"), Some(Locale::Original));
    }

    #[test]
    fn test_from_tag_ignores_case() {
        assert_eq!(Locale::from_tag("zh-hk"), Some(Locale::ZhHk));
        assert_eq!(Locale::from_tag("EN-GB"), Some(Locale::EnGb));
    }

    #[test]
    fn test_from_tag_unknown() {
        assert_eq!(Locale::from_tag("xx-ZZ"), None);
        assert_eq!(Locale::from_tag(""), None);
        assert_eq!(Locale::from_tag("en"), None);
    }

    #[test]
    fn test_from_str_error_names_tag() {
        let err = "de-DE".parse::<Locale>().unwrap_err();
        assert!(err.to_string().contains("de-DE"));
    }

    #[test]
    fn test_display_round_trips_tag() {
        for locale in Locale::ALL {
            assert_eq!(locale.to_string().parse::<Locale>().unwrap(), locale);
        }
    }

    // ==================== Misc Tests ====================

    #[test]
    fn test_default_is_en_us() {
        assert_eq!(Locale::default(), Locale::EnUs);
    }

    #[test]
    fn test_primary_subtag() {
        assert_eq!(Locale::EnGb.primary_subtag(), "en");
        assert_eq!(Locale::Original.primary_subtag(), "und");
    }
}
