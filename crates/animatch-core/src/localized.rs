//! Canonical-language values with per-language translations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A value in the canonical language plus zero or more translations keyed by
/// language code (`"en"`, `"ja"`, `"zh-TW"`, ...).
///
/// Translations are kept in a `BTreeMap` so serialization order is stable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Localized<T> {
    /// Value in the canonical language.
    pub canonical: T,
    /// Translated values keyed by language code.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub translations: BTreeMap<String, T>,
}

impl<T> Localized<T> {
    /// Create a value with no translations.
    pub fn new(canonical: T) -> Self {
        Self {
            canonical,
            translations: BTreeMap::new(),
        }
    }

    /// Builder-style translation insert (replaces an existing language).
    #[must_use]
    pub fn with_translation(mut self, lang: impl Into<String>, value: T) -> Self {
        let _ = self.translations.insert(lang.into(), value);
        self
    }

    /// Value for `lang`, falling back to the canonical value.
    pub fn get(&self, lang: &str) -> &T {
        self.translations.get(lang).unwrap_or(&self.canonical)
    }

    /// Language codes with a translation, in sorted order.
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.translations.keys().map(String::as_str)
    }
}

impl<T> From<T> for Localized<T> {
    fn from(canonical: T) -> Self {
        Self::new(canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_falls_back_to_canonical() {
        let name = Localized::new("아카네".to_string()).with_translation("en", "Akane".into());
        assert_eq!(name.get("en"), "Akane");
        assert_eq!(name.get("ja"), "아카네");
    }

    #[test]
    fn translations_omitted_when_empty() {
        let title = Localized::new("Oshi no Ko".to_string());
        let json = serde_json::to_string(&title).unwrap();
        assert_eq!(json, r#"{"canonical":"Oshi no Ko"}"#);
    }

    #[test]
    fn translations_serialize_sorted() {
        let tags = Localized::new(vec!["a".to_string()])
            .with_translation("zh-TW", vec!["c".to_string()])
            .with_translation("en", vec!["b".to_string()]);
        let json = serde_json::to_string(&tags).unwrap();
        assert_eq!(
            json,
            r#"{"canonical":["a"],"translations":{"en":["b"],"zh-TW":["c"]}}"#
        );
        assert_eq!(tags.languages().collect::<Vec<_>>(), vec!["en", "zh-TW"]);
    }

    #[test]
    fn missing_translations_deserialize_empty() {
        let v: Localized<String> = serde_json::from_str(r#"{"canonical":"x"}"#).unwrap();
        assert!(v.translations.is_empty());
    }
}
