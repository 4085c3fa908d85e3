//! Script and direction of common locales

use std::collections::HashMap;

use typeatlas_core::{
    traits::LocaleTable,
    types::{Direction, LocaleInfo},
};

use typeatlas_core::types::Direction::{LeftToRight as Ltr, RightToLeft as Rtl};

/// Built-in rows: language or locale tag, ISO 15924 script, direction
const BUILTIN: &[(&str, &str, Direction)] = &[
    ("ar", "Arab", Rtl),
    ("bn", "Beng", Ltr),
    ("de", "Latn", Ltr),
    ("el", "Grek", Ltr),
    ("en", "Latn", Ltr),
    ("es", "Latn", Ltr),
    ("fa", "Arab", Rtl),
    ("fr", "Latn", Ltr),
    ("he", "Hebr", Rtl),
    ("hi", "Deva", Ltr),
    ("hy", "Armn", Ltr),
    ("it", "Latn", Ltr),
    ("ja", "Jpan", Ltr),
    ("ka", "Geor", Ltr),
    ("km", "Khmr", Ltr),
    ("ko", "Kore", Ltr),
    ("lo", "Laoo", Ltr),
    ("my", "Mymr", Ltr),
    ("pt", "Latn", Ltr),
    ("ru", "Cyrl", Ltr),
    ("sr", "Cyrl", Ltr),
    ("sr-Latn", "Latn", Ltr),
    ("ta", "Taml", Ltr),
    ("th", "Thai", Ltr),
    ("uk", "Cyrl", Ltr),
    ("ur", "Arab", Rtl),
    ("yi", "Hebr", Rtl),
    ("zh", "Hans", Ltr),
    ("zh-TW", "Hant", Ltr),
    ("zh-HK", "Hant", Ltr),
];

/// In-memory locale table, seeded with common languages
///
/// Tags are matched exactly; `_` and `-` are interchangeable.
#[derive(Debug, Clone)]
pub struct StaticLocaleTable {
    entries: HashMap<String, LocaleInfo>,
}

fn normalize(tag: &str) -> String {
    tag.replace('_', "-")
}

impl StaticLocaleTable {
    /// Table with the built-in rows
    pub fn new() -> Self {
        let entries = BUILTIN
            .iter()
            .map(|&(tag, script, direction)| {
                (
                    tag.to_string(),
                    LocaleInfo {
                        script: script.to_string(),
                        direction,
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Table without any rows
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Add or replace a row
    pub fn insert(&mut self, tag: &str, script: &str, direction: Direction) {
        self.entries.insert(
            normalize(tag),
            LocaleInfo {
                script: script.to_string(),
                direction,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for StaticLocaleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LocaleTable for StaticLocaleTable {
    fn lookup(&self, locale: &str) -> Option<LocaleInfo> {
        self.entries.get(&normalize(locale)).cloned()
    }
}
