use std::collections::BTreeMap;

/// Languages offered by default, with their display labels
const DEFAULT_LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("zh-cn", "Chinese (Simplified)"),
    ("ar", "Arabic"),
    ("hi", "Hindi"),
];

/// Read-only mapping from language code to display label.
///
/// Codes follow the two-letter-plus-optional-region convention (`en`, `zh-cn`)
/// and are stored lowercase.
#[derive(Debug, Clone)]
pub struct LanguageCatalog {
    entries: BTreeMap<String, String>,
}

impl LanguageCatalog {
    pub fn new<I, C, L>(entries: I) -> Self
    where
        I: IntoIterator<Item = (C, L)>,
        C: Into<String>,
        L: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(code, label)| (code.into().to_lowercase(), label.into()))
                .collect(),
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(&code.to_lowercase())
    }

    pub fn label(&self, code: &str) -> Option<&str> {
        self.entries.get(&code.to_lowercase()).map(String::as_str)
    }

    /// Display label, or the code itself for unknown languages
    pub fn label_or_code<'a>(&'a self, code: &'a str) -> &'a str {
        self.label(code).unwrap_or(code)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, l)| (c.as_str(), l.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LanguageCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGES.iter().copied())
    }
}

/// Strip the region part of a language code (`zh-cn` -> `zh`).
/// Gateways that only understand base codes call this before building requests.
pub fn base_code(code: &str) -> &str {
    code.split(['-', '_']).next().unwrap_or(code)
}
