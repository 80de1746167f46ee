use serde::{Deserialize, Serialize};

/// A localized title candidate attached to a series or episode snapshot.
///
/// `kind` carries the source's own classification ("main", "official",
/// "synonym", ...), and `language` is the source's language code, which may
/// be a transliteration marker ("x-jat", "x-zht", ...) rather than a plain
/// ISO code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Title {
    pub name: String,
    pub language: String,
    pub kind: String,
}

impl Title {
    pub fn new(name: &str, language: &str, kind: &str) -> Self {
        Self {
            name: name.to_string(),
            language: language.to_string(),
            kind: kind.to_string(),
        }
    }
}
