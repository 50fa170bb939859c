use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Dialog text: either a plain string or a per-language map.
///
/// Localized maps may carry a `notes` entry for writers; it is never shown as
/// dialog text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Text {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

impl Text {
    /// Text for `language`, falling back to the first non-`notes` entry
    pub fn localized(&self, language: Option<&str>) -> &str {
        match self {
            Text::Plain(text) => text,
            Text::Localized(entries) => language
                .and_then(|language| entries.get(language))
                .or_else(|| {
                    entries
                        .iter()
                        .find(|(key, _)| key.as_str() != "notes")
                        .map(|(_, text)| text)
                })
                .map(String::as_str)
                .unwrap_or(""),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.localized(None).is_empty()
    }
}

impl Default for Text {
    fn default() -> Self {
        Text::Plain(String::new())
    }
}

impl From<&str> for Text {
    fn from(text: &str) -> Self {
        Text::Plain(text.to_string())
    }
}

impl From<String> for Text {
    fn from(text: String) -> Self {
        Text::Plain(text)
    }
}
