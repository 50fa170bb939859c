//! # Specification Dictionary
//!
//! Every Charon document and schema property carries a free-form
//! `Specification` string. It is an ordered list of URL-query style pairs
//! (`x=10&y=20&editor=localized-text-multiline`) that extensions use to stash
//! metadata without schema changes.
//!
//! Parsing and formatting follow `application/x-www-form-urlencoded`, so
//! values written here read back identically in the host UI.

use std::fmt;

use url::form_urlencoded;

/// Ordered key/value pairs parsed from a specification string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecificationDictionary {
    pairs: Vec<(String, String)>,
}

impl SpecificationDictionary {
    pub fn parse(specification: &str) -> Self {
        let pairs = form_urlencoded::parse(specification.as_bytes())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        Self { pairs }
    }

    /// First value stored under `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(pair_key, _)| pair_key == key)
            .map(|(_, value)| value.as_str())
    }

    /// Set `key` to a single value.
    ///
    /// The first occurrence keeps its place in the ordering; later duplicates
    /// are dropped. New keys are appended.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.pairs.iter().position(|(pair_key, _)| pair_key == key) {
            Some(index) => {
                self.pairs[index].1 = value;
                let mut seen = false;
                self.pairs.retain(|(pair_key, _)| {
                    if pair_key != key {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => self.pairs.push((key.to_string(), value)),
        }
    }

    /// Remove every value stored under `key`
    pub fn delete(&mut self, key: &str) {
        self.pairs.retain(|(pair_key, _)| pair_key != key);
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Template used to render a document's display name, e.g. `{Text}`
    pub fn display_text_template(&self) -> Option<&str> {
        self.get("displayTextTemplate")
    }
}

impl fmt::Display for SpecificationDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.pairs {
            serializer.append_pair(key, value);
        }
        f.write_str(&serializer.finish())
    }
}
