//! Audience profile: trait category -> one or more selected values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{json_kind, Error, InvalidProfileShape};

/// The value held for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraitSelection {
    Single(String),
    Multiple(Vec<String>),
}

impl TraitSelection {
    /// Selected values in stored order.
    pub fn values(&self) -> &[String] {
        match self {
            TraitSelection::Single(v) => std::slice::from_ref(v),
            TraitSelection::Multiple(vs) => vs,
        }
    }

    /// A non-empty string, or a list with at least one element.
    pub fn is_filled(&self) -> bool {
        match self {
            TraitSelection::Single(v) => !v.is_empty(),
            TraitSelection::Multiple(vs) => !vs.is_empty(),
        }
    }
}

impl From<&str> for TraitSelection {
    fn from(value: &str) -> Self {
        TraitSelection::Single(value.to_string())
    }
}

impl From<String> for TraitSelection {
    fn from(value: String) -> Self {
        TraitSelection::Single(value)
    }
}

impl From<Vec<String>> for TraitSelection {
    fn from(values: Vec<String>) -> Self {
        TraitSelection::Multiple(values)
    }
}

impl From<Vec<&str>> for TraitSelection {
    fn from(values: Vec<&str>) -> Self {
        TraitSelection::Multiple(values.into_iter().map(str::to_string).collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile {
    traits: BTreeMap<String, TraitSelection>,
}

/// Result of lenient ingestion: the accepted entries plus whatever was rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileIngest {
    pub profile: Profile,
    pub rejected: Vec<InvalidProfileShape>,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starting profile for a new session.
    pub fn session_default() -> Self {
        let mut profile = Self::new();
        profile.set("generation", "Gen X");
        profile.set("tech_savviness", "medium");
        profile.set("culture", "collectivist");
        profile.set("tone_pref", "fun");
        profile
    }

    pub fn get(&self, category: &str) -> Option<&TraitSelection> {
        self.traits.get(category)
    }

    /// Set or replace a category's selection.
    pub fn set(&mut self, category: impl Into<String>, selection: impl Into<TraitSelection>) {
        self.traits.insert(category.into(), selection.into());
    }

    pub fn remove(&mut self, category: &str) -> Option<TraitSelection> {
        self.traits.remove(category)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TraitSelection)> {
        self.traits.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.traits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traits.is_empty()
    }

    /// Overwrite this profile's entries with every entry of `other`.
    pub fn merge(&mut self, other: Profile) {
        self.traits.extend(other.traits);
    }

    /// Build a profile from untrusted JSON, e.g. a model's trait extraction.
    ///
    /// Strings and arrays of strings are accepted. `null` counts as absent.
    /// Any other value is reported in `rejected` and its category is skipped.
    pub fn ingest(value: &serde_json::Value) -> crate::Result<ProfileIngest> {
        let map = value.as_object().ok_or(Error::ProfileNotObject {
            found: json_kind(value),
        })?;

        let mut out = ProfileIngest::default();
        for (category, entry) in map {
            match entry {
                serde_json::Value::Null => {}
                serde_json::Value::String(s) => out.profile.set(category.as_str(), s.as_str()),
                serde_json::Value::Array(items) => {
                    let values: Option<Vec<String>> = items
                        .iter()
                        .map(|item| item.as_str().map(str::to_string))
                        .collect();
                    match values {
                        Some(values) => out.profile.set(category.as_str(), values),
                        None => out.rejected.push(InvalidProfileShape {
                            category: category.clone(),
                            found: "array with non-string elements",
                        }),
                    }
                }
                other => out.rejected.push(InvalidProfileShape {
                    category: category.clone(),
                    found: json_kind(other),
                }),
            }
        }
        Ok(out)
    }

    pub fn ingest_str(raw: &str) -> crate::Result<ProfileIngest> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        Self::ingest(&value)
    }
}
