//! Trait rule table: (category, value) -> directive sentence.
//!
//! The table is static configuration. It is parsed once at startup from a
//! nested JSON object and never mutated afterwards, so a single instance can be
//! shared by any number of callers. Category order in the document is kept and
//! drives the order of the compiled instruction.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::{self, DeserializeSeed, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// Built-in rulebook, used when no override file exists.
pub const BUILTIN_RULEBOOK: &str = include_str!("../rulebook.json");

/// Pseudo-value holding a category's fallback directive.
pub const DEFAULT_VALUE: &str = "default";

/// Lowercase and replace spaces with underscores ("Gen Z" -> "gen_z").
pub fn normalize_value(value: &str) -> String {
    value.to_lowercase().replace(' ', "_")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveRule {
    pub value: String,
    pub directive: String,
}

/// One trait dimension and its value -> directive rules, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    name: String,
    rules: Vec<DirectiveRule>,
}

impl Category {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[DirectiveRule] {
        &self.rules
    }

    /// Values in declaration order, including the `default` pseudo-value if present.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.value.as_str())
    }

    /// Normalizes `value` and returns its directive, if any.
    pub fn lookup(&self, value: &str) -> Option<&str> {
        let key = normalize_value(value);
        self.rules
            .iter()
            .find(|r| r.value == key)
            .map(|r| r.directive.as_str())
    }

    pub fn default_directive(&self) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.value == DEFAULT_VALUE)
            .map(|r| r.directive.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable {
    categories: Vec<Category>,
}

impl RuleTable {
    /// Parse a rulebook document: `{ "<category>": { "<value>": "<directive>" } }`.
    pub fn from_json(raw: &str) -> crate::Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::Rulebook(e.to_string()))
    }

    pub fn builtin() -> crate::Result<Self> {
        Self::from_json(BUILTIN_RULEBOOK)
    }

    pub fn load(path: &Path) -> crate::Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Load the override at `path` if it exists, otherwise the built-in rulebook.
    pub fn load_or_builtin(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Self::builtin()
        }
    }

    /// Category names match exactly; the value is normalized first.
    /// Unknown categories and values yield `None`.
    pub fn lookup(&self, category: &str, value: &str) -> Option<&str> {
        self.category(category)?.lookup(value)
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

// --- serde ---

impl<'de> Deserialize<'de> for RuleTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(TableVisitor)
    }
}

struct TableVisitor;

impl<'de> Visitor<'de> for TableVisitor {
    type Value = RuleTable;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object mapping trait categories to value/directive objects")
    }

    fn visit_map<A>(self, mut map: A) -> Result<RuleTable, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut categories: Vec<Category> = Vec::new();
        while let Some(name) = map.next_key::<String>()? {
            if categories.iter().any(|c| c.name == name) {
                return Err(de::Error::custom(format!("duplicate category '{name}'")));
            }
            let rules = map.next_value_seed(RulesSeed { category: &name })?;
            categories.push(Category { name, rules });
        }
        Ok(RuleTable { categories })
    }
}

struct RulesSeed<'a> {
    category: &'a str,
}

impl<'de> DeserializeSeed<'de> for RulesSeed<'_> {
    type Value = Vec<DirectiveRule>;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for RulesSeed<'_> {
    type Value = Vec<DirectiveRule>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "an object mapping values of '{}' to directive strings", self.category)
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut rules: Vec<DirectiveRule> = Vec::new();
        while let Some((value, directive)) = map.next_entry::<String, String>()? {
            let normalized = normalize_value(&value);
            if value != normalized {
                return Err(de::Error::custom(format!(
                    "value '{value}' in '{}' is not normalized (expected '{normalized}')",
                    self.category
                )));
            }
            if rules.iter().any(|r| r.value == value) {
                return Err(de::Error::custom(format!(
                    "duplicate value '{value}' in '{}'",
                    self.category
                )));
            }
            rules.push(DirectiveRule { value, directive });
        }
        Ok(rules)
    }
}

impl Serialize for RuleTable {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.categories.len()))?;
        for category in &self.categories {
            map.serialize_entry(&category.name, &RulesRef(&category.rules))?;
        }
        map.end()
    }
}

struct RulesRef<'a>(&'a [DirectiveRule]);

impl Serialize for RulesRef<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for rule in self.0 {
            map.serialize_entry(&rule.value, &rule.directive)?;
        }
        map.end()
    }
}
