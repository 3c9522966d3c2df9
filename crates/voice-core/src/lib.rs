//! # voice-core
//!
//! Audience voice profiles and the tone instruction compiler.
//!
//! A [`Profile`] maps trait categories (generation, tone preference, work
//! style, ...) to one or more values. [`compile`] turns it into a block of
//! directive sentences using a static [`RuleTable`], ready to be embedded in
//! an LLM system prompt. [`gate`] checks whether a profile is complete enough
//! to generate from.

pub mod compile;
pub mod error;
pub mod gate;
pub mod profile;
pub mod rules;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub use compile::{compile, compile_with, resolve, unmatched_categories, CompileOptions, Resolution};
pub use error::{Error, InvalidProfileShape, Result};
pub use gate::{is_complete, missing, next_follow_up};
pub use profile::{Profile, ProfileIngest, TraitSelection};
pub use rules::{normalize_value, Category, DirectiveRule, RuleTable};

// --- Locations ---

/// Resolve the global data directory (~/.voice/).
pub fn voice_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".voice")
}

/// Optional rulebook override; the built-in table is used when absent.
pub fn rulebook_path() -> PathBuf {
    voice_dir().join("rulebook.json")
}

/// Load the active rule table. A malformed override is an error, not a fallback.
pub fn load_rule_table() -> Result<RuleTable> {
    RuleTable::load_or_builtin(&rulebook_path())
}

// --- Profile storage ---

/// Named profiles kept as `<dir>/<name>.json`.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// ~/.voice/profiles/
    pub fn default_location() -> Self {
        Self::new(voice_dir().join("profiles"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    /// List all profile names (without .json extension), sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }
        let mut names: Vec<String> = fs::read_dir(&self.dir)?
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let name = entry.file_name().to_string_lossy().to_string();
                name.strip_suffix(".json")
                    .filter(|n| !n.starts_with('.'))
                    .map(|n| n.to_string())
            })
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).exists()
    }

    pub fn read(&self, name: &str) -> Result<Profile> {
        let path = self.path(name);
        if !path.exists() {
            return Err(Error::ProfileNotFound(name.to_string()));
        }
        let raw = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Atomic write (temp file + rename) so readers never see a half-written profile.
    pub fn write(&self, name: &str, profile: &Profile) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(profile)?;
        let tmp = self.dir.join(format!(".{}.json.tmp", name));
        fs::write(&tmp, json)?;
        fs::rename(&tmp, self.path(name))?;
        Ok(())
    }

    /// Delete a profile by name. Deleting a missing profile is not an error.
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path(name);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

// --- Settings ---

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AiSettings {
    pub provider: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    #[serde(flatten)]
    pub ai: AiSettings,
    pub compile: CompileOptions,
    /// Categories that must be filled before content is generated. Empty disables the gate.
    pub required_categories: Vec<String>,
    /// Follow-up question per category, asked when the gate finds it missing.
    pub follow_ups: BTreeMap<String, String>,
    pub default_profile: Profile,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ai: AiSettings::default(),
            compile: CompileOptions::default(),
            required_categories: Vec::new(),
            follow_ups: BTreeMap::new(),
            default_profile: Profile::session_default(),
        }
    }
}

pub fn settings_path() -> PathBuf {
    voice_dir().join("settings.json")
}

/// Read settings from `path`; a missing or unreadable file yields defaults.
pub fn read_settings_from(path: &Path) -> Settings {
    if !path.exists() {
        return Settings::default();
    }
    fs::read_to_string(path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

pub fn read_settings() -> Settings {
    read_settings_from(&settings_path())
}

pub fn write_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn write_settings(settings: &Settings) -> Result<()> {
    write_settings_to(&settings_path(), settings)
}

pub fn ai_configured(settings: &AiSettings) -> bool {
    !settings.provider.is_empty()
        && !settings.model.is_empty()
        && (settings.provider == "ollama" || !settings.api_key.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_store_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(tmp.path().join("profiles"));
        assert!(store.list().unwrap().is_empty());

        let mut profile = Profile::new();
        profile.set("generation", "millennials");
        profile.set("tone_pref", vec!["fun", "direct"]);
        store.write("onboarding", &profile).unwrap();
        store.write("all-hands", &Profile::session_default()).unwrap();

        assert_eq!(store.list().unwrap(), vec!["all-hands", "onboarding"]);
        assert_eq!(store.read("onboarding").unwrap(), profile);

        store.delete("onboarding").unwrap();
        store.delete("onboarding").unwrap();
        assert!(matches!(
            store.read("onboarding"),
            Err(Error::ProfileNotFound(name)) if name == "onboarding"
        ));
    }

    #[test]
    fn settings_defaults_and_partial_files() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");

        let settings = read_settings_from(&path);
        assert!(settings.compile.category_case_sensitive);
        assert_eq!(settings.default_profile, Profile::session_default());

        fs::write(
            &path,
            r#"{"provider":"openai","apiKey":"sk-test","model":"gpt-4o",
                "compile":{"dedupeDirectives":true},
                "requiredCategories":["generation","tone_pref"]}"#,
        )
        .unwrap();
        let settings = read_settings_from(&path);
        assert!(ai_configured(&settings.ai));
        assert!(settings.compile.dedupe_directives);
        assert!(settings.compile.category_case_sensitive);
        assert_eq!(settings.required_categories, vec!["generation", "tone_pref"]);

        fs::write(&path, "{ not json").unwrap();
        assert!(read_settings_from(&path).ai.provider.is_empty());
    }

    #[test]
    fn settings_write_then_read() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("settings.json");
        let mut settings = Settings::default();
        settings.ai.provider = "ollama".to_string();
        settings.ai.model = "llama3".to_string();
        settings
            .follow_ups
            .insert("generation".to_string(), "Who is the audience?".to_string());
        write_settings_to(&path, &settings).unwrap();

        let back = read_settings_from(&path);
        assert!(ai_configured(&back.ai));
        assert_eq!(back.follow_ups.get("generation").unwrap(), "Who is the audience?");
    }

    #[test]
    fn ai_configured_requires_key_except_ollama() {
        let mut ai = AiSettings {
            provider: "anthropic".to_string(),
            api_key: String::new(),
            model: "claude".to_string(),
        };
        assert!(!ai_configured(&ai));
        ai.provider = "ollama".to_string();
        assert!(ai_configured(&ai));
    }
}
