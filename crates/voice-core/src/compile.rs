//! Instruction compiler: profile + rule table -> newline-joined tone directives.
//!
//! Pure and deterministic. Output order follows the rule table's category
//! order, then the stored order of values inside a multi-select category.
//! Unknown categories and values contribute nothing; compilation never fails.

use serde::{Deserialize, Serialize};

use crate::profile::{Profile, TraitSelection};
use crate::rules::{Category, RuleTable, DEFAULT_VALUE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// When false, a profile key matches a category regardless of ASCII case.
    /// An exact match always wins over a case-folded one.
    pub category_case_sensitive: bool,
    /// Drop repeated directive sentences, keeping the first occurrence.
    pub dedupe_directives: bool,
    /// Emit a category's `default` directive when the profile leaves it empty.
    pub apply_category_defaults: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            category_case_sensitive: true,
            dedupe_directives: false,
            apply_category_defaults: false,
        }
    }
}

/// One attempted (category, value) lookup and what it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution<'a> {
    pub category: &'a str,
    pub value: &'a str,
    pub directive: Option<&'a str>,
}

/// Compile with default options.
pub fn compile(profile: &Profile, table: &RuleTable) -> String {
    compile_with(profile, table, &CompileOptions::default())
}

pub fn compile_with(profile: &Profile, table: &RuleTable, options: &CompileOptions) -> String {
    let mut directives: Vec<&str> = Vec::new();
    for directive in resolve(profile, table, options)
        .into_iter()
        .filter_map(|r| r.directive)
    {
        if options.dedupe_directives && directives.contains(&directive) {
            continue;
        }
        directives.push(directive);
    }
    directives.join("\n")
}

/// Every value the profile selects for a known category, in output order,
/// paired with its directive (or `None` when the value is unknown).
///
/// Profile keys that match no category are not reported.
pub fn resolve<'a>(
    profile: &'a Profile,
    table: &'a RuleTable,
    options: &CompileOptions,
) -> Vec<Resolution<'a>> {
    let mut out = Vec::new();
    for category in table.categories() {
        let selection = selection_for(profile, category.name(), options.category_case_sensitive)
            .filter(|s| s.is_filled());

        match selection {
            Some(selection) => {
                for value in selection.values() {
                    out.push(Resolution {
                        category: category.name(),
                        value: value.as_str(),
                        directive: category.lookup(value),
                    });
                }
            }
            None if options.apply_category_defaults => {
                if let Some(directive) = fallback(category) {
                    out.push(directive);
                }
            }
            None => {}
        }
    }
    out
}

/// Profile keys that no rule table category picks up.
pub fn unmatched_categories<'a>(
    profile: &'a Profile,
    table: &RuleTable,
    options: &CompileOptions,
) -> Vec<&'a str> {
    profile
        .iter()
        .map(|(key, _)| key)
        .filter(|key| {
            !table.categories().iter().any(|c| {
                c.name() == *key
                    || (!options.category_case_sensitive && c.name().eq_ignore_ascii_case(key))
            })
        })
        .collect()
}

fn selection_for<'a>(
    profile: &'a Profile,
    name: &str,
    case_sensitive: bool,
) -> Option<&'a TraitSelection> {
    if let Some(selection) = profile.get(name) {
        return Some(selection);
    }
    if case_sensitive {
        return None;
    }
    profile
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, selection)| selection)
}

fn fallback(category: &Category) -> Option<Resolution<'_>> {
    category.default_directive().map(|directive| Resolution {
        category: category.name(),
        value: DEFAULT_VALUE,
        directive: Some(directive),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RuleTable {
        RuleTable::from_json(
            r#"{
                "tone": {"fun": "Use humor.", "formal": "Be polished.", "direct": "Be blunt."},
                "length": {"short": "Keep under 100 words.", "default": "Aim for about 300 words."}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn single_values_in_table_order() {
        let mut profile = Profile::new();
        profile.set("length", "short");
        profile.set("tone", "fun");
        assert_eq!(compile(&profile, &table()), "Use humor.\nKeep under 100 words.");
    }

    #[test]
    fn unknown_value_yields_empty_string() {
        let mut profile = Profile::new();
        profile.set("tone", "sarcastic");
        assert_eq!(compile(&profile, &table()), "");
    }

    #[test]
    fn multi_select_keeps_list_order_and_duplicates() {
        let mut profile = Profile::new();
        profile.set("tone", vec!["direct", "fun", "direct"]);
        assert_eq!(
            compile(&profile, &table()),
            "Be blunt.\nUse humor.\nBe blunt."
        );
    }

    #[test]
    fn dedupe_option_keeps_first_occurrence() {
        let mut profile = Profile::new();
        profile.set("tone", vec!["direct", "fun", "direct"]);
        let options = CompileOptions {
            dedupe_directives: true,
            ..CompileOptions::default()
        };
        assert_eq!(compile_with(&profile, &table(), &options), "Be blunt.\nUse humor.");
    }

    #[test]
    fn empty_collection_is_absent() {
        let mut profile = Profile::new();
        profile.set("tone", Vec::<String>::new());
        assert_eq!(compile(&profile, &table()), "");
        assert!(resolve(&profile, &table(), &CompileOptions::default()).is_empty());
    }

    #[test]
    fn empty_string_is_absent() {
        let table = table();
        let mut empty_string = Profile::new();
        empty_string.set("length", "");
        let mut empty_list = Profile::new();
        empty_list.set("length", Vec::<String>::new());

        assert_eq!(compile(&empty_string, &table), "");
        assert!(resolve(&empty_string, &table, &CompileOptions::default()).is_empty());

        let options = CompileOptions {
            apply_category_defaults: true,
            ..CompileOptions::default()
        };
        assert_eq!(
            compile_with(&empty_string, &table, &options),
            "Aim for about 300 words."
        );
        assert_eq!(
            compile_with(&empty_string, &table, &options),
            compile_with(&empty_list, &table, &options)
        );
    }

    #[test]
    fn category_case_flag() {
        let mut profile = Profile::new();
        profile.set("TONE", "fun");
        assert_eq!(compile(&profile, &table()), "");

        let options = CompileOptions {
            category_case_sensitive: false,
            ..CompileOptions::default()
        };
        assert_eq!(compile_with(&profile, &table(), &options), "Use humor.");
    }

    #[test]
    fn exact_key_beats_case_folded_key() {
        let mut profile = Profile::new();
        profile.set("Tone", "formal");
        profile.set("tone", "fun");
        let options = CompileOptions {
            category_case_sensitive: false,
            ..CompileOptions::default()
        };
        assert_eq!(compile_with(&profile, &table(), &options), "Use humor.");
    }

    #[test]
    fn defaults_only_when_enabled() {
        let mut profile = Profile::new();
        profile.set("tone", "fun");
        assert_eq!(compile(&profile, &table()), "Use humor.");

        let options = CompileOptions {
            apply_category_defaults: true,
            ..CompileOptions::default()
        };
        assert_eq!(
            compile_with(&profile, &table(), &options),
            "Use humor.\nAim for about 300 words."
        );

        // An explicit but unknown value is not replaced by the default.
        profile.set("length", "epic");
        assert_eq!(compile_with(&profile, &table(), &options), "Use humor.");
    }

    #[test]
    fn default_is_selectable_as_a_value() {
        let mut profile = Profile::new();
        profile.set("length", "Default");
        assert_eq!(compile(&profile, &table()), "Aim for about 300 words.");
    }

    #[test]
    fn resolve_reports_misses() {
        let mut profile = Profile::new();
        profile.set("tone", vec!["fun", "snarky"]);
        profile.set("mood", "happy");
        let table = table();
        let resolved = resolve(&profile, &table, &CompileOptions::default());
        assert_eq!(
            resolved,
            vec![
                Resolution { category: "tone", value: "fun", directive: Some("Use humor.") },
                Resolution { category: "tone", value: "snarky", directive: None },
            ]
        );
        assert_eq!(
            unmatched_categories(&profile, &table, &CompileOptions::default()),
            vec!["mood"]
        );
    }
}
