use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use voice_core::{CompileOptions, InvalidProfileShape, Profile, ProfileIngest, RuleTable, Settings};

/// A question to put to the user before content can be generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUp {
    pub category: String,
    pub question: String,
}

/// Per-conversation state owned by the host. Nothing here is global; two
/// sessions never share a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub profile: Profile,
}

impl FollowUp {
    /// The first category in `required` that `profile` leaves empty, with the
    /// configured question or a generic one built from the category name.
    pub fn next<S: AsRef<str>>(
        profile: &Profile,
        required: &[S],
        questions: &BTreeMap<String, String>,
    ) -> Option<Self> {
        let (category, question) = voice_core::next_follow_up(profile, required, questions)?;
        let question = match question {
            Some(q) => q.to_string(),
            None => format!(
                "Before I start writing: what {} should I assume for your audience?",
                category.replace('_', " ")
            ),
        };
        Some(FollowUp {
            category: category.to_string(),
            question,
        })
    }
}

impl Session {
    pub fn new(profile: Profile) -> Self {
        Self { profile }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.default_profile.clone())
    }

    /// Merge an extraction result into the profile. Returns the rejected entries.
    pub fn apply_extraction(&mut self, ingest: ProfileIngest) -> Vec<InvalidProfileShape> {
        for rejected in &ingest.rejected {
            tracing::warn!(category = %rejected.category, "skipping profile entry: {}", rejected);
        }
        self.profile.merge(ingest.profile);
        ingest.rejected
    }

    /// The compiled tone instruction for the current profile.
    pub fn instruction(&self, table: &RuleTable, options: &CompileOptions) -> String {
        voice_core::compile_with(&self.profile, table, options)
    }

    /// The follow-up for the first required category still missing.
    pub fn pending_follow_up(&self, settings: &Settings) -> Option<FollowUp> {
        FollowUp::next(&self.profile, &settings.required_categories, &settings.follow_ups)
    }
}
