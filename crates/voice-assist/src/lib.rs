//! Content assistant on top of voice-core: trait extraction, tone-guided
//! generation and follow-up questions, all through a configured LLM provider.

pub mod engine;
mod parse;
mod prompt;
mod session;

use serde::Serialize;
use thiserror::Error;

use voice_core::{AiSettings, RuleTable, Settings};

pub use parse::parse_traits;
pub use prompt::{extraction_prompt, system_prompt, EXTRACTION_SYSTEM_PROMPT, PERSONA_PREAMBLE};
pub use session::{FollowUp, Session};

#[derive(Error, Debug)]
pub enum AssistError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("AI provider is not configured")]
    NotConfigured,

    #[error("build LLM: {0}")]
    Build(String),

    #[error("chat: {0}")]
    Chat(String),

    #[error("LLM returned empty text")]
    EmptyResponse,

    #[error("LLM returned no text")]
    NoText,
}

/// Outcome of one assist turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Reply {
    /// A required trait is missing; ask this before generating.
    FollowUp { category: String, question: String },
    /// Generated content and the tone instruction it was written under.
    Content { text: String, instruction: String },
}

/// Infer traits from `message` and merge them into the session profile.
/// Returns how many categories were updated; an unparseable reply updates nothing.
pub async fn extract_traits(
    session: &mut Session,
    table: &RuleTable,
    settings: &AiSettings,
    message: &str,
) -> Result<usize, AssistError> {
    let user_msg = prompt::extraction_prompt(message, table);
    let raw = engine::generate(settings, EXTRACTION_SYSTEM_PROMPT, &user_msg).await?;
    tracing::debug!("raw extraction output:\n{}", raw);

    match parse::parse_traits(&raw) {
        Some(ingest) => {
            let updated = ingest.profile.len();
            session.apply_extraction(ingest);
            tracing::debug!(updated, "profile updated from message");
            Ok(updated)
        }
        None => {
            tracing::warn!("couldn't parse profile info from extraction reply");
            Ok(0)
        }
    }
}

/// One full turn: update the profile from the request, check completeness,
/// then generate content under the compiled tone instruction.
///
/// A failed extraction never blocks generation.
pub async fn assist(
    session: &mut Session,
    table: &RuleTable,
    settings: &Settings,
    request: &str,
) -> Result<Reply, AssistError> {
    if let Err(e) = extract_traits(session, table, &settings.ai, request).await {
        tracing::warn!("trait extraction failed: {}", e);
    }

    if let Some(follow_up) = session.pending_follow_up(settings) {
        return Ok(Reply::FollowUp {
            category: follow_up.category,
            question: follow_up.question,
        });
    }

    let instruction = session.instruction(table, &settings.compile);
    let system = prompt::system_prompt(&instruction);

    tracing::info!(
        provider = %settings.ai.provider,
        model = %settings.ai.model,
        directives = instruction.lines().count(),
        "generating content"
    );
    let text = engine::generate(&settings.ai, &system, request).await?;
    Ok(Reply::Content { text, instruction })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_extraction_leaves_profile_alone() {
        let table = RuleTable::builtin().unwrap();
        let mut session = Session::from_settings(&Settings::default());
        let before = session.profile.clone();

        let err = extract_traits(&mut session, &table, &AiSettings::default(), "Gen Z interns")
            .await
            .unwrap_err();
        assert!(matches!(err, AssistError::NotConfigured));
        assert_eq!(session.profile, before);
    }

    #[tokio::test]
    async fn missing_trait_asks_before_calling_the_model() {
        let table = RuleTable::builtin().unwrap();
        let mut settings = Settings::default();
        settings.required_categories = vec!["style_of_work".to_string()];
        let mut session = Session::from_settings(&settings);

        let reply = assist(&mut session, &table, &settings, "Write a welcome note")
            .await
            .unwrap();
        assert!(matches!(reply, Reply::FollowUp { ref category, .. } if category == "style_of_work"));
    }

    #[tokio::test]
    async fn complete_profile_reaches_the_provider() {
        let table = RuleTable::builtin().unwrap();
        let settings = Settings::default();
        let mut session = Session::from_settings(&settings);

        let err = assist(&mut session, &table, &settings, "Write a welcome note")
            .await
            .unwrap_err();
        assert!(matches!(err, AssistError::NotConfigured));
    }

    #[test]
    fn reply_serializes_with_kind_tag() {
        let reply = Reply::FollowUp {
            category: "generation".to_string(),
            question: "Who is reading?".to_string(),
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["kind"], "followUp");
        assert_eq!(json["question"], "Who is reading?");
    }
}
