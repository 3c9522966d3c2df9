use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::ChatMessage;

use voice_core::AiSettings;

use crate::AssistError;

fn map_backend(provider: &str) -> Result<LLMBackend, AssistError> {
    match provider {
        "openai" => Ok(LLMBackend::OpenAI),
        "anthropic" => Ok(LLMBackend::Anthropic),
        "google" => Ok(LLMBackend::Google),
        "ollama" => Ok(LLMBackend::Ollama),
        "groq" => Ok(LLMBackend::Groq),
        "mistral" => Ok(LLMBackend::Mistral),
        "deepseek" => Ok(LLMBackend::DeepSeek),
        other => Err(AssistError::UnknownProvider(other.to_string())),
    }
}

/// Send one system + user exchange and return the reply text.
pub async fn generate(
    settings: &AiSettings,
    system: &str,
    user_msg: &str,
) -> Result<String, AssistError> {
    if !voice_core::ai_configured(settings) {
        return Err(AssistError::NotConfigured);
    }
    let backend = map_backend(&settings.provider)?;

    let mut builder = LLMBuilder::new()
        .backend(backend)
        .model(&settings.model)
        .system(system);

    if !settings.api_key.is_empty() {
        builder = builder.api_key(&settings.api_key);
    }

    let llm = builder
        .build()
        .map_err(|e| AssistError::Build(e.to_string()))?;

    let messages = vec![ChatMessage::user().content(user_msg).build()];

    tracing::debug!(provider = %settings.provider, model = %settings.model, "sending chat request");
    let response = llm
        .chat(&messages)
        .await
        .map_err(|e| AssistError::Chat(e.to_string()))?;

    match response.text() {
        Some(text) if !text.trim().is_empty() => Ok(text),
        Some(_) => Err(AssistError::EmptyResponse),
        None => Err(AssistError::NoText),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_providers() {
        for provider in ["openai", "anthropic", "google", "ollama", "groq", "mistral", "deepseek"] {
            assert!(map_backend(provider).is_ok(), "{provider}");
        }
        assert!(matches!(
            map_backend("watson"),
            Err(AssistError::UnknownProvider(p)) if p == "watson"
        ));
    }

    #[tokio::test]
    async fn refuses_when_not_configured() {
        let settings = AiSettings::default();
        let err = generate(&settings, "system", "hello").await.unwrap_err();
        assert!(matches!(err, AssistError::NotConfigured));
    }
}
