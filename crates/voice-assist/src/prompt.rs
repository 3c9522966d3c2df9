use voice_core::rules::DEFAULT_VALUE;
use voice_core::RuleTable;

/// Static persona sent ahead of the tone block.
pub const PERSONA_PREAMBLE: &str = "You are a writing assistant with a bright, funny, and creative \
personality. You help users write internal content like onboarding, training, or announcements.";

pub const EXTRACTION_SYSTEM_PROMPT: &str = "Extract profile traits based on user messages.";

/// Persona preamble plus the compiled tone instruction.
///
/// An empty instruction means "no tone guidance" and omits the section.
pub fn system_prompt(instruction: &str) -> String {
    if instruction.trim().is_empty() {
        return PERSONA_PREAMBLE.to_string();
    }
    format!("{PERSONA_PREAMBLE}\n\nTone Based on User Profile:\n{instruction}")
}

/// Ask the model to infer trait values from free text, restricted to the
/// categories and values the rule table knows about.
pub fn extraction_prompt(user_message: &str, table: &RuleTable) -> String {
    let mut out = String::with_capacity(1024);

    out.push_str("The user said: \"");
    out.push_str(user_message);
    out.push_str("\"\n\n");
    out.push_str("Based on this, infer and update the following profile traits:\n");

    let names: Vec<&str> = table.categories().iter().map(|c| c.name()).collect();
    out.push_str(&names.join(", "));
    out.push_str("\n\nUse only these labels:\n");

    for category in table.categories() {
        let labels: Vec<String> = category
            .values()
            .filter(|v| *v != DEFAULT_VALUE)
            .map(|v| format!("\"{v}\""))
            .collect();
        out.push_str(category.name());
        out.push_str(": [");
        out.push_str(&labels.join(", "));
        out.push_str("]\n");
    }

    out.push_str(
        "\nOnly include traits the message gives evidence for. A trait may hold a single \
label or a list of labels.\n\nReturn only JSON.",
    );
    out
}
