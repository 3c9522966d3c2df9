use voice_core::{Profile, ProfileIngest};

/// Parse a trait-extraction reply into a profile update.
/// Returns `None` when no JSON object can be recovered (graceful degradation).
pub fn parse_traits(raw: &str) -> Option<ProfileIngest> {
    let json_str = extract_json_object(raw)?;
    let value: serde_json::Value = serde_json::from_str(json_str).ok()?;
    Profile::ingest(&value).ok()
}

/// Extract the outermost JSON object substring from raw LLM output
/// (tolerates prose and code fences around it).
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}
