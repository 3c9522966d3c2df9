mod init;

use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;
use voice_assist::{FollowUp, Session};
use voice_core::{
    CompileOptions, InvalidProfileShape, Profile, ProfileStore, RuleTable, Settings,
};

/// Profile names become file names: letters, digits, '-' and '_' only.
fn is_valid_profile_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn validate_profile_name(name: &str) -> Result<(), String> {
    if is_valid_profile_name(name) {
        Ok(())
    } else {
        Err(format!(
            "Profile name '{}' is invalid: use letters, digits, '-' and '_' only",
            name
        ))
    }
}

fn describe_rejected(rejected: &[InvalidProfileShape]) -> Vec<String> {
    rejected.iter().map(|r| r.to_string()).collect()
}

fn respond(result: Result<String, String>) -> Result<CallToolResult, McpError> {
    Ok(match result {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(e) => CallToolResult::error(vec![Content::text(e)]),
    })
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("Serialization error: {}", e))
}

// --- Request types ---

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
struct CompileRequest {
    /// Inline profile as a JSON object mapping trait category to a value or a list of values, e.g. {"generation": "Gen Z", "tone_pref": ["fun", "direct"]}. Takes precedence over `name`.
    profile: Option<String>,
    /// Name of a stored profile to compile
    name: Option<String>,
    /// Override: match profile categories case-sensitively (default from settings)
    category_case_sensitive: Option<bool>,
    /// Override: drop repeated directives (default from settings)
    dedupe_directives: Option<bool>,
    /// Override: emit each category's "default" directive when the profile leaves it empty
    apply_category_defaults: Option<bool>,
}

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
struct CheckProfileRequest {
    /// Inline profile as a JSON object. Takes precedence over `name`.
    profile: Option<String>,
    /// Name of a stored profile to check
    name: Option<String>,
    /// Categories that must be filled. Defaults to the configured required categories.
    required: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ProfileNameRequest {
    /// Name of the stored profile
    name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SetProfileRequest {
    /// Name of the profile to create or overwrite
    name: String,
    /// The complete profile as a JSON object: {"<category>": "<value>" | ["<value>", ...]}
    data: String,
}

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
struct UpdateProfileRequest {
    /// Name of the profile to update. Created from the default profile if missing.
    name: String,
    /// JSON object of traits to set; each key replaces the stored selection
    traits: Option<String>,
    /// Categories to remove from the profile
    remove: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ExtractTraitsRequest {
    /// Name of the profile to update. Created from the default profile if missing.
    name: String,
    /// Free text from the user describing their team or audience
    message: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct GenerateContentRequest {
    /// Stored profile to write for. Traits inferred from the request are saved back to it. Omit to use the default profile for a one-off request.
    name: Option<String>,
    /// What to write, e.g. "A welcome note for new warehouse staff"
    request: String,
}

// --- Server ---

#[derive(Clone)]
pub struct VoiceServer {
    table: Arc<RuleTable>,
    settings: Arc<Settings>,
    store: ProfileStore,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl VoiceServer {
    pub fn new(table: RuleTable, settings: Settings, store: ProfileStore) -> Self {
        Self {
            table: Arc::new(table),
            settings: Arc::new(settings),
            store,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "List trait categories and the values each accepts, in the order their directives are compiled")]
    fn list_traits(&self) -> Result<CallToolResult, McpError> {
        respond(Ok(self.traits_text()))
    }

    #[tool(description = "Get the full rulebook as JSON: {category: {value: directive}}")]
    fn get_rulebook(&self) -> Result<CallToolResult, McpError> {
        respond(
            serde_json::to_string_pretty(self.table.as_ref()).map_err(|e| e.to_string()),
        )
    }

    #[tool(
        description = "Compile a profile into the tone instruction sent to the writing model. Returns {instruction, resolved: [{category, value, directive}], unmatchedCategories, rejected}. Unknown values resolve to null and contribute nothing; an empty instruction means no tone guidance."
    )]
    fn compile_instruction(
        &self,
        Parameters(req): Parameters<CompileRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.compile_report(&req))
    }

    #[tool(
        description = "Check whether a profile fills every required category. Returns {complete, missing, followUp}. followUp holds the question to ask for the first missing category."
    )]
    fn check_profile(
        &self,
        Parameters(req): Parameters<CheckProfileRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.check_report(&req))
    }

    #[tool(description = "List all stored profiles")]
    fn list_profiles(&self) -> Result<CallToolResult, McpError> {
        respond(
            self.store
                .list()
                .map(|names| {
                    if names.is_empty() {
                        "No profiles found. Use set_profile to create one.".to_string()
                    } else {
                        names.join("\n")
                    }
                })
                .map_err(|e| e.to_string()),
        )
    }

    #[tool(description = "Get a stored profile as JSON")]
    fn get_profile(
        &self,
        Parameters(req): Parameters<ProfileNameRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.read_stored(&req.name).map(|p| profile_json(&p)))
    }

    #[tool(description = "Create or overwrite a stored profile. Entries that are not a string or a list of strings are skipped and reported.")]
    fn set_profile(
        &self,
        Parameters(req): Parameters<SetProfileRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.set_stored(&req))
    }

    #[tool(description = "Set and/or remove individual traits on a stored profile")]
    fn update_profile(
        &self,
        Parameters(req): Parameters<UpdateProfileRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.update_stored(&req))
    }

    #[tool(description = "Delete a stored profile")]
    fn delete_profile(
        &self,
        Parameters(req): Parameters<ProfileNameRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(
            validate_profile_name(&req.name)
                .and_then(|_| self.store.delete(&req.name).map_err(|e| e.to_string()))
                .map(|_| format!("Deleted profile '{}'", req.name)),
        )
    }

    #[tool(
        description = "Infer audience traits from free text with the configured model and merge them into a stored profile. Returns {updated, profile}."
    )]
    async fn extract_traits(
        &self,
        Parameters(req): Parameters<ExtractTraitsRequest>,
    ) -> Result<CallToolResult, McpError> {
        if let Err(e) = validate_profile_name(&req.name) {
            return respond(Err(e));
        }
        let mut session = match self.session_for(Some(req.name.as_str())) {
            Ok(s) => s,
            Err(e) => return respond(Err(e)),
        };

        let updated = match voice_assist::extract_traits(
            &mut session,
            &self.table,
            &self.settings.ai,
            &req.message,
        )
        .await
        {
            Ok(n) => n,
            Err(e) => return respond(Err(format!("Trait extraction failed: {}", e))),
        };

        respond(
            self.store
                .write(&req.name, &session.profile)
                .map_err(|e| e.to_string())
                .map(|_| {
                    pretty(&serde_json::json!({
                        "updated": updated,
                        "profile": session.profile,
                    }))
                }),
        )
    }

    #[tool(
        description = "Write content for a request using a profile's tone. Infers traits from the request first. Returns {kind: \"content\", text, instruction} or, when a required trait is missing, {kind: \"followUp\", category, question}."
    )]
    async fn generate_content(
        &self,
        Parameters(req): Parameters<GenerateContentRequest>,
    ) -> Result<CallToolResult, McpError> {
        if let Some(name) = &req.name {
            if let Err(e) = validate_profile_name(name) {
                return respond(Err(e));
            }
        }
        let mut session = match self.session_for(req.name.as_deref()) {
            Ok(s) => s,
            Err(e) => return respond(Err(e)),
        };

        let reply =
            match voice_assist::assist(&mut session, &self.table, &self.settings, &req.request)
                .await
            {
                Ok(r) => r,
                Err(e) => return respond(Err(format!("Generation failed: {}", e))),
            };

        if let Some(name) = &req.name {
            if let Err(e) = self.store.write(name, &session.profile) {
                tracing::warn!(profile = %name, "failed to save profile: {}", e);
            }
        }

        respond(serde_json::to_string_pretty(&reply).map_err(|e| e.to_string()))
    }
}

// --- Tool bodies ---

impl VoiceServer {
    fn traits_text(&self) -> String {
        self.table
            .categories()
            .iter()
            .map(|c| format!("{}: {}", c.name(), c.values().collect::<Vec<_>>().join(", ")))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Inline JSON wins over a stored name.
    fn load_profile(
        &self,
        inline: Option<&str>,
        name: Option<&str>,
    ) -> Result<(Profile, Vec<InvalidProfileShape>), String> {
        match (inline, name) {
            (Some(raw), _) => Profile::ingest_str(raw)
                .map(|ingest| (ingest.profile, ingest.rejected))
                .map_err(|e| format!("Invalid profile: {}", e)),
            (None, Some(name)) => self.read_stored(name).map(|p| (p, vec![])),
            (None, None) => {
                Err("Provide either `profile` (inline JSON) or `name` (a stored profile)".to_string())
            }
        }
    }

    fn read_stored(&self, name: &str) -> Result<Profile, String> {
        validate_profile_name(name)?;
        self.store.read(name).map_err(|e| e.to_string())
    }

    /// Stored profile if it exists, otherwise the configured default.
    fn session_for(&self, name: Option<&str>) -> Result<Session, String> {
        match name {
            Some(name) if self.store.exists(name) => self.read_stored(name).map(Session::new),
            _ => Ok(Session::from_settings(&self.settings)),
        }
    }

    fn compile_options(&self, req: &CompileRequest) -> CompileOptions {
        let base = self.settings.compile;
        CompileOptions {
            category_case_sensitive: req
                .category_case_sensitive
                .unwrap_or(base.category_case_sensitive),
            dedupe_directives: req.dedupe_directives.unwrap_or(base.dedupe_directives),
            apply_category_defaults: req
                .apply_category_defaults
                .unwrap_or(base.apply_category_defaults),
        }
    }

    fn compile_report(&self, req: &CompileRequest) -> Result<String, String> {
        let (profile, rejected) = self.load_profile(req.profile.as_deref(), req.name.as_deref())?;
        let options = self.compile_options(req);

        let instruction = voice_core::compile_with(&profile, &self.table, &options);
        let resolved = voice_core::resolve(&profile, &self.table, &options);
        let unmatched = voice_core::unmatched_categories(&profile, &self.table, &options);

        Ok(pretty(&serde_json::json!({
            "instruction": instruction,
            "resolved": resolved,
            "unmatchedCategories": unmatched,
            "rejected": describe_rejected(&rejected),
        })))
    }

    fn check_report(&self, req: &CheckProfileRequest) -> Result<String, String> {
        let (profile, rejected) = self.load_profile(req.profile.as_deref(), req.name.as_deref())?;
        let required = req
            .required
            .as_deref()
            .unwrap_or(self.settings.required_categories.as_slice());

        let missing = voice_core::missing(&profile, required);
        let follow_up = FollowUp::next(&profile, required, &self.settings.follow_ups);

        Ok(pretty(&serde_json::json!({
            "complete": missing.is_empty(),
            "missing": missing,
            "followUp": follow_up,
            "rejected": describe_rejected(&rejected),
        })))
    }

    fn set_stored(&self, req: &SetProfileRequest) -> Result<String, String> {
        validate_profile_name(&req.name)?;
        let ingest = Profile::ingest_str(&req.data).map_err(|e| format!("Invalid profile: {}", e))?;
        self.store
            .write(&req.name, &ingest.profile)
            .map_err(|e| e.to_string())?;

        let mut text = format!(
            "Saved profile '{}' with {} trait(s)",
            req.name,
            ingest.profile.len()
        );
        for line in describe_rejected(&ingest.rejected) {
            text.push_str("\nSkipped: ");
            text.push_str(&line);
        }
        Ok(text)
    }

    fn update_stored(&self, req: &UpdateProfileRequest) -> Result<String, String> {
        validate_profile_name(&req.name)?;
        let mut profile = self.session_for(Some(req.name.as_str()))?.profile;

        let mut rejected = Vec::new();
        if let Some(raw) = &req.traits {
            let ingest = Profile::ingest_str(raw).map_err(|e| format!("Invalid traits: {}", e))?;
            profile.merge(ingest.profile);
            rejected = ingest.rejected;
        }
        for category in req.remove.iter().flatten() {
            profile.remove(category);
        }

        self.store
            .write(&req.name, &profile)
            .map_err(|e| e.to_string())?;

        Ok(pretty(&serde_json::json!({
            "profile": profile,
            "rejected": describe_rejected(&rejected),
        })))
    }
}

fn profile_json(profile: &Profile) -> String {
    serde_json::to_string_pretty(profile).unwrap_or_else(|e| format!("Serialization error: {}", e))
}

#[tool_handler]
impl ServerHandler for VoiceServer {
    fn get_info(&self) -> ServerInfo {
        let instructions = format!("{}\n\n## Trait categories\n{}", INSTRUCTIONS, self.traits_text());
        ServerInfo {
            instructions: Some(instructions.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

const INSTRUCTIONS: &str = r#"Voice profiles describe an audience (generation, work style, tone preference, ...). Each selected trait value maps to a tone directive; the directives are compiled, in rulebook order, into the tone instruction a writing model follows.

Workflow:
1. `list_traits` to see categories and accepted values. Values are matched case-insensitively and spaces count as underscores ("Gen Z" = "gen_z"). Category names must match exactly.
2. Build a profile with `set_profile` / `update_profile`, or let `extract_traits` infer it from a description of the team.
3. `compile_instruction` previews the tone guidance. Unknown values are skipped silently; check `resolved` to see which ones missed.
4. `generate_content` writes the content. If it returns a follow-up question, ask the user and store the answer with `update_profile` before retrying."#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle `voice-mcp init` subcommand
    if std::env::args().nth(1).as_deref() == Some("init") {
        if let Err(e) = init::init_project() {
            eprintln!("voice-mcp init: {}", e);
            std::process::exit(1);
        }
        return Ok(());
    }

    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = voice_core::read_settings();
    let table = voice_core::load_rule_table()
        .inspect_err(|e| tracing::error!("failed to load rulebook: {}", e))?;
    tracing::info!(
        categories = table.len(),
        ai_configured = voice_core::ai_configured(&settings.ai),
        "rule table loaded"
    );

    let service = VoiceServer::new(table, settings, ProfileStore::default_location())
        .serve(rmcp::transport::io::stdio())
        .await
        .inspect_err(|e| tracing::error!("MCP server error: {}", e))?;
    service.waiting().await?;
    Ok(())
}
