//! `voice-mcp init`: register voice-mcp with the MCP clients installed on this
//! machine, scoped to the current project, and seed `~/.voice/settings.json`.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use voice_core::Settings;

const SERVER_KEY: &str = "voice";

#[derive(Debug, Error)]
pub enum InitError {
    #[error("neither `claude` nor `codex` found in PATH; install one, then re-run `voice-mcp init`")]
    NoClients,

    #[error("{} is not valid {format}, leaving it untouched: {reason}", .path.display())]
    Malformed {
        path: PathBuf,
        format: &'static str,
        reason: String,
    },

    #[error("`{key}` in {} is not a table of servers", .path.display())]
    NotATable { path: PathBuf, key: &'static str },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("settings: {0}")]
    Settings(#[from] voice_core::Error),
}

/// An MCP client that reads a project-scoped server list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Client {
    ClaudeCode,
    Codex,
}

impl Client {
    const ALL: [Client; 2] = [Client::ClaudeCode, Client::Codex];

    fn command(self) -> &'static str {
        match self {
            Client::ClaudeCode => "claude",
            Client::Codex => "codex",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Client::ClaudeCode => "Claude Code",
            Client::Codex => "Codex",
        }
    }

    fn config_path(self, project: &Path) -> PathBuf {
        match self {
            Client::ClaudeCode => project.join(".mcp.json"),
            Client::Codex => project.join(".codex").join("config.toml"),
        }
    }

    /// `existing` config text with the voice entry added or replaced.
    fn register(self, path: &Path, existing: &str, binary: &str) -> Result<String, InitError> {
        match self {
            Client::ClaudeCode => register_json(path, existing, binary),
            Client::Codex => register_toml(path, existing, binary),
        }
    }
}

pub fn init_project() -> Result<(), InitError> {
    let binary = std::env::current_exe()?
        .canonicalize()?
        .to_string_lossy()
        .into_owned();
    let project = std::env::current_dir()?;

    let clients: Vec<Client> = Client::ALL
        .into_iter()
        .filter(|c| on_path(c.command()))
        .collect();
    for path in register_clients(&project, &binary, &clients)? {
        eprintln!("Wrote {}", path.display());
    }

    let settings = voice_core::settings_path();
    if seed_settings(&settings)? {
        eprintln!(
            "Wrote {} (set provider, apiKey and model to enable generation)",
            settings.display()
        );
    }

    let labels: Vec<&str> = clients.iter().map(|c| c.label()).collect();
    eprintln!("\nDone. {} will use voice-mcp in this project.", labels.join(" and "));
    Ok(())
}

/// Register `binary` with each client under `project`. Returns the files written.
pub(crate) fn register_clients(
    project: &Path,
    binary: &str,
    clients: &[Client],
) -> Result<Vec<PathBuf>, InitError> {
    if clients.is_empty() {
        return Err(InitError::NoClients);
    }
    clients
        .iter()
        .map(|client| {
            let path = client.config_path(project);
            update_config(&path, |existing| client.register(&path, existing, binary))?;
            Ok(path)
        })
        .collect()
}

/// Write default settings unless a settings file already exists.
/// Returns whether one was written.
pub(crate) fn seed_settings(path: &Path) -> Result<bool, InitError> {
    if path.exists() {
        return Ok(false);
    }
    voice_core::write_settings_to(path, &Settings::default())?;
    Ok(true)
}

fn on_path(name: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| {
            std::env::split_paths(&paths).any(|dir| {
                dir.join(name).is_file() || dir.join(format!("{name}.exe")).is_file()
            })
        })
        .unwrap_or(false)
}

/// Rewrite `path` through `edit` with a temp file + rename. A missing file edits as empty.
fn update_config(
    path: &Path,
    edit: impl FnOnce(&str) -> Result<String, InitError>,
) -> Result<(), InitError> {
    let existing = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    let updated = edit(&existing)?;

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("voice.tmp");
    fs::write(&tmp, updated)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn malformed(path: &Path, format: &'static str, err: impl std::fmt::Display) -> InitError {
    InitError::Malformed {
        path: path.to_path_buf(),
        format,
        reason: err.to_string(),
    }
}

fn register_json(path: &Path, existing: &str, binary: &str) -> Result<String, InitError> {
    let mut root: serde_json::Value = if existing.trim().is_empty() {
        serde_json::json!({})
    } else {
        serde_json::from_str(existing).map_err(|e| malformed(path, "JSON", e))?
    };

    let servers = root
        .as_object_mut()
        .map(|obj| {
            obj.entry("mcpServers")
                .or_insert_with(|| serde_json::json!({}))
        })
        .and_then(|v| v.as_object_mut())
        .ok_or_else(|| InitError::NotATable {
            path: path.to_path_buf(),
            key: "mcpServers",
        })?;
    servers.insert(
        SERVER_KEY.to_string(),
        serde_json::json!({
            "type": "stdio",
            "command": binary,
            "args": [],
        }),
    );

    Ok(serde_json::to_string_pretty(&root)? + "\n")
}

fn register_toml(path: &Path, existing: &str, binary: &str) -> Result<String, InitError> {
    let mut doc = existing
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| malformed(path, "TOML", e))?;

    let servers = doc
        .entry("mcp_servers")
        .or_insert(toml_edit::Item::Table(toml_edit::Table::new()))
        .as_table_mut()
        .ok_or_else(|| InitError::NotATable {
            path: path.to_path_buf(),
            key: "mcp_servers",
        })?;

    let mut server = toml_edit::Table::new();
    server.insert("command", toml_edit::value(binary));
    server.insert("args", toml_edit::value(toml_edit::Array::new()));
    servers.insert(SERVER_KEY, toml_edit::Item::Table(server));

    Ok(doc.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BIN: &str = "/usr/local/bin/voice-mcp";

    #[test]
    fn no_installed_clients_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = register_clients(tmp.path(), BIN, &[]).unwrap_err();
        assert!(matches!(err, InitError::NoClients));
        assert!(fs::read_dir(tmp.path()).unwrap().next().is_none());
    }

    #[test]
    fn mcp_json_keeps_other_servers_and_replaces_stale_entry() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join(".mcp.json"),
            r#"{"mcpServers":{"other":{"command":"other-bin"},"voice":{"command":"/old/voice-mcp"}}}"#,
        )
        .unwrap();

        let written = register_clients(tmp.path(), BIN, &[Client::ClaudeCode]).unwrap();
        assert_eq!(written, vec![tmp.path().join(".mcp.json")]);

        let raw = fs::read_to_string(tmp.path().join(".mcp.json")).unwrap();
        let root: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(root["mcpServers"]["other"]["command"], "other-bin");
        assert_eq!(root["mcpServers"]["voice"]["command"], BIN);
        assert_eq!(root["mcpServers"]["voice"]["type"], "stdio");

        let leftovers: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn malformed_config_is_left_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".mcp.json");
        fs::write(&path, "{ not json").unwrap();

        let err = register_clients(tmp.path(), BIN, &[Client::ClaudeCode]).unwrap_err();
        assert!(matches!(err, InitError::Malformed { format: "JSON", .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");

        fs::write(&path, r#"{"mcpServers": []}"#).unwrap();
        let err = register_clients(tmp.path(), BIN, &[Client::ClaudeCode]).unwrap_err();
        assert!(matches!(err, InitError::NotATable { key: "mcpServers", .. }));
    }

    #[test]
    fn codex_config_keeps_existing_settings() {
        let tmp = tempfile::tempdir().unwrap();
        let codex_dir = tmp.path().join(".codex");
        fs::create_dir_all(&codex_dir).unwrap();
        fs::write(
            codex_dir.join("config.toml"),
            "model = \"o3\"\n\n[mcp_servers.other]\ncommand = \"other-bin\"\n",
        )
        .unwrap();

        register_clients(tmp.path(), "/opt/voice-mcp", &[Client::Codex]).unwrap();

        let raw = fs::read_to_string(codex_dir.join("config.toml")).unwrap();
        let doc: toml_edit::DocumentMut = raw.parse().unwrap();
        assert_eq!(doc["model"].as_str(), Some("o3"));
        assert_eq!(doc["mcp_servers"]["other"]["command"].as_str(), Some("other-bin"));
        assert_eq!(doc["mcp_servers"]["voice"]["command"].as_str(), Some("/opt/voice-mcp"));
    }

    #[test]
    fn both_clients_registered_in_one_pass() {
        let tmp = tempfile::tempdir().unwrap();
        let written = register_clients(tmp.path(), BIN, &Client::ALL).unwrap();
        assert_eq!(written.len(), 2);
        assert!(tmp.path().join(".mcp.json").is_file());
        assert!(tmp.path().join(".codex").join("config.toml").is_file());
    }

    #[test]
    fn settings_seeded_once() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("voice").join("settings.json");

        assert!(seed_settings(&path).unwrap());
        let seeded = voice_core::read_settings_from(&path);
        assert_eq!(seeded.default_profile, voice_core::Profile::session_default());

        fs::write(&path, r#"{"provider": "ollama", "model": "llama3"}"#).unwrap();
        assert!(!seed_settings(&path).unwrap());
        assert_eq!(voice_core::read_settings_from(&path).ai.provider, "ollama");
    }
}
