use serde::{Deserialize, Serialize};

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub(super) struct AppSettings {
    /// Shared secret typed on the gate screen to unlock architect mode.
    pub access_key: String,
    /// Base URL prefixed to the `?s=` share token.
    pub share_base_url: String,
    /// Shell command for the intel analyzer; prompt on stdin, JSON on stdout.
    pub analyzer_command: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            access_key: "RYMM".to_string(),
            share_base_url: "https://chiraka-nexus.example/board".to_string(),
            analyzer_command: None,
        }
    }
}

pub(super) fn load_settings(path: &str) -> Option<AppSettings> {
    let s = std::fs::read_to_string(path).ok()?;
    if path.ends_with(".toml") {
        toml::from_str::<AppSettings>(&s)
            .ok()
            .or_else(|| serde_json::from_str::<AppSettings>(&s).ok())
    } else {
        serde_json::from_str::<AppSettings>(&s)
            .ok()
            .or_else(|| toml::from_str::<AppSettings>(&s).ok())
    }
}
