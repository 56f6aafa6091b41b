use std::{fs, path::PathBuf};

use serde::Deserialize;

pub const SETTINGS_FILE: &str = "admin_console.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Rest,
    Memory,
}

impl BackendKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "rest" | "supabase" => Some(Self::Rest),
            "memory" | "offline" => Some(Self::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub backend: BackendKind,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub seed_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Rest,
            supabase_url: "http://127.0.0.1:54321".into(),
            supabase_anon_key: String::new(),
            seed_path: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    backend: Option<String>,
    supabase_url: Option<String>,
    supabase_anon_key: Option<String>,
    seed_path: Option<PathBuf>,
}

/// Defaults, then `admin_console.toml` if present, then the environment.
pub fn load_settings() -> Settings {
    let file = fs::read_to_string(SETTINGS_FILE).ok();
    load_settings_from(file.as_deref(), |key| std::env::var(key).ok())
}

pub(crate) fn load_settings_from(
    file_contents: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file_contents {
        match toml::from_str::<FileSettings>(raw) {
            Ok(file_cfg) => apply_file(&mut settings, file_cfg),
            Err(err) => {
                tracing::warn!(error = %err, file = SETTINGS_FILE, "ignoring unreadable settings file")
            }
        }
    }

    if let Some(v) = env("SUPABASE_URL") {
        settings.supabase_url = v;
    }
    if let Some(v) = env("APP__SUPABASE_URL") {
        settings.supabase_url = v;
    }

    if let Some(v) = env("SUPABASE_ANON_KEY") {
        settings.supabase_anon_key = v;
    }
    if let Some(v) = env("APP__SUPABASE_ANON_KEY") {
        settings.supabase_anon_key = v;
    }

    if let Some(kind) = env("APP__BACKEND").as_deref().and_then(BackendKind::parse) {
        settings.backend = kind;
    }

    if let Some(v) = env("APP__SEED_PATH") {
        settings.seed_path = Some(PathBuf::from(v));
    }

    settings
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(kind) = file_cfg.backend.as_deref().and_then(BackendKind::parse) {
        settings.backend = kind;
    }
    if let Some(v) = file_cfg.supabase_url {
        settings.supabase_url = v;
    }
    if let Some(v) = file_cfg.supabase_anon_key {
        settings.supabase_anon_key = v;
    }
    if let Some(v) = file_cfg.seed_path {
        settings.seed_path = Some(v);
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
