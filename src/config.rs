use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config/chat.json";
pub const DEFAULT_TARGET_LANGUAGE: &str = "English";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// SQLite file; two windows pointing at the same file can chat.
    Local {
        database_path: String,
        #[serde(default = "default_local_poll_ms")]
        poll_interval_ms: u64,
    },
    /// PostgREST-style HTTP API exposing a `messages` table.
    Rest {
        url: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_rest_poll_ms")]
        poll_interval_ms: u64,
    },
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::Local {
            database_path: "data/chat.db".to_string(),
            poll_interval_ms: default_local_poll_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    /// Translate function endpoint; translation is reported as failed when unset.
    #[serde(default)]
    pub translate_url: Option<String>,
    #[serde(default)]
    pub translate_api_key: Option<String>,
    #[serde(default = "default_users")]
    pub users: Vec<UserAccount>,
    /// Logged-in user and language preference
    #[serde(default = "default_state_path")]
    pub state_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            translate_url: None,
            translate_api_key: None,
            users: default_users(),
            state_path: default_state_path(),
        }
    }
}

impl AppConfig {
    /// Fill keys missing from the file with the one from the environment.
    pub fn with_api_key_fallback(mut self, api_key: Option<String>) -> Self {
        let Some(api_key) = api_key.filter(|key| !key.trim().is_empty()) else {
            return self;
        };

        if let BackendConfig::Rest { api_key: slot, .. } = &mut self.backend {
            slot.get_or_insert_with(|| api_key.clone());
        }
        if self.translate_url.is_some() {
            self.translate_api_key.get_or_insert(api_key);
        }
        self
    }
}

fn default_local_poll_ms() -> u64 {
    500
}

fn default_rest_poll_ms() -> u64 {
    1500
}

fn default_state_path() -> String {
    "data/session.json".to_string()
}

fn default_users() -> Vec<UserAccount> {
    [("Joffreyg", "mustafo"), ("Hana", "usagi")]
        .into_iter()
        .map(|(username, password)| UserAccount {
            username: username.to_string(),
            password: password.to_string(),
        })
        .collect()
}

pub fn load_config(path: &str) -> AppConfig {
    let path = Path::new(path);
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse config file {}: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    }
}

pub fn save_config(path: &str, config: &AppConfig) -> std::io::Result<()> {
    crate::storage::ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let config = load_config(path.to_str().unwrap());

        assert_eq!(config.backend, BackendConfig::default());
        assert_eq!(config.users.len(), 2);
        assert!(config.translate_url.is_none());
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let config = load_config(path.to_str().unwrap());
        assert_eq!(config.state_path, "data/session.json");
    }

    #[test]
    fn rest_backend_with_partial_fields() {
        let config: AppConfig = serde_json::from_str(
            r#"{
                "backend": { "kind": "rest", "url": "https://chat.example.org" },
                "translate_url": "https://chat.example.org/functions/v1/translate"
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.backend,
            BackendConfig::Rest {
                url: "https://chat.example.org".to_string(),
                api_key: None,
                poll_interval_ms: 1500,
            }
        );
        assert_eq!(config.users, default_users());
    }

    #[test]
    fn env_key_only_fills_gaps() {
        let config = AppConfig {
            backend: BackendConfig::Rest {
                url: "https://chat.example.org".to_string(),
                api_key: Some("from-file".to_string()),
                poll_interval_ms: 1500,
            },
            translate_url: Some("https://chat.example.org/translate".to_string()),
            ..AppConfig::default()
        }
        .with_api_key_fallback(Some("from-env".to_string()));

        assert!(matches!(
            &config.backend,
            BackendConfig::Rest { api_key: Some(key), .. } if key == "from-file"
        ));
        assert_eq!(config.translate_api_key.as_deref(), Some("from-env"));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chat.json");
        let path = path.to_str().unwrap();

        let config = AppConfig {
            translate_url: Some("http://localhost:8080/translate".to_string()),
            ..AppConfig::default()
        };
        save_config(path, &config).unwrap();

        let loaded = load_config(path);
        assert_eq!(loaded.translate_url, config.translate_url);
        assert_eq!(loaded.backend, config.backend);
    }
}
