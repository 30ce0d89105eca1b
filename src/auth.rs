use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::Identity;
use crate::config::{DEFAULT_TARGET_LANGUAGE, UserAccount};
use crate::storage::ensure_parent_dir;

/// Static username/password table for the two participants.
#[derive(Debug, Clone)]
pub struct Credentials {
    accounts: Vec<UserAccount>,
}

impl Credentials {
    pub fn new(accounts: Vec<UserAccount>) -> Self {
        if accounts.len() != 2 {
            log::error!(
                "Expected exactly two chat participants, found {}",
                accounts.len()
            );
        }
        Self { accounts }
    }

    pub fn login(&self, username: &str, password: &str) -> Option<Identity> {
        let account = self
            .accounts
            .iter()
            .find(|account| account.username == username)?;
        if account.password != password {
            log::info!("Rejected login for {username}");
            return None;
        }
        self.identity_for(username)
    }

    /// Identity of a known user; the peer is the other configured account.
    pub fn identity_for(&self, username: &str) -> Option<Identity> {
        let [first, second] = self.accounts.as_slice() else {
            return None;
        };
        let peer = if first.username == username {
            second
        } else if second.username == username {
            first
        } else {
            return None;
        };

        Some(Identity {
            current: username.to_string(),
            peer: peer.username.clone(),
        })
    }
}

/// Remembered between runs: who is logged in, and the translation target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalState {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default = "default_target_language")]
    pub target_language: String,
}

impl Default for LocalState {
    fn default() -> Self {
        Self {
            user: None,
            target_language: default_target_language(),
        }
    }
}

fn default_target_language() -> String {
    DEFAULT_TARGET_LANGUAGE.to_string()
}

impl LocalState {
    pub fn load(path: &str) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<LocalState>(&content) {
                Ok(state) => state,
                Err(err) => {
                    log::warn!("Failed to parse {path} ({err}); starting logged out");
                    Self::default()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => Self::default(),
            Err(err) => {
                log::warn!("Failed to read {path}: {err}");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &str) -> io::Result<()> {
        ensure_parent_dir(Path::new(path))?;
        let payload = serde_json::to_string_pretty(self)?;
        fs::write(path, payload)
    }

    /// Save, logging instead of failing; losing the preference is not fatal.
    pub fn persist(&self, path: &str) {
        if let Err(err) = self.save(path) {
            log::warn!("Failed to persist local state to {path}: {err}");
        }
    }
}
