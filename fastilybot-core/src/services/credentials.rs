//! Credential lookup: `<USERNAME>_PW` environment variables with a fallback to the
//! credential store written by `fastilybot --wgen`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("No password found for '{username}': set the {var} environment variable or run `fastilybot --wgen`")]
    Missing { username: String, var: String },
    #[error("Failed to read credential store {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse credential store {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to write credential store {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to serialize credential store: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Username cannot be empty")]
    EmptyUsername,
}

/// Name of the environment variable holding the password of `username`.
///
/// The username is uppercased and every character that is not valid in a variable name
/// becomes `_`, so `FastilyBot` maps to `FASTILYBOT_PW` and `Some Bot` to `SOME_BOT_PW`.
pub fn credential_env_var(username: &str) -> String {
    let base: String = username
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_PW", base)
}

/// Username → password pairs saved on disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialStore {
    #[serde(default)]
    accounts: BTreeMap<String, String>,
}

impl CredentialStore {
    /// Load the store, returning an empty store if the file does not exist
    pub fn load(path: &Path) -> Result<Self, CredentialError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| CredentialError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| CredentialError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save the store, readable by the owner only.
    ///
    /// The new content goes to a sibling temp file created with mode 0600 and is renamed
    /// over `path`, so the password is never on disk with wider permissions.
    pub fn save(&self, path: &Path) -> Result<(), CredentialError> {
        let content = toml::to_string_pretty(self)?;
        let write_err = |source| CredentialError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let tmp_path = path.with_extension("tmp");
        match std::fs::remove_file(&tmp_path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(write_err(e)),
            _ => {}
        }

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&tmp_path).map_err(write_err)?;
        file.write_all(content.as_bytes()).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        drop(file);

        std::fs::rename(&tmp_path, path).map_err(write_err)
    }

    pub fn get(&self, username: &str) -> Option<&str> {
        self.accounts.get(username).map(String::as_str)
    }

    pub fn set(&mut self, username: &str, password: &str) -> Result<(), CredentialError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(CredentialError::EmptyUsername);
        }
        self.accounts
            .insert(username.to_string(), password.to_string());
        Ok(())
    }

    pub fn usernames(&self) -> impl Iterator<Item = &str> {
        self.accounts.keys().map(String::as_str)
    }
}

/// Resolve the password of `username` from the environment, then from the credential store.
pub fn resolve_password(username: &str, store_path: &Path) -> Result<String, CredentialError> {
    resolve_password_with(username, store_path, |var| std::env::var(var).ok())
}

/// Same as [`resolve_password`] with an injectable environment lookup
pub fn resolve_password_with<F>(
    username: &str,
    store_path: &Path,
    env: F,
) -> Result<String, CredentialError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = credential_env_var(username);
    if let Some(password) = env(&var).filter(|p| !p.is_empty()) {
        tracing::debug!(var = %var, "Using password from environment");
        return Ok(password);
    }

    let store = CredentialStore::load(store_path)?;
    if let Some(password) = store.get(username) {
        tracing::debug!(store = %store_path.display(), "Using password from credential store");
        return Ok(password.to_string());
    }

    Err(CredentialError::Missing {
        username: username.to_string(),
        var,
    })
}
