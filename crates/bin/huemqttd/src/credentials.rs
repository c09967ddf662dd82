//! Pairing credential saved as JSON next to the config file.

use std::path::{Path, PathBuf};

use huemqtt_app::ports::CredentialSink;
use huemqtt_domain::credential::PairingCredential;
use huemqtt_domain::error::HueMqttError;
use serde::{Deserialize, Serialize};

/// File name of the saved credential.
pub const CREDENTIAL_FILE: &str = "hue.json";

/// On-disk form of a [`PairingCredential`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedCredential {
    pub gateway: String,
    pub username: String,
    pub client_key: String,
}

impl From<&PairingCredential> for SavedCredential {
    fn from(credential: &PairingCredential) -> Self {
        Self {
            gateway: credential.gateway_address.clone(),
            username: credential.username.clone(),
            client_key: credential.client_key.clone(),
        }
    }
}

/// File-backed [`CredentialSink`].
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The store living in the same directory as `config_path`.
    #[must_use]
    pub fn beside(config_path: &Path) -> Self {
        let dir = config_path.parent().unwrap_or_else(|| Path::new(""));
        Self::new(dir.join(CREDENTIAL_FILE))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the saved credential; `None` when nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<SavedCredential>, CredentialError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(CredentialError::Io(err)),
        }
    }

    /// Replace the saved credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save(&self, saved: &SavedCredential) -> Result<(), CredentialError> {
        let content = serde_json::to_string_pretty(saved)?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}

impl CredentialSink for FileCredentialStore {
    async fn persist(&self, credential: &PairingCredential) -> Result<(), HueMqttError> {
        self.save(&SavedCredential::from(credential))
            .await
            .map_err(|err| HueMqttError::Storage(Box::new(err)))?;
        tracing::info!(path = %self.path.display(), "pairing credential saved");
        Ok(())
    }
}

/// Credential file errors.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// File I/O failure.
    #[error("credential file I/O failed")]
    Io(#[from] std::io::Error),
    /// The file is not a valid credential.
    #[error("malformed credential file")]
    Parse(#[from] serde_json::Error),
}
