//! # Client Identity
//!
//! The receiver keys its virtual pad on a per-device client id, so the id
//! must survive restarts. The session only asks an [`IdentityProvider`]
//! for it once, at construction; where the id is stored is up to the
//! provider.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::info;
use uuid::Uuid;

use crate::error::{GamepadError, Result};

/// Source of the stable per-device client id.
#[cfg_attr(test, mockall::automock)]
pub trait IdentityProvider {
    /// Returns the client id, creating it on first use if needed.
    fn client_id(&self) -> Result<String>;
}

/// Fixed id, for embedding and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticIdentity(pub String);

impl IdentityProvider for StaticIdentity {
    fn client_id(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Id persisted in a small text file; a UUID v4 is generated and written
/// the first time.
#[derive(Debug, Clone)]
pub struct FileIdentityProvider {
    path: PathBuf,
}

impl FileIdentityProvider {
    /// Creates a provider backed by `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the id file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn generate(&self) -> Result<String> {
        let id = Uuid::new_v4().to_string();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, &id).map_err(|e| {
            GamepadError::Identity(format!("Failed to persist client id to {}: {}", self.path.display(), e))
        })?;

        info!("Generated new client id {} ({})", id, self.path.display());
        Ok(id)
    }
}

impl IdentityProvider for FileIdentityProvider {
    fn client_id(&self) -> Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let id = contents.trim();
                if id.is_empty() {
                    self.generate()
                } else {
                    Ok(id.to_string())
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => self.generate(),
            Err(e) => Err(GamepadError::Identity(format!(
                "Failed to read client id from {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}
