//! API credential loaded once at startup.

use std::fmt;
use std::io::ErrorKind;
use std::path::Path;

use secrecy::{ExposeSecret, SecretString};

use crate::config::ConfigError;

/// The feed API consumer key.
///
/// Never printed; `Debug` is redacted.
pub struct ApiCredential {
    secret: SecretString,
}

impl ApiCredential {
    /// Wrap `raw`, dropping line breaks and surrounding whitespace.
    ///
    /// Returns `None` when nothing is left.
    pub fn new(raw: &str) -> Option<Self> {
        let cleaned: String = raw.chars().filter(|c| *c != '\n' && *c != '\r').collect();
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            return None;
        }
        Some(Self {
            secret: SecretString::from(cleaned.to_string()),
        })
    }

    /// Read the single-line secret file at `path`.
    ///
    /// A missing or blank file disables fetching and yields `Ok(None)`; any
    /// other read failure is an error.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Credential file not found; fetching disabled");
                return Ok(None);
            }
            Err(err) => return Err(ConfigError::Io(err)),
        };

        let credential = Self::new(&raw);
        if credential.is_none() {
            tracing::warn!(path = %path.display(), "Credential file is empty; fetching disabled");
        }
        Ok(credential)
    }

    pub(crate) fn expose(&self) -> &str {
        self.secret.expose_secret()
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiCredential([REDACTED])")
    }
}
