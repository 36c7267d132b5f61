//! Configuration for the registry client.

use devhub_core::{Error, Result};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Connection facts for a registry: the hub host and the shared access
/// signature presented as the `Authorization` header value.
///
/// Both fields are validated non-empty at construction and immutable
/// afterwards. The credential is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegistryConfig {
    #[validate(length(min = 1, message = "host must not be empty"))]
    host: String,

    #[serde(skip_serializing)]
    #[validate(length(min = 1, message = "sharedAccessSignature must not be empty"))]
    shared_access_signature: String,
}

impl RegistryConfig {
    /// Creates a validated registry configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] naming the offending field when `host`
    /// or `shared_access_signature` is empty.
    pub fn new(
        host: impl Into<String>,
        shared_access_signature: impl Into<String>,
    ) -> Result<Self> {
        let config = Self {
            host: host.into(),
            shared_access_signature: shared_access_signature.into(),
        };

        config
            .validate()
            .map_err(|err| Error::ConfigError(format!("invalid registry configuration: {err}")))?;

        Ok(config)
    }

    /// Returns the hub host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the shared access signature credential string.
    #[must_use]
    pub fn shared_access_signature(&self) -> &str {
        &self.shared_access_signature
    }
}
