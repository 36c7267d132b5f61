//! Connection strings and shared access signatures.
//!
//! A registry credential starts life as a connection string naming the hub
//! host, an access policy and its base64 key. The key is never sent on the
//! wire; instead a time-limited shared access signature is derived from it
//! and presented in the `Authorization` header.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Characters escaped when URI-component-encoding signature fields.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const SIGNATURE_PREFIX: &str = "SharedAccessSignature ";

/// A parsed registry connection string.
///
/// Connection strings are semicolon-separated `Key=Value` pairs carrying the
/// hub host, the name of a shared access policy and that policy's base64 key:
///
/// ```text
/// HostName=contoso.example.net;SharedAccessKeyName=owner;SharedAccessKey=<base64>
/// ```
#[derive(Debug)]
pub struct ConnectionString {
    host_name: String,
    shared_access_key_name: String,
    shared_access_key: SecretString,
}

impl ConnectionString {
    /// Parses a connection string.
    ///
    /// Unrecognized keys are ignored. The `HostName`, `SharedAccessKeyName`
    /// and `SharedAccessKey` fields are required and must be non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionStringParse`] if the input is empty,
    /// a segment is not a `Key=Value` pair, or a required field is missing.
    pub fn parse(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Err(Error::ConnectionStringParse(
                "connection string is empty".to_string(),
            ));
        }

        let mut host_name = None;
        let mut key_name = None;
        let mut key = None;

        for segment in input.split(';').filter(|s| !s.trim().is_empty()) {
            // SharedAccessKey values are base64 and may contain '='; split at
            // the first one only.
            let (name, value) = segment.split_once('=').ok_or_else(|| {
                Error::ConnectionStringParse(format!("malformed segment `{segment}`"))
            })?;

            match name.trim() {
                "HostName" => host_name = Some(value.to_string()),
                "SharedAccessKeyName" => key_name = Some(value.to_string()),
                "SharedAccessKey" => key = Some(value.to_string()),
                _ => {}
            }
        }

        let required = |field: Option<String>, name: &str| {
            field
                .filter(|value| !value.is_empty())
                .ok_or_else(|| Error::ConnectionStringParse(format!("missing {name}")))
        };

        Ok(Self {
            host_name: required(host_name, "HostName")?,
            shared_access_key_name: required(key_name, "SharedAccessKeyName")?,
            shared_access_key: SecretString::from(required(key, "SharedAccessKey")?),
        })
    }

    /// Returns the hub host name.
    #[must_use]
    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    /// Returns the shared access policy name.
    #[must_use]
    pub fn shared_access_key_name(&self) -> &str {
        &self.shared_access_key_name
    }

    /// Returns the base64 shared access key.
    #[must_use]
    pub const fn shared_access_key(&self) -> &SecretString {
        &self.shared_access_key
    }

    /// Derives a signature for this connection's host, valid until `expiry`
    /// (Unix seconds), without exposing the key to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArgumentError`] if the stored key is not valid
    /// base64.
    pub fn derive_signature(&self, expiry: u64) -> Result<SharedAccessSignature> {
        SharedAccessSignature::generate(
            &self.host_name,
            Some(&self.shared_access_key_name),
            self.shared_access_key.expose_secret(),
            expiry,
        )
    }
}

impl FromStr for ConnectionString {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A shared access signature token.
///
/// The serialized form is the credential string presented in the
/// `Authorization` header:
///
/// ```text
/// SharedAccessSignature sr=<resource>&sig=<signature>&se=<expiry>[&skn=<policy>]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedAccessSignature {
    resource: String,
    signature: String,
    expiry: u64,
    key_name: Option<String>,
}

impl SharedAccessSignature {
    /// Generates a signature for `resource`, valid until `expiry` (Unix
    /// seconds), by signing `"{uri-encoded resource}\n{expiry}"` with
    /// HMAC-SHA256 under the base64-decoded `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArgumentError`] if `resource` is empty or `key` is
    /// not valid base64.
    pub fn generate(
        resource: &str,
        key_name: Option<&str>,
        key: &str,
        expiry: u64,
    ) -> Result<Self> {
        if resource.is_empty() {
            return Err(Error::ArgumentError(
                "signature resource is empty".to_string(),
            ));
        }

        let key_bytes = BASE64.decode(key).map_err(|err| {
            Error::ArgumentError(format!("shared access key is not valid base64: {err}"))
        })?;

        let mut mac = HmacSha256::new_from_slice(&key_bytes)
            .map_err(|err| Error::ArgumentError(format!("unusable shared access key: {err}")))?;
        mac.update(uri_encode(resource).as_bytes());
        mac.update(b"\n");
        mac.update(expiry.to_string().as_bytes());

        Ok(Self {
            resource: resource.to_string(),
            signature: BASE64.encode(mac.finalize().into_bytes()),
            expiry,
            key_name: key_name.map(ToString::to_string),
        })
    }

    /// Parses a serialized shared access signature.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SignatureParse`] if the prefix is wrong, a field is
    /// malformed, or any of `sr`, `sig`, `se` is missing.
    pub fn parse(input: &str) -> Result<Self> {
        let fields = input.strip_prefix(SIGNATURE_PREFIX).ok_or_else(|| {
            Error::SignatureParse(format!("missing `{}` prefix", SIGNATURE_PREFIX.trim_end()))
        })?;

        let mut resource = None;
        let mut signature = None;
        let mut expiry = None;
        let mut key_name = None;

        for field in fields.split('&') {
            let (name, value) = field.split_once('=').ok_or_else(|| {
                Error::SignatureParse(format!("malformed field `{field}`"))
            })?;

            match name {
                "sr" => resource = Some(uri_decode(value)?),
                "sig" => signature = Some(uri_decode(value)?),
                "se" => {
                    expiry = Some(value.parse::<u64>().map_err(|_| {
                        Error::SignatureParse(format!("invalid expiry `{value}`"))
                    })?);
                }
                "skn" => key_name = Some(uri_decode(value)?),
                _ => {}
            }
        }

        let required = |field: Option<String>, name: &str| {
            field
                .filter(|value| !value.is_empty())
                .ok_or_else(|| Error::SignatureParse(format!("missing {name} field")))
        };

        Ok(Self {
            resource: required(resource, "sr")?,
            signature: required(signature, "sig")?,
            expiry: expiry.ok_or_else(|| Error::SignatureParse("missing se field".to_string()))?,
            key_name,
        })
    }

    /// Returns an expiry `lifetime_secs` in the future, in Unix seconds.
    #[must_use]
    pub fn expiry_after(lifetime_secs: u64) -> u64 {
        Utc::now().timestamp().unsigned_abs() + lifetime_secs
    }

    /// Returns the resource (`sr`) field, the hub host for hub-scoped tokens.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Returns the base64 signature (`sig`) field.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Returns the expiry (`se`) field in Unix seconds.
    #[must_use]
    pub const fn expiry(&self) -> u64 {
        self.expiry
    }

    /// Returns the shared access policy name (`skn`) field, if present.
    #[must_use]
    pub fn key_name(&self) -> Option<&str> {
        self.key_name.as_deref()
    }
}

impl FromStr for SharedAccessSignature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SharedAccessSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{SIGNATURE_PREFIX}sr={}&sig={}&se={}",
            uri_encode(&self.resource),
            uri_encode(&self.signature),
            self.expiry
        )?;
        if let Some(key_name) = &self.key_name {
            write!(f, "&skn={}", uri_encode(key_name))?;
        }
        Ok(())
    }
}

fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}

fn uri_decode(input: &str) -> Result<String> {
    percent_decode_str(input)
        .decode_utf8()
        .map(|decoded| decoded.to_string())
        .map_err(|err| Error::SignatureParse(format!("invalid percent-encoding: {err}")))
}
