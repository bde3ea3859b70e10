//! Authentication modes and credential material.

use std::fmt;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};

/// How the user chose to connect
///
/// The composite secrets-store key is prefixed with this mode, so the
/// string forms are stable storage identifiers, not display strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectMode {
    /// Account, username, and password
    Password,
    /// Federated single-sign-on through an external browser
    Sso,
    /// Key-pair authentication with an RSA private key
    KeyPair,
    /// Reuse of a previously saved connection bundle
    Saved,
}

impl ConnectMode {
    /// Returns the stable storage prefix for this mode
    #[must_use]
    pub const fn key_prefix(self) -> &'static str {
        match self {
            Self::Password => "Default",
            Self::Sso => "SSO",
            Self::KeyPair => "KPA",
            Self::Saved => "Existing",
        }
    }
}

impl fmt::Display for ConnectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_prefix())
    }
}

impl FromStr for ConnectMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Default" => Ok(Self::Password),
            "SSO" => Ok(Self::Sso),
            "KPA" => Ok(Self::KeyPair),
            "Existing" => Ok(Self::Saved),
            other => Err(format!("Unknown connection mode: {other}")),
        }
    }
}

/// Credential material for a connection profile
///
/// Exactly one authentication mechanism exists per profile, by
/// construction: the variant carries only the fields its mode needs.
/// Passwords are held as `SecretString` so they never appear in debug
/// output; the decrypted private key is unencrypted PKCS#8 DER ready
/// for the client.
#[derive(Clone)]
pub enum AuthMethod {
    /// Plain password authentication
    Password(SecretString),
    /// External interactive browser flow; no secret collected locally
    ExternalBrowser,
    /// Key-pair authentication with a decrypted private key
    KeyPair {
        /// Unencrypted PKCS#8 DER private-key bytes
        der: Vec<u8>,
    },
}

impl AuthMethod {
    /// Creates password authentication from a plain string
    #[must_use]
    pub fn password(password: impl Into<String>) -> Self {
        Self::Password(SecretString::from(password.into()))
    }

    /// Returns the connection mode this mechanism belongs to
    #[must_use]
    pub const fn mode(&self) -> ConnectMode {
        match self {
            Self::Password(_) => ConnectMode::Password,
            Self::ExternalBrowser => ConnectMode::Sso,
            Self::KeyPair { .. } => ConnectMode::KeyPair,
        }
    }

    /// Exposes the password for use (should be used carefully)
    #[must_use]
    pub fn expose_password(&self) -> Option<&str> {
        match self {
            Self::Password(secret) => Some(secret.expose_secret()),
            _ => None,
        }
    }

    /// Returns the private-key bytes for key-pair authentication
    #[must_use]
    pub fn private_key(&self) -> Option<&[u8]> {
        match self {
            Self::KeyPair { der } => Some(der),
            _ => None,
        }
    }
}

// Manual Debug implementation so password material never leaks into logs
impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password(_) => f.write_str("AuthMethod::Password(<redacted>)"),
            Self::ExternalBrowser => f.write_str("AuthMethod::ExternalBrowser"),
            Self::KeyPair { der } => write!(f, "AuthMethod::KeyPair({} DER bytes)", der.len()),
        }
    }
}

// Manual PartialEq implementation since SecretString doesn't implement it
impl PartialEq for AuthMethod {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Password(a), Self::Password(b)) => a.expose_secret() == b.expose_secret(),
            (Self::ExternalBrowser, Self::ExternalBrowser) => true,
            (Self::KeyPair { der: a }, Self::KeyPair { der: b }) => a == b,
            _ => false,
        }
    }
}

impl Eq for AuthMethod {}
