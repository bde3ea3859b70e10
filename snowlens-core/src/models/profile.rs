//! Connection profile: the full parameter set for one warehouse session.

use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::{ValidationError, ValidationResult};

use super::account::Account;
use super::auth::{AuthMethod, ConnectMode};

/// Authenticator marker sent to the client for federated SSO
pub const EXTERNAL_BROWSER_AUTHENTICATOR: &str = "externalbrowser";

/// A complete, validated set of connection parameters
///
/// Carries exactly one authentication mechanism (see [`AuthMethod`])
/// plus the optional session context fields. Blank optional fields are
/// normalized to `None` so they are never sent to the client as
/// empty-string placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionProfile {
    /// Normalized account locator
    pub account: Account,
    /// Login name
    pub user: String,
    /// Authentication mechanism for this profile
    pub auth: AuthMethod,
    /// Optional role to assume after login
    pub role: Option<String>,
    /// Optional virtual warehouse
    pub warehouse: Option<String>,
    /// Optional default database
    pub database: Option<String>,
    /// Optional default schema
    pub schema: Option<String>,
}

impl ConnectionProfile {
    /// Creates a profile with no optional session context
    #[must_use]
    pub fn new(account: Account, user: impl Into<String>, auth: AuthMethod) -> Self {
        Self {
            account,
            user: user.into(),
            auth,
            role: None,
            warehouse: None,
            database: None,
            schema: None,
        }
    }

    /// Sets the role, treating a blank value as absent
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = normalize_optional(role.into());
        self
    }

    /// Sets the warehouse, treating a blank value as absent
    #[must_use]
    pub fn with_warehouse(mut self, warehouse: impl Into<String>) -> Self {
        self.warehouse = normalize_optional(warehouse.into());
        self
    }

    /// Sets the database, treating a blank value as absent
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = normalize_optional(database.into());
        self
    }

    /// Sets the schema, treating a blank value as absent
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = normalize_optional(schema.into());
        self
    }

    /// Checks that every field the selected mode requires is present
    ///
    /// Submissions must be blocked on the first missing field instead of
    /// reaching the client library with empty values.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyField` naming the missing field.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.account.as_str().is_empty() {
            return Err(ValidationError::EmptyField("account"));
        }
        if self.user.trim().is_empty() {
            return Err(ValidationError::EmptyField("username"));
        }
        match &self.auth {
            AuthMethod::Password(_) => {
                if self
                    .auth
                    .expose_password()
                    .is_none_or(|p| p.trim().is_empty())
                {
                    return Err(ValidationError::EmptyField("password"));
                }
            }
            AuthMethod::ExternalBrowser => {}
            AuthMethod::KeyPair { der } => {
                if der.is_empty() {
                    return Err(ValidationError::EmptyField("private key"));
                }
            }
        }
        Ok(())
    }

    /// Returns the connection mode of this profile
    #[must_use]
    pub const fn mode(&self) -> ConnectMode {
        self.auth.mode()
    }

    /// Returns the composite secrets-store key for this profile
    ///
    /// The key is `{mode}_{account}_{username}`, matching the layout of
    /// the secrets file.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("{}_{}_{}", self.mode(), self.account, self.user)
    }

    /// Returns a stable fingerprint of the full parameter set
    ///
    /// Two profiles share a fingerprint iff every field, including the
    /// secret, is identical. Used as the session-cache key.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.account.as_str().as_bytes());
        hasher.update([0]);
        hasher.update(self.user.as_bytes());
        hasher.update([0]);
        match &self.auth {
            AuthMethod::Password(_) => {
                hasher.update(b"password:");
                if let Some(password) = self.auth.expose_password() {
                    hasher.update(password.as_bytes());
                }
            }
            AuthMethod::ExternalBrowser => hasher.update(b"externalbrowser"),
            AuthMethod::KeyPair { der } => {
                hasher.update(b"keypair:");
                hasher.update(der);
            }
        }
        for field in [&self.role, &self.warehouse, &self.database, &self.schema] {
            hasher.update([0]);
            if let Some(value) = field {
                hasher.update(value.as_bytes());
            }
        }
        hex::encode(hasher.finalize())
    }
}

/// Treats blank or whitespace-only strings as absent
fn normalize_optional(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// On-disk representation of a profile inside the secrets file
///
/// Mirrors the field names the client call recognizes: exactly one of
/// `password`, `authenticator`, or `private_key` is present, and the
/// private key is stored as a plain byte sequence so the TOML format
/// can represent it.
#[derive(Serialize, Deserialize)]
struct ProfileSerde {
    account: String,
    user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    authenticator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    private_key: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    warehouse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schema: Option<String>,
}

impl Serialize for ConnectionProfile {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let (password, authenticator, private_key) = match &self.auth {
            AuthMethod::Password(_) => (
                self.auth.expose_password().map(str::to_string),
                None,
                None,
            ),
            AuthMethod::ExternalBrowser => {
                (None, Some(EXTERNAL_BROWSER_AUTHENTICATOR.to_string()), None)
            }
            AuthMethod::KeyPair { der } => (None, None, Some(der.clone())),
        };
        ProfileSerde {
            account: self.account.as_str().to_string(),
            user: self.user.clone(),
            password,
            authenticator,
            private_key,
            role: self.role.clone(),
            warehouse: self.warehouse.clone(),
            database: self.database.clone(),
            schema: self.schema.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ConnectionProfile {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        let raw = ProfileSerde::deserialize(deserializer)?;
        let auth = match (raw.authenticator.as_deref(), raw.private_key, raw.password) {
            (Some(EXTERNAL_BROWSER_AUTHENTICATOR), None, None) => AuthMethod::ExternalBrowser,
            (Some(other), _, _) => {
                return Err(D::Error::custom(format!("Unknown authenticator: {other}")))
            }
            (None, Some(der), None) => AuthMethod::KeyPair { der },
            (None, None, Some(password)) => AuthMethod::Password(SecretString::from(password)),
            _ => {
                return Err(D::Error::custom(
                    "Connection entry must carry exactly one of password, authenticator, or private_key",
                ))
            }
        };
        let account = Account::parse(&raw.account).map_err(D::Error::custom)?;
        Ok(Self {
            account,
            user: raw.user,
            auth,
            role: raw.role,
            warehouse: raw.warehouse,
            database: raw.database,
            schema: raw.schema,
        })
    }
}
