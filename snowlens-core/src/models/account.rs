//! Account locator model and normalization.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ValidationError, ValidationResult};

/// Vendor domain suffix stripped from account URLs
const VENDOR_SUFFIX: &str = ".snowflakecomputing.com";

/// A normalized warehouse account locator
///
/// Users may enter either the bare account locator (`xy12345` or
/// `xy12345.eu-central-1`) or the full account URL
/// (`https://xy12345.snowflakecomputing.com`). Both normalize to the
/// bare locator the client addresses deployments by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Account(String);

impl Account {
    /// Parses user input into a normalized account locator
    ///
    /// A URL input has the vendor domain suffix stripped from its host;
    /// a bare string passes through unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyField` for blank input and
    /// `ValidationError::InvalidAccount` if a URL input carries no host.
    pub fn parse(input: &str) -> ValidationResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyField("account"));
        }

        // `Url::parse` only succeeds for absolute URLs, so bare locators
        // (no scheme) fall through to the identity branch below.
        if trimmed.contains("://") {
            let url = Url::parse(trimmed)
                .map_err(|e| ValidationError::InvalidAccount(format!("{trimmed}: {e}")))?;
            let host = url
                .host_str()
                .ok_or_else(|| ValidationError::InvalidAccount(trimmed.to_string()))?;
            return Ok(Self(strip_vendor_suffix(host)));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Returns the normalized locator as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strips the vendor domain suffix from a URL host, if present
fn strip_vendor_suffix(host: &str) -> String {
    host.strip_suffix(VENDOR_SUFFIX).unwrap_or(host).to_string()
}
