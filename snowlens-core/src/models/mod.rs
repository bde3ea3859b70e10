//! Data models for Snowlens connection handling.

mod account;
mod auth;
mod profile;

pub use account::Account;
pub use auth::{AuthMethod, ConnectMode};
pub use profile::{ConnectionProfile, EXTERNAL_BROWSER_AUTHENTICATOR};
