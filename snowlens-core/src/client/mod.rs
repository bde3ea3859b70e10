//! Warehouse client seam.
//!
//! [`WarehouseClient`] turns a validated [`ConnectionProfile`] into a
//! live [`Session`]; [`Session`] executes parametrized SQL and returns
//! tabular results. Keeping both behind traits lets tests substitute a
//! fake client and lets the session cache stay deterministic.
//!
//! [`ConnectionProfile`]: crate::models::ConnectionProfile

mod rest;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ConnectResult, QueryResult};
use crate::models::ConnectionProfile;

pub use rest::RestClient;

/// A positional bind value for a parametrized statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bind(pub String);

impl Bind {
    /// Creates a text bind value
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

/// Column names plus rows of a query result
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Column names in result order
    pub columns: Vec<String>,
    /// Rows of values, one entry per column
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Finds a column index by case-insensitive name
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }
}

/// A live warehouse session
///
/// Sessions are opaque handles owned by the session cache; they are
/// never explicitly closed (process lifetime = session lifetime).
#[async_trait]
pub trait Session: Send + Sync {
    /// Executes a parametrized statement and returns its result set
    ///
    /// # Arguments
    /// * `sql` - Statement text with positional `?` placeholders
    /// * `binds` - Bind values in placeholder order
    ///
    /// # Errors
    /// Returns `QueryError` if execution fails or the result cannot be
    /// interpreted
    async fn execute(&self, sql: &str, binds: &[Bind]) -> QueryResult<Table>;
}

/// Abstraction over warehouse connection opening
#[async_trait]
pub trait WarehouseClient: Send + Sync {
    /// Opens a session for the given parameter set
    ///
    /// # Errors
    /// Returns `ConnectError` on invalid credentials, unreachable host,
    /// or a failed SSO browser flow
    async fn connect(&self, profile: &ConnectionProfile) -> ConnectResult<Arc<dyn Session>>;
}
