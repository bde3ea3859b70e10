//! Profile store trait definition.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::models::ConnectionProfile;

/// Abstraction over saved-connection storage
///
/// Implementations persist connection bundles under composite keys of
/// the form `{mode}_{account}_{username}`. Writing to an existing key
/// replaces the stored bundle wholesale; there is no merge.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Lists the keys of all saved connections
    ///
    /// # Errors
    /// Returns `StoreError` if the backing store cannot be read
    async fn list(&self) -> StoreResult<Vec<String>>;

    /// Retrieves the saved connection under the given key
    ///
    /// # Returns
    /// `Some(ConnectionProfile)` if found, `None` if not found
    ///
    /// # Errors
    /// Returns `StoreError` if the backing store cannot be read
    async fn get(&self, key: &str) -> StoreResult<Option<ConnectionProfile>>;

    /// Saves a connection bundle, replacing any entry under the key
    ///
    /// # Errors
    /// Returns `StoreError` if the backing store cannot be written
    async fn put(&self, key: &str, profile: &ConnectionProfile) -> StoreResult<()>;

    /// Deletes the saved connection under the given key
    ///
    /// # Errors
    /// Returns `StoreError::NotFound` if no entry exists under the key,
    /// or another `StoreError` if the store cannot be updated
    async fn delete(&self, key: &str) -> StoreResult<()>;
}
