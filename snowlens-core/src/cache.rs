//! Process-wide session cache keyed by the full parameter set.
//!
//! Identical parameter sets share one live session instead of opening a
//! new one per submission. Unlike a hidden singleton, the cache is an
//! explicit component the caller owns and can invalidate, so a stale
//! credential does not require a process restart to clear.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::client::{Session, WarehouseClient};
use crate::error::ConnectResult;
use crate::models::ConnectionProfile;

/// Cache of live sessions keyed by profile fingerprint
#[derive(Default)]
pub struct SessionCache {
    /// Sessions by canonical parameter-set fingerprint
    sessions: RwLock<HashMap<String, Arc<dyn Session>>>,
}

impl SessionCache {
    /// Creates an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached session for the parameter set, connecting on miss
    ///
    /// Two sequential calls with identical parameter sets return the
    /// same session instance; any differing field is a miss and opens a
    /// fresh session.
    ///
    /// # Errors
    /// Returns `ConnectError` if a cache miss requires a connection and
    /// the connection fails; nothing is cached in that case.
    pub async fn get_or_connect(
        &self,
        client: &dyn WarehouseClient,
        profile: &ConnectionProfile,
    ) -> ConnectResult<Arc<dyn Session>> {
        let key = profile.fingerprint();
        if let Some(session) = self.sessions.read().await.get(&key) {
            debug!(account = %profile.account, "session cache hit");
            return Ok(Arc::clone(session));
        }

        let session = client.connect(profile).await?;
        self.sessions
            .write()
            .await
            .insert(key, Arc::clone(&session));
        Ok(session)
    }

    /// Drops the cached session for the parameter set, if any
    ///
    /// Returns `true` if a session was evicted. Call this after an
    /// authentication failure or an expired-session error so the next
    /// submission reconnects.
    pub async fn invalidate(&self, profile: &ConnectionProfile) -> bool {
        self.sessions
            .write()
            .await
            .remove(&profile.fingerprint())
            .is_some()
    }

    /// Drops every cached session
    pub async fn clear(&self) {
        self.sessions.write().await.clear();
    }

    /// Returns the number of live cached sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns `true` if no sessions are cached
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
