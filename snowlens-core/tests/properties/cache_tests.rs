//! Tests for session-cache hit/miss behavior with a fake client

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use snowlens_core::{
    Account, AuthMethod, Bind, ConnectResult, ConnectionProfile, QueryResult, Session,
    SessionCache, Table, WarehouseClient,
};

/// Fake session carrying the serial number of the connect that made it
struct FakeSession {
    #[allow(dead_code)]
    serial: usize,
}

#[async_trait]
impl Session for FakeSession {
    async fn execute(&self, _sql: &str, _binds: &[Bind]) -> QueryResult<Table> {
        Ok(Table::default())
    }
}

/// Fake client counting how many sessions it opened
#[derive(Default)]
struct FakeClient {
    connects: AtomicUsize,
}

#[async_trait]
impl WarehouseClient for FakeClient {
    async fn connect(&self, _profile: &ConnectionProfile) -> ConnectResult<Arc<dyn Session>> {
        let serial = self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeSession { serial }))
    }
}

fn profile(user: &str, password: &str) -> ConnectionProfile {
    ConnectionProfile::new(
        Account::parse("xy12345").unwrap(),
        user,
        AuthMethod::password(password),
    )
}

#[tokio::test]
async fn identical_parameter_sets_share_one_session() {
    let client = FakeClient::default();
    let cache = SessionCache::new();
    let p = profile("alice", "pw");

    let first = cache.get_or_connect(&client, &p).await.unwrap();
    let second = cache.get_or_connect(&client, &p.clone()).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(client.connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn any_differing_field_is_a_cache_miss() {
    let client = FakeClient::default();
    let cache = SessionCache::new();

    let base = profile("alice", "pw");
    let other_user = profile("bob", "pw");
    let other_password = profile("alice", "pw2");
    let with_warehouse = base.clone().with_warehouse("COMPUTE_WH");

    let a = cache.get_or_connect(&client, &base).await.unwrap();
    let b = cache.get_or_connect(&client, &other_user).await.unwrap();
    let c = cache.get_or_connect(&client, &other_password).await.unwrap();
    let d = cache.get_or_connect(&client, &with_warehouse).await.unwrap();

    assert!(!Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
    assert!(!Arc::ptr_eq(&a, &d));
    assert_eq!(client.connects.load(Ordering::SeqCst), 4);
    assert_eq!(cache.len().await, 4);
}

#[tokio::test]
async fn invalidate_forces_a_fresh_session() {
    let client = FakeClient::default();
    let cache = SessionCache::new();
    let p = profile("alice", "pw");

    let stale = cache.get_or_connect(&client, &p).await.unwrap();
    assert!(cache.invalidate(&p).await);

    let fresh = cache.get_or_connect(&client, &p).await.unwrap();
    assert!(!Arc::ptr_eq(&stale, &fresh));
    assert_eq!(client.connects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn invalidate_of_uncached_profile_is_a_noop() {
    let cache = SessionCache::new();
    assert!(!cache.invalidate(&profile("alice", "pw")).await);
}

#[tokio::test]
async fn clear_empties_the_cache() {
    let client = FakeClient::default();
    let cache = SessionCache::new();
    cache
        .get_or_connect(&client, &profile("alice", "pw"))
        .await
        .unwrap();

    cache.clear().await;
    assert!(cache.is_empty().await);
}
