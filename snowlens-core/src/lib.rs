//! Snowlens Core Library
//!
//! This crate provides the core functionality for the Snowlens
//! query-history explorer: credential-flow handling across the four
//! connection modes, the saved-connection secrets store, private-key
//! decryption for key-pair authentication, a session cache over the
//! warehouse client, and the query-history retrieval and timeline
//! layout the visualization is built from.

pub mod cache;
pub mod client;
pub mod error;
pub mod history;
pub mod keypair;
pub mod models;
pub mod store;
pub mod timeline;

pub use cache::SessionCache;
pub use client::{Bind, RestClient, Session, Table, WarehouseClient};
pub use error::{
    ConnectError, ConnectResult, KeyError, KeyResult, QueryError, QueryResult, Result,
    SnowlensError, StoreError, StoreResult, ValidationError, ValidationResult,
};
pub use history::{HistoryFilter, QueryRecord, TagSummary, TimeWindow};
pub use keypair::decode_private_key;
pub use models::{Account, AuthMethod, ConnectMode, ConnectionProfile};
pub use store::{ProfileStore, TomlFileStore};
pub use timeline::{Timeline, TimelineSpan};
