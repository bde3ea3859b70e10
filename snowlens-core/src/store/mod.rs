//! Secrets store for saved connection bundles.
//!
//! The store is a repository over named [`ConnectionProfile`] bundles
//! keyed by `{mode}_{account}_{username}`. The trait keeps the storage
//! format an implementation choice; the shipped backend is a
//! human-editable TOML file.
//!
//! [`ConnectionProfile`]: crate::models::ConnectionProfile

mod backend;
mod toml_file;

pub use backend::ProfileStore;
pub use toml_file::TomlFileStore;
