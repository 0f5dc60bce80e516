//! Path-addressed document store.
//!
//! Records live in one nested tree (`owners/{ownerId}/{collection}/{recordId}`)
//! the way the hosted realtime database lays them out. Backends implement
//! [`DocumentStore`]; the rest of the crate only sees the trait.

pub mod memory;
pub mod path;

#[cfg(feature = "firebase")]
pub mod firebase;
#[cfg(feature = "mongo")]
pub mod mongo;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AppError;
pub use path::StorePath;

/// Store operations used by the listing pipeline and the record services.
///
/// Abstracted as a trait so tests can run against the in-memory backend or a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch the subtree at `path`. `None` when nothing is stored there.
    async fn read(&self, path: &StorePath) -> Result<Option<Value>, AppError>;

    /// Replace the subtree at `path`. Writing `null` removes it.
    async fn write(&self, path: &StorePath, value: Value) -> Result<(), AppError>;

    /// Add `value` under a freshly generated child key of `path` and return the key.
    ///
    /// Keys generated later sort after keys generated earlier.
    async fn append(&self, path: &StorePath, value: Value) -> Result<String, AppError>;

    /// Atomically add `delta` to the number at `path` (missing counts as zero)
    /// and return the new value.
    async fn increment(&self, path: &StorePath, delta: i64) -> Result<i64, AppError>;

    /// Atomically write `value` at `path` only if nothing is stored there yet.
    ///
    /// Returns `false`, leaving the store untouched, when the path was occupied.
    async fn create_if_absent(&self, path: &StorePath, value: Value) -> Result<bool, AppError>;
}

/// Generate a child key for [`DocumentStore::append`].
///
/// UUIDv7 keys start with a millisecond timestamp, so their lexical order
/// follows creation order.
pub fn generate_key() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}
