//! Object store capability consumed by the watchers

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Metadata returned by existence-waits and head requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjectMeta {
    pub size: u64,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found")]
    NotFound,
    #[error("exceeded max wait time of {0:?}")]
    WaitTimeout(Duration),
    #[error("{0}")]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        StoreError::Backend(error.into())
    }
}

/// Key/value blob store.
///
/// `wait_for_existence` does not take a cancellation token. Callers race the
/// returned future against their own scope, so implementations must tolerate
/// being dropped at any await point.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Block until `key` exists or `timeout` elapses.
    async fn wait_for_existence(&self, key: &str, timeout: Duration) -> StoreResult<ObjectMeta>;

    /// Fetch the full body of `key`.
    async fn get_object(&self, key: &str) -> StoreResult<Bytes>;

    /// Fetch the metadata of `key` without its body.
    async fn head_object(&self, key: &str) -> StoreResult<ObjectMeta>;
}
