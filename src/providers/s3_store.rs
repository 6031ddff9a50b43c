//! S3 implementation of the marker store

use async_trait::async_trait;
use aws_sdk_s3::client::Waiters;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::waiters::object_exists::WaitUntilObjectExistsError;
use aws_sdk_s3::Client;
use bytes::Bytes;
use log::trace;
use marker_wait::{ObjectMeta, ObjectStore, StoreError, StoreResult};
use std::time::Duration;

pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    async fn wait_until_exists(&self, key: &str, timeout: Duration) -> StoreResult<ObjectMeta> {
        let polled = self
            .client
            .wait_until_object_exists()
            .bucket(&self.bucket)
            .key(key)
            .wait(timeout)
            .await;

        match polled {
            Ok(poll) => match poll.into_result() {
                Ok(output) => Ok(ObjectMeta {
                    size: output.content_length().unwrap_or(0).max(0) as u64,
                }),
                Err(err) => Err(StoreError::backend(DisplayErrorContext(&err).to_string())),
            },
            Err(WaitUntilObjectExistsError::ExceededMaxWait(_)) => Err(StoreError::WaitTimeout(timeout)),
            Err(err) => Err(StoreError::backend(DisplayErrorContext(&err).to_string())),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    /// The SDK waiter paces the HEAD probes (5 s growing to 120 s, jittered).
    /// Its deadline is only checked between probes, so the whole wait is also
    /// bounded by `timeout` to cut off a hung request.
    async fn wait_for_existence(&self, key: &str, timeout: Duration) -> StoreResult<ObjectMeta> {
        match tokio::time::timeout(timeout, self.wait_until_exists(key, timeout)).await {
            Ok(result) => result,
            Err(_) => {
                trace!("wait_for_existence: {} cut off after {:?}", key, timeout);
                Err(StoreError::WaitTimeout(timeout))
            }
        }
    }

    async fn get_object(&self, key: &str) -> StoreResult<Bytes> {
        let output = match self.client.get_object().bucket(&self.bucket).key(key).send().await {
            Ok(output) => output,
            Err(err) if err.as_service_error().is_some_and(|e| e.is_no_such_key()) => {
                return Err(StoreError::NotFound)
            }
            Err(err) => return Err(StoreError::backend(DisplayErrorContext(&err).to_string())),
        };

        let body = output.body.collect().await.map_err(StoreError::backend)?;
        Ok(body.into_bytes())
    }

    async fn head_object(&self, key: &str) -> StoreResult<ObjectMeta> {
        match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(output) => {
                let size = output.content_length().unwrap_or(0).max(0) as u64;
                trace!("head_object: key={} size={}", key, size);
                Ok(ObjectMeta { size })
            }
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => {
                Err(StoreError::NotFound)
            }
            Err(err) => Err(StoreError::backend(DisplayErrorContext(&err).to_string())),
        }
    }
}
