//! Object store seam and the uploader built on top of it.
//!
//! [`ObjectStore`] is the protocol boundary (S3 in production, memory in
//! tests). [`Uploader`] adds what the pipeline needs on top: cache headers,
//! per-call timeout, bounded retry and public URL derivation.

pub mod memory;
pub mod retry;
pub mod s3;

pub use memory::MemoryStore;
pub use s3::S3Store;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::naming::public_url;

/// One object write.
#[derive(Debug, Clone)]
pub struct PutObject {
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
    pub cache_control: String,
}

/// An S3-compatible binary object store.
///
/// Implementations must be safe to share across concurrent items.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write one object, overwriting nothing the pipeline relies on.
    async fn put_object(&self, object: &PutObject) -> PipelineResult<()>;

    /// Short name for logs ("s3", "memory").
    fn name(&self) -> &str;
}

/// Uploads derived artifacts and returns their public URLs.
#[derive(Clone)]
pub struct Uploader {
    store: Arc<dyn ObjectStore>,
    public_base_url: String,
    cache_control: String,
    timeout_ms: u64,
    retry_attempts: u32,
    retry_delay_ms: u64,
}

impl Uploader {
    pub fn new(store: Arc<dyn ObjectStore>, config: &Config) -> Self {
        Self {
            store,
            public_base_url: config.storage.public_base_url.clone(),
            cache_control: config.storage.cache_control.clone(),
            timeout_ms: config.limits.upload_timeout_ms,
            retry_attempts: config.pipeline.retry_attempts,
            retry_delay_ms: config.pipeline.retry_delay_ms,
        }
    }

    /// Upload `body` under `key` and return `<public base>/<key>`.
    ///
    /// Transient failures are retried up to the configured attempt count;
    /// the last error is returned once attempts run out.
    pub async fn upload(
        &self,
        body: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> PipelineResult<String> {
        let object = PutObject {
            key: key.to_string(),
            body,
            content_type: content_type.to_string(),
            cache_control: self.cache_control.clone(),
        };

        let mut last_error = None;
        for attempt in 0..=self.retry_attempts {
            if attempt > 0 {
                let delay = retry::backoff_duration(attempt - 1, self.retry_delay_ms);
                tracing::debug!(
                    "Retry {attempt}/{} for {key} after {delay:?}",
                    self.retry_attempts
                );
                tokio::time::sleep(delay).await;
            }

            match tokio::time::timeout(
                Duration::from_millis(self.timeout_ms),
                self.store.put_object(&object),
            )
            .await
            {
                Ok(Ok(())) => {
                    tracing::debug!(
                        "Uploaded {key} ({} B) to {}",
                        object.body.len(),
                        self.store.name()
                    );
                    return Ok(public_url(&self.public_base_url, key));
                }
                Ok(Err(e)) => {
                    let retryable = retry::is_retryable(&e);
                    last_error = Some(e);
                    if !retryable {
                        break;
                    }
                }
                Err(_) => {
                    last_error = Some(PipelineError::Timeout {
                        target: key.to_string(),
                        stage: "upload".to_string(),
                        timeout_ms: self.timeout_ms,
                    });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| PipelineError::Upload {
            key: key.to_string(),
            message: "no upload attempt was made".to_string(),
            retryable: false,
        }))
    }
}
