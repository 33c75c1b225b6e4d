//! S3-compatible object store (AWS, R2, MinIO, LocalStack).
//!
//! The client is built once from explicit configuration and shared by every
//! item of a run. Bodies above the configured part size go through a
//! multipart upload; smaller ones are a single PUT.

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Builder, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use std::ops::Range;

use super::{ObjectStore, PutObject};
use crate::config::{StorageConfig, StorageCredentials};
use crate::error::{ConfigError, PipelineError, PipelineResult};

/// Object store backed by the AWS S3 SDK.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
    part_size: usize,
}

impl S3Store {
    /// Build a store from config, resolving credentials from config or env.
    pub fn from_config(config: &StorageConfig) -> Result<Self, ConfigError> {
        config.validate_for_upload()?;
        let credentials = config.resolve_credentials()?;
        Ok(Self::with_credentials(config, credentials))
    }

    pub fn with_credentials(config: &StorageConfig, credentials: StorageCredentials) -> Self {
        let credentials = Credentials::new(
            credentials.access_key_id,
            credentials.secret_access_key,
            None,
            None,
            "curator-config",
        );

        let mut builder = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(config.force_path_style);
        if let Some(endpoint) = config.endpoint.as_deref().filter(|e| !e.is_empty()) {
            builder = builder.endpoint_url(endpoint);
        }

        tracing::debug!(
            "S3 client: bucket={}, region={}, endpoint={:?}",
            config.bucket,
            config.region,
            config.endpoint
        );

        Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            part_size: config.part_size_bytes(),
        }
    }

    async fn put_single(&self, object: &PutObject) -> PipelineResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object.key)
            .content_type(&object.content_type)
            .cache_control(&object.cache_control)
            .body(ByteStream::from(object.body.clone()))
            .send()
            .await
            .map_err(|e| upload_error(&object.key, e))?;
        Ok(())
    }

    async fn put_multipart(&self, object: &PutObject) -> PipelineResult<()> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(&object.key)
            .content_type(&object.content_type)
            .cache_control(&object.cache_control)
            .send()
            .await
            .map_err(|e| upload_error(&object.key, e))?;

        let upload_id = created
            .upload_id()
            .ok_or_else(|| PipelineError::Upload {
                key: object.key.clone(),
                message: "create_multipart_upload returned no upload id".to_string(),
                retryable: true,
            })?
            .to_string();

        let result = match self.upload_parts(object, &upload_id).await {
            Ok(parts) => self.complete(object, &upload_id, parts).await,
            Err(e) => Err(e),
        };

        if result.is_err() {
            if let Err(abort) = self
                .client
                .abort_multipart_upload()
                .bucket(&self.bucket)
                .key(&object.key)
                .upload_id(&upload_id)
                .send()
                .await
            {
                tracing::warn!(
                    "Failed to abort multipart upload for {}: {}",
                    object.key,
                    DisplayErrorContext(&abort)
                );
            }
        }
        result
    }

    async fn upload_parts(
        &self,
        object: &PutObject,
        upload_id: &str,
    ) -> PipelineResult<Vec<CompletedPart>> {
        let mut parts = Vec::new();
        for (part_number, range) in part_ranges(object.body.len(), self.part_size) {
            let chunk = &object.body[range];
            let uploaded = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(&object.key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(chunk.to_vec()))
                .send()
                .await
                .map_err(|e| upload_error(&object.key, e))?;

            tracing::trace!(
                "  Part {part_number} of {} ({} B) uploaded",
                object.key,
                chunk.len()
            );

            parts.push(
                CompletedPart::builder()
                    .set_e_tag(uploaded.e_tag().map(str::to_string))
                    .part_number(part_number)
                    .build(),
            );
        }
        Ok(parts)
    }

    async fn complete(
        &self,
        object: &PutObject,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> PipelineResult<()> {
        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(&object.key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| upload_error(&object.key, e))?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(&self, object: &PutObject) -> PipelineResult<()> {
        if object.body.len() > self.part_size {
            self.put_multipart(object).await
        } else {
            self.put_single(object).await
        }
    }

    fn name(&self) -> &str {
        "s3"
    }
}

/// 1-based part numbers and byte ranges covering a body of `len` bytes.
///
/// Every part is `part_size` bytes except the last, which holds the rest.
fn part_ranges(len: usize, part_size: usize) -> Vec<(i32, Range<usize>)> {
    let part_size = part_size.max(1);
    (0..len)
        .step_by(part_size)
        .enumerate()
        .map(|(index, start)| ((index + 1) as i32, start..(start + part_size).min(len)))
        .collect()
}

/// Map an SDK failure to an item error, flagging transient ones for retry.
fn upload_error<E>(key: &str, err: SdkError<E>) -> PipelineError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let retryable = match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            true
        }
        SdkError::ServiceError(_) => status.map(is_retryable_status).unwrap_or(false),
        _ => false,
    };
    PipelineError::Upload {
        key: key.to_string(),
        message: DisplayErrorContext(&err).to_string(),
        retryable,
    }
}

fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}
