use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use walcat_core::store::{ListPage, ObjectInfo, ObjectReader, ObjectStore, StoreType};
use walcat_core::{Error, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    /// Custom endpoint for S3-compatible stores (MinIO, Ceph, ...).
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub path_style: bool,
    /// Upper bound for a whole request including SDK-level retries.
    pub operation_timeout_secs: Option<u64>,
    pub max_keys: Option<i32>,
}

pub struct S3Store {
    client: Client,
    max_keys: Option<i32>,
}

impl S3Store {
    pub async fn from_config(config: &S3Config) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let Some(secs) = config.operation_timeout_secs {
            loader = loader.timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(Duration::from_secs(secs))
                    .build(),
            );
        }
        let shared = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.path_style)
            .build();

        Ok(Self {
            client: Client::from_conf(s3_config),
            max_keys: config.max_keys,
        })
    }
}

fn to_utc(time: Option<&aws_sdk_s3::primitives::DateTime>) -> DateTime<Utc> {
    time.and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
        .unwrap_or_default()
}

fn classify<E>(operation: &str, key: &str, err: SdkError<E, HttpResponse>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let message = format!("{} {} failed: {}", operation, key, DisplayErrorContext(&err));
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            Error::Transient(message)
        }
        SdkError::ServiceError(service) => classify_status(
            service.raw().status().as_u16(),
            service.err().code(),
            key,
            message,
        ),
        _ => Error::Store(message),
    }
}

/// Maps an S3 service response to the store error taxonomy.
pub(crate) fn classify_status(status: u16, code: Option<&str>, key: &str, message: String) -> Error {
    match (status, code) {
        (_, Some("NoSuchBucket")) => Error::Store(message),
        (404, _) | (_, Some("NoSuchKey" | "NotFound")) => Error::not_found(key),
        (408 | 429 | 500 | 502 | 503 | 504, _) => Error::Transient(message),
        (_, Some("SlowDown" | "Throttling" | "ThrottlingException" | "RequestTimeout" | "InternalError")) => {
            Error::Transient(message)
        }
        _ => Error::Store(message),
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
        continuation_token: Option<String>,
    ) -> Result<ListPage> {
        let mut request = self.client.list_objects_v2().bucket(bucket).prefix(prefix);
        if let Some(delimiter) = delimiter {
            request = request.delimiter(delimiter);
        }
        if let Some(token) = continuation_token {
            request = request.continuation_token(token);
        }
        if let Some(max_keys) = self.max_keys {
            request = request.max_keys(max_keys);
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify("List", prefix, e))?;

        let objects: Vec<ObjectInfo> = response
            .contents()
            .iter()
            .filter_map(|object| {
                let key = object.key()?;
                Some(ObjectInfo {
                    key: key.to_string(),
                    size: object.size().unwrap_or(0).max(0) as u64,
                    last_modified: to_utc(object.last_modified()),
                })
            })
            .collect();

        let common_prefixes = response
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix().map(str::to_string))
            .collect();

        let next_continuation_token = if response.is_truncated().unwrap_or(false) {
            response.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        debug!(
            bucket,
            prefix,
            objects = objects.len(),
            truncated = next_continuation_token.is_some(),
            "Listed S3 page"
        );

        Ok(ListPage {
            objects,
            common_prefixes,
            next_continuation_token,
        })
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<ObjectInfo> {
        let response = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify("Head", key, e))?;

        Ok(ObjectInfo {
            key: key.to_string(),
            size: response.content_length().unwrap_or(0).max(0) as u64,
            last_modified: to_utc(response.last_modified()),
        })
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<ObjectReader> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify("Get", key, e))?;

        Ok(Box::pin(response.body.into_async_read()))
    }

    fn store_type(&self) -> StoreType {
        StoreType::S3
    }
}
