//! `aws-sdk-s3` transport

use super::{ObjectBody, ObjectReader, ObjectTransport};
use crate::config::ResolvedConfig;
use crate::error::{S3Error, S3Result, TransportError};
use crate::types::{DeleteFailure, ListPage, S3Object, UploadOptions};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client as AwsS3Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Transport backed by the official AWS SDK
///
/// Works for every provider: the resolved endpoint, region, credentials and
/// addressing style are baked into the SDK client at construction.
#[derive(Clone)]
pub struct AwsTransport {
    client: AwsS3Client,
    bucket: String,
}

impl AwsTransport {
    /// Build the SDK client from a resolved configuration
    pub async fn connect(config: &ResolvedConfig) -> S3Result<Self> {
        let endpoint = endpoint_url(config)?;

        let credentials = Credentials::new(
            config.access_key_id(),
            config.secret_access_key().expose_secret(),
            None,
            None,
            "s3bridge-static",
        );

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region().to_string()))
            .credentials_provider(credentials)
            .load()
            .await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&aws_config);

        if let Some(endpoint) = endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        s3_config_builder = s3_config_builder.force_path_style(config.use_path_style());

        debug!(
            provider = %config.provider(),
            bucket = %config.bucket_name(),
            path_style = config.use_path_style(),
            "Built AWS SDK S3 client"
        );

        Ok(Self {
            client: AwsS3Client::from_conf(s3_config_builder.build()),
            bucket: config.bucket_name().to_string(),
        })
    }

    /// Use an SDK client configured elsewhere
    pub fn from_client(client: AwsS3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Get a reference to the underlying AWS S3 client
    pub fn aws_client(&self) -> &AwsS3Client {
        &self.client
    }
}

/// Endpoint URL for the SDK, or `None` for the AWS default
///
/// A scheme-less endpoint gets `https://` or `http://` from the TLS flag.
pub(crate) fn endpoint_url(config: &ResolvedConfig) -> S3Result<Option<String>> {
    let endpoint = config.endpoint().trim().trim_end_matches('/');
    if endpoint.is_empty() {
        return Ok(None);
    }

    let endpoint = if endpoint.contains("://") {
        endpoint.to_string()
    } else if config.use_ssl() {
        format!("https://{}", endpoint)
    } else {
        format!("http://{}", endpoint)
    };

    let parsed = url::Url::parse(&endpoint).map_err(|e| {
        S3Error::InvalidConfig(format!("invalid endpoint '{}': {}", endpoint, e))
    })?;
    if parsed.host_str().is_none() {
        return Err(S3Error::InvalidConfig(format!(
            "endpoint '{}' has no host",
            endpoint
        )));
    }

    Ok(Some(endpoint))
}

impl<E> From<SdkError<E, HttpResponse>> for TransportError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    fn from(error: SdkError<E, HttpResponse>) -> Self {
        let status = error.raw_response().map(|r| r.status().as_u16());
        let service = error.as_service_error();
        let code = service.and_then(|e| e.code()).map(str::to_string);
        let message = service
            .and_then(|e| e.message())
            .map(str::to_string)
            .unwrap_or_else(|| DisplayErrorContext(&error).to_string());

        TransportError {
            code,
            status,
            message,
        }
    }
}

fn to_chrono(dt: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

fn object_size(size: Option<i64>) -> u64 {
    size.unwrap_or(0).max(0) as u64
}

/// Continuation token of a ListObjectsV2 response
fn next_page_token(
    is_truncated: Option<bool>,
    token: Option<&str>,
) -> Result<Option<String>, TransportError> {
    match (is_truncated.unwrap_or(false), token) {
        (false, _) => Ok(None),
        (true, Some(token)) => Ok(Some(token.to_string())),
        (true, None) => Err(TransportError::new(
            "listing is truncated but no continuation token was returned",
        )),
    }
}

#[async_trait]
impl ObjectTransport for AwsTransport {
    async fn put_object(
        &self,
        key: &str,
        body: ObjectBody,
        options: &UploadOptions,
    ) -> Result<(), TransportError> {
        let data = match body {
            ObjectBody::Bytes(data) => data,
            ObjectBody::Reader(mut reader) => {
                // PutObject needs a known length; buffer the source
                let mut buffer = Vec::new();
                reader.read_to_end(&mut buffer).await.map_err(|e| {
                    TransportError::new(format!("failed to read upload body: {}", e))
                })?;
                Bytes::from(buffer)
            }
        };

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data));

        if let Some(content_type) = &options.content_type {
            request = request.content_type(content_type);
        }

        if !options.metadata.is_empty() {
            request = request.set_metadata(Some(options.metadata.clone()));
        }

        request.send().await?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<ObjectReader, TransportError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;

        Ok(Box::pin(output.body.into_async_read()))
    }

    async fn head_object(&self, key: &str) -> Result<S3Object, TransportError> {
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;

        Ok(S3Object {
            key: key.to_string(),
            size: object_size(output.content_length()),
            last_modified: output.last_modified().and_then(to_chrono),
            etag: output.e_tag().map(str::to_string),
        })
    }

    async fn head_bucket(&self) -> Result<(), TransportError> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| {
                let error = TransportError::from(e);
                // HEAD responses carry no body, so a missing bucket surfaces as NotFound
                if error.is_not_found() {
                    TransportError {
                        code: Some("NoSuchBucket".to_string()),
                        ..error
                    }
                } else {
                    error
                }
            })?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), TransportError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;
        Ok(())
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<Vec<DeleteFailure>, TransportError> {
        let objects = keys
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TransportError::new(format!("invalid delete request: {}", e)))?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|e| TransportError::new(format!("invalid delete request: {}", e)))?;

        let output = self
            .client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await?;

        Ok(output
            .errors()
            .iter()
            .map(|error| DeleteFailure {
                key: error.key().unwrap_or_default().to_string(),
                code: error.code().map(str::to_string),
                message: error.message().map(str::to_string),
            })
            .collect())
    }

    async fn list_objects_page(
        &self,
        prefix: Option<&str>,
        continuation_token: Option<String>,
    ) -> Result<ListPage, TransportError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .set_prefix(prefix.map(str::to_string))
            .set_continuation_token(continuation_token)
            .send()
            .await?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|obj| {
                Some(S3Object {
                    key: obj.key()?.to_string(),
                    size: object_size(obj.size()),
                    last_modified: obj.last_modified().and_then(to_chrono),
                    etag: obj.e_tag().map(str::to_string),
                })
            })
            .collect();

        let next_continuation_token =
            next_page_token(output.is_truncated(), output.next_continuation_token())?;

        Ok(ListPage {
            objects,
            next_continuation_token,
        })
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, TransportError> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| TransportError::new(format!("invalid presign expiration: {}", e)))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await?;

        Ok(request.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Provider, S3Config};
    use crate::resolver::resolve;

    fn resolved(provider: Option<Provider>, endpoint: &str, use_ssl: bool) -> ResolvedConfig {
        let mut config = S3Config::new(provider, "", "AKIA", "secret", endpoint, "bucket");
        config.use_ssl = use_ssl;
        resolve(config).unwrap()
    }

    #[test]
    fn test_endpoint_url_aws_default() {
        assert_eq!(endpoint_url(&resolved(Some(Provider::Aws), "", true)).unwrap(), None);
    }

    #[test]
    fn test_endpoint_url_adds_scheme() {
        let config = resolved(Some(Provider::Custom), "storage.example.com/", true);
        assert_eq!(
            endpoint_url(&config).unwrap().as_deref(),
            Some("https://storage.example.com")
        );

        let config = resolved(Some(Provider::Custom), "storage.example.com", false);
        assert_eq!(
            endpoint_url(&config).unwrap().as_deref(),
            Some("http://storage.example.com")
        );
    }

    #[test]
    fn test_endpoint_url_keeps_explicit_scheme() {
        let config = resolved(Some(Provider::Minio), "http://localhost:9000", true);
        assert_eq!(
            endpoint_url(&config).unwrap().as_deref(),
            Some("http://localhost:9000")
        );
    }

    #[test]
    fn test_endpoint_url_rejects_garbage() {
        let config = resolved(Some(Provider::Custom), "http://bad host.example", true);
        assert!(matches!(endpoint_url(&config), Err(S3Error::InvalidConfig(_))));
    }

    #[test]
    fn test_next_page_token() {
        assert_eq!(next_page_token(None, None).unwrap(), None);
        assert_eq!(next_page_token(Some(false), Some("stale")).unwrap(), None);
        assert_eq!(
            next_page_token(Some(true), Some("t1")).unwrap().as_deref(),
            Some("t1")
        );

        let err = next_page_token(Some(true), None).unwrap_err();
        assert!(err.message.contains("no continuation token"));
    }

    #[tokio::test]
    async fn test_connect_builds_client() {
        let config = resolved(Some(Provider::Minio), "http://localhost:9000", false);
        let transport = AwsTransport::connect(&config).await.unwrap();
        assert_eq!(transport.bucket, "bucket");
        assert_eq!(
            transport.aws_client().config().region().map(|r| r.as_ref()),
            Some("us-east-1")
        );
    }

    #[tokio::test]
    async fn test_presign_is_local() {
        let config = resolved(Some(Provider::Minio), "http://localhost:9000", false);
        let transport = AwsTransport::connect(&config).await.unwrap();

        let url = transport
            .presign_get("reports/q1.csv", Duration::from_secs(900))
            .await
            .unwrap();
        assert!(url.starts_with("http://localhost:9000/bucket/reports/q1.csv?"));
        assert!(url.contains("X-Amz-Expires=900"));
    }
}
