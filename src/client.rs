//! S3 client implementation

use crate::config::{Provider, ResolvedConfig, S3Config};
use crate::context::RequestContext;
use crate::error::{S3Error, S3Result};
use crate::resolver::resolve;
use crate::transport::{AwsTransport, ObjectTransport};
use crate::types::S3Object;
use crate::validation::{validate_configuration, validate_key};
use std::sync::Arc;
use tracing::{debug, info};

/// Client for one bucket on AWS S3 or an S3-compatible provider
///
/// Cheap to clone; clones share the transport and the resolved
/// configuration, and may be used from many tasks at once.
#[derive(Clone)]
pub struct S3Client {
    /// Resolved once at construction, never mutated afterwards
    config: Arc<ResolvedConfig>,

    transport: Arc<dyn ObjectTransport>,
}

impl S3Client {
    /// Validate and resolve a configuration without connecting
    pub fn prepare(mut config: S3Config) -> S3Result<ResolvedConfig> {
        validate_configuration(Some(&mut config))?;
        resolve(config)
    }

    /// Create a client backed by the AWS SDK
    ///
    /// # Example
    ///
    /// ```no_run
    /// use s3bridge::{S3Client, S3Config};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let config =
    ///         S3Config::minio("http://localhost:9000", "minioadmin", "minioadmin", "uploads");
    ///     let client = S3Client::connect(config).await?;
    ///     println!("connected to {}", client.bucket());
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(config: S3Config) -> S3Result<Self> {
        let resolved = Self::prepare(config)?;
        let transport = AwsTransport::connect(&resolved).await?;
        resolved.log_summary();

        Ok(Self {
            config: Arc::new(resolved),
            transport: Arc::new(transport),
        })
    }

    /// Create a client over a caller-supplied transport
    ///
    /// The configuration is validated and resolved exactly as in
    /// [`S3Client::connect`].
    pub fn with_transport(
        config: S3Config,
        transport: Arc<dyn ObjectTransport>,
    ) -> S3Result<Self> {
        let resolved = Self::prepare(config)?;
        debug!(
            provider = %resolved.provider(),
            bucket = %resolved.bucket_name(),
            "S3 client created with custom transport"
        );

        Ok(Self {
            config: Arc::new(resolved),
            transport,
        })
    }

    /// Get a reference to the resolved configuration
    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        self.config.bucket_name()
    }

    pub fn provider(&self) -> Provider {
        self.config.provider()
    }

    pub(crate) fn transport(&self) -> &dyn ObjectTransport {
        self.transport.as_ref()
    }

    /// Test the connection by attempting to head the bucket
    pub async fn check_bucket(&self, ctx: &RequestContext) -> S3Result<()> {
        ctx.run(async {
            self.transport.head_bucket().await.map_err(|e| {
                S3Error::from_transport(format!("failed to access bucket {}", self.bucket()), e)
            })?;
            info!(bucket = %self.bucket(), "Bucket is reachable");
            Ok::<_, S3Error>(())
        })
        .await
    }

    /// Check if an object exists
    ///
    /// Only a not-found answer yields `Ok(false)`; every other failure is
    /// returned as an error.
    pub async fn exists(&self, ctx: &RequestContext, key: &str) -> S3Result<bool> {
        match self.get_object_info(ctx, key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Get object metadata without downloading the body
    pub async fn get_object_info(&self, ctx: &RequestContext, key: &str) -> S3Result<S3Object> {
        validate_key(key)?;
        ctx.run(async {
            self.transport.head_object(key).await.map_err(|e| {
                S3Error::from_transport(format!("failed to get object info {}", key), e)
            })
        })
        .await
    }

    /// Delete an object; deleting a missing key succeeds
    pub async fn delete(&self, ctx: &RequestContext, key: &str) -> S3Result<()> {
        validate_key(key)?;
        let result = ctx
            .run(async {
                self.transport.delete_object(key).await.map_err(|e| {
                    S3Error::from_transport(format!("failed to delete object {}", key), e)
                })
            })
            .await;

        match result {
            Err(e) if e.is_not_found() => {
                debug!(key, "Object already absent");
                Ok(())
            }
            other => other,
        }
    }
}

impl std::fmt::Debug for S3Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, TransportError};
    use crate::transport::MemoryTransport;

    fn client(transport: &MemoryTransport) -> S3Client {
        let config =
            S3Config::minio("http://localhost:9000", "minioadmin", "minioadmin", "bucket");
        S3Client::with_transport(config, Arc::new(transport.clone())).unwrap()
    }

    #[test]
    fn test_prepare_validates_then_resolves() {
        let config = S3Config::auto(
            "",
            "key",
            "secret",
            "https://nyc3.digitaloceanspaces.com",
            "space",
        );
        let resolved = S3Client::prepare(config).unwrap();
        assert_eq!(resolved.provider(), Provider::DigitalOcean);
        assert_eq!(resolved.region(), "us-east-1");

        let config = S3Config::auto("", "key", "secret", "", "");
        let err = S3Client::prepare(config).unwrap_err();
        assert!(err.is(ErrorKind::EmptyBucketName));
    }

    #[test]
    fn test_with_transport_rejects_invalid_config() {
        let config = S3Config::new(Some(Provider::Minio), "", "key", "secret", "", "bucket");
        let result = S3Client::with_transport(config, Arc::new(MemoryTransport::new("bucket")));
        assert!(result.unwrap_err().is(ErrorKind::InvalidConfig));
    }

    #[tokio::test]
    async fn test_accessors() {
        let client = client(&MemoryTransport::new("bucket"));
        assert_eq!(client.bucket(), "bucket");
        assert_eq!(client.provider(), Provider::Minio);
        assert!(client.config().use_path_style());
        assert!(!format!("{:?}", client).contains("minioadmin"));
    }

    #[tokio::test]
    async fn test_exists_and_info() {
        let transport = MemoryTransport::new("bucket");
        transport.insert("present.txt", "twelve bytes");
        let client = client(&transport);
        let ctx = RequestContext::new();

        assert!(client.exists(&ctx, "present.txt").await.unwrap());
        assert!(!client.exists(&ctx, "absent.txt").await.unwrap());

        let info = client.get_object_info(&ctx, "present.txt").await.unwrap();
        assert_eq!(info.size, 12);
        assert!(info.etag.is_some());

        let err = client.get_object_info(&ctx, "absent.txt").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("absent.txt"));
    }

    #[tokio::test]
    async fn test_exists_propagates_other_errors() {
        let transport = MemoryTransport::new("bucket");
        transport.fail_requests_for(
            "locked.txt",
            TransportError::service("AccessDenied", "Access Denied").with_status(403),
        );
        let client = client(&transport);

        let err = client
            .exists(&RequestContext::new(), "locked.txt")
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::AccessDenied));
    }

    #[tokio::test]
    async fn test_empty_key_short_circuits() {
        let transport = MemoryTransport::new("bucket");
        let client = client(&transport);
        let ctx = RequestContext::new();

        assert!(client.exists(&ctx, "").await.unwrap_err().is(ErrorKind::EmptyKey));
        assert!(client.delete(&ctx, "").await.unwrap_err().is(ErrorKind::EmptyKey));
        assert!(client
            .get_object_info(&ctx, "")
            .await
            .unwrap_err()
            .is(ErrorKind::EmptyKey));
        assert_eq!(transport.total_requests(), 0);
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let transport = MemoryTransport::new("bucket");
        transport.insert("a", "x");
        let client = client(&transport);
        let ctx = RequestContext::new();

        client.delete(&ctx, "a").await.unwrap();
        client.delete(&ctx, "a").await.unwrap();
        assert!(!transport.contains("a"));

        transport.fail_requests_for(
            "gone",
            TransportError::service("NoSuchKey", "missing").with_status(404),
        );
        client.delete(&ctx, "gone").await.unwrap();
    }

    #[tokio::test]
    async fn test_check_bucket() {
        let transport = MemoryTransport::new("bucket");
        let client = client(&transport);
        client.check_bucket(&RequestContext::new()).await.unwrap();

        transport.remove_bucket();
        let err = client.check_bucket(&RequestContext::new()).await.unwrap_err();
        assert!(err.is(ErrorKind::BucketNotFound));
    }
}
