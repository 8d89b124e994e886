/*!
 * s3bridge - one S3 client for AWS, MinIO, DigitalOcean Spaces and other
 * S3-compatible object stores
 *
 * - Provider detection from the endpoint, with per-provider region, TLS and
 *   addressing-style rules resolved once at construction
 * - Upload, download, streaming download, delete, bulk delete, paginated
 *   listing, existence checks and presigned URLs
 * - Cancellation and deadlines on every operation
 * - Provider errors folded into a small set of error kinds
 * - Pluggable transport: `aws-sdk-s3` for real endpoints, in-memory for tests
 *
 * ```no_run
 * use s3bridge::{RequestContext, S3Client, S3Config};
 *
 * #[tokio::main]
 * async fn main() -> Result<(), Box<dyn std::error::Error>> {
 *     let client = S3Client::connect(S3Config::from_env()?).await?;
 *     let ctx = RequestContext::new();
 *
 *     client.upload(&ctx, "hello.txt", "hello", None).await?;
 *     for object in client.list(&ctx, "").await? {
 *         println!("{} {}", object.key, object.size);
 *     }
 *     Ok(())
 * }
 * ```
 */

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod operations;
pub mod resolver;
pub mod transport;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use client::S3Client;
pub use config::{
    mask_key, ConfigReport, Provider, ResolvedConfig, S3Config, S3ConfigBuilder, DEFAULT_DO_REGION,
    DEFAULT_REGION,
};
pub use context::RequestContext;
pub use error::{normalize_error, normalize_result, ErrorKind, S3Error, S3Result, TransportError};
pub use logging::{init_logging, LogConfig};
pub use operations::MAX_DELETE_BATCH;
pub use resolver::{detect_provider, resolve};
pub use transport::{AwsTransport, MemoryTransport, ObjectTransport};
pub use types::{DeleteFailure, ListPage, S3Object, UploadOptions};
pub use validation::{validate_configuration, validate_key};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
