//! Transport seam between the client and the S3 wire protocol
//!
//! [`ObjectTransport`] is one bucket's worth of S3 requests. The client
//! validates, enforces cancellation and normalizes errors; a transport only
//! performs the request and reports what the provider said.
//!
//! - [`AwsTransport`]: `aws-sdk-s3`, used for real endpoints
//! - [`MemoryTransport`]: in-process bucket for tests and offline work

mod aws;
mod memory;

pub use aws::AwsTransport;
pub use memory::MemoryTransport;

use crate::error::TransportError;
use crate::types::{DeleteFailure, ListPage, S3Object, UploadOptions};
use async_trait::async_trait;
use bytes::Bytes;
use std::pin::Pin;
use std::time::Duration;
use tokio::io::AsyncRead;

/// Readable object body
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Body of a PUT request
pub enum ObjectBody {
    Bytes(Bytes),
    /// Read by the transport when the request is built
    Reader(ObjectReader),
}

impl From<Bytes> for ObjectBody {
    fn from(data: Bytes) -> Self {
        ObjectBody::Bytes(data)
    }
}

/// S3 requests against a single bucket
///
/// Implementations must be safe to share between concurrent callers.
#[async_trait]
pub trait ObjectTransport: Send + Sync {
    async fn put_object(
        &self,
        key: &str,
        body: ObjectBody,
        options: &UploadOptions,
    ) -> Result<(), TransportError>;

    async fn get_object(&self, key: &str) -> Result<ObjectReader, TransportError>;

    /// Metadata only, no body transfer
    async fn head_object(&self, key: &str) -> Result<S3Object, TransportError>;

    async fn head_bucket(&self) -> Result<(), TransportError>;

    async fn delete_object(&self, key: &str) -> Result<(), TransportError>;

    /// One bulk-delete request; returns the keys the provider refused
    async fn delete_objects(&self, keys: &[String]) -> Result<Vec<DeleteFailure>, TransportError>;

    /// One page of a listing, starting at `continuation_token`
    async fn list_objects_page(
        &self,
        prefix: Option<&str>,
        continuation_token: Option<String>,
    ) -> Result<ListPage, TransportError>;

    /// Presigned GET URL valid for `expires_in`
    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, TransportError>;
}
