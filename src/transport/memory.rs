//! In-memory transport for testing
//!
//! Holds a single bucket in a `BTreeMap`, so listings come back in key order.
//! Failure injection and request counters let tests observe exactly what the
//! client sent.

use super::{ObjectBody, ObjectReader, ObjectTransport};
use crate::error::TransportError;
use crate::types::{DeleteFailure, ListPage, S3Object, UploadOptions};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::io::AsyncReadExt;

/// S3's maximum keys per ListObjectsV2 page
pub const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: Option<String>,
    metadata: HashMap<String, String>,
    last_modified: DateTime<Utc>,
    etag: String,
}

#[derive(Debug, Default)]
struct BucketState {
    objects: BTreeMap<String, StoredObject>,
    failing_deletes: HashSet<String>,
    key_errors: HashMap<String, TransportError>,
    bucket_missing: bool,
}

#[derive(Debug, Default)]
struct Counters {
    put: AtomicU64,
    get: AtomicU64,
    head: AtomicU64,
    delete: AtomicU64,
    bulk_delete: AtomicU64,
    list: AtomicU64,
    presign: AtomicU64,
    generation: AtomicU64,
}

/// Mock bucket implementation for testing
///
/// ```
/// use s3bridge::transport::{MemoryTransport, ObjectTransport};
///
/// # #[tokio::main]
/// # async fn main() {
/// let transport = MemoryTransport::new("uploads").with_page_size(2);
/// transport.insert("a.txt", "alpha");
/// assert!(transport.contains("a.txt"));
/// assert!(transport.head_object("a.txt").await.is_ok());
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    bucket: String,
    page_size: usize,
    latency: Option<Duration>,
    state: Arc<RwLock<BucketState>>,
    counters: Arc<Counters>,
}

impl MemoryTransport {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            page_size: DEFAULT_PAGE_SIZE,
            latency: None,
            state: Arc::new(RwLock::new(BucketState::default())),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Maximum objects per listing page (at least 1)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Delay every request by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Store an object directly, bypassing the request counters
    pub fn insert(&self, key: impl Into<String>, data: impl Into<Bytes>) {
        let object = self.stored(data.into(), &UploadOptions::default());
        self.write().objects.insert(key.into(), object);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().objects.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.read().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Content type and metadata recorded for `key`
    pub fn upload_options(&self, key: &str) -> Option<UploadOptions> {
        self.read().objects.get(key).map(|o| UploadOptions {
            content_type: o.content_type.clone(),
            metadata: o.metadata.clone(),
        })
    }

    /// Make bulk deletes report `key` as failed (and leave it in place)
    pub fn fail_delete_of(&self, key: impl Into<String>) {
        self.write().failing_deletes.insert(key.into());
    }

    /// Fail every single-key request for `key` with `error`
    pub fn fail_requests_for(&self, key: impl Into<String>, error: TransportError) {
        self.write().key_errors.insert(key.into(), error);
    }

    /// Simulate a bucket that does not exist
    pub fn remove_bucket(&self) {
        self.write().bucket_missing = true;
    }

    pub fn put_requests(&self) -> u64 {
        self.counters.put.load(Ordering::SeqCst)
    }

    pub fn get_requests(&self) -> u64 {
        self.counters.get.load(Ordering::SeqCst)
    }

    pub fn head_requests(&self) -> u64 {
        self.counters.head.load(Ordering::SeqCst)
    }

    pub fn delete_requests(&self) -> u64 {
        self.counters.delete.load(Ordering::SeqCst)
    }

    pub fn bulk_delete_requests(&self) -> u64 {
        self.counters.bulk_delete.load(Ordering::SeqCst)
    }

    pub fn list_requests(&self) -> u64 {
        self.counters.list.load(Ordering::SeqCst)
    }

    pub fn presign_requests(&self) -> u64 {
        self.counters.presign.load(Ordering::SeqCst)
    }

    /// Total requests of any kind
    pub fn total_requests(&self) -> u64 {
        self.put_requests()
            + self.get_requests()
            + self.head_requests()
            + self.delete_requests()
            + self.bulk_delete_requests()
            + self.list_requests()
            + self.presign_requests()
    }

    fn read(&self) -> RwLockReadGuard<'_, BucketState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BucketState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn stored(&self, data: Bytes, options: &UploadOptions) -> StoredObject {
        let generation = self.counters.generation.fetch_add(1, Ordering::SeqCst) + 1;
        StoredObject {
            data,
            content_type: options.content_type.clone(),
            metadata: options.metadata.clone(),
            last_modified: Utc::now(),
            etag: format!("\"{:016x}\"", generation),
        }
    }

    async fn begin(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// Errors that apply to any request touching `key`
    fn precheck(&self, key: Option<&str>) -> Result<(), TransportError> {
        let state = self.read();
        if state.bucket_missing {
            return Err(TransportError::service(
                "NoSuchBucket",
                format!("The specified bucket does not exist: {}", self.bucket),
            )
            .with_status(404));
        }
        if let Some(error) = key.and_then(|k| state.key_errors.get(k)) {
            return Err(error.clone());
        }
        Ok(())
    }

    fn no_such_key(key: &str) -> TransportError {
        TransportError::service("NoSuchKey", format!("The specified key does not exist: {}", key))
            .with_status(404)
    }

    fn describe(key: &str, object: &StoredObject) -> S3Object {
        S3Object {
            key: key.to_string(),
            size: object.data.len() as u64,
            last_modified: Some(object.last_modified),
            etag: Some(object.etag.clone()),
        }
    }
}

#[async_trait]
impl ObjectTransport for MemoryTransport {
    async fn put_object(
        &self,
        key: &str,
        body: ObjectBody,
        options: &UploadOptions,
    ) -> Result<(), TransportError> {
        self.begin(&self.counters.put).await;
        self.precheck(Some(key))?;

        let data = match body {
            ObjectBody::Bytes(data) => data,
            ObjectBody::Reader(mut reader) => {
                let mut buffer = Vec::new();
                reader.read_to_end(&mut buffer).await.map_err(|e| {
                    TransportError::new(format!("failed to read upload body: {}", e))
                })?;
                Bytes::from(buffer)
            }
        };

        let object = self.stored(data, options);
        self.write().objects.insert(key.to_string(), object);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<ObjectReader, TransportError> {
        self.begin(&self.counters.get).await;
        self.precheck(Some(key))?;

        let data = self
            .read()
            .objects
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| Self::no_such_key(key))?;
        Ok(Box::pin(Cursor::new(data)))
    }

    async fn head_object(&self, key: &str) -> Result<S3Object, TransportError> {
        self.begin(&self.counters.head).await;
        self.precheck(Some(key))?;

        let state = self.read();
        match state.objects.get(key) {
            Some(object) => Ok(Self::describe(key, object)),
            // HEAD has no body, so the provider can only say NotFound
            None => Err(TransportError::service("NotFound", "Not Found").with_status(404)),
        }
    }

    async fn head_bucket(&self) -> Result<(), TransportError> {
        self.begin(&self.counters.head).await;
        self.precheck(None)
    }

    async fn delete_object(&self, key: &str) -> Result<(), TransportError> {
        self.begin(&self.counters.delete).await;
        self.precheck(Some(key))?;

        self.write().objects.remove(key);
        Ok(())
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<Vec<DeleteFailure>, TransportError> {
        self.begin(&self.counters.bulk_delete).await;
        self.precheck(None)?;

        let mut state = self.write();
        let mut failures = Vec::new();
        for key in keys {
            if state.failing_deletes.contains(key) {
                failures.push(DeleteFailure {
                    key: key.clone(),
                    code: Some("AccessDenied".to_string()),
                    message: Some("Access Denied".to_string()),
                });
            } else {
                state.objects.remove(key);
            }
        }
        Ok(failures)
    }

    async fn list_objects_page(
        &self,
        prefix: Option<&str>,
        continuation_token: Option<String>,
    ) -> Result<ListPage, TransportError> {
        self.begin(&self.counters.list).await;
        self.precheck(None)?;

        let prefix = prefix.unwrap_or_default();
        let state = self.read();

        // the token is the last key of the previous page
        let mut matching = state
            .objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .filter(|(key, _)| match &continuation_token {
                Some(after) => key.as_str() > after.as_str(),
                None => true,
            });

        let objects: Vec<S3Object> = matching
            .by_ref()
            .take(self.page_size)
            .map(|(key, object)| Self::describe(key, object))
            .collect();

        let next_continuation_token = if matching.next().is_some() {
            objects.last().map(|o| o.key.clone())
        } else {
            None
        };

        Ok(ListPage {
            objects,
            next_continuation_token,
        })
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, TransportError> {
        self.begin(&self.counters.presign).await;
        self.precheck(None)?;

        Ok(format!(
            "memory://{}/{}?X-Amz-Expires={}",
            self.bucket,
            key,
            expires_in.as_secs()
        ))
    }
}
