//! Object operations: upload, download, delete, list, presign

use crate::client::S3Client;
use crate::context::RequestContext;
use crate::error::{S3Error, S3Result, TransportError};
use crate::transport::ObjectBody;
use crate::types::{ListPage, S3Object, UploadOptions};
use crate::validation::validate_key;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tracing::{debug, warn};

/// Most keys one DeleteObjects request may carry
pub const MAX_DELETE_BATCH: usize = 1000;

fn non_empty(prefix: &str) -> Option<&str> {
    if prefix.is_empty() {
        None
    } else {
        Some(prefix)
    }
}

/// Token for the following page; a provider echoing the token it was just
/// sent would otherwise page forever
fn next_token(sent: Option<&str>, next: Option<String>) -> S3Result<Option<String>> {
    match next {
        Some(token) if sent == Some(token.as_str()) => Err(S3Error::Transport {
            context: "failed to list objects".to_string(),
            source: TransportError::new(format!(
                "provider repeated continuation token '{}'",
                token
            )),
        }),
        next => Ok(next),
    }
}

impl S3Client {
    /// Upload an object in a single PUT
    ///
    /// Content type and metadata from `options` are sent as given.
    pub async fn upload(
        &self,
        ctx: &RequestContext,
        key: &str,
        data: impl Into<Bytes>,
        options: Option<&UploadOptions>,
    ) -> S3Result<()> {
        validate_key(key)?;
        let data = data.into();
        debug!(key, bucket = %self.bucket(), size = data.len(), "Uploading object");

        self.put(ctx, key, ObjectBody::Bytes(data), options).await
    }

    /// Upload an object whose body comes from an async reader
    pub async fn upload_from_reader<R>(
        &self,
        ctx: &RequestContext,
        key: &str,
        reader: R,
        options: Option<&UploadOptions>,
    ) -> S3Result<()>
    where
        R: AsyncRead + Send + 'static,
    {
        validate_key(key)?;
        debug!(key, bucket = %self.bucket(), "Uploading object from reader");

        self.put(ctx, key, ObjectBody::Reader(Box::pin(reader)), options)
            .await
    }

    async fn put(
        &self,
        ctx: &RequestContext,
        key: &str,
        body: ObjectBody,
        options: Option<&UploadOptions>,
    ) -> S3Result<()> {
        let default_options = UploadOptions::default();
        let options = options.unwrap_or(&default_options);

        ctx.run(async {
            self.transport()
                .put_object(key, body, options)
                .await
                .map_err(|e| S3Error::from_transport(format!("failed to upload object {}", key), e))
        })
        .await
    }

    /// Download a whole object into memory
    pub async fn download(&self, ctx: &RequestContext, key: &str) -> S3Result<Bytes> {
        validate_key(key)?;
        debug!(key, bucket = %self.bucket(), "Downloading object");

        ctx.run(async {
            let mut reader = self
                .transport()
                .get_object(key)
                .await
                .map_err(|e| {
                    S3Error::from_transport(format!("failed to download object {}", key), e)
                })?;

            let mut buffer = Vec::new();
            reader
                .read_to_end(&mut buffer)
                .await
                .map_err(|e| S3Error::io(format!("failed to read object body {}", key), e))?;
            Ok::<_, S3Error>(Bytes::from(buffer))
        })
        .await
    }

    /// Stream an object into `writer`, returning the number of bytes copied
    pub async fn download_to_writer<W>(
        &self,
        ctx: &RequestContext,
        key: &str,
        writer: &mut W,
    ) -> S3Result<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        validate_key(key)?;
        debug!(key, bucket = %self.bucket(), "Streaming object download");

        ctx.run(async {
            let mut reader = self
                .transport()
                .get_object(key)
                .await
                .map_err(|e| {
                    S3Error::from_transport(format!("failed to download object {}", key), e)
                })?;

            tokio::io::copy(&mut reader, writer)
                .await
                .map_err(|e| S3Error::io(format!("failed to stream object {}", key), e))
        })
        .await
    }

    /// Delete many objects with bulk-delete requests
    ///
    /// Keys go out in batches of [`MAX_DELETE_BATCH`]. Every key the provider
    /// refused is reported in [`S3Error::DeleteFailed`]; keys not reported
    /// there may or may not have been removed.
    ///
    /// A request-level failure stops the remaining batches and is returned
    /// as is. Keys refused by earlier batches are then only logged.
    pub async fn delete_multiple<S>(&self, ctx: &RequestContext, keys: &[S]) -> S3Result<()>
    where
        S: AsRef<str>,
    {
        if keys.is_empty() {
            return Ok(());
        }
        for key in keys {
            validate_key(key.as_ref())?;
        }

        let mut failed = Vec::new();
        for batch in keys.chunks(MAX_DELETE_BATCH) {
            let batch: Vec<String> = batch.iter().map(|k| k.as_ref().to_string()).collect();
            debug!(bucket = %self.bucket(), count = batch.len(), "Deleting object batch");

            let result = ctx
                .run(async {
                    self.transport()
                        .delete_objects(&batch)
                        .await
                        .map_err(|e| S3Error::from_transport("failed to delete objects", e))
                })
                .await;

            let failures = match result {
                Ok(failures) => failures,
                Err(e) => {
                    if !failed.is_empty() {
                        warn!(
                            keys = %failed.join(", "),
                            "Bulk delete aborted after earlier batches refused keys"
                        );
                    }
                    return Err(e);
                }
            };

            for failure in failures {
                warn!(
                    key = %failure.key,
                    code = failure.code.as_deref().unwrap_or("unknown"),
                    message = failure.message.as_deref().unwrap_or(""),
                    "Object was not deleted"
                );
                failed.push(failure.key);
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(S3Error::DeleteFailed { keys: failed })
        }
    }

    async fn list_page(
        &self,
        ctx: &RequestContext,
        prefix: Option<&str>,
        continuation_token: Option<String>,
    ) -> S3Result<ListPage> {
        ctx.run(async {
            self.transport()
                .list_objects_page(prefix, continuation_token)
                .await
                .map_err(|e| {
                    let prefix = prefix.unwrap_or_default();
                    S3Error::from_transport(
                        format!("failed to list objects with prefix '{}'", prefix),
                        e,
                    )
                })
        })
        .await
    }

    /// List every object under `prefix`, following pagination to the end
    ///
    /// An empty prefix lists the whole bucket. A provider that returns the
    /// continuation token it was given fails the listing.
    pub async fn list(&self, ctx: &RequestContext, prefix: &str) -> S3Result<Vec<S3Object>> {
        let prefix = non_empty(prefix);
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .list_page(ctx, prefix, continuation_token.clone())
                .await?;
            pages += 1;
            objects.extend(page.objects);

            match next_token(continuation_token.as_deref(), page.next_continuation_token)? {
                Some(token) => continuation_token = Some(token),
                None => break,
            }
        }

        debug!(bucket = %self.bucket(), pages, count = objects.len(), "Listed objects");
        Ok(objects)
    }

    /// Lazily paginated listing
    ///
    /// Pages are requested as the stream is polled; the first error ends the
    /// stream.
    ///
    /// ```no_run
    /// use futures::TryStreamExt;
    /// use s3bridge::{RequestContext, S3Client};
    ///
    /// # async fn example(client: S3Client) -> s3bridge::S3Result<()> {
    /// let ctx = RequestContext::new();
    /// let mut objects = client.list_stream(&ctx, "logs/");
    /// while let Some(object) = objects.try_next().await? {
    ///     println!("{} ({} bytes)", object.key, object.size);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn list_stream(
        &self,
        ctx: &RequestContext,
        prefix: &str,
    ) -> BoxStream<'static, S3Result<S3Object>> {
        struct Cursor {
            client: S3Client,
            ctx: RequestContext,
            prefix: Option<String>,
            continuation_token: Option<String>,
            exhausted: bool,
        }

        let cursor = Cursor {
            client: self.clone(),
            ctx: ctx.clone(),
            prefix: non_empty(prefix).map(str::to_string),
            continuation_token: None,
            exhausted: false,
        };

        stream::try_unfold(cursor, |mut cursor| async move {
            if cursor.exhausted {
                return Ok(None);
            }

            let sent = cursor.continuation_token.take();
            let page = cursor
                .client
                .list_page(&cursor.ctx, cursor.prefix.as_deref(), sent.clone())
                .await?;

            cursor.continuation_token = next_token(sent.as_deref(), page.next_continuation_token)?;
            cursor.exhausted = cursor.continuation_token.is_none();

            let objects = stream::iter(page.objects.into_iter().map(Ok::<S3Object, S3Error>));
            Ok::<_, S3Error>(Some((objects, cursor)))
        })
        .try_flatten()
        .boxed()
    }

    /// Presigned GET URL valid for `expiration`
    ///
    /// The object is not checked for existence.
    pub async fn generate_presigned_url(
        &self,
        ctx: &RequestContext,
        key: &str,
        expiration: Duration,
    ) -> S3Result<String> {
        validate_key(key)?;
        debug!(
            key,
            bucket = %self.bucket(),
            expires_secs = expiration.as_secs(),
            "Presigning GET"
        );

        ctx.run(async {
            self.transport()
                .presign_get(key, expiration)
                .await
                .map_err(|e| {
                    let context = format!("failed to generate presigned URL for {}", key);
                    S3Error::from_transport(context, e)
                })
        })
        .await
    }
}
