//! Cancellation and deadlines for client operations

use crate::error::{S3Error, S3Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Per-call cancellation signal and optional deadline
///
/// Every [`S3Client`](crate::S3Client) operation takes a context and fails
/// with [`S3Error::Cancelled`] or [`S3Error::DeadlineExceeded`] as soon as
/// either fires. Cloned contexts share the same token.
///
/// ```
/// use s3bridge::RequestContext;
/// use std::time::Duration;
///
/// let ctx = RequestContext::new().with_timeout(Duration::from_secs(30));
/// let child = ctx.child();
/// ctx.cancel();
/// assert!(child.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context that is never cancelled and has no deadline
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing cancellation token
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Deadline `timeout` from now; an earlier existing deadline is kept
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        });
        self
    }

    /// Context cancelled together with this one, but cancellable on its own
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Fail fast if the context is already done
    pub fn check(&self) -> S3Result<()> {
        if self.token.is_cancelled() {
            return Err(S3Error::Cancelled);
        }
        if matches!(self.deadline, Some(deadline) if deadline <= Instant::now()) {
            return Err(S3Error::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drive `operation` until it completes or the context fires
    ///
    /// On cancellation the operation future is dropped, which aborts the
    /// in-flight request without affecting later calls.
    pub async fn run<T, F>(&self, operation: F) -> S3Result<T>
    where
        F: Future<Output = S3Result<T>>,
    {
        self.check()?;

        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(S3Error::Cancelled),
            _ = expired => Err(S3Error::DeadlineExceeded),
            result = operation => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_run_completes() {
        let ctx = RequestContext::new();
        let value = ctx.run(async { Ok::<_, S3Error>(42) }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_already_cancelled_skips_operation() {
        let ctx = RequestContext::new();
        ctx.cancel();

        let mut polled = false;
        let result = ctx
            .run(async {
                polled = true;
                Ok::<_, S3Error>(())
            })
            .await;
        assert!(result.unwrap_err().is(ErrorKind::Cancelled));
        assert!(!polled);
    }

    #[tokio::test]
    async fn test_cancel_mid_flight() {
        let ctx = RequestContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let result = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, S3Error>(())
            })
            .await;
        assert!(result.unwrap_err().is(ErrorKind::Cancelled));
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(20));
        let result = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, S3Error>(())
            })
            .await;
        assert!(result.unwrap_err().is(ErrorKind::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_earlier_deadline_kept() {
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(10));
        let first = ctx.deadline().unwrap();
        let ctx = ctx.with_timeout(Duration::from_secs(60));
        assert_eq!(ctx.deadline(), Some(first));
    }

    #[tokio::test]
    async fn test_child_cancellation() {
        let parent = RequestContext::new();
        let child = parent.child();
        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());

        let child = parent.child();
        parent.cancel();
        assert!(child.check().unwrap_err().is(ErrorKind::Cancelled));
    }
}
