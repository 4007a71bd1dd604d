//! Per-call cancellation and deadline handling
//!
//! Every store operation runs inside a [`RequestContext`]. A cancelled or
//! expired context aborts before any statement is issued. An in-flight
//! operation that loses the race is dropped, and the repository only
//! commits a write after checking the context again.

use crate::error::{AppError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Derive a context that is cancelled with its parent and keeps the
    /// earlier of the two deadlines.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            token: self.token.child_token(),
            deadline: Some(match self.deadline {
                Some(parent) if parent < deadline => parent,
                _ => deadline,
            }),
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

    /// Fail fast if the context is already done.
    pub fn check(&self, op: &'static str) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(AppError::Cancelled { op });
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(AppError::DeadlineExceeded { op });
            }
        }
        Ok(())
    }

    /// Drive `fut` to completion unless the context is cancelled or its
    /// deadline passes first.
    pub async fn run<F, T>(&self, op: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check(op)?;

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(AppError::Cancelled { op }),
            _ = deadline => Err(AppError::DeadlineExceeded { op }),
            res = fut => res,
        }
    }
}
