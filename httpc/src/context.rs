//! Caller-supplied cancellation and deadline scope.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFuture};

/// Deadline, cancellation token and correlation id for one logical operation.
///
/// Contexts are cheap to clone. Deriving a child with [`Context::with_timeout`]
/// or [`Context::with_deadline`] creates a nested cancellation scope: cancelling
/// the parent cancels the child, never the other way around, and the child's
/// deadline is never later than the parent's.
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    token: CancellationToken,
    request_id: Option<Arc<str>>,
}

impl Context {
    /// A context with no deadline that is never cancelled unless [`Context::cancel`]
    /// is called.
    pub fn background() -> Self {
        Self::default()
    }

    /// Child context expiring `timeout` from now, or at the parent's deadline
    /// if that is sooner.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Child context expiring at `deadline`, clamped to the parent's.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) => parent.min(deadline),
            None => deadline,
        };
        Self {
            deadline: Some(deadline),
            token: self.token.child_token(),
            request_id: self.request_id.clone(),
        }
    }

    /// Attaches a correlation id. The cancellation scope is shared with `self`.
    pub fn with_request_id(&self, request_id: impl Into<String>) -> Self {
        Self {
            deadline: self.deadline,
            token: self.token.clone(),
            request_id: Some(Arc::from(request_id.into())),
        }
    }

    /// Correlation id attached with [`Context::with_request_id`].
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// `None` if the context never expires.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once this context or one of its ancestors was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when the context is cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Cancels this context's scope once the guard is dropped.
    pub(crate) fn cancel_on_drop(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    /// Runs `fut` until it completes, the deadline passes, or the context is
    /// cancelled, whichever happens first.
    pub(crate) async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Interrupted> {
        let bounded = async {
            match self.deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, fut)
                    .await
                    .map_err(|_| Interrupted::DeadlineExceeded),
                None => Ok(fut.await),
            }
        };
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(Interrupted::Canceled),
            res = bounded => res,
        }
    }
}

/// Why [`Context::run`] stopped before its future completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interrupted {
    DeadlineExceeded,
    Canceled,
}
