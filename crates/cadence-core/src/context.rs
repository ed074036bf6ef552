//! Cancellation and deadline propagation.
//!
//! Every operation that talks to a [`CalendarDataSource`](crate::calendar::CalendarDataSource)
//! takes a [`CallContext`] and checks it before each external call. Calls that
//! were already issued are never rolled back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::error::{CoreError, Result};

/// Caller-supplied cancellation flag and optional deadline.
///
/// Clones share the same cancellation flag, so a clone handed to another
/// thread can cancel the original.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<DateTime<Utc>>,
    cancelled: Arc<AtomicBool>,
}

impl CallContext {
    /// Context without deadline that is never cancelled unless asked to.
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort once `deadline` has passed.
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Abort once `timeout` has elapsed from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Utc::now() + timeout)
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// Request cancellation. Takes effect at the next [`check`](Self::check).
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail if the context was cancelled or its deadline has passed.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Utc::now() >= deadline => Err(CoreError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
