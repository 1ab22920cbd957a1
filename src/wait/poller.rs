// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Generic wait-until-condition primitive.
//!
//! The first check runs immediately, later checks run every `interval`
//! until the predicate holds, the fetch fails, the timeout elapses or the
//! caller's [`WaitContext`] is done. A failing fetch ends the wait; wrap the
//! fetch yourself when transient errors should be retried.

use crate::error::{BoxError, CrdError, Result};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Why a wait stopped before its own timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelCause {
    /// The caller's token was cancelled
    Cancelled,
    /// The caller's deadline passed
    DeadlineExceeded,
}

impl fmt::Display for CancelCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelCause::Cancelled => write!(f, "cancelled by caller"),
            CancelCause::DeadlineExceeded => write!(f, "caller deadline exceeded"),
        }
    }
}

/// Cancellation scope a wait is bound to.
///
/// Cloning shares the token, so cancelling an outer operation stops every
/// wait started under it.
#[derive(Debug, Clone, Default)]
pub struct WaitContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl WaitContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// A context cancelled together with this one, which can also be
    /// cancelled on its own
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Resolves once the context is cancelled or its deadline passes
    pub async fn done(&self) -> CancelCause {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => CancelCause::Cancelled,
                _ = sleep_until(deadline) => CancelCause::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                CancelCause::Cancelled
            }
        }
    }
}

/// Where a wait currently stands. `Checking` and `Sleeping` loop, the rest
/// are terminal.
#[derive(Debug)]
enum Phase<S> {
    Checking,
    Sleeping,
    Satisfied(S),
    Failed(BoxError),
    TimedOut,
    Cancelled(CancelCause),
}

/// Polls a fetch function until a predicate over its result holds
#[derive(Debug, Clone)]
pub struct ConditionPoller {
    what: String,
    interval: Duration,
    timeout: Duration,
}

impl ConditionPoller {
    /// `what` names the awaited condition in logs and errors
    pub fn new(what: impl Into<String>, interval: Duration, timeout: Duration) -> Self {
        Self {
            what: what.into(),
            interval,
            timeout,
        }
    }

    /// Wait until `predicate(fetch())` holds and return the satisfying state
    pub async fn wait<S, E, F, Fut, P>(&self, ctx: &WaitContext, mut fetch: F, mut predicate: P) -> Result<S>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<S, E>>,
        E: Into<BoxError>,
        P: FnMut(&S) -> bool,
    {
        let start = Instant::now();
        let deadline = later(start, self.timeout);
        let mut attempts = 0u32;
        let mut phase = Phase::Checking;

        loop {
            phase = match phase {
                Phase::Checking => {
                    attempts += 1;
                    tokio::select! {
                        biased;
                        cause = ctx.done() => Phase::Cancelled(cause),
                        fetched = fetch() => match fetched {
                            Ok(state) if predicate(&state) => Phase::Satisfied(state),
                            Ok(_) => Phase::Sleeping,
                            Err(e) => Phase::Failed(e.into()),
                        },
                        _ = sleep_until(deadline) => Phase::TimedOut,
                    }
                }
                Phase::Sleeping => {
                    trace!(what = %self.what, attempts, "Condition not yet met");
                    let wake = later(Instant::now(), self.interval).min(deadline);
                    tokio::select! {
                        biased;
                        cause = ctx.done() => Phase::Cancelled(cause),
                        _ = sleep_until(wake) => {
                            if Instant::now() >= deadline {
                                Phase::TimedOut
                            } else {
                                Phase::Checking
                            }
                        }
                    }
                }
                Phase::Satisfied(state) => {
                    debug!(what = %self.what, attempts, elapsed = ?start.elapsed(), "Condition met");
                    return Ok(state);
                }
                Phase::Failed(source) => {
                    debug!(what = %self.what, attempts, error = %source, "Condition check failed");
                    return Err(CrdError::WaitFailed {
                        what: self.what.clone(),
                        source,
                    });
                }
                Phase::TimedOut => {
                    debug!(what = %self.what, attempts, "Condition timed out");
                    return Err(CrdError::WaitTimeout {
                        what: self.what.clone(),
                        timeout: self.timeout,
                    });
                }
                Phase::Cancelled(cause) => {
                    debug!(what = %self.what, attempts, %cause, "Condition wait cancelled");
                    return Err(CrdError::WaitCancelled {
                        what: self.what.clone(),
                        cause,
                    });
                }
            };
        }
    }
}

/// Furthest a wait can be scheduled ahead of now
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `at + after`, capped so huge durations never overflow the clock
fn later(at: Instant, after: Duration) -> Instant {
    at.checked_add(after.min(FAR_FUTURE)).unwrap_or(at)
}
