// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Cancellation and deadlines for protocol calls.
//!
//! Every RPC, poll and fetch retry takes a [`Context`]. A context is done when
//! its token is cancelled (by the caller or a parent context) or when its
//! deadline passes. Backoff sleeps wake up early when the context is done.

use crate::error::HiveError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Deadline used for cleanup calls when the caller's context is already done.
pub const CLEANUP_TIMEOUT: Duration = Duration::from_secs(1);

/// A cancellable, optionally deadline-bearing scope for protocol calls.
#[derive(Debug, Clone)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// A context that is never done unless cancelled explicitly.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Wraps an existing token, e.g. one owned by an ADBC statement.
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// A child context: cancelled with its parent, or on its own via [`Context::cancel`].
    pub fn with_cancel(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// A child context that is also done after `timeout`. Never extends the parent deadline.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
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

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Why the context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<HiveError> {
        if self.token.is_cancelled() {
            return Some(HiveError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(HiveError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Returns `Err` if the context is done.
    pub fn check(&self) -> Result<(), HiveError> {
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Resolves once the context is done.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Sleeps for `duration`, returning early if the context becomes done.
    pub async fn sleep(&self, duration: Duration) {
        tokio::select! {
            _ = self.done() => {}
            _ = tokio::time::sleep(duration) => {}
        }
    }

    /// The context cleanup should run under: this one while it is live,
    /// otherwise a fresh background context bounded by [`CLEANUP_TIMEOUT`].
    pub fn cleanup(&self) -> Context {
        if self.is_done() {
            Context::background().with_timeout(CLEANUP_TIMEOUT)
        } else {
            self.clone()
        }
    }

    /// Runs `cleanup` so that it still gets a chance when this context is done.
    pub async fn with_fallback<F, Fut, T>(&self, cleanup: F) -> T
    where
        F: FnOnce(Context) -> Fut,
        Fut: Future<Output = T>,
    {
        cleanup(self.cleanup()).await
    }
}
