// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Retry policy for failed replays.

use std::time::Duration;

/// How failed mutations and failed passes are retried.
///
/// The default never gives up on a mutation: it stays queued and its retry
/// counter keeps growing. With `max_retries` set, a mutation whose counter
/// reaches the limit is moved to the dead-letter table instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: Option<u32>,
    /// Delay before the first re-attempt of a failed pass.
    pub initial_delay: Duration,
    /// Ceiling for the doubling delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: None,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Whether a mutation that has failed `retries` times should be parked.
    pub fn is_exhausted(&self, retries: u32) -> bool {
        matches!(self.max_retries, Some(max) if retries >= max)
    }

    /// Delay before re-attempt number `attempt` (1-based): doubles each time,
    /// capped at `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
