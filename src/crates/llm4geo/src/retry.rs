//! Bounded retry state machine for corrective re-prompting.
//!
//! Each protocol stage walks `Attempt(n) -> Valid | Invalid -> Attempt(n + 1)`
//! until either the output is valid or the retry budget is spent. Retries are
//! immediate: failures here are bad output shapes, not transient faults, so
//! there is no backoff.

use serde::{Deserialize, Serialize};

/// Retry budget for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt. A policy of 2 makes at most 3 calls.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 2 }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Upper bound on model calls for the stage.
    pub fn total_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// State for the first attempt.
    pub fn start(&self) -> RetryState {
        RetryState::Attempt {
            number: 1,
            remaining: self.max_retries,
        }
    }
}

/// Position in the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Attempt `number` (1-based) is due; `remaining` retries follow it.
    Attempt { number: u32, remaining: u32 },

    /// Every attempt produced invalid output.
    Exhausted { attempts: u32 },
}

impl RetryState {
    /// Transition taken when the current attempt's output is invalid.
    pub fn after_invalid(self) -> RetryState {
        match self {
            RetryState::Attempt {
                number,
                remaining: 0,
            } => RetryState::Exhausted { attempts: number },
            RetryState::Attempt { number, remaining } => RetryState::Attempt {
                number: number + 1,
                remaining: remaining - 1,
            },
            exhausted @ RetryState::Exhausted { .. } => exhausted,
        }
    }

    /// Attempt number when an attempt is due.
    pub fn attempt(&self) -> Option<u32> {
        match self {
            RetryState::Attempt { number, .. } => Some(*number),
            RetryState::Exhausted { .. } => None,
        }
    }

    pub fn is_retry(&self) -> bool {
        matches!(self, RetryState::Attempt { number, .. } if *number > 1)
    }
}

/// Result of checking one attempt's output.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome<T, E> {
    Valid(T),
    Invalid(E),
}
