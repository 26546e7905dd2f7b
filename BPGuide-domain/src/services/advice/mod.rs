//! AI advice pipeline
//!
//! A request flows through [`AdviceGenerator`]: cache lookup, user context,
//! a rate-limited inference call wrapped in the retry policy, then either a
//! cached answer or one of the fixed fallback texts.

pub mod cache;
pub mod generator;
pub mod inference;
pub mod limiter;
pub mod prompt;
pub mod retry;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cache::AdviceCache;
pub use generator::AdviceGenerator;
pub use inference::{InferenceClient, InferenceError, OpenAiClient};
pub use limiter::{RateLimiter, RatePermit};
pub use retry::{call_with_retry, InferenceOutcome, RetryPolicy};

/// Returned when every attempt was rate limited
pub const FALLBACK_RATE_LIMITED: &str =
    "AI analysis temporarily unavailable due to rate limiting. Please try again later.";

/// Returned for any other inference failure
pub const FALLBACK_UNAVAILABLE: &str =
    "AI analysis is temporarily unavailable. Please try again later.";

/// Cache key derived from a user and the reading values
///
/// No time component: identical readings share advice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    pub user_id: i64,
    pub systolic: u16,
    pub diastolic: u16,
}

impl Fingerprint {
    pub fn new(user_id: i64, systolic: u16, diastolic: u16) -> Self {
        Self {
            user_id,
            systolic,
            diastolic,
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.user_id, self.systolic, self.diastolic)
    }
}

/// Terminal failures of advice generation
///
/// Inference failures never appear here; they become fallback text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdviceError {
    /// The user has no profile to build the prompt from
    #[error("User {0} not found")]
    UserNotFound(i64),

    /// The user profile could not be loaded
    #[error("Storage error: {0}")]
    Storage(String),
}
