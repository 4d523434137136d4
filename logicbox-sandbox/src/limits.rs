//! Resource limits configuration for sandboxed execution

use logicbox_logic::Budget;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Resource limits for one script invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    /// Wall-clock budget before the invocation fails with a timeout
    #[serde(with = "humantime_serde")]
    pub max_duration: Option<Duration>,

    /// Interpreter steps (expression evaluations and loop iterations)
    pub max_operations: u64,

    /// Nested lambda calls
    pub max_call_depth: usize,

    /// Elements in any single list, tuple, set or dict
    pub max_collection_len: usize,

    /// Characters in any single string
    pub max_string_len: usize,

    /// Steps allowed to each inference or solver call
    pub max_inference_steps: u64,

    /// Proof depth for backward chaining
    pub max_inference_depth: usize,

    /// Answers collected by one query
    pub max_answers: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_duration: Some(Duration::from_secs(5)),
            max_operations: 1_000_000,
            max_call_depth: 64,
            max_collection_len: 100_000,
            max_string_len: 1_000_000,
            max_inference_steps: 200_000,
            max_inference_depth: 64,
            max_answers: 1_000,
        }
    }
}

impl ResourceLimits {
    /// Create unlimited resource configuration (dangerous!)
    pub fn unlimited() -> Self {
        Self {
            max_duration: None,
            max_operations: u64::MAX,
            max_call_depth: 256,
            max_collection_len: usize::MAX,
            max_string_len: usize::MAX,
            max_inference_steps: u64::MAX,
            max_inference_depth: 1_024,
            max_answers: usize::MAX,
        }
    }

    /// Create strict limits for untrusted callers
    pub fn strict() -> Self {
        Self {
            max_duration: Some(Duration::from_secs(1)),
            max_operations: 100_000,
            max_call_depth: 32,
            max_collection_len: 10_000,
            max_string_len: 100_000,
            max_inference_steps: 20_000,
            max_inference_depth: 32,
            max_answers: 100,
        }
    }

    /// Create permissive limits for trusted callers
    pub fn permissive() -> Self {
        Self {
            max_duration: Some(Duration::from_secs(60)),
            max_operations: 50_000_000,
            max_call_depth: 256,
            max_collection_len: 5_000_000,
            max_string_len: 50_000_000,
            max_inference_steps: 10_000_000,
            max_inference_depth: 256,
            max_answers: 100_000,
        }
    }

    /// Effective duration for a caller-requested timeout, never above `max_duration`
    pub fn clamp_timeout(&self, requested: Option<Duration>) -> Option<Duration> {
        match (requested, self.max_duration) {
            (Some(requested), Some(max)) => Some(requested.min(max)),
            (Some(requested), None) => Some(requested),
            (None, max) => max,
        }
    }

    /// Fresh inference budget for one toolkit call
    pub fn inference_budget(&self, deadline: Option<Instant>) -> Budget {
        Budget::new(self.max_inference_steps)
            .with_deadline(deadline)
            .with_max_depth(self.max_inference_depth)
            .with_max_answers(self.max_answers)
    }
}
