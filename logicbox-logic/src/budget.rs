//! Step, depth and deadline accounting for inference procedures

use crate::error::{LogicError, LogicResult};
use std::time::Instant;

/// How often (in steps) the wall clock is consulted
const DEADLINE_CHECK_INTERVAL: u64 = 256;

/// Bounds shared by every search in this crate
#[derive(Debug, Clone)]
pub struct Budget {
    max_steps: u64,
    used: u64,
    deadline: Option<Instant>,
    max_depth: usize,
    max_answers: usize,
}

impl Budget {
    /// Create a budget allowing `max_steps` inference steps
    pub fn new(max_steps: u64) -> Self {
        Self {
            max_steps,
            used: 0,
            deadline: None,
            max_depth: 64,
            max_answers: 1_000,
        }
    }

    /// Effectively unbounded budget (tests and trusted callers)
    pub fn unlimited() -> Self {
        Self {
            max_steps: u64::MAX,
            used: 0,
            deadline: None,
            max_depth: usize::MAX,
            max_answers: usize::MAX,
        }
    }

    /// Stop with [`LogicError::DeadlineExceeded`] once `deadline` passes
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Set the maximum proof depth for backward chaining
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the maximum number of answers a query collects
    pub fn with_max_answers(mut self, answers: usize) -> Self {
        self.max_answers = answers;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn max_answers(&self) -> usize {
        self.max_answers
    }

    /// Steps consumed so far
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Consume one step
    pub fn tick(&mut self) -> LogicResult<()> {
        if self.used >= self.max_steps {
            return Err(LogicError::StepBudgetExhausted(self.max_steps));
        }
        self.used += 1;
        if self.used % DEADLINE_CHECK_INTERVAL == 0 {
            self.check_deadline()?;
        }
        Ok(())
    }

    /// Fail if the deadline has already passed
    pub fn check_deadline(&self) -> LogicResult<()> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(LogicError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self::new(200_000)
    }
}
