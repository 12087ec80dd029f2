//! Attempt accounting for retry-classified operations.

use noodles_core::Error;

/// Counts retries against an optional cap.
///
/// With no cap the budget never runs out, matching the historical behavior
/// where a retrying run blocks until the operator fixes the environment.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    max: Option<u32>,
    attempts: u32,
}

impl RetryBudget {
    /// Create a budget allowing `max` retries, or unlimited when `None`.
    pub fn new(max: Option<u32>) -> RetryBudget {
        RetryBudget { max, attempts: 0 }
    }

    /// Record one retry. Fails with [`Error::RetryExhausted`] once the cap
    /// is exceeded.
    pub fn spend(&mut self) -> Result<(), Error> {
        self.attempts += 1;
        match self.max {
            Some(max) if self.attempts > max => Err(Error::RetryExhausted {
                attempts: self.attempts,
            }),
            _ => Ok(()),
        }
    }
}
