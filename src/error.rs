//! Failure taxonomy of the evaluation engine.
//!
//! Every variant is fatal for the call that raised it: evaluators never
//! catch, retry, or substitute a default after one of these.

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EvalError {
    /// A stored tag or handle does not describe a leaf, stem or fork.
    #[error("invariant violation: {detail}")]
    InvariantViolation { detail: String },
    /// Private storage of an evaluator cannot grow any further.
    #[error("{resource} exhausted: cannot grow to {requested} entries")]
    ResourceExhausted {
        resource: &'static str,
        requested: usize,
    },
    /// The configured rewrite budget ran out before a normal form was reached.
    #[error("step limit of {limit} rewrites exceeded")]
    StepLimitExceeded { limit: u64 },
}

impl EvalError {
    pub fn invariant(detail: impl Into<String>) -> Self {
        EvalError::InvariantViolation {
            detail: detail.into(),
        }
    }
}

/// Rewrite counter with an optional budget, shared by every strategy.
#[derive(Clone, Copy, Debug, Default)]
pub struct StepBudget {
    pub steps: u64,
    pub limit: Option<u64>,
}

impl StepBudget {
    pub fn new(limit: Option<u64>) -> Self {
        Self { steps: 0, limit }
    }

    /// Account for one rewrite.
    #[inline]
    pub fn tick(&mut self) -> Result<(), EvalError> {
        if let Some(limit) = self.limit {
            if self.steps >= limit {
                return Err(EvalError::StepLimitExceeded { limit });
            }
        }
        self.steps += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlimited_budget_counts() {
        let mut budget = StepBudget::new(None);
        for _ in 0..1000 {
            budget.tick().unwrap();
        }
        assert_eq!(budget.steps, 1000);
    }

    #[test]
    fn test_budget_stops_at_limit() {
        let mut budget = StepBudget::new(Some(3));
        assert!(budget.tick().is_ok());
        assert!(budget.tick().is_ok());
        assert!(budget.tick().is_ok());
        assert_eq!(
            budget.tick(),
            Err(EvalError::StepLimitExceeded { limit: 3 })
        );
        assert_eq!(budget.steps, 3);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            EvalError::invariant("tag 7 at index 3").to_string(),
            "invariant violation: tag 7 at index 3"
        );
        assert_eq!(
            EvalError::StepLimitExceeded { limit: 10 }.to_string(),
            "step limit of 10 rewrites exceeded"
        );
        assert_eq!(
            EvalError::ResourceExhausted {
                resource: "arena",
                requested: 8
            }
            .to_string(),
            "arena exhausted: cannot grow to 8 entries"
        );
    }
}
