// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Policy rules evaluated before a request is approved.
//!
//! The rule engine is pluggable: the lifecycle manager evaluates whatever
//! [`RuleEngine`] it was constructed with before performing any side effect.
//! A violation denies the request and names the violated rule; it is never a
//! crash.

use std::time::Duration;

use crate::error::PolicyError;
use crate::types::PrivilegeRequest;

// =============================================================================
// RuleEngine Trait
// =============================================================================

/// Policy checks applied to privilege requests.
pub trait RuleEngine: Send + Sync {
    /// Evaluates a request against the configured rules.
    ///
    /// # Errors
    ///
    /// Returns the first [`PolicyError`] violated, naming the rule.
    fn evaluate(&self, request: &PrivilegeRequest) -> Result<(), PolicyError>;
}

// =============================================================================
// StandardRuleEngine
// =============================================================================

/// The default rule set: duration bounds and a required reason.
#[derive(Debug, Clone)]
pub struct StandardRuleEngine {
    /// Ceiling on requested durations.
    max_duration: Duration,
    /// Floor on requested durations.
    min_duration: Duration,
}

impl StandardRuleEngine {
    /// Creates a rule engine with explicit duration bounds.
    pub fn new(min_duration: Duration, max_duration: Duration) -> Self {
        Self {
            max_duration,
            min_duration,
        }
    }

    /// Returns the configured maximum duration.
    pub fn max_duration(&self) -> Duration {
        self.max_duration
    }

    /// Returns the configured minimum duration.
    pub fn min_duration(&self) -> Duration {
        self.min_duration
    }
}

impl Default for StandardRuleEngine {
    /// Defaults: privileges last between 5 minutes and 24 hours.
    fn default() -> Self {
        Self {
            max_duration: Duration::from_secs(24 * 60 * 60),
            min_duration: Duration::from_secs(5 * 60),
        }
    }
}

impl RuleEngine for StandardRuleEngine {
    fn evaluate(&self, request: &PrivilegeRequest) -> Result<(), PolicyError> {
        if request.duration > self.max_duration {
            return Err(PolicyError::duration_too_long(
                request.duration,
                self.max_duration,
            ));
        }

        if request.duration < self.min_duration {
            return Err(PolicyError::duration_too_short(
                request.duration,
                self.min_duration,
            ));
        }

        if request.reason.trim().is_empty() {
            return Err(PolicyError::ReasonRequired);
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PrivilegeLevel;

    fn request_with(duration: Duration, reason: &str) -> PrivilegeRequest {
        PrivilegeRequest::new("u1", "mysql-1", PrivilegeLevel::Read, reason, duration)
    }

    #[test]
    fn test_accepts_request_within_bounds() {
        let engine = StandardRuleEngine::default();
        let request = request_with(Duration::from_secs(3600), "debugging prod incident");
        assert!(engine.evaluate(&request).is_ok());
    }

    #[test]
    fn test_rejects_duration_over_maximum() {
        let engine = StandardRuleEngine::default();
        let request = request_with(Duration::from_secs(25 * 60 * 60), "long task");

        let err = engine.evaluate(&request).unwrap_err();
        assert_eq!(err.rule(), "max_duration");
    }

    #[test]
    fn test_rejects_duration_under_minimum() {
        let engine = StandardRuleEngine::default();
        let request = request_with(Duration::from_secs(60), "quick peek");

        let err = engine.evaluate(&request).unwrap_err();
        assert_eq!(err.rule(), "min_duration");
    }

    #[test]
    fn test_rejects_missing_reason() {
        let engine = StandardRuleEngine::default();
        let request = request_with(Duration::from_secs(3600), "   ");

        let err = engine.evaluate(&request).unwrap_err();
        assert_eq!(err, PolicyError::ReasonRequired);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let engine = StandardRuleEngine::new(
            Duration::from_secs(300),
            Duration::from_secs(86_400),
        );

        assert!(engine.evaluate(&request_with(Duration::from_secs(300), "r")).is_ok());
        assert!(engine
            .evaluate(&request_with(Duration::from_secs(86_400), "r"))
            .is_ok());
    }
}
