//! Superuser access policy.
//!
//! Every info-disclosure or mutating operation on a single process asks the
//! policy first. The decision depends only on the target's owner and the
//! override carried by [`AccessPolicyConfig`].

use crate::config::{AccessPolicyConfig, PolicyConfig};
use serde::Serialize;

/// The kind of operation being gated. Selects the denial wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyAction {
    /// Reading a process's attributes.
    Inspect,
    /// Signalling a process to exit.
    Terminate,
}

/// Outcome of a policy check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: String,
}

impl AccessDecision {
    fn allow(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }
}

/// Access policy for superuser-owned processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPolicy {
    config: AccessPolicyConfig,
}

impl AccessPolicy {
    pub fn new(config: AccessPolicyConfig) -> Self {
        Self { config }
    }

    /// Whether the superuser override is in effect.
    pub fn is_root_access_allowed(&self) -> bool {
        self.config.allow_root_access
    }

    /// Decide whether `action` may be applied to a process owned by `target_owner`.
    ///
    /// Denied iff the owner is the superuser and the override is not set.
    pub fn decide(&self, target_owner: &str, action: PolicyAction) -> AccessDecision {
        if target_owner != PolicyConfig::SUPERUSER_NAME {
            return AccessDecision::allow("target is not owned by the superuser");
        }
        if self.is_root_access_allowed() {
            return AccessDecision::allow(format!(
                "superuser override enabled via {}={}",
                PolicyConfig::ALLOW_ROOT_ENV,
                PolicyConfig::ALLOW_ROOT_VALUE
            ));
        }
        AccessDecision::deny(denial_message(action))
    }
}

fn denial_message(action: PolicyAction) -> String {
    let subject = match action {
        PolicyAction::Inspect => "Access to root processes",
        PolicyAction::Terminate => "Terminating root processes",
    };
    format!(
        "{} is not allowed. Set {}={} to override.",
        subject,
        PolicyConfig::ALLOW_ROOT_ENV,
        PolicyConfig::ALLOW_ROOT_VALUE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(allow_root: bool) -> AccessPolicy {
        AccessPolicy::new(AccessPolicyConfig::new(allow_root))
    }

    #[test]
    fn test_root_denied_without_override() {
        let decision = policy(false).decide("root", PolicyAction::Inspect);
        assert!(!decision.allowed);
        assert_eq!(
            decision.reason,
            "Access to root processes is not allowed. Set ALLOW_ROOT=Y to override."
        );
    }

    #[test]
    fn test_terminate_denial_wording() {
        let decision = policy(false).decide("root", PolicyAction::Terminate);
        assert!(!decision.allowed);
        assert_eq!(
            decision.reason,
            "Terminating root processes is not allowed. Set ALLOW_ROOT=Y to override."
        );
    }

    #[test]
    fn test_root_allowed_with_override() {
        let decision = policy(true).decide("root", PolicyAction::Terminate);
        assert!(decision.allowed);
        assert!(policy(true).is_root_access_allowed());
    }

    #[test]
    fn test_owner_match_is_exact() {
        // Only the exact superuser name is gated.
        for owner in ["Root", "root ", "rooted", "alice", ""] {
            assert!(policy(false).decide(owner, PolicyAction::Inspect).allowed, "{owner:?}");
        }
    }
}
