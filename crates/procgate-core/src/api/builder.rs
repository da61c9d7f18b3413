//! Builder for configuring ProcgateApi.

use std::sync::Arc;

use crate::config::AccessPolicyConfig;
use crate::identity::{IdentityResolver, OsIdentity};
use crate::policy::AccessPolicy;
use crate::snapshot::{ProcessSource, Snapshot, SystemSource};
use crate::ProcgateApi;

/// Builder for configuring ProcgateApi.
///
/// Every component defaults to the live system: the OS process table, the
/// identity of the running process, and the `ALLOW_ROOT` environment
/// variable read at build time.
///
/// # Example
///
/// ```rust,ignore
/// use procgate_core::{AccessPolicyConfig, ProcgateApi};
///
/// let api = ProcgateApi::builder()
///     .policy(AccessPolicyConfig::new(true))
///     .build();
/// ```
#[derive(Default)]
pub struct ProcgateApiBuilder {
    source: Option<Arc<dyn ProcessSource>>,
    identity: Option<Arc<dyn IdentityResolver>>,
    policy: Option<AccessPolicyConfig>,
}

impl ProcgateApiBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific process table instead of the live OS one.
    pub fn source(mut self, source: Arc<dyn ProcessSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Use a specific identity resolver for the default owner scope.
    pub fn identity(mut self, identity: Arc<dyn IdentityResolver>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Use an explicit policy configuration instead of reading `ALLOW_ROOT`.
    pub fn policy(mut self, config: AccessPolicyConfig) -> Self {
        self.policy = Some(config);
        self
    }

    /// Build the ProcgateApi instance.
    pub fn build(self) -> ProcgateApi {
        let source = self
            .source
            .unwrap_or_else(|| Arc::new(SystemSource::new()));
        let identity = self.identity.unwrap_or_else(|| Arc::new(OsIdentity));
        let config = self.policy.unwrap_or_else(AccessPolicyConfig::from_env);

        ProcgateApi {
            snapshot: Snapshot::new(source),
            policy: AccessPolicy::new(config),
            identity,
        }
    }
}
