//! Procgate Core - Headless library for owner-scoped process inspection and control.
//!
//! This crate lists, searches, inspects and terminates processes of a given
//! user, and resolves which process listens on a port. Access to processes
//! owned by the superuser is denied unless `ALLOW_ROOT=Y` was set when the
//! API was built. It can be used programmatically without any RPC layer.
//!
//! # Example
//!
//! ```rust,ignore
//! use procgate_core::ProcgateApi;
//!
//! let api = ProcgateApi::new();
//!
//! // Processes of the current user, as "pid: name" lines
//! println!("{}", api.list_processes(None).as_text().unwrap_or_default());
//!
//! // Who is listening on 8080/tcp?
//! let owner = api.get_process_by_port(8080, "tcp", None);
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod identity;
pub mod policy;
pub mod query;
pub mod snapshot;

mod api;

// Re-export commonly used types
pub use api::{ProcgateApiBuilder, ToolResponse};
pub use config::{AccessPolicyConfig, ServiceConfig};
pub use error::{ProcgateError, Result};
pub use identity::{FixedIdentity, Identity, IdentityResolver, OsIdentity};
pub use policy::{AccessDecision, AccessPolicy, PolicyAction};
pub use snapshot::{
    ConnectionRecord, ConnectionStatus, ProcessAttributes, ProcessRecord, ProcessSource,
    Snapshot, SocketType, StaticSource, SystemSource,
};

use std::sync::Arc;

/// Main API struct for procgate operations.
///
/// Each operation reads a fresh snapshot of the process table and never
/// fails towards the caller: expected conditions (missing process, policy
/// denial, invalid pattern, no listener) come back as a message in the
/// [`ToolResponse`].
///
/// `ProcgateApi` is `Send + Sync`; operations block on OS reads, so async
/// callers should run them on a blocking thread.
pub struct ProcgateApi {
    snapshot: Snapshot,
    policy: AccessPolicy,
    identity: Arc<dyn IdentityResolver>,
}

impl ProcgateApi {
    /// Create an API over the live system, reading `ALLOW_ROOT` now.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for ProcgateApi.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let api = ProcgateApi::builder()
    ///     .policy(AccessPolicyConfig::new(false))
    ///     .build();
    /// ```
    pub fn builder() -> ProcgateApiBuilder {
        ProcgateApiBuilder::new()
    }

    /// The access policy in effect.
    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// The process table this API reads.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Identity of the account the service runs as.
    pub fn current_identity(&self) -> Result<Identity> {
        self.identity.current_identity()
    }
}

impl Default for ProcgateApi {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProcgateApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcgateApi")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
