//! Policy-gated single-process commands.

use crate::error::{ProcgateError, Result};
use crate::policy::{AccessPolicy, PolicyAction};
use crate::snapshot::{ProcessRecord, Snapshot};
use tracing::{debug, info};

/// Info retrieval and termination of one process.
///
/// Both commands look the process up fresh and consult the policy with its
/// current owner before acting.
pub struct CommandEngine<'a> {
    snapshot: &'a Snapshot,
    policy: &'a AccessPolicy,
}

impl<'a> CommandEngine<'a> {
    pub fn new(snapshot: &'a Snapshot, policy: &'a AccessPolicy) -> Self {
        Self { snapshot, policy }
    }

    /// The full record of `pid`, if the policy allows inspecting it.
    pub fn process_info(&self, pid: u32) -> Result<ProcessRecord> {
        self.authorized(pid, PolicyAction::Inspect)
    }

    /// Ask the OS to terminate `pid`, if the policy allows it.
    ///
    /// Returns once the signal is sent; the exit is not awaited.
    pub fn terminate(&self, pid: u32) -> Result<()> {
        let record = self.authorized(pid, PolicyAction::Terminate)?;
        self.snapshot.terminate(pid)?;
        info!("Terminated process {} ({}) owned by {}", pid, record.name, record.owner);
        Ok(())
    }

    fn authorized(&self, pid: u32, action: PolicyAction) -> Result<ProcessRecord> {
        let record = self.snapshot.get_process(pid)?;
        let decision = self.policy.decide(&record.owner, action);
        if !decision.allowed {
            info!("Denied {:?} on process {} owned by {}", action, pid, record.owner);
            return Err(ProcgateError::PolicyDenied {
                reason: decision.reason,
            });
        }
        debug!("Allowed {:?} on process {}: {}", action, pid, decision.reason);
        Ok(record)
    }
}
