//! Process snapshot accessor.
//!
//! Wraps the OS process and connection tables behind a uniform query surface.
//! Every read is a fresh point-in-time snapshot; nothing is cached between
//! calls, and any process may disappear between enumeration and a detail
//! fetch.
//!
//! # Sources
//!
//! - [`SystemSource`] - the live OS tables (sysinfo, procfs sockets, signals)
//! - [`StaticSource`] - a fixed in-memory table, for embedding and tests

mod fixed;
#[cfg(target_os = "linux")]
mod procfs;
mod system;
mod types;

pub use fixed::{ConnectionFault, StaticSource};
pub use system::SystemSource;
pub use types::{
    ConnectionRecord, ConnectionStatus, ProcessAttributes, ProcessRecord, SocketType,
};

use crate::error::Result;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Why an entry was left out of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The process exited while the table was being read.
    Vanished { pid: u32 },
    /// The process owner could not be determined.
    OwnerUnavailable { pid: u32 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Vanished { pid } => write!(f, "process {} vanished", pid),
            SkipReason::OwnerUnavailable { pid } => {
                write!(f, "owner of process {} is unavailable", pid)
            }
        }
    }
}

/// Result of one entry in a process table scan.
pub type ScanEntry = std::result::Result<ProcessRecord, SkipReason>;

/// Raw access to a process/connection table.
pub trait ProcessSource: Send + Sync {
    /// Enumerate the table. Entries that could not be resolved are reported
    /// as [`SkipReason`]s rather than errors.
    fn scan(&self) -> Vec<ScanEntry>;

    /// Look up one process. Fails with `NoSuchProcess` if it is gone.
    fn process(&self, pid: u32) -> Result<ProcessRecord>;

    /// Internet sockets owned by `pid`.
    ///
    /// Fails with `AccessDenied` if the caller may not inspect them, or
    /// `NoSuchProcess` if the process exited.
    fn connections(&self, pid: u32) -> Result<Vec<ConnectionRecord>>;

    /// Ask the OS to terminate `pid`. Does not wait for the exit.
    fn terminate(&self, pid: u32) -> Result<()>;
}

/// Query surface over a [`ProcessSource`].
#[derive(Clone)]
pub struct Snapshot {
    source: Arc<dyn ProcessSource>,
}

impl Snapshot {
    pub fn new(source: Arc<dyn ProcessSource>) -> Self {
        Self { source }
    }

    /// All resolvable processes, in table order. Skipped entries are dropped.
    pub fn list_processes(&self) -> Vec<ProcessRecord> {
        self.filter(|_| true)
    }

    /// Processes whose owner equals `owner` exactly.
    pub fn processes_owned_by(&self, owner: &str) -> Vec<ProcessRecord> {
        self.filter(|record| record.owner == owner)
    }

    /// Processes satisfying `predicate`, in table order.
    pub fn filter<F>(&self, predicate: F) -> Vec<ProcessRecord>
    where
        F: Fn(&ProcessRecord) -> bool,
    {
        self.source
            .scan()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(record) => Some(record),
                Err(reason) => {
                    trace!("Skipping table entry: {}", reason);
                    None
                }
            })
            .filter(|record| predicate(record))
            .collect()
    }

    pub fn get_process(&self, pid: u32) -> Result<ProcessRecord> {
        self.source.process(pid)
    }

    pub fn get_connections(&self, pid: u32) -> Result<Vec<ConnectionRecord>> {
        self.source.connections(pid)
    }

    pub fn terminate(&self, pid: u32) -> Result<()> {
        self.source.terminate(pid)
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Snapshot {
        let source = StaticSource::new()
            .with_process(ProcessRecord::new(1, "init", "root", vec!["/sbin/init".into()]))
            .with_vanished(2)
            .with_process(ProcessRecord::new(3, "bash", "alice", vec!["-bash".into()]))
            .with_process(ProcessRecord::new(4, "bash", "Alice", vec!["-bash".into()]));
        Snapshot::new(Arc::new(source))
    }

    #[test]
    fn test_list_skips_vanished_entries() {
        let pids: Vec<u32> = snapshot().list_processes().iter().map(|r| r.pid).collect();
        assert_eq!(pids, vec![1, 3, 4]);
    }

    #[test]
    fn test_owner_filter_is_case_sensitive() {
        let owned = snapshot().processes_owned_by("alice");
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].pid, 3);
    }

    #[test]
    fn test_missing_pid_is_no_such_process() {
        let err = snapshot().get_process(99).unwrap_err();
        assert_eq!(err.kind(), "NoSuchProcess");
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::Vanished { pid: 9 }.to_string(), "process 9 vanished");
    }
}
