//! In-memory process table.

use super::{ConnectionRecord, ProcessRecord, ProcessSource, ScanEntry, SkipReason};
use crate::error::{ProcgateError, Result};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum Entry {
    Live(ProcessRecord),
    /// Listed by the table, gone by the time it is read.
    Vanished(u32),
}

/// Failure to return from a connection query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionFault {
    AccessDenied,
    Vanished,
    Other(String),
}

/// A fixed process table.
///
/// Scans return entries in insertion order. Terminations are recorded
/// instead of delivered, and can be read back with [`StaticSource::terminated`].
#[derive(Debug, Default)]
pub struct StaticSource {
    entries: Vec<Entry>,
    connections: HashMap<u32, std::result::Result<Vec<ConnectionRecord>, ConnectionFault>>,
    terminated: Mutex<Vec<u32>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_process(mut self, record: ProcessRecord) -> Self {
        self.entries.push(Entry::Live(record));
        self
    }

    /// Add a pid that disappears between enumeration and lookup.
    pub fn with_vanished(mut self, pid: u32) -> Self {
        self.entries.push(Entry::Vanished(pid));
        self
    }

    pub fn with_connections(mut self, pid: u32, connections: Vec<ConnectionRecord>) -> Self {
        self.connections.insert(pid, Ok(connections));
        self
    }

    pub fn with_connection_fault(mut self, pid: u32, fault: ConnectionFault) -> Self {
        self.connections.insert(pid, Err(fault));
        self
    }

    /// Pids passed to [`ProcessSource::terminate`], in call order.
    pub fn terminated(&self) -> Vec<u32> {
        self.terminated
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn live(&self, pid: u32) -> Option<&ProcessRecord> {
        self.entries.iter().find_map(|entry| match entry {
            Entry::Live(record) if record.pid == pid => Some(record),
            _ => None,
        })
    }
}

impl ProcessSource for StaticSource {
    fn scan(&self) -> Vec<ScanEntry> {
        self.entries
            .iter()
            .map(|entry| match entry {
                Entry::Live(record) => Ok(record.clone()),
                Entry::Vanished(pid) => Err(SkipReason::Vanished { pid: *pid }),
            })
            .collect()
    }

    fn process(&self, pid: u32) -> Result<ProcessRecord> {
        self.live(pid)
            .cloned()
            .ok_or(ProcgateError::NoSuchProcess { pid })
    }

    fn connections(&self, pid: u32) -> Result<Vec<ConnectionRecord>> {
        match self.connections.get(&pid) {
            Some(Ok(connections)) => Ok(connections.clone()),
            Some(Err(ConnectionFault::AccessDenied)) => Err(ProcgateError::AccessDenied {
                pid,
                message: "permission denied reading sockets".into(),
            }),
            Some(Err(ConnectionFault::Vanished)) => Err(ProcgateError::NoSuchProcess { pid }),
            Some(Err(ConnectionFault::Other(message))) => {
                Err(ProcgateError::Other(message.clone()))
            }
            None if self.live(pid).is_some() => Ok(Vec::new()),
            None => Err(ProcgateError::NoSuchProcess { pid }),
        }
    }

    fn terminate(&self, pid: u32) -> Result<()> {
        if self.live(pid).is_none() {
            return Err(ProcgateError::NoSuchProcess { pid });
        }
        self.terminated
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(pid);
        Ok(())
    }
}
