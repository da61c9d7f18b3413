//! Owner-scoped process queries.
//!
//! All queries are scoped to one owner. Results follow snapshot iteration
//! order, which is not guaranteed to be stable across calls.

use crate::error::{ProcgateError, Result};
use crate::snapshot::{ProcessRecord, Snapshot, SocketType};
use regex::Regex;
use tracing::{debug, trace, warn};

/// Listing, pattern search and port resolution over a [`Snapshot`].
pub struct QueryEngine<'a> {
    snapshot: &'a Snapshot,
}

impl<'a> QueryEngine<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self { snapshot }
    }

    /// Every process owned by `owner`.
    pub fn list_processes(&self, owner: &str) -> Vec<ProcessRecord> {
        self.snapshot.processes_owned_by(owner)
    }

    /// Processes owned by `owner` whose name or joined command line matches
    /// `pattern`.
    ///
    /// The pattern is compiled before anything is enumerated, so an invalid
    /// pattern never touches the process table. A process whose name matches
    /// is not tested against its command line, so it is reported once.
    pub fn find_processes(&self, pattern: &str, owner: &str) -> Result<Vec<ProcessRecord>> {
        let regex = Regex::new(pattern).map_err(|e| ProcgateError::InvalidPattern {
            message: e.to_string(),
        })?;

        Ok(self
            .snapshot
            .processes_owned_by(owner)
            .into_iter()
            .filter(|record| {
                regex.is_match(&record.name) || regex.is_match(&record.joined_command_line())
            })
            .collect())
    }

    /// The first process owned by `owner` listening on `port` with the given
    /// socket type.
    ///
    /// Scanning stops at the first match. Processes whose sockets cannot be
    /// read are skipped; unexpected read failures are logged as warnings.
    pub fn find_by_port(
        &self,
        port: u16,
        socket_type: SocketType,
        owner: &str,
    ) -> Option<ProcessRecord> {
        self.snapshot
            .processes_owned_by(owner)
            .into_iter()
            .find(|record| match self.snapshot.get_connections(record.pid) {
                Ok(connections) => connections
                    .iter()
                    .any(|conn| conn.is_listening_on(port, socket_type)),
                Err(e) if e.is_skippable() => {
                    trace!("Skipping process {} during port scan: {}", record.pid, e);
                    false
                }
                Err(e) => {
                    warn!("Unreadable sockets for process {}: {}", record.pid, e);
                    false
                }
            })
            .inspect(|record| {
                debug!(
                    "Port {}/{} resolved to process {} ({})",
                    port, socket_type, record.pid, record.name
                );
            })
    }
}

/// Render records as newline-joined `pid: name` lines.
pub fn format_listing(records: &[ProcessRecord]) -> String {
    records
        .iter()
        .map(ProcessRecord::summary_line)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{ConnectionFault, ConnectionRecord, ConnectionStatus, StaticSource};
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;

    fn proc(pid: u32, name: &str, owner: &str, cmdline: &[&str]) -> ProcessRecord {
        ProcessRecord::new(
            pid,
            name,
            owner,
            cmdline.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn listener(pid: u32, port: u16, socket_type: SocketType) -> ConnectionRecord {
        ConnectionRecord {
            local_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            local_port: port,
            remote_addr: None,
            status: ConnectionStatus::Listen,
            socket_type,
            owning_pid: pid,
        }
    }

    fn base_source() -> StaticSource {
        StaticSource::new()
            .with_process(proc(1, "systemd", "root", &["/sbin/init"]))
            .with_process(proc(100, "python3", "alice", &["python3", "-m", "http.server", "8000"]))
            .with_process(proc(101, "bash", "alice", &["-bash"]))
            .with_process(proc(102, "node", "bob", &["node", "server.js"]))
            .with_process(proc(103, "server", "alice", &["/opt/server", "--port", "9000"]))
    }

    fn snapshot(source: StaticSource) -> Snapshot {
        Snapshot::new(Arc::new(source))
    }

    #[test]
    fn test_list_is_owner_scoped() {
        let snap = snapshot(base_source());
        let records = QueryEngine::new(&snap).list_processes("alice");
        let pids: Vec<u32> = records.iter().map(|r| r.pid).collect();
        assert_eq!(pids, vec![100, 101, 103]);
        assert!(records.iter().all(|r| r.owner == "alice"));
    }

    #[test]
    fn test_list_unknown_owner_is_empty() {
        let snap = snapshot(base_source());
        assert!(QueryEngine::new(&snap).list_processes("mallory").is_empty());
    }

    #[test]
    fn test_find_matches_name_or_cmdline() {
        let snap = snapshot(base_source());
        let engine = QueryEngine::new(&snap);

        // Matches the command line only.
        let found = engine.find_processes(r"http\.server", "alice").unwrap();
        assert_eq!(found.iter().map(|r| r.pid).collect::<Vec<_>>(), vec![100]);

        // Matches the name only.
        let found = engine.find_processes("^bash$", "alice").unwrap();
        assert_eq!(found.iter().map(|r| r.pid).collect::<Vec<_>>(), vec![101]);
    }

    #[test]
    fn test_find_reports_each_pid_once() {
        let snap = snapshot(base_source());
        // "server" matches both the name and the command line of pid 103.
        let found = QueryEngine::new(&snap).find_processes("server", "alice").unwrap();
        let pids: Vec<u32> = found.iter().map(|r| r.pid).collect();
        assert_eq!(pids, vec![100, 103]);
    }

    #[test]
    fn test_find_respects_owner() {
        let snap = snapshot(base_source());
        let found = QueryEngine::new(&snap).find_processes("node", "alice").unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_find_invalid_pattern() {
        let snap = snapshot(base_source());
        let err = QueryEngine::new(&snap).find_processes("(", "alice").unwrap_err();
        match err {
            ProcgateError::InvalidPattern { message } => assert!(!message.is_empty()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_find_by_port_matches_listener() {
        let source = base_source()
            .with_connections(101, vec![])
            .with_connections(103, vec![listener(103, 9000, SocketType::Stream)]);
        let snap = snapshot(source);
        let found = QueryEngine::new(&snap)
            .find_by_port(9000, SocketType::Stream, "alice")
            .unwrap();
        assert_eq!(found.pid, 103);
    }

    #[test]
    fn test_find_by_port_checks_socket_type() {
        let source = base_source()
            .with_connections(103, vec![listener(103, 9000, SocketType::Stream)]);
        let snap = snapshot(source);
        assert!(QueryEngine::new(&snap)
            .find_by_port(9000, SocketType::Dgram, "alice")
            .is_none());
    }

    #[test]
    fn test_find_by_port_ignores_non_listening() {
        let mut conn = listener(103, 9000, SocketType::Stream);
        conn.status = ConnectionStatus::Established;
        let snap = snapshot(base_source().with_connections(103, vec![conn]));
        assert!(QueryEngine::new(&snap)
            .find_by_port(9000, SocketType::Stream, "alice")
            .is_none());
    }

    #[test]
    fn test_find_by_port_skips_unreadable_processes() {
        let source = base_source()
            .with_connection_fault(100, ConnectionFault::AccessDenied)
            .with_connection_fault(101, ConnectionFault::Other("boom".into()))
            .with_process(proc(104, "worker", "alice", &["worker"]))
            .with_connection_fault(104, ConnectionFault::Vanished)
            .with_process(proc(105, "server", "alice", &["/opt/server", "--port", "9000"]))
            .with_connections(105, vec![listener(105, 9000, SocketType::Stream)]);
        let snap = snapshot(source);
        let found = QueryEngine::new(&snap)
            .find_by_port(9000, SocketType::Stream, "alice")
            .unwrap();
        assert_eq!(found.pid, 105);
    }

    #[test]
    fn test_find_by_port_is_first_match_wins() {
        let source = base_source()
            .with_connections(100, vec![listener(100, 9000, SocketType::Stream)])
            .with_connections(103, vec![listener(103, 9000, SocketType::Stream)]);
        let snap = snapshot(source);
        let found = QueryEngine::new(&snap)
            .find_by_port(9000, SocketType::Stream, "alice")
            .unwrap();
        assert_eq!(found.pid, 100);
    }

    #[test]
    fn test_find_by_port_ignores_other_owners() {
        let source = base_source()
            .with_connections(102, vec![listener(102, 3000, SocketType::Stream)]);
        let snap = snapshot(source);
        assert!(QueryEngine::new(&snap)
            .find_by_port(3000, SocketType::Stream, "alice")
            .is_none());
    }

    #[test]
    fn test_format_listing() {
        let records = vec![proc(1, "init", "root", &[]), proc(42, "bash", "root", &[])];
        assert_eq!(format_listing(&records), "1: init\n42: bash");
        assert_eq!(format_listing(&[]), "");
    }
}
