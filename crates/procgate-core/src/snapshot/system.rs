//! Live OS process table.
//!
//! # Platform Behavior
//! - **Process table**: `sysinfo` on every platform, re-read on every call
//! - **Sockets**: procfs on Linux; other platforms report `Unsupported`
//! - **Termination**: `SIGTERM` via `kill(2)` on Unix, `sysinfo` elsewhere

use super::{ConnectionRecord, ProcessRecord, ProcessSource, ScanEntry, SkipReason};
use crate::error::{ProcgateError, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use sysinfo::{
    Pid, Process, ProcessRefreshKind, ProcessesToUpdate, System, ThreadKind, UpdateKind,
};
use tracing::{debug, info};

/// The running system's process and socket tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSource;

impl SystemSource {
    pub fn new() -> Self {
        Self
    }

    fn refresh_kind() -> ProcessRefreshKind {
        ProcessRefreshKind::new()
            .with_cpu()
            .with_memory()
            .with_disk_usage()
            .with_user(UpdateKind::Always)
            .with_cmd(UpdateKind::Always)
            .with_exe(UpdateKind::Always)
            .with_cwd(UpdateKind::Always)
            .with_root(UpdateKind::Always)
    }

    /// Read a fresh process table.
    fn load(processes: ProcessesToUpdate<'_>) -> System {
        let mut system = System::new();
        system.refresh_processes_specifics(processes, true, Self::refresh_kind());
        system
    }
}

impl ProcessSource for SystemSource {
    fn scan(&self) -> Vec<ScanEntry> {
        let system = Self::load(ProcessesToUpdate::All);
        let mut owners = OwnerCache::default();

        let mut processes: Vec<(&Pid, &Process)> = system
            .processes()
            .iter()
            // Linux lists userland threads alongside processes. Kernel
            // threads (kthreadd, kworker) are processes in their own right.
            .filter(|(_, process)| !is_userland_thread(process))
            .collect();
        processes.sort_by_key(|(pid, _)| pid.as_u32());

        processes
            .into_iter()
            .map(|(pid, process)| {
                let pid = pid.as_u32();
                owners
                    .owner_of(process)
                    .map(|owner| build_record(pid, process, owner))
                    .ok_or(SkipReason::OwnerUnavailable { pid })
            })
            .collect()
    }

    fn process(&self, pid: u32) -> Result<ProcessRecord> {
        let target = Pid::from_u32(pid);
        let system = Self::load(ProcessesToUpdate::Some(&[target]));
        let process = system
            .process(target)
            .ok_or(ProcgateError::NoSuchProcess { pid })?;

        let owner = OwnerCache::default()
            .owner_of(process)
            .ok_or_else(|| ProcgateError::AccessDenied {
                pid,
                message: "process owner is unavailable".into(),
            })?;
        Ok(build_record(pid, process, owner))
    }

    fn connections(&self, pid: u32) -> Result<Vec<ConnectionRecord>> {
        #[cfg(target_os = "linux")]
        {
            super::procfs::connections_for(pid)
        }

        #[cfg(not(target_os = "linux"))]
        {
            let _ = pid;
            Err(ProcgateError::Unsupported {
                operation: "Listing process connections".into(),
            })
        }
    }

    fn terminate(&self, pid: u32) -> Result<()> {
        #[cfg(unix)]
        {
            terminate_unix(pid)
        }

        #[cfg(not(unix))]
        {
            terminate_generic(pid)
        }
    }
}

fn is_userland_thread(process: &Process) -> bool {
    matches!(process.thread_kind(), Some(ThreadKind::Userland))
}

/// Send SIGTERM and return without waiting for the exit.
#[cfg(unix)]
fn terminate_unix(pid: u32) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid as NixPid;

    // kill(2) treats 0 and negative pids as process groups.
    let raw = match i32::try_from(pid) {
        Ok(raw) if raw > 0 => raw,
        _ => return Err(ProcgateError::NoSuchProcess { pid }),
    };

    debug!("Sending SIGTERM to process {}", pid);
    match kill(NixPid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => {
            info!("Sent SIGTERM to process {}", pid);
            Ok(())
        }
        Err(Errno::ESRCH) => Err(ProcgateError::NoSuchProcess { pid }),
        Err(Errno::EPERM) => Err(ProcgateError::AccessDenied {
            pid,
            message: Errno::EPERM.desc().to_string(),
        }),
        Err(e) => Err(ProcgateError::Other(format!(
            "Failed to signal process {}: {}",
            pid, e
        ))),
    }
}

#[cfg(not(unix))]
fn terminate_generic(pid: u32) -> Result<()> {
    let target = Pid::from_u32(pid);
    let system = SystemSource::load(ProcessesToUpdate::Some(&[target]));
    let process = system
        .process(target)
        .ok_or(ProcgateError::NoSuchProcess { pid })?;

    let sent = process
        .kill_with(sysinfo::Signal::Term)
        .unwrap_or_else(|| process.kill());
    if sent {
        info!("Requested termination of process {}", pid);
        Ok(())
    } else {
        Err(ProcgateError::AccessDenied {
            pid,
            message: "termination request was refused".into(),
        })
    }
}

/// Per-read cache of uid to account name lookups.
#[derive(Default)]
struct OwnerCache {
    names: HashMap<u32, String>,
}

impl OwnerCache {
    #[cfg(unix)]
    fn owner_of(&mut self, process: &Process) -> Option<String> {
        let uid: u32 = **process.user_id()?;
        Some(
            self.names
                .entry(uid)
                .or_insert_with(|| crate::identity::username_for_uid(uid))
                .clone(),
        )
    }

    #[cfg(not(unix))]
    fn owner_of(&mut self, process: &Process) -> Option<String> {
        let users = sysinfo::Users::new_with_refreshed_list();
        let uid = process.user_id()?;
        users.get_user_by_id(uid).map(|user| user.name().to_string())
    }
}

/// Build a record with the full attribute set of `process`.
fn build_record(pid: u32, process: &Process, owner: String) -> ProcessRecord {
    let name = process.name().to_string_lossy().into_owned();
    let command_line: Vec<String> = process
        .cmd()
        .iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let path_value = |path: Option<&std::path::Path>| -> Value {
        path.map(|p| Value::from(p.display().to_string()))
            .unwrap_or(Value::Null)
    };
    let disk = process.disk_usage();
    let (uids, gids) = credential_ids(process);

    ProcessRecord::new(pid, name, owner, command_line)
        .with_attribute("ppid", process.parent().map(|p| p.as_u32()))
        .with_attribute("exe", path_value(process.exe()))
        .with_attribute("cwd", path_value(process.cwd()))
        .with_attribute("root", path_value(process.root()))
        .with_attribute("status", process.status().to_string())
        .with_attribute("create_time", process.start_time())
        .with_attribute("run_time", process.run_time())
        .with_attribute("cpu_percent", f64::from(process.cpu_usage()))
        .with_attribute(
            "memory_info",
            json!({ "rss": process.memory(), "vms": process.virtual_memory() }),
        )
        .with_attribute(
            "io_counters",
            json!({
                "read_bytes": disk.total_read_bytes,
                "write_bytes": disk.total_written_bytes,
            }),
        )
        .with_attribute("session_id", process.session_id().map(|p| p.as_u32()))
        .with_attribute("uids", uids)
        .with_attribute("gids", gids)
}

/// Real and effective uid/gid pairs, `null` where unreadable.
#[cfg(unix)]
fn credential_ids(process: &Process) -> (Value, Value) {
    let uid = |id: Option<&sysinfo::Uid>| id.map(|id| **id);
    let gid = |id: Option<sysinfo::Gid>| id.map(|id| *id);
    (
        json!({
            "real": uid(process.user_id()),
            "effective": uid(process.effective_user_id()),
        }),
        json!({
            "real": gid(process.group_id()),
            "effective": gid(process.effective_group_id()),
        }),
    )
}

#[cfg(not(unix))]
fn credential_ids(_process: &Process) -> (Value, Value) {
    (Value::Null, Value::Null)
}
