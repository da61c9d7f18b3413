//! Linux socket tables from procfs.
//!
//! `/proc/net/{tcp,tcp6,udp,udp6}` list every internet socket keyed by inode.
//! A process owns a socket when one of its `/proc/<pid>/fd/*` links reads
//! `socket:[<inode>]`.

use super::{ConnectionRecord, ConnectionStatus, SocketType};
use crate::config::ProcfsConfig;
use crate::error::{ProcgateError, Result};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use tracing::{debug, trace};

/// One row of a kernel socket table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SocketEntry {
    pub local: SocketAddr,
    pub remote: SocketAddr,
    pub status: ConnectionStatus,
    pub socket_type: SocketType,
}

/// Internet sockets owned by `pid`.
pub(crate) fn connections_for(pid: u32) -> Result<Vec<ConnectionRecord>> {
    let inodes = socket_inodes(pid)?;
    if inodes.is_empty() {
        return Ok(Vec::new());
    }

    let table = read_socket_table()?;
    Ok(inodes
        .into_iter()
        .filter_map(|inode| table.get(&inode))
        .map(|entry| ConnectionRecord {
            local_addr: entry.local.ip(),
            local_port: entry.local.port(),
            remote_addr: (entry.remote.port() != 0).then_some(entry.remote),
            status: entry.status,
            socket_type: entry.socket_type,
            owning_pid: pid,
        })
        .collect())
}

/// Socket inodes referenced by the open descriptors of `pid`.
fn socket_inodes(pid: u32) -> Result<Vec<u64>> {
    let fd_dir = PathBuf::from(ProcfsConfig::PROC_ROOT)
        .join(pid.to_string())
        .join("fd");

    let entries = fs::read_dir(&fd_dir).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ProcgateError::NoSuchProcess { pid },
        ErrorKind::PermissionDenied => ProcgateError::AccessDenied {
            pid,
            message: e.to_string(),
        },
        _ => ProcgateError::io_with_path(e, &fd_dir),
    })?;

    // Descriptors can close while we iterate; unreadable links are skipped.
    Ok(entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| fs::read_link(entry.path()).ok())
        .filter_map(|target| parse_socket_link(&target.to_string_lossy()))
        .collect())
}

/// Parse a descriptor link target of the form `socket:[12345]`.
fn parse_socket_link(target: &str) -> Option<u64> {
    target
        .strip_prefix("socket:[")?
        .strip_suffix(']')?
        .parse()
        .ok()
}

/// Read all four internet socket tables into an inode-keyed map.
fn read_socket_table() -> Result<HashMap<u64, SocketEntry>> {
    let tables = [
        (ProcfsConfig::TCP4_TABLE, SocketType::Stream),
        (ProcfsConfig::TCP6_TABLE, SocketType::Stream),
        (ProcfsConfig::UDP4_TABLE, SocketType::Dgram),
        (ProcfsConfig::UDP6_TABLE, SocketType::Dgram),
    ];

    let mut sockets = HashMap::new();
    for (path, socket_type) in tables {
        match fs::read_to_string(path) {
            Ok(content) => sockets.extend(parse_table(&content, socket_type)),
            // Kernels built without IPv6 have no tcp6/udp6 tables.
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Socket table {} not present", path);
            }
            Err(e) => return Err(ProcgateError::io_with_path(e, path)),
        }
    }
    Ok(sockets)
}

/// Parse the body of a `/proc/net/{tcp,udp}[6]` table.
fn parse_table(content: &str, socket_type: SocketType) -> Vec<(u64, SocketEntry)> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let entry = parse_row(line, socket_type);
            if entry.is_none() {
                trace!("Unparseable socket table row: {}", line);
            }
            entry
        })
        .filter(|(inode, _)| *inode != 0)
        .collect()
}

fn parse_row(line: &str, socket_type: SocketType) -> Option<(u64, SocketEntry)> {
    // sl local_address rem_address st tx:rx tr:when retrnsmt uid timeout inode ...
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 10 {
        return None;
    }

    let local = parse_endpoint(fields[1])?;
    let remote = parse_endpoint(fields[2])?;
    let state = u8::from_str_radix(fields[3], 16).ok()?;
    let inode: u64 = fields[9].parse().ok()?;

    let status = match socket_type {
        SocketType::Stream => ConnectionStatus::from_tcp_state(state),
        // A bound datagram socket without a fixed peer is the datagram
        // equivalent of a listener.
        SocketType::Dgram if remote.port() == 0 => ConnectionStatus::Listen,
        SocketType::Dgram => ConnectionStatus::None,
    };

    Some((
        inode,
        SocketEntry {
            local,
            remote,
            status,
            socket_type,
        },
    ))
}

/// Parse `ADDR:PORT` where both parts are hex and the address is stored as
/// native-endian 32-bit words of the network-order bytes.
fn parse_endpoint(field: &str) -> Option<SocketAddr> {
    let (addr_hex, port_hex) = field.split_once(':')?;
    let port = u16::from_str_radix(port_hex, 16).ok()?;

    let ip = match addr_hex.len() {
        8 => IpAddr::V4(Ipv4Addr::from(parse_word(addr_hex)?)),
        32 => {
            let mut octets = [0u8; 16];
            for (i, chunk) in octets.chunks_exact_mut(4).enumerate() {
                chunk.copy_from_slice(&parse_word(&addr_hex[i * 8..i * 8 + 8])?);
            }
            IpAddr::V6(Ipv6Addr::from(octets))
        }
        _ => return None,
    };

    Some(SocketAddr::new(ip, port))
}

fn parse_word(hex: &str) -> Option<[u8; 4]> {
    u32::from_str_radix(hex, 16).ok().map(u32::to_ne_bytes)
}
