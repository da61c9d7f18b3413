//! Process and connection records produced by a snapshot read.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Full attribute set of a process, keyed by attribute name.
pub type ProcessAttributes = BTreeMap<String, Value>;

/// One process as seen by a single snapshot read.
///
/// Records are never cached: a pid is only unique within the snapshot that
/// produced it, since the OS reuses pids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessRecord {
    pub pid: u32,
    pub name: String,
    /// Account name of the process owner at snapshot time.
    pub owner: String,
    pub command_line: Vec<String>,
    pub attributes: ProcessAttributes,
}

impl ProcessRecord {
    /// Create a record whose attribute map holds the identifying fields.
    pub fn new(
        pid: u32,
        name: impl Into<String>,
        owner: impl Into<String>,
        command_line: Vec<String>,
    ) -> Self {
        let name = name.into();
        let owner = owner.into();
        let mut attributes = ProcessAttributes::new();
        attributes.insert("pid".into(), Value::from(pid));
        attributes.insert("name".into(), Value::from(name.clone()));
        attributes.insert("username".into(), Value::from(owner.clone()));
        attributes.insert("cmdline".into(), Value::from(command_line.clone()));

        Self {
            pid,
            name,
            owner,
            command_line,
            attributes,
        }
    }

    /// Add or replace one attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Command line joined with single spaces.
    pub fn joined_command_line(&self) -> String {
        self.command_line.join(crate::config::ServiceConfig::CMDLINE_SEPARATOR)
    }

    /// The `pid: name` line used by listing operations.
    pub fn summary_line(&self) -> String {
        format!("{}: {}", self.pid, self.name)
    }
}

/// Socket kind of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SocketType {
    Stream,
    Dgram,
}

impl SocketType {
    /// Socket type expected for a protocol name.
    ///
    /// `tcp` in any letter case selects stream sockets; every other name
    /// selects datagram sockets.
    pub fn for_protocol(protocol: &str) -> Self {
        if protocol.to_lowercase() == crate::config::ServiceConfig::STREAM_PROTOCOL {
            SocketType::Stream
        } else {
            SocketType::Dgram
        }
    }
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketType::Stream => write!(f, "STREAM"),
            SocketType::Dgram => write!(f, "DGRAM"),
        }
    }
}

/// Connection state, named after the kernel TCP states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Established,
    SynSent,
    SynRecv,
    FinWait1,
    FinWait2,
    TimeWait,
    Close,
    CloseWait,
    LastAck,
    Listen,
    Closing,
    /// Datagram sockets with a fixed peer, and unknown states.
    None,
}

impl ConnectionStatus {
    /// Map the hex state code used by the kernel's TCP tables.
    pub fn from_tcp_state(code: u8) -> Self {
        match code {
            0x01 => ConnectionStatus::Established,
            0x02 => ConnectionStatus::SynSent,
            0x03 => ConnectionStatus::SynRecv,
            0x04 => ConnectionStatus::FinWait1,
            0x05 => ConnectionStatus::FinWait2,
            0x06 => ConnectionStatus::TimeWait,
            0x07 => ConnectionStatus::Close,
            0x08 => ConnectionStatus::CloseWait,
            0x09 => ConnectionStatus::LastAck,
            0x0A => ConnectionStatus::Listen,
            0x0B => ConnectionStatus::Closing,
            _ => ConnectionStatus::None,
        }
    }
}

/// One socket owned by a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionRecord {
    pub local_addr: IpAddr,
    pub local_port: u16,
    pub remote_addr: Option<SocketAddr>,
    pub status: ConnectionStatus,
    pub socket_type: SocketType,
    pub owning_pid: u32,
}

impl ConnectionRecord {
    /// Whether this socket is listening on `port` with the given socket type.
    pub fn is_listening_on(&self, port: u16, socket_type: SocketType) -> bool {
        self.local_port == port
            && self.status == ConnectionStatus::Listen
            && self.socket_type == socket_type
    }
}
