//! Centralized configuration for procgate.
//!
//! Constants for the access policy and the process scanner, plus the
//! environment-derived [`AccessPolicyConfig`] that is read once at startup.

/// Service-level configuration.
pub struct ServiceConfig;

impl ServiceConfig {
    pub const SERVICE_NAME: &'static str = "ProcessManager";
    /// Protocol name that selects stream sockets; anything else selects datagrams.
    pub const STREAM_PROTOCOL: &'static str = "tcp";
    pub const DEFAULT_PROTOCOL: &'static str = "tcp";
    /// Separator used when joining command-line arguments for pattern matching.
    pub const CMDLINE_SEPARATOR: &'static str = " ";
}

/// Superuser policy constants.
pub struct PolicyConfig;

impl PolicyConfig {
    pub const ALLOW_ROOT_ENV: &'static str = "ALLOW_ROOT";
    /// The only value of [`Self::ALLOW_ROOT_ENV`] that enables the override.
    pub const ALLOW_ROOT_VALUE: &'static str = "Y";
    pub const SUPERUSER_NAME: &'static str = "root";
}

/// Linux procfs locations used by the connection scanner.
pub struct ProcfsConfig;

impl ProcfsConfig {
    pub const PROC_ROOT: &'static str = "/proc";
    pub const TCP4_TABLE: &'static str = "/proc/net/tcp";
    pub const TCP6_TABLE: &'static str = "/proc/net/tcp6";
    pub const UDP4_TABLE: &'static str = "/proc/net/udp";
    pub const UDP6_TABLE: &'static str = "/proc/net/udp6";
}

/// Access policy input, resolved once per process start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessPolicyConfig {
    /// Permit operations on processes owned by the superuser.
    pub allow_root_access: bool,
}

impl AccessPolicyConfig {
    pub fn new(allow_root_access: bool) -> Self {
        Self { allow_root_access }
    }

    /// Read the override from `ALLOW_ROOT`. Only the exact value `Y` enables it.
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(PolicyConfig::ALLOW_ROOT_ENV).ok().as_deref())
    }

    /// Interpret a raw `ALLOW_ROOT` value (`None` when unset).
    pub fn from_env_value(value: Option<&str>) -> Self {
        Self {
            allow_root_access: value == Some(PolicyConfig::ALLOW_ROOT_VALUE),
        }
    }
}
