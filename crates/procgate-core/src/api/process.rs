//! Process inspection and control methods for ProcgateApi.

use super::{render_error, ToolResponse};
use crate::command::CommandEngine;
use crate::config::ServiceConfig;
use crate::error::Result;
use crate::query::{format_listing, QueryEngine};
use crate::snapshot::SocketType;
use crate::ProcgateApi;
use tracing::{debug, info};

impl ProcgateApi {
    /// The owner to scope a query to: `username`, or the current user.
    fn resolve_owner(&self, username: Option<&str>) -> Result<String> {
        match username {
            Some(name) => Ok(name.to_string()),
            None => Ok(self.identity.current_identity()?.username),
        }
    }

    /// List the processes of `username` (default: current user) as
    /// `pid: name` lines.
    pub fn list_processes(&self, username: Option<&str>) -> ToolResponse {
        let owner = match self.resolve_owner(username) {
            Ok(owner) => owner,
            Err(e) => return render_error("list_processes", &e),
        };

        let records = QueryEngine::new(&self.snapshot).list_processes(&owner);
        debug!("Listed {} processes for {}", records.len(), owner);
        ToolResponse::Text(format_listing(&records))
    }

    /// Find processes of `username` whose name or command line matches the
    /// regular expression `pattern`.
    pub fn find_processes(&self, pattern: &str, username: Option<&str>) -> ToolResponse {
        let owner = match self.resolve_owner(username) {
            Ok(owner) => owner,
            Err(e) => return render_error("find_processes", &e),
        };

        match QueryEngine::new(&self.snapshot).find_processes(pattern, &owner) {
            Ok(records) => {
                debug!(
                    "Pattern {:?} matched {} processes for {}",
                    pattern,
                    records.len(),
                    owner
                );
                ToolResponse::Text(format_listing(&records))
            }
            Err(e) => render_error("find_processes", &e),
        }
    }

    /// Full attribute map of `pid`.
    pub fn get_process_info(&self, pid: u32) -> ToolResponse {
        match CommandEngine::new(&self.snapshot, &self.policy).process_info(pid) {
            Ok(record) => ToolResponse::Attributes(record.attributes),
            Err(e) => render_error("get_process_info", &e),
        }
    }

    /// Request termination of `pid` without waiting for it to exit.
    pub fn terminate_process(&self, pid: u32) -> ToolResponse {
        match CommandEngine::new(&self.snapshot, &self.policy).terminate(pid) {
            Ok(()) => ToolResponse::Text(format!("Process {} terminated.", pid)),
            Err(e) => render_error("terminate_process", &e),
        }
    }

    /// Attributes of the first process of `username` listening on `port`.
    ///
    /// `protocol` is matched case-insensitively: `tcp` selects stream
    /// sockets and anything else selects datagram sockets.
    pub fn get_process_by_port(
        &self,
        port: u16,
        protocol: &str,
        username: Option<&str>,
    ) -> ToolResponse {
        let owner = match self.resolve_owner(username) {
            Ok(owner) => owner,
            Err(e) => return render_error("get_process_by_port", &e),
        };

        let socket_type = SocketType::for_protocol(protocol);
        match QueryEngine::new(&self.snapshot).find_by_port(port, socket_type, &owner) {
            Some(record) => ToolResponse::Attributes(record.attributes),
            None => {
                info!("No {} listener on port {} for {}", protocol, port, owner);
                ToolResponse::Text(format!(
                    "No process found for user '{}' listening on port {} with protocol {}",
                    owner, port, protocol
                ))
            }
        }
    }

    /// Username, uid and gid of the account the service runs as.
    pub fn get_user_info(&self) -> ToolResponse {
        match self.identity.current_identity() {
            Ok(identity) => ToolResponse::User(identity),
            Err(e) => ToolResponse::Text(format!("Error getting user info: {}", e)),
        }
    }

    /// Protocol used when a port lookup does not name one.
    pub fn default_protocol() -> &'static str {
        ServiceConfig::DEFAULT_PROTOCOL
    }
}
