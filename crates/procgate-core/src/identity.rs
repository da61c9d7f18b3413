//! Caller identity resolution.
//!
//! The identity of the running service is the implicit owner scope for
//! queries that omit a username, and is what `get_user_info` reports.

use crate::error::{ProcgateError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Username, uid and gid of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub uid: u32,
    pub gid: u32,
}

/// Source of the "current user" identity.
pub trait IdentityResolver: Send + Sync {
    fn current_identity(&self) -> Result<Identity>;
}

/// Resolves the identity of the running process from the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsIdentity;

impl IdentityResolver for OsIdentity {
    fn current_identity(&self) -> Result<Identity> {
        #[cfg(unix)]
        {
            use nix::unistd::{getgid, getuid};

            let uid = getuid().as_raw();
            let gid = getgid().as_raw();
            let username = current_username(uid, lookup_username(uid))?;
            debug!("Resolved current identity: {} ({}:{})", username, uid, gid);
            Ok(Identity { username, uid, gid })
        }

        #[cfg(not(unix))]
        {
            Err(ProcgateError::Unsupported {
                operation: "Resolving the current user".into(),
            })
        }
    }
}

/// A preset identity, for embedders that already know who the caller is.
#[derive(Debug, Clone)]
pub struct FixedIdentity(pub Identity);

impl FixedIdentity {
    pub fn new(username: impl Into<String>, uid: u32, gid: u32) -> Self {
        Self(Identity {
            username: username.into(),
            uid,
            gid,
        })
    }
}

impl IdentityResolver for FixedIdentity {
    fn current_identity(&self) -> Result<Identity> {
        Ok(self.0.clone())
    }
}

#[cfg(unix)]
fn lookup_username(uid: u32) -> nix::Result<Option<String>> {
    use nix::unistd::{Uid, User};

    User::from_uid(Uid::from_raw(uid)).map(|user| user.map(|u| u.name))
}

/// Account name of the running service.
///
/// A uid without a passwd entry renders as its decimal form, the same way
/// process owners do. A failed lookup is an error.
#[cfg(unix)]
fn current_username(uid: u32, lookup: nix::Result<Option<String>>) -> Result<String> {
    match lookup {
        Ok(Some(name)) => Ok(name),
        Ok(None) => Ok(uid.to_string()),
        Err(e) => Err(ProcgateError::Identity {
            message: format!("passwd lookup for uid {} failed: {}", uid, e),
        }),
    }
}

/// Map a uid to its account name via the passwd database.
///
/// Falls back to the decimal uid when no entry exists or the lookup fails,
/// so one unreadable owner never hides a process from a scan.
#[cfg(unix)]
pub fn username_for_uid(uid: u32) -> String {
    match lookup_username(uid) {
        Ok(Some(name)) => name,
        Ok(None) => uid.to_string(),
        Err(e) => {
            debug!("passwd lookup for uid {} failed: {}", uid, e);
            uid.to_string()
        }
    }
}
