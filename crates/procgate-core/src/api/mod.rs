//! Public facade over the query and command engines.
//!
//! Engine methods return typed errors. The facade turns the expected ones
//! (vanished pid, policy denial, bad pattern, no listener) into user-facing
//! messages and reports anything else with its kind and message, so no
//! operation ever fails towards the caller.

mod builder;
mod process;

pub use builder::ProcgateApiBuilder;

use crate::error::ProcgateError;
use crate::identity::Identity;
use crate::snapshot::ProcessAttributes;
use serde::Serialize;
use tracing::error;

/// Output of one operation: a message, an attribute map, or a user record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolResponse {
    Text(String),
    Attributes(ProcessAttributes),
    User(Identity),
}

impl ToolResponse {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ToolResponse::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_attributes(&self) -> Option<&ProcessAttributes> {
        match self {
            ToolResponse::Attributes(attributes) => Some(attributes),
            _ => None,
        }
    }

    pub fn as_user(&self) -> Option<&Identity> {
        match self {
            ToolResponse::User(identity) => Some(identity),
            _ => None,
        }
    }
}

impl From<String> for ToolResponse {
    fn from(text: String) -> Self {
        ToolResponse::Text(text)
    }
}

/// Render an engine error for the caller.
///
/// Expected failures become their message; anything else is logged and
/// reported as `Error in {operation}: {kind}: {message}`.
pub(crate) fn render_error(operation: &str, err: &ProcgateError) -> ToolResponse {
    match err {
        ProcgateError::NoSuchProcess { .. }
        | ProcgateError::AccessDenied { .. }
        | ProcgateError::PolicyDenied { .. }
        | ProcgateError::InvalidPattern { .. } => ToolResponse::Text(err.to_string()),
        _ => {
            error!("Unexpected fault in {}: {}: {}", operation, err.kind(), err);
            ToolResponse::Text(format!("Error in {}: {}: {}", operation, err.kind(), err))
        }
    }
}
