//! Process inspection and control handlers.

use super::{get_str_param, require_str_param, require_uint_param, run_blocking};
use crate::server::AppState;
use procgate_core::ProcgateApi;
use serde_json::Value;

fn require_pid(params: &Value) -> procgate_core::Result<u32> {
    let pid = require_uint_param(params, "pid", "pid", u64::from(u32::MAX))?;
    Ok(pid as u32)
}

fn username(params: &Value) -> Option<String> {
    get_str_param(params, "username", "userName").map(String::from)
}

pub async fn list_processes(state: &AppState, params: &Value) -> procgate_core::Result<Value> {
    let username = username(params);
    run_blocking(state, move |api| api.list_processes(username.as_deref())).await
}

pub async fn find_processes(state: &AppState, params: &Value) -> procgate_core::Result<Value> {
    let pattern = require_str_param(params, "pattern", "pattern")?;
    let username = username(params);
    run_blocking(state, move |api| {
        api.find_processes(&pattern, username.as_deref())
    })
    .await
}

pub async fn get_process_info(state: &AppState, params: &Value) -> procgate_core::Result<Value> {
    let pid = require_pid(params)?;
    run_blocking(state, move |api| api.get_process_info(pid)).await
}

pub async fn terminate_process(state: &AppState, params: &Value) -> procgate_core::Result<Value> {
    let pid = require_pid(params)?;
    run_blocking(state, move |api| api.terminate_process(pid)).await
}

pub async fn get_process_by_port(
    state: &AppState,
    params: &Value,
) -> procgate_core::Result<Value> {
    let port = require_uint_param(params, "port", "port", u64::from(u16::MAX))? as u16;
    let protocol = get_str_param(params, "protocol", "protocol")
        .unwrap_or(ProcgateApi::default_protocol())
        .to_string();
    let username = username(params);
    run_blocking(state, move |api| {
        api.get_process_by_port(port, &protocol, username.as_deref())
    })
    .await
}

pub async fn get_user_info(state: &AppState, _params: &Value) -> procgate_core::Result<Value> {
    run_blocking(state, |api| api.get_user_info()).await
}
