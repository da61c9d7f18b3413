//! Integration tests for the ProcgateApi public interface.
//!
//! The first half drives the API over a fixed process table so results are
//! deterministic; the second half runs against the live system using this
//! test process as the target.

use procgate_core::{
    AccessPolicyConfig, ConnectionRecord, ConnectionStatus, FixedIdentity, ProcessRecord,
    ProcgateApi, SocketType, StaticSource,
};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

fn record(pid: u32, name: &str, owner: &str, cmdline: &[&str]) -> ProcessRecord {
    ProcessRecord::new(
        pid,
        name,
        owner,
        cmdline.iter().map(|s| s.to_string()).collect(),
    )
}

fn tcp_listener(pid: u32, port: u16) -> ConnectionRecord {
    ConnectionRecord {
        local_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        local_port: port,
        remote_addr: None,
        status: ConnectionStatus::Listen,
        socket_type: SocketType::Stream,
        owning_pid: pid,
    }
}

/// A small machine: a root daemon, two users, one web server on port 80.
fn static_source() -> StaticSource {
    StaticSource::new()
        .with_process(record(1, "systemd", "root", &["/sbin/init", "splash"]))
        .with_process(record(88, "sshd", "root", &["/usr/sbin/sshd", "-D"]))
        .with_process(record(1200, "nginx", "www", &["nginx", "-g", "daemon off;"]))
        .with_vanished(1201)
        .with_process(record(1300, "python3", "alice", &["python3", "manage.py", "runserver"]))
        .with_process(record(1301, "vim", "alice", &["vim", "manage.py"]))
        .with_process(record(1400, "zsh", "bob", &["-zsh"]))
        .with_connections(1200, vec![tcp_listener(1200, 80)])
        .with_connections(88, vec![tcp_listener(88, 22)])
}

fn create_api(allow_root: bool) -> (Arc<StaticSource>, ProcgateApi) {
    let source = Arc::new(static_source());
    let api = ProcgateApi::builder()
        .source(source.clone())
        .policy(AccessPolicyConfig::new(allow_root))
        .identity(Arc::new(FixedIdentity::new("alice", 1000, 1000)))
        .build();
    (source, api)
}

fn listed_pids(text: &str) -> Vec<u32> {
    text.lines()
        .filter_map(|line| line.split(':').next())
        .filter_map(|pid| pid.trim().parse().ok())
        .collect()
}

#[test]
fn test_list_processes_is_owner_scoped() {
    let (_, api) = create_api(false);

    let mine = api.list_processes(None);
    assert_eq!(mine.as_text(), Some("1300: python3\n1301: vim"));

    let www = api.list_processes(Some("www"));
    assert_eq!(listed_pids(www.as_text().unwrap()), vec![1200]);

    let nobody = api.list_processes(Some("nobody"));
    assert_eq!(nobody.as_text(), Some(""));
}

#[test]
fn test_find_processes_lists_each_pid_once() {
    let (_, api) = create_api(false);

    // "manage" matches the command line of both alice processes; "python"
    // matches both the name and the command line of 1300.
    let found = api.find_processes("manage|python", None);
    assert_eq!(listed_pids(found.as_text().unwrap()), vec![1300, 1301]);
}

#[test]
fn test_find_processes_invalid_pattern() {
    let (_, api) = create_api(false);
    let found = api.find_processes("(", None);
    let text = found.as_text().unwrap();
    assert!(text.starts_with("Invalid regex pattern: "), "{text}");
    assert!(!text.contains("1300"));
}

#[test]
fn test_get_process_info_root_requires_override() {
    let (_, denied_api) = create_api(false);
    assert_eq!(
        denied_api.get_process_info(88).as_text(),
        Some("Access to root processes is not allowed. Set ALLOW_ROOT=Y to override.")
    );

    let (_, allowed_api) = create_api(true);
    let info = allowed_api.get_process_info(88);
    let attributes = info.as_attributes().unwrap();
    assert_eq!(attributes["pid"], 88);
    assert_eq!(attributes["name"], "sshd");
    assert_eq!(attributes["username"], "root");
}

#[test]
fn test_get_process_info_other_user_is_allowed() {
    let (_, api) = create_api(false);
    let info = api.get_process_info(1400);
    assert_eq!(info.as_attributes().unwrap()["username"], "bob");
}

#[test]
fn test_get_process_info_missing_and_vanished() {
    let (_, api) = create_api(false);
    assert_eq!(
        api.get_process_info(999999).as_text(),
        Some("No such process with PID: 999999")
    );
    assert_eq!(
        api.get_process_info(1201).as_text(),
        Some("No such process with PID: 1201")
    );
}

#[test]
fn test_terminate_process() {
    let (source, api) = create_api(false);

    assert_eq!(
        api.terminate_process(999999).as_text(),
        Some("No such process with PID: 999999")
    );
    assert_eq!(
        api.terminate_process(1).as_text(),
        Some("Terminating root processes is not allowed. Set ALLOW_ROOT=Y to override.")
    );
    assert!(source.terminated().is_empty());

    assert_eq!(api.terminate_process(1301).as_text(), Some("Process 1301 terminated."));
    assert_eq!(source.terminated(), vec![1301]);
}

#[test]
fn test_terminate_root_process_with_override() {
    let (source, api) = create_api(true);
    assert_eq!(api.terminate_process(88).as_text(), Some("Process 88 terminated."));
    assert_eq!(source.terminated(), vec![88]);
}

#[test]
fn test_get_process_by_port() {
    let (_, api) = create_api(false);

    let found = api.get_process_by_port(80, "tcp", Some("www"));
    assert_eq!(found.as_attributes().unwrap()["pid"], 1200);

    let missing = api.get_process_by_port(80, "tcp", None);
    assert_eq!(
        missing.as_text(),
        Some("No process found for user 'alice' listening on port 80 with protocol tcp")
    );

    let wrong_protocol = api.get_process_by_port(80, "udp", Some("www"));
    assert_eq!(
        wrong_protocol.as_text(),
        Some("No process found for user 'www' listening on port 80 with protocol udp")
    );
}

#[test]
fn test_get_process_by_port_ignores_policy() {
    // Port resolution reports the owner's own processes; the superuser
    // policy only gates direct single-process operations.
    let (_, api) = create_api(false);
    let found = api.get_process_by_port(22, "TCP", Some("root"));
    assert_eq!(found.as_attributes().unwrap()["pid"], 88);
}

#[test]
fn test_get_user_info_is_independent_of_username_scope() {
    let (_, api) = create_api(false);
    let _ = api.list_processes(Some("bob"));
    let user = api.get_user_info();
    let identity = user.as_user().unwrap();
    assert_eq!(identity.username, "alice");
    assert_eq!((identity.uid, identity.gid), (1000, 1000));
}

// Live system

fn live_api() -> ProcgateApi {
    // Tests may run as root, so the override keeps own-process checks valid.
    ProcgateApi::builder()
        .policy(AccessPolicyConfig::new(true))
        .build()
}

#[test]
fn test_live_list_contains_self() {
    let api = live_api();
    let listing = api.list_processes(None);
    let pids = listed_pids(listing.as_text().unwrap());
    assert!(pids.contains(&std::process::id()));
}

#[cfg(target_os = "linux")]
#[test]
fn test_live_root_listing_includes_kernel_threads() {
    // Skip where pid 2 is not kthreadd (e.g. inside a pid namespace).
    let is_kthreadd = std::fs::read_to_string("/proc/2/status")
        .map(|status| status.contains("kthreadd"))
        .unwrap_or(false);
    if !is_kthreadd {
        return;
    }

    let api = live_api();
    let listing = api.list_processes(Some("root"));
    assert!(listed_pids(listing.as_text().unwrap()).contains(&2));

    // The listing and the direct lookup agree on kernel threads.
    let info = api.get_process_info(2);
    assert_eq!(info.as_attributes().expect("pid 2 info")["pid"], 2);
}

#[test]
fn test_live_process_info_for_self() {
    let api = live_api();
    let pid = std::process::id();
    let info = api.get_process_info(pid);
    let attributes = info.as_attributes().unwrap();
    assert_eq!(attributes["pid"], pid);
    assert_eq!(
        attributes["username"],
        api.current_identity().unwrap().username.as_str()
    );
}

#[test]
fn test_live_nonexistent_pid() {
    let api = live_api();
    assert_eq!(
        api.get_process_info(4_000_000_000).as_text(),
        Some("No such process with PID: 4000000000")
    );
    assert_eq!(
        api.terminate_process(4_000_000_000).as_text(),
        Some("No such process with PID: 4000000000")
    );
}

#[cfg(unix)]
#[test]
fn test_live_user_info_matches_os_identity() {
    let api = live_api();
    let user = api.get_user_info();
    let identity = user.as_user().unwrap();
    assert_eq!(identity.uid, nix::unistd::getuid().as_raw());
    assert_eq!(identity.gid, nix::unistd::getgid().as_raw());
}

#[cfg(target_os = "linux")]
#[test]
fn test_live_tcp_listener_resolves_to_self() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let api = live_api();
    let found = api.get_process_by_port(port, "tcp", None);
    let attributes = found.as_attributes().expect("listener not found");
    assert_eq!(attributes["pid"], std::process::id());

    drop(listener);
}

#[cfg(target_os = "linux")]
#[test]
fn test_live_udp_socket_resolves_to_self() {
    let socket = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    let port = socket.local_addr().unwrap().port();

    let api = live_api();
    let found = api.get_process_by_port(port, "udp", None);
    assert_eq!(found.as_attributes().expect("socket not found")["pid"], std::process::id());

    // A UDP socket never satisfies a stream lookup.
    let as_tcp = api.get_process_by_port(port, "tcp", None);
    assert!(as_tcp.as_text().unwrap().starts_with("No process found for user"));

    drop(socket);
}
