// Copyright (c) 2026 Tether Authors
// SPDX-License-Identifier: Apache-2.0

use std::io::{BufRead, BufReader};
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

const READY_LINE: &str = "Registering cluster with parent";

fn agent_command() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tether-agent"));
    for (key, _) in std::env::vars() {
        if key.starts_with("TETHER_") {
            cmd.env_remove(key);
        }
    }
    cmd.env("RUST_LOG", "info");
    cmd
}

fn valid_agent_command() -> Command {
    let mut cmd = agent_command();
    cmd.args([
        "--cluster-id=edge-01",
        "--cluster-reg-parent-url=https://parent.example.com:6443",
        "--cluster-reg-token=abcdef.0123456789abcdef",
        "--cluster-status-collect-frequency=50ms",
        "--cluster-status-report-frequency=100ms",
    ]);
    cmd
}

/// Spawns the agent and waits until its run loop has started logging.
fn spawn_running_agent() -> Child {
    let mut child = valid_agent_command()
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn tether-agent");

    let stderr = child.stderr.take().unwrap();
    let (ready_tx, ready_rx) = mpsc::channel();
    thread::spawn(move || {
        let mut ready_tx = Some(ready_tx);
        for line in BufReader::new(stderr).lines().map_while(Result::ok) {
            if line.contains(READY_LINE) {
                if let Some(tx) = ready_tx.take() {
                    let _ = tx.send(());
                }
            }
        }
    });

    if ready_rx.recv_timeout(Duration::from_secs(10)).is_err() {
        let _ = child.kill();
        panic!("tether-agent never reported that it was running");
    }
    child
}

fn send_signal(child: &Child, signal: &str) {
    let status = Command::new("kill")
        .arg(format!("-{}", signal))
        .arg(child.id().to_string())
        .status()
        .expect("failed to run kill");
    assert!(status.success());
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> ExitStatus {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            panic!("tether-agent still running {:?} after a single shutdown signal", timeout);
        }
        thread::sleep(Duration::from_millis(25));
    }
}

#[cfg(unix)]
#[test]
fn test_sigterm_exits_cleanly_without_second_signal() {
    let mut child = spawn_running_agent();
    send_signal(&child, "TERM");

    let status = wait_with_timeout(&mut child, Duration::from_secs(5));
    assert_eq!(status.code(), Some(0));
}

#[cfg(unix)]
#[test]
fn test_sigint_exits_cleanly_without_second_signal() {
    let mut child = spawn_running_agent();
    send_signal(&child, "INT");

    let status = wait_with_timeout(&mut child, Duration::from_secs(5));
    assert_eq!(status.code(), Some(0));
}

fn run_to_completion(args: &[&str]) -> Output {
    agent_command()
        .args(args)
        .output()
        .expect("failed to run tether-agent")
}

#[test]
fn test_version_query_exits_zero() {
    let output = run_to_completion(&["--version"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("tether-agent version "));
}

#[test]
fn test_invalid_options_exit_one_with_error_line() {
    let output = run_to_completion(&["--cluster-id=edge-01"]);
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error:"));
    assert!(stderr.contains("--cluster-reg-parent-url: required"));
}

#[test]
fn test_unknown_flag_exits_two() {
    let output = run_to_completion(&["--no-such-flag"]);
    assert_eq!(output.status.code(), Some(2));
}
