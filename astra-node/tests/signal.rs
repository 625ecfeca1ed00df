//! Process-level shutdown: the binary exits cleanly when it receives SIGTERM.

#![cfg(unix)]

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;

/// Helper: send `signal` to `pid` with the system `kill` utility.
fn send_signal(pid: u32, signal: &str) {
    let status = std::process::Command::new("kill")
        .args([signal, &pid.to_string()])
        .status()
        .expect("failed to run kill");
    assert!(status.success(), "kill {} {} failed", signal, pid);
}

#[tokio::test]
async fn test_sigterm_shuts_down_running_node() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_astra-relay"))
        .args(["--log-level", "info", "run", "--listen", "/ip4/127.0.0.1/tcp/0"])
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .expect("failed to spawn node");

    let stdout = child.stdout.take().unwrap();
    let mut lines = BufReader::new(stdout).lines();

    // The first status report means the run loop is up.
    let reported = timeout(Duration::from_secs(20), async {
        while let Some(line) = lines.next_line().await.unwrap() {
            if line.contains("Listen addresses: [/ip4/127.0.0.1/tcp/") {
                return true;
            }
        }
        false
    })
    .await
    .expect("no status report within 20s");
    assert!(reported, "node exited before its first status report");

    // Give the loop a turn to install the signal handlers.
    tokio::time::sleep(Duration::from_millis(500)).await;
    send_signal(child.id().expect("node already exited"), "-TERM");

    let status = timeout(Duration::from_secs(15), child.wait())
        .await
        .expect("node did not exit within 15s of SIGTERM")
        .unwrap();
    assert!(status.success(), "node exited with {}", status);

    let mut rest = Vec::new();
    while let Some(line) = lines.next_line().await.unwrap() {
        rest.push(line);
    }
    let rest = rest.join("\n");
    assert!(rest.contains("SIGTERM"));
    assert!(rest.contains("Node shutdown complete"));
}
