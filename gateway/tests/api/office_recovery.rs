use std::time::Duration;

use tempfile::tempdir;
use tokio::time::sleep;

use crate::helpers::{spawn_app_with, write_fake_executable};

const FAKE_OFFICE_WORKER: &str = "\
#!/bin/sh
pidfile=\"\"
profiledir=\"\"
for arg in \"$@\"; do
  case \"$arg\" in
    --pidfile=*) pidfile=\"${arg#--pidfile=}\" ;;
    --profile-dir=*) profiledir=\"${arg#--profile-dir=}\" ;;
  esac
done
mkdir -p \"$profiledir\"
echo $$ > \"$pidfile\"
while true; do sleep 3600; done
";

async fn office_health(app: &crate::helpers::TestApp, port: u16) -> Option<String> {
    let body: serde_json::Value = reqwest::Client::new()
        .get(format!("{}/healthcheck", app.address))
        .send()
        .await
        .expect("healthcheck request")
        .json()
        .await
        .expect("healthcheck body is JSON");

    let key = format!("unoservers.{port}");
    body["health"].get(key.as_str()).and_then(|v| v.as_str()).map(str::to_string)
}

async fn wait_for_office_health(app: &crate::helpers::TestApp, port: u16, want: &str, timeout: Duration) {
    let deadline = std::time::Instant::now() + timeout;
    loop {
        if office_health(app, port).await.as_deref() == Some(want) {
            return;
        }
        if std::time::Instant::now() >= deadline {
            panic!("office worker on port {port} never reached {want}");
        }
        sleep(Duration::from_millis(50)).await;
    }
}

/// A killed office worker is detected, marked unhealthy, and respawned by
/// its supervisor without another request needing to trigger anything.
#[tokio::test]
async fn office_worker_recovers_after_crash() {
    let dir = tempdir().expect("tempdir");
    let office_executable = write_fake_executable(dir.path(), "fake-office-worker", FAKE_OFFICE_WORKER);
    let temp_root = dir.path().to_path_buf();
    let port = 2003u16;

    let app = spawn_app_with(|settings| {
        settings.converters.office_executable = office_executable.display().to_string();
        settings.converters.temp_root = temp_root.display().to_string();
        settings.converters.restart_delay_ms = 200;
        settings.converters.max_concurrent_jobs = 1;
        settings.converters.office_base_port = port;
    })
    .await;

    wait_for_office_health(&app, port, "healthy", Duration::from_secs(5)).await;

    let pid_file = temp_root.join(format!("office-{port}.pid"));
    let pid: u32 = tokio::fs::read_to_string(&pid_file)
        .await
        .expect("pid file should exist once healthy")
        .trim()
        .parse()
        .expect("pid file should contain a pid");

    // SIGKILL: the same as a real backend crash, not a cooperative shutdown.
    std::process::Command::new("kill")
        .arg("-9")
        .arg(pid.to_string())
        .status()
        .expect("failed to send SIGKILL to fake office worker");

    wait_for_office_health(&app, port, "unhealthy", Duration::from_secs(5)).await;
    wait_for_office_health(&app, port, "healthy", Duration::from_secs(5)).await;
}
