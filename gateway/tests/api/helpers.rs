use std::os::unix::fs::PermissionsExt;
use std::sync::LazyLock;

use dotenv::dotenv;
use gateway::app_settings::{AppSettings, get_app_settings};
use gateway::startup::Application;
use gateway::telemetry::{get_telemetry_subscriber, init_telemetry_subscriber};

pub struct TestApp {
    /// Address where our app will be listening to HTTP requests. Port is
    /// assigned dynamically based on what the OS provides.
    pub address: String,
}

#[allow(clippy::let_underscore_future)]
pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// Like `spawn_app`, but lets the caller override settings (e.g. point a
/// backend executable field at a fake script) before the server starts.
#[allow(clippy::let_underscore_future)]
pub async fn spawn_app_with(mutate: impl FnOnce(&mut AppSettings)) -> TestApp {
    dotenv().ok();

    LazyLock::force(&TRACING);

    let mut settings = get_app_settings().expect("Could not get App Settings");
    settings.application.port = 0;
    settings.converters.max_concurrent_jobs = 1;
    settings.converters.max_queued_jobs = 1;
    mutate(&mut settings);

    let app: Application = Application::build(settings)
        .await
        .expect("Could not build Application server");

    let app_port = app.port();
    let _ = tokio::spawn(app.run_until_stopped());

    let address = format!("http://127.0.0.1:{app_port}");
    TestApp { address }
}

/// Write an executable shell script standing in for a backend binary the
/// test environment doesn't have installed. Returns its absolute path;
/// the caller's `TempDir` must outlive the test for the path to stay valid.
pub fn write_fake_executable(dir: &std::path::Path, name: &str, script: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, script).expect("failed to write fake executable");
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("failed to chmod fake executable");
    path
}

static TRACING: LazyLock<()> = LazyLock::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_telemetry_subscriber("gateway", "info", std::io::stdout);
        init_telemetry_subscriber(subscriber);
    } else {
        let subscriber = get_telemetry_subscriber("gateway", "info", std::io::sink);
        init_telemetry_subscriber(subscriber);
    };
});
