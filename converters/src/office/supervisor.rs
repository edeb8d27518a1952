//! Office-worker supervisor: keeps N office workers alive on fixed ports.
//! One background task per worker runs the Start/Exit loop below for the
//! lifetime of the process; workers are independent, so one worker's
//! crash loop never affects another.

use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::process::{Child, Command};
use uuid::Uuid;

use crate::config::Settings;
use crate::error::OfficeError;
use crate::health::{Health, HealthMap, office_worker_key};
use crate::process::{kill_best_effort, kill_process_tree, run_with_timeout, wait_for_paths};

use super::worker::Worker;

pub struct Supervisor {
    workers: Vec<Arc<Worker>>,
}

impl Supervisor {
    /// Launches a background task per configured port and returns
    /// immediately; readiness is observed later via the health map, not by
    /// blocking startup on every worker coming up.
    pub fn start(settings: Arc<Settings>, health: HealthMap) -> Self {
        let workers: Vec<Arc<Worker>> = settings
            .office_ports()
            .map(|port| {
                let token = Uuid::new_v4().simple().to_string();
                Arc::new(Worker::new(port, &settings.temp_root, &token))
            })
            .collect();

        for worker in &workers {
            let worker = worker.clone();
            let settings = settings.clone();
            let health = health.clone();
            tokio::spawn(async move { run_worker_lifecycle(worker, settings, health).await });
        }

        Self { workers }
    }

    /// Iterate workers in stable port order, claim the first available one.
    /// Fails fast: no blocking wait for a worker to free up.
    pub fn claim_any(&self) -> Option<Arc<Worker>> {
        self.workers.iter().find(|w| w.try_claim()).cloned()
    }

    pub fn workers(&self) -> &[Arc<Worker>] {
        &self.workers
    }

    /// Run a single conversion against an already-claimed worker. Releases
    /// the worker (sets `available = true`) in every exit path.
    pub async fn convert(
        &self,
        worker: &Worker,
        settings: &Settings,
        input: Vec<u8>,
    ) -> Result<Vec<u8>, OfficeError> {
        let result = self.convert_inner(worker, settings, input).await;
        worker.release();
        result
    }

    async fn convert_inner(
        &self,
        worker: &Worker,
        settings: &Settings,
        input: Vec<u8>,
    ) -> Result<Vec<u8>, OfficeError> {
        let mut command = Command::new(&settings.backends.transport_executable);
        command.arg(format!("--port={}", worker.port));

        let also_kill = worker.backend_pid();

        let output = run_with_timeout(command, input, settings.pdf_render_timeout, also_kill)
            .await
            .map_err(|_| {
                // The worker backend is force-killed too: a stuck worker
                // would otherwise jam every future request routed to it.
                if let Some(pid) = worker.backend_pid() {
                    kill_process_tree(pid);
                }
                OfficeError::ConvertTimeout { port: worker.port }
            })?;

        match output.exit_code {
            Some(0) => Ok(output.stdout),
            other => Err(OfficeError::ConvertFailed {
                port: worker.port,
                exit_code: other,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
        }
    }
}

async fn run_worker_lifecycle(worker: Arc<Worker>, settings: Arc<Settings>, health: HealthMap) {
    loop {
        if worker.restart_count.load(Ordering::SeqCst) > settings.max_restarts {
            tracing::error!(port = worker.port, "office worker exceeded restart budget");
            health.set(office_worker_key(worker.port), Health::Unhealthy);
            return;
        }
        worker.restart_count.fetch_add(1, Ordering::SeqCst);

        let _ = tokio::fs::remove_file(&worker.pid_file).await;

        let mut command = Command::new(&settings.backends.office_executable);
        command
            .arg(format!("--port={}", worker.port))
            .arg(format!("--pidfile={}", worker.pid_file.display()))
            .arg(format!("--profile-dir={}", worker.profile_dir.display()))
            .arg(format!(
                "--timeout={}",
                settings.pdf_render_timeout.as_secs()
            ))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let child = match command.spawn() {
            Ok(child) => child,
            Err(error) => {
                tracing::warn!(port = worker.port, %error, "failed to spawn office worker");
                crate::process::sleep_for(settings.restart_delay).await;
                continue;
            }
        };

        if !wait_for_paths(
            &worker.pid_file,
            &worker.profile_dir,
            settings.office_launch_timeout,
        )
        .await
        {
            let mut child = child;
            kill_best_effort(&mut child, "office launch timeout");
            let _ = child.wait().await;
            crate::process::sleep_for(settings.restart_delay).await;
            continue;
        }

        if let Some(id) = child.id() {
            worker.set_backend_pid(id);
        }
        worker.release();
        health.set(office_worker_key(worker.port), Health::Healthy);
        tracing::info!(port = worker.port, "office worker ready");

        wait_for_exit_with_uptime_reset(child, &worker, settings.restart_reset_window()).await;

        worker.mark_unavailable();
        worker.set_backend_pid(0);
        health.set(office_worker_key(worker.port), Health::Unhealthy);

        if let Ok(pid_text) = tokio::fs::read_to_string(&worker.pid_file).await {
            if let Ok(pid) = pid_text.trim().parse::<u32>() {
                kill_process_tree(pid);
            }
        }
        if let Err(error) = tokio::fs::remove_dir_all(&worker.profile_dir).await {
            if error.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(port = worker.port, %error, "failed to remove worker profile dir");
            }
        }

        crate::process::sleep_for(settings.restart_delay).await;
    }
}

/// Wait for the backend to exit, resetting the restart counter once it has
/// stayed up for the full rolling window. This is the sole brake against
/// a crash loop.
async fn wait_for_exit_with_uptime_reset(
    mut child: Child,
    worker: &Worker,
    reset_window: std::time::Duration,
) {
    tokio::select! {
        _ = tokio::time::sleep(reset_window) => {
            worker.restart_count.store(0, Ordering::SeqCst);
            let _ = child.wait().await;
        }
        _ = child.wait() => {}
    }
}
