//! Headless browser supervisor: one long-lived browser, restarted on a
//! schedule and on crash, with reference-counted hot-swap.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::config::Settings;
use crate::health::{BROWSER, Health, HealthMap};

use super::holder::Holder;

pub type BrowserRef = super::holder::Ref<Browser>;

pub struct Supervisor {
    current: Arc<RwLock<Option<Holder<Browser>>>>,
    restart_count: Arc<AtomicU32>,
}

impl Supervisor {
    /// Launches the browser in the background and installs the periodic
    /// restart timer; returns immediately, like the office supervisor.
    pub fn start(settings: Arc<Settings>, health: HealthMap) -> Self {
        let current = Arc::new(RwLock::new(None));
        let restart_count = Arc::new(AtomicU32::new(0));

        let supervisor = Self {
            current: current.clone(),
            restart_count: restart_count.clone(),
        };

        tokio::spawn(run_lifecycle(settings, health, current, restart_count));

        supervisor
    }

    /// Acquire a reference to the currently live browser, if any.
    pub fn acquire(&self) -> Option<BrowserRef> {
        self.current.read().as_ref().and_then(|holder| holder.acquire())
    }
}

async fn run_lifecycle(
    settings: Arc<Settings>,
    health: HealthMap,
    current: Arc<RwLock<Option<Holder<Browser>>>>,
    restart_count: Arc<AtomicU32>,
) {
    let mut interval = tokio::time::interval(settings.browser_restart_interval);
    interval.tick().await; // burst-mode interval: first tick fires immediately, discard it

    start_once(&settings, &health, &current, &restart_count).await;

    loop {
        interval.tick().await;
        start_once(&settings, &health, &current, &restart_count).await;
    }
}

async fn start_once(
    settings: &Arc<Settings>,
    health: &HealthMap,
    current: &Arc<RwLock<Option<Holder<Browser>>>>,
    restart_count: &Arc<AtomicU32>,
) {
    loop {
        if restart_count.load(Ordering::SeqCst) > settings.max_restarts {
            tracing::error!("browser exceeded restart budget");
            health.set(BROWSER, Health::Unhealthy);
            return;
        }
        restart_count.fetch_add(1, Ordering::SeqCst);

        let user_data_dir = settings
            .temp_root
            .join(format!("browser-{}", Uuid::new_v4().simple()));

        let executable = settings
            .backends
            .browser_executable
            .clone()
            .unwrap_or_else(|| PathBuf::from("chromium"));

        let config = match BrowserConfig::builder()
            .chrome_executable(executable)
            .user_data_dir(&user_data_dir)
            .no_sandbox()
            .args(vec![
                "--disable-gpu",
                "--disable-extensions",
                "--disable-translate",
                "--disable-dev-shm-usage",
                "--disable-infobars",
                "--noerrdialogs",
            ])
            .request_timeout(settings.browser_launch_timeout)
            .build()
        {
            Ok(config) => config,
            Err(error) => {
                tracing::warn!(%error, "invalid browser configuration");
                crate::process::sleep_for(settings.restart_delay).await;
                continue;
            }
        };

        let launch = tokio::time::timeout(
            settings.browser_launch_timeout,
            Browser::launch(config),
        )
        .await;

        let (browser, mut handler) = match launch {
            Ok(Ok(pair)) => pair,
            Ok(Err(error)) => {
                tracing::warn!(%error, "browser failed to launch");
                crate::process::sleep_for(settings.restart_delay).await;
                continue;
            }
            Err(_) => {
                tracing::warn!("browser launch timed out");
                crate::process::sleep_for(settings.restart_delay).await;
                continue;
            }
        };

        let user_data_dir_for_cleanup = user_data_dir.clone();
        let holder = Holder::new(browser, move |mut browser| {
            let user_data_dir = user_data_dir_for_cleanup.clone();
            tokio::spawn(async move {
                let _ = browser.close().await;
                if user_data_dir.is_dir() {
                    let _ = tokio::fs::remove_dir_all(&user_data_dir).await;
                }
            });
        });

        let previous = current.write().replace(holder.clone());
        if let Some(previous) = previous {
            previous.mark_for_collection();
        }

        health.set(BROWSER, Health::Healthy);
        tracing::info!("browser ready");

        // The handler future draining to completion is chromiumoxide's
        // stand-in for a `disconnected` event: it ends once the CDP
        // connection drops, whether that's a crash or our own clean close
        // on a scheduled restart. Drained on its own task so the reset
        // timer below can race it repeatedly without re-borrowing it.
        let disconnected = Arc::new(tokio::sync::Notify::new());
        let disconnected_setter = disconnected.clone();
        tokio::spawn(async move {
            while handler.next().await.is_some() {}
            disconnected_setter.notify_one();
        });

        loop {
            tokio::select! {
                _ = tokio::time::sleep(settings.restart_reset_window()) => {
                    restart_count.store(0, Ordering::SeqCst);
                }
                _ = disconnected.notified() => break,
            }
        }

        if holder.is_marked() {
            // Already superseded by a newer holder (periodic restart raced
            // the disconnect); that holder's own loop owns recovery now.
            return;
        }

        holder.mark_for_collection();
        health.set(BROWSER, Health::Unhealthy);
        crate::process::sleep_for(settings.restart_delay).await;
    }
}
