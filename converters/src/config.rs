//! Frozen runtime configuration, loaded once from the environment.
//!
//! This crate only needs the resolved values, not the layered-config
//! loading mechanism itself, which lives in the `gateway` binary. Every
//! field here is read-only after construction and shared behind an `Arc`
//! by every supervisor and the dispatcher.

use std::path::PathBuf;
use std::time::Duration;

/// Paths to the four external backend executables and the per-request
/// transport helper used to talk to a running office worker.
#[derive(Debug, Clone)]
pub struct BackendPaths {
    pub browser_executable: Option<PathBuf>,
    pub office_executable: PathBuf,
    pub markup_executable: Option<PathBuf>,
    pub transport_executable: PathBuf,
}

/// Frozen configuration shared by every component. Construct once at
/// startup and hand out clones (cheap: everything here is `Copy` or an
/// `Arc`-free small value) or wrap the whole thing in an `Arc`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub max_file_size: u64,
    pub max_concurrent_jobs: usize,
    pub max_queued_jobs: usize,
    pub max_resource_count: usize,
    pub max_restarts: u32,
    pub restart_delay: Duration,
    pub pdf_render_timeout: Duration,
    pub browser_launch_timeout: Duration,
    pub browser_restart_interval: Duration,
    pub office_launch_timeout: Duration,
    pub office_base_port: u16,
    pub temp_root: PathBuf,
    pub backends: BackendPaths,
}

impl Settings {
    /// Rolling window after which a worker's restart counter resets to
    /// zero: `RESTART_DELAY * MAX_RESTARTS * 2`.
    pub fn restart_reset_window(&self) -> Duration {
        self.restart_delay * self.max_restarts * 2
    }

    pub fn office_ports(&self) -> impl Iterator<Item = u16> + '_ {
        let base = self.office_base_port;
        (0..self.max_concurrent_jobs as u16).map(move |i| base + i)
    }
}

impl Default for Settings {
    /// Defaults matching the shipped base config, for use in tests that
    /// don't care about config loading.
    fn default() -> Self {
        Self {
            max_file_size: 128 * 1024 * 1024,
            max_concurrent_jobs: 6,
            max_queued_jobs: 128,
            max_resource_count: 16,
            max_restarts: 3,
            restart_delay: Duration::from_millis(5000),
            pdf_render_timeout: Duration::from_millis(150_000),
            browser_launch_timeout: Duration::from_millis(30_000),
            browser_restart_interval: Duration::from_millis(86_400_000),
            office_launch_timeout: Duration::from_millis(30_000),
            office_base_port: 2003,
            temp_root: std::env::temp_dir(),
            backends: BackendPaths {
                browser_executable: None,
                office_executable: PathBuf::from("office-worker"),
                markup_executable: None,
                transport_executable: PathBuf::from("office-transport"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_reset_window_is_the_derived_product() {
        let settings = Settings::default();
        assert_eq!(
            settings.restart_reset_window(),
            settings.restart_delay * settings.max_restarts * 2
        );
    }

    #[test]
    fn office_ports_span_base_to_base_plus_concurrency() {
        let mut settings = Settings::default();
        settings.office_base_port = 2003;
        settings.max_concurrent_jobs = 3;

        let ports: Vec<u16> = settings.office_ports().collect();
        assert_eq!(ports, vec![2003, 2004, 2005]);
    }
}
