//! Status and stop commands
//!
//! Both work from the run marker, so they can address a listener started
//! from another terminal or by a service manager.

use super::super::CliContext;
use anyhow::Result;
use cry_monitor::daemon::marker::{is_process_running, terminate};
use cry_monitor::daemon::{MarkerStatus, RunMarker};
use std::time::{Duration, Instant};
use tracing::{info, warn};

const STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Handler for status and stop
pub struct LifecycleHandler<'a> {
    context: &'a CliContext,
}

impl<'a> LifecycleHandler<'a> {
    pub fn new(context: &'a CliContext) -> Self {
        Self { context }
    }

    fn marker(&self) -> RunMarker {
        RunMarker::new(self.context.config_manager.marker_path())
    }

    pub fn handle_status(&self) -> Result<()> {
        match self.marker().inspect()? {
            MarkerStatus::Live(record) => {
                println!("Cry monitor is running");
                println!("  PID:     {}", record.pid);
                println!("  Port:    {}", record.port);
                println!("  Since:   {}", record.started_at.format("%Y-%m-%d %H:%M:%S"));
            }
            MarkerStatus::Stale(_) => {
                println!(
                    "Cry monitor is not running (stale marker at {})",
                    self.marker().path().display()
                );
            }
            MarkerStatus::Absent => println!("Cry monitor is not running"),
        }
        Ok(())
    }

    pub async fn handle_stop(&self) -> Result<()> {
        let marker = self.marker();
        let record = match marker.inspect()? {
            MarkerStatus::Live(record) => record,
            MarkerStatus::Stale(_) => {
                marker.remove()?;
                println!("Cry monitor is not running (removed stale marker)");
                return Ok(());
            }
            MarkerStatus::Absent => {
                println!("Cry monitor is not running");
                return Ok(());
            }
        };

        terminate(record.pid)?;
        info!("Sent stop signal to PID {}", record.pid);

        let start_time = Instant::now();
        while start_time.elapsed() < STOP_TIMEOUT {
            if !is_process_running(record.pid) {
                println!("Cry monitor stopped");
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        warn!("PID {} still running after {:?}", record.pid, STOP_TIMEOUT);
        Err(anyhow::anyhow!(
            "Cry monitor (PID {}) did not stop within {} seconds",
            record.pid,
            STOP_TIMEOUT.as_secs()
        ))
    }
}
