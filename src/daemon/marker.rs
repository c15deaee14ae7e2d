//! Cross-process run marker
//!
//! A host may kill and later relaunch the listener process. The marker file
//! lets a fresh process see that another instance already holds the listen
//! port before it tries to bind again.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::errors::{AppError, AppResult, ErrorContextExt};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerRecord {
    pub pid: u32,
    pub port: u16,
    pub started_at: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkerStatus {
    Absent,
    /// Written by a process that is still alive
    Live(MarkerRecord),
    /// Left behind by a process that has exited, or unreadable
    Stale(Option<MarkerRecord>),
}

#[derive(Debug, Clone)]
pub struct RunMarker {
    path: PathBuf,
}

impl RunMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the marker without modifying it
    pub fn inspect(&self) -> AppResult<MarkerStatus> {
        if !self.path.exists() {
            return Ok(MarkerStatus::Absent);
        }

        let content =
            fs::read_to_string(&self.path).in_file_operation(&self.path, "read run marker")?;
        let record = match serde_json::from_str::<MarkerRecord>(&content) {
            Ok(record) => record,
            Err(e) => {
                debug!("Run marker is not valid JSON: {}", e);
                return Ok(MarkerStatus::Stale(None));
            }
        };

        if is_process_running(record.pid) {
            Ok(MarkerStatus::Live(record))
        } else {
            Ok(MarkerStatus::Stale(Some(record)))
        }
    }

    /// Fail with `AlreadyRunning` if another live process owns the marker.
    /// Stale or invalid markers are removed.
    pub fn check(&self) -> AppResult<()> {
        match self.inspect()? {
            MarkerStatus::Absent => Ok(()),
            MarkerStatus::Live(record) if record.pid == std::process::id() => {
                debug!("Run marker belongs to this process");
                Ok(())
            }
            MarkerStatus::Live(record) => Err(AppError::AlreadyRunning { pid: record.pid }),
            MarkerStatus::Stale(record) => {
                match record {
                    Some(r) => info!("Removing stale run marker left by PID {}", r.pid),
                    None => info!("Removing invalid run marker"),
                }
                self.remove()
            }
        }
    }

    pub fn write(&self, port: u16) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).in_file_operation(parent, "create marker directory")?;
        }

        let record = MarkerRecord {
            pid: std::process::id(),
            port,
            started_at: Local::now(),
        };
        let content = serde_json::to_string(&record)?;
        fs::write(&self.path, content).in_file_operation(&self.path, "write run marker")?;
        debug!("Run marker written to {}", self.path.display());
        Ok(())
    }

    pub fn remove(&self) -> AppResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!("Failed to remove run marker {}: {}", self.path.display(), e);
                Err(AppError::io_with_source(&self.path, "remove run marker", e))
            }
        }
    }
}

/// Check if a process is running by PID
pub fn is_process_running(pid: u32) -> bool {
    #[cfg(unix)]
    {
        let Ok(pid) = libc::pid_t::try_from(pid) else {
            return false;
        };
        // signal 0 probes for existence; EPERM means it exists under another user
        let rc = unsafe { libc::kill(pid, 0) };
        rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
    }

    #[cfg(windows)]
    {
        use std::process::Command;

        Command::new("tasklist")
            .arg("/FI")
            .arg(format!("PID eq {}", pid))
            .output()
            .map(|output| {
                output.status.success()
                    && String::from_utf8_lossy(&output.stdout).contains(&pid.to_string())
            })
            .unwrap_or(false)
    }
}

/// Ask the process to shut down gracefully
pub fn terminate(pid: u32) -> AppResult<()> {
    #[cfg(unix)]
    {
        let target = libc::pid_t::try_from(pid)
            .map_err(|_| AppError::internal(format!("PID {} out of range", pid)))?;
        let rc = unsafe { libc::kill(target, libc::SIGTERM) };
        if rc != 0 {
            return Err(AppError::internal(format!(
                "failed to signal PID {}: {}",
                pid,
                std::io::Error::last_os_error()
            )));
        }
        Ok(())
    }

    #[cfg(windows)]
    {
        let status = std::process::Command::new("taskkill")
            .arg("/PID")
            .arg(pid.to_string())
            .status()?;
        if !status.success() {
            return Err(AppError::internal(format!("taskkill failed for PID {}", pid)));
        }
        Ok(())
    }
}
