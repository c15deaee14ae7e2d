//! Wake-preventing hold
//!
//! While the listener runs the host must not suspend networking. The hold is
//! never taken indefinitely: a [`WakeLease`] acquires it for a bounded
//! duration and a renewal task extends it periodically until the lease is
//! released. If renewal stops for any reason the hold lapses on its own.

use flume::Sender;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};

use crate::errors::{AppError, AppResult};
use crate::shared::config::{WakeHoldBackend, WakeHoldConfig};

pub trait WakeHold: Send + Sync {
    /// Take (or extend) the hold for `duration` from now.
    fn acquire(&self, duration: Duration) -> AppResult<()>;

    fn release(&self) -> AppResult<()>;
}

/// For hosts where suspension is not a concern
#[derive(Debug, Default)]
pub struct NoWakeHold;

impl WakeHold for NoWakeHold {
    fn acquire(&self, duration: Duration) -> AppResult<()> {
        debug!("Wake hold not configured, skipping acquire for {:?}", duration);
        Ok(())
    }

    fn release(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Blocks sleep through `systemd-inhibit` wrapped around a `sleep` child
/// whose lifetime is the hold's duration.
#[derive(Debug, Default)]
pub struct SystemdInhibitHold {
    child: Mutex<Option<Child>>,
}

impl SystemdInhibitHold {
    pub fn new() -> Self {
        Self::default()
    }

    fn spawn_inhibitor(duration: Duration) -> AppResult<Child> {
        Command::new("systemd-inhibit")
            .arg("--what=sleep:idle")
            .arg("--who=cry-monitor")
            .arg("--why=Listening for cry alerts")
            .arg("--mode=block")
            .arg("sleep")
            .arg(duration.as_secs().max(1).to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AppError::wake_hold_with_source("failed to spawn systemd-inhibit", e))
    }

    fn stop_child(mut child: Child) {
        if let Err(e) = child.kill() {
            debug!("Inhibitor already exited: {}", e);
        }
        let _ = child.wait();
    }
}

impl WakeHold for SystemdInhibitHold {
    fn acquire(&self, duration: Duration) -> AppResult<()> {
        // start the replacement before dropping the old one so the hold never gaps
        let next = Self::spawn_inhibitor(duration)?;
        let mut slot = self
            .child
            .lock()
            .map_err(|_| AppError::wake_hold("inhibitor lock poisoned"))?;
        if let Some(previous) = slot.replace(next) {
            Self::stop_child(previous);
        }
        debug!("systemd-inhibit hold taken for {:?}", duration);
        Ok(())
    }

    fn release(&self) -> AppResult<()> {
        let mut slot = self
            .child
            .lock()
            .map_err(|_| AppError::wake_hold("inhibitor lock poisoned"))?;
        if let Some(child) = slot.take() {
            Self::stop_child(child);
            debug!("systemd-inhibit hold released");
        }
        Ok(())
    }
}

/// Counts calls; used by tests and dry runs
#[derive(Debug, Default)]
pub struct RecordingWakeHold {
    acquisitions: AtomicUsize,
    releases: AtomicUsize,
    held: AtomicBool,
}

impl RecordingWakeHold {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

impl WakeHold for RecordingWakeHold {
    fn acquire(&self, _duration: Duration) -> AppResult<()> {
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        self.held.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self) -> AppResult<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.held.store(false, Ordering::SeqCst);
        Ok(())
    }
}

pub fn create_wake_hold(config: &WakeHoldConfig) -> Arc<dyn WakeHold> {
    match config.backend {
        WakeHoldBackend::None => Arc::new(NoWakeHold),
        WakeHoldBackend::SystemdInhibit => Arc::new(SystemdInhibitHold::new()),
    }
}

/// A held wake lock with a bounded expiry and a renewal task
///
/// Must be created inside a tokio runtime. Dropping the lease without
/// calling [`WakeLease::release`] still stops renewal and releases the hold.
pub struct WakeLease {
    hold: Arc<dyn WakeHold>,
    issued: Instant,
    expires_after_ms: Arc<AtomicU64>,
    stop: Option<Sender<()>>,
    renewal: Option<JoinHandle<()>>,
    released: bool,
}

impl WakeLease {
    pub fn acquire(
        hold: Arc<dyn WakeHold>,
        duration: Duration,
        renew_every: Duration,
    ) -> AppResult<Self> {
        hold.acquire(duration)?;

        let issued = Instant::now();
        let expires_after_ms = Arc::new(AtomicU64::new(duration.as_millis() as u64));
        let (stop, stop_rx) = flume::bounded::<()>(1);

        let renewal = tokio::spawn({
            let hold = Arc::clone(&hold);
            let expires_after_ms = Arc::clone(&expires_after_ms);
            async move {
                let mut ticks = interval_at(issued + renew_every, renew_every);
                loop {
                    tokio::select! {
                        _ = stop_rx.recv_async() => break,
                        tick = ticks.tick() => {
                            match hold.acquire(duration) {
                                Ok(()) => {
                                    let expiry = tick.duration_since(issued) + duration;
                                    expires_after_ms
                                        .store(expiry.as_millis() as u64, Ordering::SeqCst);
                                    debug!("Wake hold renewed for {:?}", duration);
                                }
                                Err(e) => warn!(
                                    category = e.category(),
                                    "Wake hold renewal failed, hold will lapse: {}", e
                                ),
                            }
                        }
                    }
                }
            }
        });

        info!(
            "Wake hold acquired for {:?}, renewing every {:?}",
            duration, renew_every
        );

        Ok(Self {
            hold,
            issued,
            expires_after_ms,
            stop: Some(stop),
            renewal: Some(renewal),
            released: false,
        })
    }

    /// When the hold lapses unless renewed again
    pub fn expires_at(&self) -> Instant {
        self.issued + Duration::from_millis(self.expires_after_ms.load(Ordering::SeqCst))
    }

    /// Stop renewing, wait for the renewal task and release the hold.
    pub async fn release(mut self) -> AppResult<()> {
        self.released = true;
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(renewal) = self.renewal.take() {
            if let Err(e) = renewal.await {
                warn!("Wake hold renewal task ended abnormally: {}", e);
            }
        }
        self.hold.release()?;
        info!("Wake hold released");
        Ok(())
    }
}

impl Drop for WakeLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Some(renewal) = self.renewal.take() {
            renewal.abort();
        }
        if let Err(e) = self.hold.release() {
            warn!(category = e.category(), "Failed to release wake hold: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_lease_renews_until_released() {
        let hold = Arc::new(RecordingWakeHold::new());
        let lease = WakeLease::acquire(
            hold.clone(),
            Duration::from_secs(600),
            Duration::from_secs(300),
        )
        .unwrap();
        let first_expiry = lease.expires_at();
        assert_eq!(hold.acquisitions(), 1);
        assert!(hold.is_held());

        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(hold.acquisitions(), 2);
        assert!(lease.expires_at() > first_expiry);

        lease.release().await.unwrap();
        assert_eq!(hold.releases(), 1);
        assert!(!hold.is_held());

        tokio::time::sleep(Duration::from_secs(900)).await;
        assert_eq!(hold.acquisitions(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_is_bounded() {
        let hold = Arc::new(RecordingWakeHold::new());
        let start = Instant::now();
        let lease =
            WakeLease::acquire(hold, Duration::from_secs(60), Duration::from_secs(30)).unwrap();
        assert!(lease.expires_at() <= start + Duration::from_secs(61));
        lease.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_drop_releases_hold() {
        let hold = Arc::new(RecordingWakeHold::new());
        {
            let _lease = WakeLease::acquire(
                hold.clone(),
                Duration::from_secs(10),
                Duration::from_secs(5),
            )
            .unwrap();
        }
        assert_eq!(hold.releases(), 1);
        assert!(!hold.is_held());
    }

    #[tokio::test]
    async fn test_failed_acquire_yields_no_lease() {
        struct Refusing;
        impl WakeHold for Refusing {
            fn acquire(&self, _duration: Duration) -> AppResult<()> {
                Err(AppError::wake_hold("denied"))
            }
            fn release(&self) -> AppResult<()> {
                panic!("nothing to release");
            }
        }

        let result = WakeLease::acquire(
            Arc::new(Refusing),
            Duration::from_secs(10),
            Duration::from_secs(5),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_create_from_config() {
        let config = WakeHoldConfig::default();
        let hold = create_wake_hold(&config);
        assert!(hold.acquire(Duration::from_secs(1)).is_ok());
        assert!(hold.release().is_ok());
    }
}
