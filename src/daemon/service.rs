//! Lifecycle manager
//!
//! Owns the Stopped -> Starting -> Running -> Stopping -> Stopped state
//! machine. A running period holds three resources together: the listener
//! task (and through it the socket), the wake lease and the monitoring
//! indicator. `start` and `stop` are serialized by a lifecycle lock and are
//! both idempotent.

use flume::Sender;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::dispatcher::AlertDispatcher;
use super::listener::{ListenerSettings, ListenerStats, StatsSnapshot, UdpListener};
use super::marker::RunMarker;
use super::publisher::EventPublisher;
use super::state::{ServiceState, StateEvent, StatusHandle};
use super::wake::{create_wake_hold, NoWakeHold, WakeHold, WakeLease};
use crate::alert::AlertEvent;
use crate::config::ConfigManager;
use crate::errors::AppResult;
use crate::notify::{
    create_surface, ConsoleSurface, FilePreferenceStore, NoActuator, Notification,
    NotificationSurface, Notifier, TemplateEngine, MONITORING_ID,
};
use crate::shared::config::WakeHoldConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started(SocketAddr),
    /// `start` was called while a running period was already active
    AlreadyRunning(SocketAddr),
}

impl StartOutcome {
    pub fn local_addr(&self) -> SocketAddr {
        match self {
            StartOutcome::Started(addr) | StartOutcome::AlreadyRunning(addr) => *addr,
        }
    }
}

struct RunningParts {
    local_addr: SocketAddr,
    shutdown: Sender<()>,
    listener: JoinHandle<()>,
    lease: WakeLease,
    stats: Arc<ListenerStats>,
}

pub struct MonitorService {
    settings: ListenerSettings,
    dispatcher: Arc<AlertDispatcher>,
    indicator: Arc<dyn NotificationSurface>,
    wake_hold: Arc<dyn WakeHold>,
    hold_for: Duration,
    renew_every: Duration,
    marker: Option<RunMarker>,
    status: StatusHandle,
    running: Mutex<Option<RunningParts>>,
}

impl MonitorService {
    pub fn new(
        settings: ListenerSettings,
        dispatcher: AlertDispatcher,
        wake_hold: Arc<dyn WakeHold>,
        wake_config: &WakeHoldConfig,
    ) -> Self {
        let indicator = dispatcher.notifier().surface();
        Self {
            settings,
            dispatcher: Arc::new(dispatcher),
            indicator,
            wake_hold,
            hold_for: wake_config.hold_duration(),
            renew_every: wake_config.renew_interval(),
            marker: None,
            status: StatusHandle::new(),
            running: Mutex::new(None),
        }
    }

    /// Guard against a second process binding the same port
    pub fn with_marker(mut self, marker: RunMarker) -> Self {
        self.marker = Some(marker);
        self
    }

    /// Assemble the service from the on-disk configuration. A dry run prints
    /// notifications to the console and takes no wake hold.
    pub fn from_config(manager: &ConfigManager, dry_run: bool) -> AppResult<Self> {
        let config = manager.config();

        let surface: Arc<dyn NotificationSurface> = if dry_run {
            Arc::new(ConsoleSurface)
        } else {
            create_surface(&config.notifications)?
        };
        let wake_hold: Arc<dyn WakeHold> = if dry_run {
            Arc::new(NoWakeHold)
        } else {
            create_wake_hold(&config.wake_hold)
        };

        let notifier = Notifier::new(
            surface,
            Arc::new(NoActuator),
            Arc::new(FilePreferenceStore::new(manager.preferences_path())),
            TemplateEngine::with_overrides(&config.notifications.templates)?,
        );
        let dispatcher = AlertDispatcher::new(
            notifier,
            EventPublisher::new(),
            config.dispatch.high_confidence_threshold,
        );
        let settings = ListenerSettings::from_config(&config.listener)?;

        Ok(Self::new(settings, dispatcher, wake_hold, &config.wake_hold)
            .with_marker(RunMarker::new(manager.marker_path())))
    }

    pub fn status(&self) -> StatusHandle {
        self.status.clone()
    }

    pub fn state(&self) -> ServiceState {
        self.status.get()
    }

    pub fn subscribe_state(&self) -> broadcast::Receiver<StateEvent> {
        self.status.subscribe()
    }

    pub fn subscribe_alerts(&self) -> broadcast::Receiver<AlertEvent> {
        self.dispatcher.publisher().subscribe()
    }

    /// Bound address of the current running period
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|parts| parts.local_addr)
    }

    pub async fn stats(&self) -> Option<StatsSnapshot> {
        self.running.lock().await.as_ref().map(|parts| parts.stats.snapshot())
    }

    /// Begin a running period. A call while already running changes nothing
    /// and never attempts a second bind.
    pub async fn start(&self) -> AppResult<StartOutcome> {
        let mut running = self.running.lock().await;
        if let Some(parts) = running.as_ref() {
            if !parts.listener.is_finished() && self.status.is_running() {
                debug!("start() while running on {}, ignoring", parts.local_addr);
                return Ok(StartOutcome::AlreadyRunning(parts.local_addr));
            }
        }
        // the listener died under us; release what it left behind first
        if let Some(parts) = running.take() {
            warn!("Listener on {} is gone, cleaning up before restart", parts.local_addr);
            self.tear_down(parts).await;
        }

        self.status.set(ServiceState::Starting);
        match self.bring_up().await {
            Ok(parts) => {
                let addr = parts.local_addr;
                *running = Some(parts);
                Ok(StartOutcome::Started(addr))
            }
            Err(e) => {
                error!(category = e.category(), "Failed to start cry monitor: {}", e);
                self.status.set(ServiceState::Stopped);
                Err(e)
            }
        }
    }

    async fn bring_up(&self) -> AppResult<RunningParts> {
        if let Some(marker) = &self.marker {
            marker.check()?;
        }

        let lease =
            WakeLease::acquire(Arc::clone(&self.wake_hold), self.hold_for, self.renew_every)?;

        let listener = match UdpListener::bind(
            self.settings.clone(),
            Arc::clone(&self.dispatcher),
            self.status.clone(),
        )
        .await
        {
            Ok(listener) => listener,
            Err(e) => {
                if let Err(release_err) = lease.release().await {
                    warn!("Failed to release wake hold after bind failure: {}", release_err);
                }
                return Err(e);
            }
        };
        let local_addr = listener.local_addr();
        let stats = listener.stats();

        if let Err(e) = self
            .indicator
            .post(&Notification::monitoring_indicator(local_addr.port()))
        {
            warn!(category = e.category(), "Failed to show monitoring indicator: {}", e);
        }

        if let Some(marker) = &self.marker {
            if let Err(e) = marker.write(local_addr.port()) {
                warn!("Failed to write run marker: {}", e);
            }
        }

        // the loop runs only while the state reads Running
        self.status.set(ServiceState::Running);
        let (shutdown, shutdown_rx) = flume::bounded::<()>(1);
        let listener = tokio::spawn(listener.run(shutdown_rx));

        info!("Cry monitor running on {}", local_addr);
        Ok(RunningParts {
            local_addr,
            shutdown,
            listener,
            lease,
            stats,
        })
    }

    /// End the running period and wait for every resource to be released.
    /// Calling it while stopped does nothing.
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        let Some(parts) = running.take() else {
            debug!("stop() while stopped, ignoring");
            return;
        };

        self.status.set(ServiceState::Stopping);
        self.tear_down(parts).await;
        self.status.set(ServiceState::Stopped);
        info!("Cry monitor stopped");
    }

    async fn tear_down(&self, parts: RunningParts) {
        if parts.shutdown.send(()).is_err() {
            debug!("Listener already gone before shutdown signal");
        }
        if let Err(e) = parts.listener.await {
            warn!("Listener task ended abnormally: {}", e);
        }

        if let Err(e) = parts.lease.release().await {
            warn!(category = e.category(), "Failed to release wake hold: {}", e);
        }
        if let Err(e) = self.indicator.cancel(MONITORING_ID) {
            warn!(category = e.category(), "Failed to clear monitoring indicator: {}", e);
        }
        if let Some(marker) = &self.marker {
            if let Err(e) = marker.remove() {
                warn!("Failed to remove run marker: {}", e);
            }
        }
    }
}
