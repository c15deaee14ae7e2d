//! UDP listener loop
//!
//! Receives broadcast datagrams, filters them through the trust policy and
//! hands accepted payloads to the parser and dispatcher, strictly in arrival
//! order. The loop owns its socket for its whole lifetime; the socket is
//! closed on every exit path.

use flume::Receiver;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::dispatcher::AlertDispatcher;
use super::state::{ServiceState, StatusHandle};
use super::trust::TrustPolicy;
use crate::alert::{decode_bytes, Tier};
use crate::errors::{AppError, AppResult};
use crate::shared::config::ListenerConfig;

#[derive(Debug, Clone)]
pub struct ListenerSettings {
    pub addr: SocketAddr,
    pub buffer_size: usize,
    pub retry_delay: Duration,
    pub trust: TrustPolicy,
}

impl ListenerSettings {
    pub fn from_config(config: &ListenerConfig) -> AppResult<Self> {
        Ok(Self {
            addr: config.socket_addr(),
            buffer_size: config.buffer_size,
            retry_delay: config.retry_delay(),
            trust: TrustPolicy::parse(&config.trusted_senders)?,
        })
    }
}

/// Counters shared between the loop and whoever wants to report on it
#[derive(Debug, Default)]
pub struct ListenerStats {
    received: AtomicU64,
    untrusted: AtomicU64,
    malformed: AtomicU64,
    dispatched: AtomicU64,
    receive_errors: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub received: u64,
    pub untrusted: u64,
    pub malformed: u64,
    pub dispatched: u64,
    pub receive_errors: u64,
}

impl ListenerStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            untrusted: self.untrusted.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
        }
    }
}

/// What happened to a single datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatagramOutcome {
    Dispatched(Tier),
    Untrusted,
    Malformed,
}

/// Per-datagram processing, independent of the socket
pub struct DatagramHandler {
    trust: TrustPolicy,
    dispatcher: Arc<AlertDispatcher>,
    stats: Arc<ListenerStats>,
}

impl DatagramHandler {
    pub fn new(trust: TrustPolicy, dispatcher: Arc<AlertDispatcher>) -> Self {
        Self {
            trust,
            dispatcher,
            stats: Arc::new(ListenerStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<ListenerStats> {
        Arc::clone(&self.stats)
    }

    pub fn handle(&self, payload: &[u8], sender: SocketAddr) -> DatagramOutcome {
        self.stats.received.fetch_add(1, Ordering::Relaxed);

        if !self.trust.allows(&sender.ip()) {
            self.stats.untrusted.fetch_add(1, Ordering::Relaxed);
            debug!(
                sender = %sender,
                bytes = payload.len(),
                "Dropping datagram from untrusted sender"
            );
            return DatagramOutcome::Untrusted;
        }

        match decode_bytes(payload) {
            Ok(alert) => {
                self.stats.dispatched.fetch_add(1, Ordering::Relaxed);
                DatagramOutcome::Dispatched(self.dispatcher.dispatch(alert))
            }
            Err(e) => {
                self.stats.malformed.fetch_add(1, Ordering::Relaxed);
                warn!(sender = %sender, category = "decode", "Dropping undecodable alert: {}", e);
                DatagramOutcome::Malformed
            }
        }
    }
}

pub struct UdpListener {
    socket: UdpSocket,
    local_addr: SocketAddr,
    buffer_size: usize,
    retry_delay: Duration,
    handler: DatagramHandler,
    status: StatusHandle,
}

impl UdpListener {
    /// Bind the listen socket with broadcast reception enabled. A failure
    /// here is fatal to startup.
    pub async fn bind(
        settings: ListenerSettings,
        dispatcher: Arc<AlertDispatcher>,
        status: StatusHandle,
    ) -> AppResult<Self> {
        let socket = UdpSocket::bind(settings.addr)
            .await
            .map_err(|e| AppError::bind(settings.addr, e))?;
        socket
            .set_broadcast(true)
            .map_err(|e| AppError::bind(settings.addr, e))?;
        let local_addr = socket
            .local_addr()
            .map_err(|e| AppError::bind(settings.addr, e))?;

        info!(
            addr = %local_addr,
            trusted = settings.trust.entries().len(),
            "Listening for cry alerts"
        );

        Ok(Self {
            socket,
            local_addr,
            buffer_size: settings.buffer_size,
            retry_delay: settings.retry_delay,
            handler: DatagramHandler::new(settings.trust, dispatcher),
            status,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> Arc<ListenerStats> {
        self.handler.stats()
    }

    /// Receive until `shutdown` fires (or its sender is dropped) or the
    /// service leaves the Running state.
    pub async fn run(self, shutdown: Receiver<()>) {
        let UdpListener {
            socket,
            local_addr,
            buffer_size,
            retry_delay,
            handler,
            status,
        } = self;

        let socket = scopeguard::guard(socket, move |socket| {
            drop(socket);
            info!(addr = %local_addr, "Listener socket closed");
        });
        // a loop that ends while the service still reads Running has died
        let status = scopeguard::guard(status, move |status| {
            if status.is_running() {
                error!(addr = %local_addr, "Listener loop ended unexpectedly");
                status.set(ServiceState::Stopped);
            }
        });

        receive_loop(&*socket, &handler, buffer_size, retry_delay, &status, &shutdown).await;

        let totals = handler.stats.snapshot();
        info!(
            received = totals.received,
            dispatched = totals.dispatched,
            untrusted = totals.untrusted,
            malformed = totals.malformed,
            receive_errors = totals.receive_errors,
            "Listener loop exited"
        );
    }
}

/// Where the loop reads datagrams from
pub trait DatagramSource: Send + Sync {
    fn receive(
        &self,
        buf: &mut [u8],
    ) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send;
}

impl DatagramSource for UdpSocket {
    async fn receive(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.recv_from(buf).await
    }
}

async fn receive_loop<S: DatagramSource>(
    source: &S,
    handler: &DatagramHandler,
    buffer_size: usize,
    retry_delay: Duration,
    status: &StatusHandle,
    shutdown: &Receiver<()>,
) {
    let mut buf = vec![0u8; buffer_size];

    while status.is_running() {
        tokio::select! {
            _ = shutdown.recv_async() => {
                debug!("Listener received shutdown signal");
                break;
            }

            result = source.receive(&mut buf) => match result {
                Ok((len, sender)) => {
                    handler.handle(&buf[..len], sender);
                }
                Err(e) => {
                    let err = AppError::receive(e);
                    handler.stats.receive_errors.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        category = err.category(),
                        "Receive failed, retrying in {:?}: {}", retry_delay, err
                    );

                    let cancelled = tokio::select! {
                        _ = shutdown.recv_async() => true,
                        _ = sleep(retry_delay) => false,
                    };
                    if cancelled {
                        debug!("Listener received shutdown signal during backoff");
                        break;
                    }
                }
            }
        }
    }
}
