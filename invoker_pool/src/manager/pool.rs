//manager/pool.rs
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::alert::{AlertSink, TracingAlerts};
use crate::config::{load_pool_config_from_json, PoolConfig};
use crate::container::probe::{DockerProbe, SandboxProbe};
use crate::error::PoolError;
use crate::manager::queue::Queue;
use crate::protocol::{read_frame, write_frame, ProtocolError, TestingRequest, TestingResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Free,
    Busy,
}

/// Which sandbox served a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerSignature {
    pub id: String,
    pub port: u16,
}

impl fmt::Display for WorkerSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.port)
    }
}

/// A response together with the worker that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub response: TestingResponse,
    pub worker: WorkerSignature,
}

/// Runs one request on some sandbox. Implemented by [`InvokerPool`]; tests
/// substitute their own.
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(&self, request: &TestingRequest) -> Result<Execution, PoolError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub total: usize,
    pub free: usize,
    /// Includes quarantined slots.
    pub busy: usize,
    pub quarantined: usize,
}

pub struct PoolOptions {
    /// Bound on connecting and on waiting for a response.
    pub timeout: Duration,
    pub alerts: Arc<dyn AlertSink>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(common::config::invoker_timeout_secs()),
            alerts: Arc::new(TracingAlerts),
        }
    }
}

struct Slot {
    id: String,
    status: Status,
    /// Sandbox found dead on release; kept Busy until revived.
    quarantined: bool,
}

struct PoolState {
    slots: BTreeMap<u16, Slot>,
    queue: Queue,
}

impl PoolState {
    fn live(&self) -> usize {
        self.slots.values().filter(|s| !s.quarantined).count()
    }

    /// Returns `port` to rotation and marks it Free unless a waiter took it.
    fn requeue(&mut self, port: u16) {
        let handed_off = self.queue.release_slot(port);
        if let Some(slot) = self.slots.get_mut(&port) {
            slot.status = if handed_off { Status::Busy } else { Status::Free };
        }
    }
}

struct Inner {
    host: String,
    timeout: Duration,
    probe: Arc<dyn SandboxProbe>,
    alerts: Arc<dyn AlertSink>,
    state: Mutex<PoolState>,
}

/// Fixed set of sandbox workers handed out one request at a time.
#[derive(Clone)]
pub struct InvokerPool {
    inner: Arc<Inner>,
}

impl InvokerPool {
    pub fn new(config: &PoolConfig, probe: Arc<dyn SandboxProbe>) -> Result<Self, PoolError> {
        Self::with_options(config, probe, PoolOptions::default())
    }

    pub fn with_options(
        config: &PoolConfig,
        probe: Arc<dyn SandboxProbe>,
        options: PoolOptions,
    ) -> Result<Self, PoolError> {
        let slots = config.slots()?;
        let queue = Queue::new(slots.iter().map(|(port, _)| *port));
        let slots = slots
            .into_iter()
            .map(|(port, id)| {
                let slot = Slot {
                    id,
                    status: Status::Free,
                    quarantined: false,
                };
                (port, slot)
            })
            .collect();

        Ok(Self {
            inner: Arc::new(Inner {
                host: config.host.clone(),
                timeout: options.timeout,
                probe,
                alerts: options.alerts,
                state: Mutex::new(PoolState { slots, queue }),
            }),
        })
    }

    /// Reads `invokers.json` and probes workers as Docker containers.
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> Result<Self, PoolError> {
        let config = load_pool_config_from_json(path)?;
        Self::new(&config, Arc::new(DockerProbe::from_config()))
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn bind(&self, state: &mut PoolState, port: u16) -> Result<InvokerHandle, PoolError> {
        let slot = state
            .slots
            .get_mut(&port)
            .ok_or(PoolError::UnknownSlot(port))?;
        slot.status = Status::Busy;
        Ok(InvokerHandle {
            pool: self.clone(),
            signature: WorkerSignature {
                id: slot.id.clone(),
                port,
            },
            used: false,
            released: false,
        })
    }

    /// Waits for a free slot. Fails with [`PoolError::NoLiveSlots`] once
    /// every slot is quarantined.
    pub async fn acquire(&self) -> Result<InvokerHandle, PoolError> {
        let rx = {
            let mut state = self.lock();
            if state.live() == 0 {
                return Err(PoolError::NoLiveSlots);
            }
            match state.queue.try_acquire_slot() {
                Ok(port) => return self.bind(&mut state, port),
                Err(rx) => rx,
            }
        };

        let mut pending = PendingSlot {
            rx: Some(rx),
            pool: self.clone(),
        };
        let port = pending.wait().await?;
        let mut state = self.lock();
        self.bind(&mut state, port)
    }

    /// Puts a slot back in rotation after confirming its sandbox still runs.
    /// A dead sandbox is quarantined and reported with its logs.
    pub async fn release(&self, port: u16) -> Result<(), PoolError> {
        let id = {
            let state = self.lock();
            let slot = state.slots.get(&port).ok_or(PoolError::UnknownSlot(port))?;
            if slot.status == Status::Free || slot.quarantined {
                return Ok(());
            }
            slot.id.clone()
        };

        if !self.inner.probe.is_running(&id).await {
            let logs = self.inner.probe.logs(&id).await;
            warn!(port, id = %id, "Container on port {} failed", port);
            {
                let mut state = self.lock();
                if let Some(slot) = state.slots.get_mut(&port) {
                    slot.quarantined = true;
                    slot.status = Status::Busy;
                }
                if state.live() == 0 {
                    state.queue.drop_waiters();
                }
            }
            self.inner
                .alerts
                .alert(&format!("Invoker {id}:{port} failed:\n{logs}"));
            return Err(PoolError::FailedSandbox { id, port, logs });
        }

        self.lock().requeue(port);
        info!("Released port {}", port);
        Ok(())
    }

    /// Returns a quarantined slot to rotation if its sandbox is running
    /// again. `Ok(false)` means it is still down.
    pub async fn revive(&self, port: u16) -> Result<bool, PoolError> {
        let id = {
            let state = self.lock();
            let slot = state.slots.get(&port).ok_or(PoolError::UnknownSlot(port))?;
            if !slot.quarantined {
                return Ok(true);
            }
            slot.id.clone()
        };

        if !self.inner.probe.is_running(&id).await {
            return Ok(false);
        }

        let mut state = self.lock();
        if let Some(slot) = state.slots.get_mut(&port) {
            if !slot.quarantined {
                return Ok(true);
            }
            slot.quarantined = false;
        }
        state.requeue(port);
        info!(port, id = %id, "Invoker revived");
        Ok(true)
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        let state = self.lock();
        let total = state.slots.len();
        let free = state
            .slots
            .values()
            .filter(|s| s.status == Status::Free)
            .count();
        PoolSnapshot {
            total,
            free,
            busy: total - free,
            quarantined: total - state.live(),
        }
    }

    pub fn workers(&self) -> Vec<WorkerSignature> {
        self.lock()
            .slots
            .iter()
            .map(|(port, slot)| WorkerSignature {
                id: slot.id.clone(),
                port: *port,
            })
            .collect()
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }
}

#[async_trait]
impl Invoker for InvokerPool {
    async fn invoke(&self, request: &TestingRequest) -> Result<Execution, PoolError> {
        let mut handle = self.acquire().await?;
        let worker = handle.signature().clone();
        let exchanged = handle.exchange(request).await;
        handle.release().await?;
        Ok(Execution {
            response: exchanged?,
            worker,
        })
    }
}

/// A waiter's claim on the next released port. If the acquirer goes away
/// after a port was handed over, the port is put back.
struct PendingSlot {
    rx: Option<oneshot::Receiver<u16>>,
    pool: InvokerPool,
}

impl PendingSlot {
    async fn wait(&mut self) -> Result<u16, PoolError> {
        let rx = self.rx.as_mut().ok_or(PoolError::NoLiveSlots)?;
        let port = rx.await.map_err(|_| PoolError::NoLiveSlots)?;
        self.rx = None;
        Ok(port)
    }
}

impl Drop for PendingSlot {
    fn drop(&mut self) {
        if let Some(mut rx) = self.rx.take() {
            rx.close();
            if let Ok(port) = rx.try_recv() {
                self.pool.lock().requeue(port);
            }
        }
    }
}

/// Exclusive use of one worker slot for a single request.
///
/// Call [`release`](InvokerHandle::release) when done. A handle dropped
/// without it is released in the background.
pub struct InvokerHandle {
    pool: InvokerPool,
    signature: WorkerSignature,
    used: bool,
    released: bool,
}

impl InvokerHandle {
    pub fn signature(&self) -> &WorkerSignature {
        &self.signature
    }

    /// Sends `request` and waits for the response. A worker that does not
    /// answer in time, or answers with an unreadable frame, yields a
    /// `CheckFailed` response rather than an error.
    pub async fn exchange(&mut self, request: &TestingRequest) -> Result<TestingResponse, PoolError> {
        if self.used {
            return Err(PoolError::HandleReused);
        }
        self.used = true;

        let inner = &self.pool.inner;
        let port = self.signature.port;
        let mut stream = timeout(inner.timeout, TcpStream::connect((inner.host.as_str(), port)))
            .await
            .map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("connecting to port {port} timed out"),
                )
            })??;
        info!("Connected on port {}", port);

        write_frame(&mut stream, request).await?;

        match timeout(inner.timeout, read_frame::<_, TestingResponse>(&mut stream)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(ProtocolError::Io(e))) => Err(PoolError::Io(e)),
            Ok(Err(e)) => {
                warn!(worker = %self.signature, error = %e, "unreadable invoker response");
                Ok(TestingResponse::check_failed(format!(
                    "malformed response from invoker {}: {}",
                    self.signature, e
                )))
            }
            Err(_) => {
                let logs = inner.probe.logs(&self.signature.id).await;
                inner.alerts.alert(&format!(
                    "Invoker {} not responding:\n{}",
                    self.signature, logs
                ));
                Ok(TestingResponse::check_failed(format!(
                    "invoker failed to respond in {}s",
                    inner.timeout.as_secs_f64()
                )))
            }
        }
    }

    pub async fn release(mut self) -> Result<(), PoolError> {
        self.released = true;
        self.pool.release(self.signature.port).await
    }
}

impl Drop for InvokerHandle {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let pool = self.pool.clone();
        let port = self.signature.port;
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = pool.release(port).await {
                        warn!(port, error = %e, "background release failed");
                    }
                });
            }
            Err(_) => warn!(port, "handle dropped outside a runtime; slot stays busy"),
        }
    }
}
