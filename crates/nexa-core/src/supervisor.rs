// ── Supervisor ──
//
// Owns every configured device: its stored entry, its running session,
// and its entity. Discovery admissions, unloads and device-initiated
// removals all go through here, so sessions never reach into the entry
// store themselves.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use nexa_api::Connector;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SessionSettings;
use crate::discovery::{self, Advertisement};
use crate::entity::Entity;
use crate::error::CoreError;
use crate::model::DeviceEntry;
use crate::session::{DeviceSession, SessionRequest};
use crate::store::EntryStore;

/// Outcome of admitting a discovered device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// New entry created.
    Created(DeviceEntry),
    /// Known device at a new address; the entry was updated and its
    /// session restarted.
    HostUpdated {
        entry: DeviceEntry,
        previous_host: String,
    },
    /// Known device at the same address; nothing changed.
    AlreadyConfigured(DeviceEntry),
}

impl Admission {
    pub fn entry(&self) -> &DeviceEntry {
        match self {
            Self::Created(entry)
            | Self::HostUpdated { entry, .. }
            | Self::AlreadyConfigured(entry) => entry,
        }
    }
}

struct DeviceHandle {
    session: DeviceSession,
    entity: Arc<Entity>,
}

// ── Supervisor ───────────────────────────────────────────────────

/// Cheaply cloneable owner of all device sessions.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<SupervisorInner>,
}

struct SupervisorInner {
    settings: SessionSettings,
    store: Arc<dyn EntryStore>,
    connector: Arc<dyn Connector>,
    devices: Mutex<HashMap<String, DeviceHandle>>,
    request_tx: mpsc::UnboundedSender<SessionRequest>,
    request_rx: Mutex<Option<mpsc::UnboundedReceiver<SessionRequest>>>,
    running: AtomicBool,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Supervisor {
    /// Create a supervisor. Nothing connects until [`start`](Self::start)
    /// or [`start_entry`](Self::start_entry).
    pub fn new(
        settings: SessionSettings,
        store: Arc<dyn EntryStore>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let (request_tx, request_rx) = mpsc::unbounded_channel();

        Self {
            inner: Arc::new(SupervisorInner {
                settings,
                store,
                connector,
                devices: Mutex::new(HashMap::new()),
                request_tx,
                request_rx: Mutex::new(Some(request_rx)),
                running: AtomicBool::new(false),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.inner.settings
    }

    pub fn store(&self) -> &Arc<dyn EntryStore> {
        &self.inner.store
    }

    /// Set up a session for every stored entry. Returns how many started.
    pub async fn start(&self) -> Result<usize, CoreError> {
        self.ensure_running().await;

        let mut started = 0;
        for entry in self.inner.store.entries()? {
            match self.setup_entry(entry).await {
                Ok(_) => started += 1,
                Err(CoreError::AlreadyConfigured { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        info!(devices = started, "supervisor started");
        Ok(started)
    }

    /// Start only the stored entry matching `identifier` (device id or
    /// name, case-insensitive).
    pub async fn start_entry(&self, identifier: &str) -> Result<Arc<Entity>, CoreError> {
        self.ensure_running().await;

        let entry = self.find_entry(identifier)?;
        if let Some(entity) = self.entity(&entry.device_id).await {
            return Ok(entity);
        }
        self.setup_entry(entry).await
    }

    /// Look up a stored entry by device id, then by name.
    pub fn find_entry(&self, identifier: &str) -> Result<DeviceEntry, CoreError> {
        if let Some(entry) = self.inner.store.get(identifier)? {
            return Ok(entry);
        }
        self.inner
            .store
            .entries()?
            .into_iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(identifier))
            .ok_or_else(|| CoreError::DeviceNotFound {
                identifier: identifier.to_owned(),
            })
    }

    /// Create, register and start the session for one entry.
    pub async fn setup_entry(&self, entry: DeviceEntry) -> Result<Arc<Entity>, CoreError> {
        let mut devices = self.inner.devices.lock().await;
        if devices.contains_key(&entry.device_id) {
            return Err(CoreError::AlreadyConfigured {
                identifier: entry.device_id,
            });
        }

        let session = DeviceSession::new(
            entry.clone(),
            &self.inner.settings,
            Arc::clone(&self.inner.connector),
            self.inner.request_tx.clone(),
        )?;
        let entity = session.create_entity();
        session.start().await;

        info!(
            device = %entry.name,
            platform = %entry.platform,
            url = %session.url(),
            "set up device"
        );
        devices.insert(
            entry.device_id,
            DeviceHandle {
                session,
                entity: Arc::clone(&entity),
            },
        );
        Ok(entity)
    }

    /// Stop the session for `device_id` and drop its entity. The stored
    /// entry is kept. Returns `false` if nothing was running.
    pub async fn unload_entry(&self, device_id: &str) -> bool {
        let handle = self.inner.devices.lock().await.remove(device_id);
        let Some(handle) = handle else {
            return false;
        };

        handle.session.shutdown().await;
        debug!(device = %handle.entity.name(), "unloaded device");
        true
    }

    /// Forget a device: delete its stored entry, then unload it.
    ///
    /// Idempotent. Returns `false` (with a warning) when there was no entry.
    pub async fn remove_entry(&self, device_id: &str) -> Result<bool, CoreError> {
        let Some(entry) = self.inner.store.remove(device_id)? else {
            warn!(device_id, "could not find config entry to remove");
            return Ok(false);
        };

        info!(device = %entry.name, device_id, "removing device");
        self.unload_entry(device_id).await;
        Ok(true)
    }

    /// Validate a discovered device and configure it.
    ///
    /// A known device at a new host gets its host updated (and, while
    /// running, its session restarted on the new address).
    pub async fn admit(&self, ad: &Advertisement) -> Result<Admission, CoreError> {
        let candidate = discovery::evaluate(ad, &self.inner.settings.min_firmware)?;

        let admission = match self.inner.store.get(&candidate.device_id)? {
            Some(existing) if existing.host == candidate.host => {
                debug!(device = %existing.name, "device already configured");
                return Ok(Admission::AlreadyConfigured(existing));
            }
            Some(mut existing) => {
                let previous_host = std::mem::replace(&mut existing.host, candidate.host);
                info!(
                    device = %existing.name,
                    %previous_host,
                    host = %existing.host,
                    "device moved; updating host"
                );
                self.inner.store.upsert(existing.clone())?;
                Admission::HostUpdated {
                    entry: existing,
                    previous_host,
                }
            }
            None => {
                info!(
                    "automatically configuring discovered {}: {} ({}) at {}",
                    candidate.platform, candidate.name, candidate.model, candidate.host
                );
                self.inner.store.upsert(candidate.clone())?;
                Admission::Created(candidate)
            }
        };

        if self.inner.running.load(Ordering::SeqCst) {
            let entry = admission.entry().clone();
            self.unload_entry(&entry.device_id).await;
            self.setup_entry(entry).await?;
        }
        Ok(admission)
    }

    /// The live entity for `device_id`, if its session is running.
    pub async fn entity(&self, device_id: &str) -> Option<Arc<Entity>> {
        self.inner
            .devices
            .lock()
            .await
            .get(device_id)
            .map(|handle| Arc::clone(&handle.entity))
    }

    /// All live entities, ordered by device id.
    pub async fn entities(&self) -> Vec<Arc<Entity>> {
        let devices = self.inner.devices.lock().await;
        let mut entities: Vec<_> = devices.values().map(|h| Arc::clone(&h.entity)).collect();
        entities.sort_by(|a, b| a.device_id().cmp(b.device_id()));
        entities
    }

    pub fn entries(&self) -> Result<Vec<DeviceEntry>, CoreError> {
        self.inner.store.entries()
    }

    /// Wait until the session for `device_id` reports the device
    /// available.
    pub async fn wait_available(&self, device_id: &str, timeout: Duration) -> Result<(), CoreError> {
        let mut availability = {
            let devices = self.inner.devices.lock().await;
            let handle = devices
                .get(device_id)
                .ok_or_else(|| CoreError::DeviceNotFound {
                    identifier: device_id.to_owned(),
                })?;
            handle.session.availability()
        };

        match tokio::time::timeout(timeout, availability.wait_for(|available| *available)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(CoreError::NotConnected {
                device: device_id.to_owned(),
            }),
            Err(_) => Err(CoreError::Timeout {
                timeout_secs: timeout.as_secs(),
            }),
        }
    }

    /// Stop the request processor and every session.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.inner.running.store(false, Ordering::SeqCst);

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        let devices: Vec<DeviceHandle> = self
            .inner
            .devices
            .lock()
            .await
            .drain()
            .map(|(_, handle)| handle)
            .collect();
        for handle in &devices {
            handle.session.shutdown().await;
        }
        debug!(devices = devices.len(), "supervisor stopped");
    }

    /// Spawn the request processor once.
    async fn ensure_running(&self) {
        if self.inner.cancel.is_cancelled() {
            return;
        }
        self.inner.running.store(true, Ordering::SeqCst);

        if let Some(rx) = self.inner.request_rx.lock().await.take() {
            let supervisor = self.clone();
            self.inner
                .task_handles
                .lock()
                .await
                .push(tokio::spawn(request_processor_task(supervisor, rx)));
        }
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("settings", &self.inner.settings)
            .field("running", &self.inner.running.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Handle requests posted by sessions.
async fn request_processor_task(
    supervisor: Supervisor,
    mut rx: mpsc::UnboundedReceiver<SessionRequest>,
) {
    let cancel = supervisor.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            request = rx.recv() => {
                let Some(request) = request else { break };
                match request {
                    SessionRequest::RemoveEntry { device_id } => {
                        if let Err(e) = supervisor.remove_entry(&device_id).await {
                            warn!(%device_id, error = %e, "failed to remove device");
                        }
                    }
                }
            }
        }
    }
}
