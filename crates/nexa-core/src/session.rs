// ── Device session ──
//
// One long-lived background task per configured device. The task
// connects to the device socket, logs in, dispatches inbound frames to
// the device's entity, and on any failure waits a fixed delay before
// trying again. It only stops when the session is shut down.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use nexa_api::websocket::{Message, classify, frame_text};
use nexa_api::{Connection, Connector, InboundMessage, OutboundFrame, parse_inbound};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::availability::AvailabilityBroadcaster;
use crate::command::ConnectionSlot;
use crate::config::SessionSettings;
use crate::entity::Entity;
use crate::error::CoreError;
use crate::model::DeviceEntry;

// ── SessionState ─────────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection; either not started or waiting to retry.
    Disconnected,
    Connecting { attempt: u32 },
    LoggingIn,
    Connected,
}

/// Requests a session posts to whoever owns its entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRequest {
    /// The device asked to be forgotten (`device_reset`).
    RemoveEntry { device_id: String },
}

// ── DeviceSession ────────────────────────────────────────────────

/// Connection lifecycle for one device.
///
/// Construct with [`new`](Self::new), create the entity with
/// [`create_entity`](Self::create_entity), then [`start`](Self::start) the
/// background task. [`shutdown`](Self::shutdown) stops it for good.
pub struct DeviceSession {
    inner: Arc<SessionInner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct SessionInner {
    entry: DeviceEntry,
    url: Url,
    retry_delay: Duration,
    connector: Arc<dyn Connector>,
    connection: Arc<ConnectionSlot>,
    availability: AvailabilityBroadcaster,
    state: watch::Sender<SessionState>,
    requests: mpsc::UnboundedSender<SessionRequest>,
    cancel: CancellationToken,
}

impl DeviceSession {
    pub fn new(
        entry: DeviceEntry,
        settings: &SessionSettings,
        connector: Arc<dyn Connector>,
        requests: mpsc::UnboundedSender<SessionRequest>,
    ) -> Result<Self, CoreError> {
        let url = settings.endpoint(&entry.host).url()?;
        let (state, _) = watch::channel(SessionState::Disconnected);

        Ok(Self {
            inner: Arc::new(SessionInner {
                connection: Arc::new(ConnectionSlot::new(entry.name.clone())),
                availability: AvailabilityBroadcaster::new(entry.name.clone()),
                entry,
                url,
                retry_delay: settings.retry_delay,
                connector,
                state,
                requests,
                cancel: CancellationToken::new(),
            }),
            task: Mutex::new(None),
        })
    }

    pub fn entry(&self) -> &DeviceEntry {
        &self.inner.entry
    }

    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    /// Build the device's entity, wired to this session's connection and
    /// availability. The session only keeps a weak reference: the caller
    /// owns the entity.
    pub fn create_entity(&self) -> Arc<Entity> {
        let entity = Entity::new(
            &self.inner.entry,
            Arc::clone(&self.inner.connection),
            self.inner.availability.is_available(),
        );
        self.inner.availability.register(&entity);
        entity
    }

    pub fn is_available(&self) -> bool {
        self.inner.availability.is_available()
    }

    pub fn availability(&self) -> watch::Receiver<bool> {
        self.inner.availability.subscribe()
    }

    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Spawn the connection loop. A no-op if it is already running or the
    /// session has been shut down.
    pub async fn start(&self) {
        let mut task = self.task.lock().await;
        if task.is_some() || self.inner.cancel.is_cancelled() {
            return;
        }
        debug!(device = %self.inner.entry.name, url = %self.inner.url, "starting session");
        *task = Some(tokio::spawn(connection_task(Arc::clone(&self.inner))));
    }

    /// Wait until the device is available, or fail after `timeout`.
    pub async fn wait_available(&self, timeout: Duration) -> Result<(), CoreError> {
        let mut rx = self.availability();
        match tokio::time::timeout(timeout, rx.wait_for(|available| *available)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(CoreError::Internal("availability channel closed".into())),
            Err(_) => Err(CoreError::Timeout {
                timeout_secs: timeout.as_secs(),
            }),
        }
    }

    /// Stop the loop, close the connection and mark the device
    /// unavailable. The session cannot be restarted afterwards.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        if let Some(handle) = self.task.lock().await.take() {
            if let Err(e) = handle.await {
                warn!(device = %self.inner.entry.name, error = %e, "session task ended abnormally");
            }
        }

        if let Some(mut sink) = self.inner.connection.clear().await {
            if let Err(e) = sink.close().await {
                debug!(device = %self.inner.entry.name, error = %e, "close on shutdown failed");
            }
        }

        self.inner.availability.set(false);
        self.inner.state.send_replace(SessionState::Disconnected);
        debug!(device = %self.inner.entry.name, "session stopped");
    }
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("device", &self.inner.entry.name)
            .field("url", &self.inner.url.as_str())
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

// ── Background task ──────────────────────────────────────────────

/// Connect, serve, wait, repeat. The wait is the same whatever ended the
/// previous attempt.
async fn connection_task(session: Arc<SessionInner>) {
    let cancel = session.cancel.clone();
    let mut attempt: u32 = 0;

    loop {
        attempt = attempt.saturating_add(1);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            () = session.connect_and_serve(attempt) => {}
        }

        session.state.send_replace(SessionState::Disconnected);
        debug!(
            device = %session.entry.name,
            delay_secs = session.retry_delay.as_secs(),
            "waiting before reconnecting"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            () = tokio::time::sleep(session.retry_delay) => {}
        }
    }

    debug!(device = %session.entry.name, "session task exiting");
}

impl SessionInner {
    /// One connection attempt, served until the connection ends.
    async fn connect_and_serve(&self, attempt: u32) {
        let device = self.entry.name.as_str();

        self.state.send_replace(SessionState::Connecting { attempt });
        self.availability.set(false);
        info!(device, url = %self.url, attempt, "connecting to device");

        let Connection { sink, mut stream } = match self.connector.connect(&self.url).await {
            Ok(connection) => connection,
            Err(e) => {
                error!(device, url = %self.url, error = %e, "failed to connect to device");
                self.connection.clear().await;
                self.availability.set(false);
                return;
            }
        };

        self.connection.install(sink).await;
        self.state.send_replace(SessionState::LoggingIn);
        if let Err(e) = self.connection.transmit(&OutboundFrame::login()).await {
            error!(device, url = %self.url, error = %e, "failed to log in to device");
            self.connection.clear().await;
            self.availability.set(false);
            return;
        }

        self.state.send_replace(SessionState::Connected);
        info!(device, url = %self.url, "connected to device");
        self.availability.set(true);

        loop {
            match stream.next().await {
                Some(Ok(Message::Close(frame))) => {
                    match frame {
                        Some(frame) => warn!(
                            device,
                            code = u16::from(frame.code),
                            reason = frame.reason.as_str(),
                            "device closed the connection"
                        ),
                        None => warn!(device, "device closed the connection"),
                    }
                    break;
                }
                Some(Ok(message)) => match frame_text(&message) {
                    Some(text) => self.dispatch(text),
                    None => trace!(device, "ignoring control frame"),
                },
                Some(Err(e)) => {
                    let err = classify(e);
                    match err.close_details() {
                        Some((code, reason)) => {
                            warn!(device, code, reason, "connection closed");
                        }
                        None => error!(device, error = %err, "receive failed"),
                    }
                    break;
                }
                None => {
                    warn!(device, "connection closed");
                    break;
                }
            }
        }

        self.connection.clear().await;
        self.availability.set(false);
    }

    /// Route one inbound text frame. Never fails: every problem is logged
    /// and the receive loop carries on.
    fn dispatch(&self, text: &str) {
        let device = self.entry.name.as_str();
        debug!(device, payload = text, "received frame");

        match parse_inbound(text) {
            Ok(InboundMessage::State(raw)) => self.apply_state(raw),
            Ok(InboundMessage::DeviceReset) => {
                info!(device, "device requested reset; removing entry");
                self.request_removal();
            }
            Ok(InboundMessage::Ignored(kind)) => {
                trace!(device, kind = ?kind, "ignoring frame");
            }
            Err(nexa_api::Error::MalformedFrame { message, body }) => {
                error!(device, error = %message, body = %body, "invalid JSON received");
            }
            Err(e) => {
                error!(device, error = %e, payload = text, "error processing message");
            }
        }
    }

    fn apply_state(&self, raw: f64) {
        let entity_id = self.entry.entity_id();
        let target = self
            .availability
            .entities()
            .into_iter()
            .find(|entity| entity.entity_id() == entity_id);

        match target {
            Some(entity) => entity.handle_state_update(raw),
            None => warn!(
                device = %self.entry.name,
                %entity_id,
                "couldn't find entity for device"
            ),
        }
    }

    fn request_removal(&self) {
        let request = SessionRequest::RemoveEntry {
            device_id: self.entry.device_id.clone(),
        };
        if self.requests.send(request).is_err() {
            warn!(device = %self.entry.name, "no owner to handle removal request");
        }
    }
}
