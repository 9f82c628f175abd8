// ── Live entity ──
//
// The presentation-facing half of a device: current state, availability,
// change notification, and the user intents (on/off/toggle). State only
// changes when the device reports it; intents never update it
// optimistically.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::{debug, error};

use crate::command::{ConnectionSlot, send_command};
use crate::error::CoreError;
use crate::model::{
    DeviceClass, DeviceEntry, EntityView, Platform, StateModel, TurnOnOptions,
};

/// Callback invoked once per state or availability change.
pub type StateListener = Arc<dyn Fn(&EntityView) + Send + Sync>;

/// One controllable capability of a device (its switch or its light).
///
/// Shared as `Arc<Entity>`: the owner (supervisor or front end) holds it
/// strongly, the session only keeps a weak reference for dispatch and
/// availability fan-out.
pub struct Entity {
    entity_id: String,
    unique_id: String,
    name: String,
    device_id: String,
    model: String,
    device_class: Option<DeviceClass>,
    view: watch::Sender<EntityView>,
    listeners: Mutex<Vec<StateListener>>,
    connection: Arc<ConnectionSlot>,
}

impl Entity {
    pub(crate) fn new(
        entry: &DeviceEntry,
        connection: Arc<ConnectionSlot>,
        available: bool,
    ) -> Arc<Self> {
        let (view, _) = watch::channel(EntityView::new(entry.platform, available));

        Arc::new(Self {
            entity_id: entry.entity_id(),
            unique_id: entry.unique_id(),
            name: entry.name.clone(),
            device_id: entry.device_id.clone(),
            model: entry.model.clone(),
            device_class: entry.device_class(),
            view,
            listeners: Mutex::new(Vec::new()),
            connection,
        })
    }

    // ── Identity ─────────────────────────────────────────────────

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn platform(&self) -> Platform {
        self.view.borrow().state.platform()
    }

    pub fn device_class(&self) -> Option<DeviceClass> {
        self.device_class
    }

    // ── State view ───────────────────────────────────────────────

    /// Current state snapshot.
    pub fn view(&self) -> EntityView {
        *self.view.borrow()
    }

    pub fn is_on(&self) -> bool {
        self.view().is_on()
    }

    pub fn brightness(&self) -> Option<u8> {
        self.view().brightness()
    }

    pub fn available(&self) -> bool {
        self.view().available
    }

    /// Watch the state. Rapid changes may be coalesced; use
    /// [`on_change`](Self::on_change) to see every one.
    pub fn subscribe(&self) -> watch::Receiver<EntityView> {
        self.view.subscribe()
    }

    /// Register a callback fired once per state or availability change.
    pub fn on_change(&self, listener: impl Fn(&EntityView) + Send + Sync + 'static) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    // ── Device-driven updates ────────────────────────────────────

    /// Apply a `state` value reported by the device and notify.
    pub fn handle_state_update(&self, raw: f64) {
        self.view
            .send_modify(|view| view.state.decode_state_update(raw));
        let view = self.view();
        debug!(
            entity = %self.entity_id,
            is_on = view.is_on(),
            brightness = ?view.brightness(),
            "state updated"
        );
        self.notify(&view);
    }

    /// Set availability. Returns `false` (and does not notify) when the
    /// value is unchanged.
    pub fn set_available(&self, available: bool) -> bool {
        let changed = self.view.send_if_modified(|view| {
            if view.available == available {
                return false;
            }
            view.available = available;
            true
        });

        if changed {
            debug!(entity = %self.entity_id, available, "availability changed");
            self.notify(&self.view());
        }
        changed
    }

    // ── User intents ─────────────────────────────────────────────

    pub async fn turn_on(&self, options: TurnOnOptions) -> Result<(), CoreError> {
        let value = self.view().state.encode_turn_on(options);
        send_command(self, value).await
    }

    pub async fn turn_off(&self) -> Result<(), CoreError> {
        let value = self.view().state.encode_turn_off();
        send_command(self, value).await
    }

    pub async fn toggle(&self) -> Result<(), CoreError> {
        let value = self.view().state.encode_toggle();
        send_command(self, value).await
    }

    pub(crate) fn connection(&self) -> &ConnectionSlot {
        &self.connection
    }

    /// Run every listener against `view`. A panicking listener is logged
    /// and does not stop the others.
    fn notify(&self, view: &EntityView) {
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for listener in &listeners {
            if panic::catch_unwind(AssertUnwindSafe(|| listener(view))).is_err() {
                error!(entity = %self.entity_id, "state listener panicked");
            }
        }
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("entity_id", &self.entity_id)
            .field("view", &self.view())
            .finish_non_exhaustive()
    }
}
