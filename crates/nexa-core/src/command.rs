// ── Command transmission ──
//
// The connection slot holds the write half of the session's current
// socket, if any. Entities send their intents through it; the session
// installs and clears it as connections come and go.

use nexa_api::websocket::{FrameSink, send_frame};
use nexa_api::{OutboundFrame, StateValue};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::entity::Entity;
use crate::error::CoreError;

/// The current outbound handle of one device session.
pub struct ConnectionSlot {
    device: String,
    sink: Mutex<Option<FrameSink>>,
}

impl ConnectionSlot {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            sink: Mutex::new(None),
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub async fn install(&self, sink: FrameSink) {
        *self.sink.lock().await = Some(sink);
    }

    /// Drop the handle, returning it so the caller may close it.
    pub async fn clear(&self) -> Option<FrameSink> {
        self.sink.lock().await.take()
    }

    pub async fn is_connected(&self) -> bool {
        self.sink.lock().await.is_some()
    }

    /// Write one frame on the current connection.
    pub async fn transmit(&self, frame: &OutboundFrame) -> Result<(), CoreError> {
        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or_else(|| CoreError::NotConnected {
            device: self.device.clone(),
        })?;
        send_frame(sink, frame).await.map_err(CoreError::from)
    }
}

impl std::fmt::Debug for ConnectionSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSlot")
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

/// Send a state command on behalf of `entity`.
///
/// Never retried or queued. With no connection the command is dropped; a
/// closed connection additionally marks the entity unavailable. Other send
/// failures are logged and leave availability alone. Errors are returned
/// for callers that want to report them.
pub async fn send_command(entity: &Entity, value: StateValue) -> Result<(), CoreError> {
    let device = entity.name();
    info!(device, entity = entity.entity_id(), ?value, "sending command");

    let frame = OutboundFrame::state(value);
    match entity.connection().transmit(&frame).await {
        Ok(()) => {
            debug!(device, ?value, "command sent");
            Ok(())
        }
        Err(err @ CoreError::NotConnected { .. }) => {
            error!(device, "cannot send command: no connection available");
            Err(err)
        }
        Err(CoreError::ConnectionClosed { code, reason }) => {
            error!(device, code, %reason, "failed to send command: connection closed");
            entity.set_available(false);
            Err(CoreError::ConnectionClosed { code, reason })
        }
        Err(err) => {
            error!(device, error = %err, "failed to send command");
            Err(err)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use nexa_api::websocket::{Message, WsError};
    use tokio::sync::mpsc;

    use super::*;
    use crate::model::{DeviceEntry, DeviceModel, TurnOnOptions};

    fn plug(slot: &Arc<ConnectionSlot>) -> Arc<Entity> {
        let entry = DeviceEntry::new("plug-1", "10.0.0.9", "Plug", DeviceModel::Wpo01);
        Entity::new(&entry, Arc::clone(slot), true)
    }

    fn capturing_sink() -> (FrameSink, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = futures_util::sink::unfold(tx, |tx, message: Message| async move {
            tx.send(message).map_err(|_| WsError::ConnectionClosed)?;
            Ok::<_, WsError>(tx)
        });
        (Box::pin(sink), rx)
    }

    fn failing_sink(err: fn() -> WsError) -> FrameSink {
        Box::pin(futures_util::sink::unfold((), move |(), _: Message| async move {
            Err::<(), WsError>(err())
        }))
    }

    #[tokio::test]
    async fn without_connection_command_is_dropped() {
        let slot = Arc::new(ConnectionSlot::new("Plug"));
        let entity = plug(&slot);
        let before = entity.view();

        let result = entity.turn_on(TurnOnOptions::default()).await;

        assert!(matches!(result, Err(CoreError::NotConnected { .. })));
        assert_eq!(entity.view(), before);
    }

    #[tokio::test]
    async fn command_reaches_connection() {
        let slot = Arc::new(ConnectionSlot::new("Plug"));
        let (sink, mut sent) = capturing_sink();
        slot.install(sink).await;
        let entity = plug(&slot);

        entity.toggle().await.unwrap();

        let message = sent.recv().await.unwrap();
        assert_eq!(message, Message::text(r#"{"type":"state","value":-1}"#));
        assert!(!entity.is_on(), "no optimistic update");
    }

    #[tokio::test]
    async fn closed_connection_marks_unavailable() {
        let slot = Arc::new(ConnectionSlot::new("Plug"));
        slot.install(failing_sink(|| WsError::ConnectionClosed)).await;
        let entity = plug(&slot);

        let result = entity.turn_off().await;

        assert!(matches!(result, Err(CoreError::ConnectionClosed { code: 1006, .. })));
        assert!(!entity.available());
    }

    #[tokio::test]
    async fn other_send_failure_keeps_availability() {
        let slot = Arc::new(ConnectionSlot::new("Plug"));
        slot.install(failing_sink(|| WsError::Io(std::io::Error::other("tls failure")))).await;
        let entity = plug(&slot);

        let result = entity.turn_off().await;

        assert!(result.is_err());
        assert!(entity.available());
    }

    #[tokio::test]
    async fn cleared_slot_is_disconnected() {
        let slot = ConnectionSlot::new("Plug");
        let (sink, _sent) = capturing_sink();
        slot.install(sink).await;
        assert!(slot.is_connected().await);

        assert!(slot.clear().await.is_some());
        assert!(!slot.is_connected().await);
    }
}
