// Scripted device connections for session and supervisor tests.
//
// Each `accept()` queues one in-memory connection; connect attempts with
// nothing queued are refused. The returned `DeviceEnd` plays the device:
// it pushes frames to the session and reads what the session sent.
// Dropping it ends the connection.
#![allow(clippy::unwrap_used)]

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use nexa_api::websocket::{Message, WsError};
use nexa_api::{Connection, Connector, Error};
use nexa_core::{DeviceEntry, DeviceModel};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_stream::wrappers::UnboundedReceiverStream;
use url::Url;

#[derive(Default)]
pub struct ScriptedConnector {
    attempts: Mutex<Vec<Instant>>,
    script: Mutex<VecDeque<Connection>>,
}

impl ScriptedConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a connection for the next attempt.
    pub fn accept(&self) -> DeviceEnd {
        let (to_client, client_rx) = mpsc::unbounded_channel();
        let (client_tx, from_client) = mpsc::unbounded_channel();

        let sink = futures_util::sink::unfold(client_tx, |tx, message: Message| async move {
            tx.send(message).map_err(|_| WsError::ConnectionClosed)?;
            Ok::<_, WsError>(tx)
        });
        let stream = UnboundedReceiverStream::new(client_rx);

        self.script
            .lock()
            .unwrap()
            .push_back(Connection::new(Box::pin(sink), Box::pin(stream)));

        DeviceEnd {
            to_client,
            from_client,
        }
    }

    /// When each connect attempt happened.
    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }
}

impl Connector for ScriptedConnector {
    fn connect<'a>(&'a self, _url: &'a Url) -> BoxFuture<'a, Result<Connection, Error>> {
        Box::pin(async move {
            self.attempts.lock().unwrap().push(Instant::now());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| Error::WebSocketConnect("connection refused".into()))
        })
    }
}

pub struct DeviceEnd {
    to_client: mpsc::UnboundedSender<Result<Message, WsError>>,
    from_client: mpsc::UnboundedReceiver<Message>,
}

impl DeviceEnd {
    pub fn send_text(&self, text: &str) {
        self.to_client
            .send(Ok(Message::text(text.to_owned())))
            .unwrap();
    }

    pub fn send_close(&self) {
        self.to_client.send(Ok(Message::Close(None))).unwrap();
    }

    /// Next frame the session sent, as text.
    pub async fn recv_text(&mut self) -> String {
        let message = self.from_client.recv().await.unwrap();
        message.into_text().unwrap().as_str().to_owned()
    }

    /// Next frame the session sent; `None` once the session let go of
    /// the connection.
    pub async fn recv(&mut self) -> Option<Message> {
        self.from_client.recv().await
    }
}

pub fn lamp() -> DeviceEntry {
    DeviceEntry::new("a1b2c3", "192.168.1.20", "Lamp", DeviceModel::Wbd01)
}

pub fn plug() -> DeviceEntry {
    DeviceEntry::new("d4e5f6", "192.168.1.21", "Kitchen Plug", DeviceModel::Wpo01)
}
