// Supervisor tests: admission, removal and device-initiated reset.
#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use nexa_core::{
    Admission, Advertisement, CoreError, DeviceEntry, EntryStore, MemoryEntryStore,
    SessionSettings, Supervisor,
};
use pretty_assertions::assert_eq;

use common::{ScriptedConnector, lamp};

// ── Helpers ─────────────────────────────────────────────────────────

/// Memory store that counts successful removals.
#[derive(Default)]
struct CountingStore {
    inner: MemoryEntryStore,
    removed: AtomicUsize,
}

impl EntryStore for CountingStore {
    fn entries(&self) -> Result<Vec<DeviceEntry>, CoreError> {
        self.inner.entries()
    }

    fn get(&self, device_id: &str) -> Result<Option<DeviceEntry>, CoreError> {
        self.inner.get(device_id)
    }

    fn upsert(&self, entry: DeviceEntry) -> Result<(), CoreError> {
        self.inner.upsert(entry)
    }

    fn remove(&self, device_id: &str) -> Result<Option<DeviceEntry>, CoreError> {
        let removed = self.inner.remove(device_id)?;
        if removed.is_some() {
            self.removed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(removed)
    }
}

fn supervisor(store: Arc<dyn EntryStore>, connector: &Arc<ScriptedConnector>) -> Supervisor {
    Supervisor::new(
        SessionSettings::default(),
        store,
        Arc::clone(connector) as Arc<dyn nexa_api::Connector>,
    )
}

fn advertisement(host: &str) -> Advertisement {
    Advertisement::new(host, "Lamp._systemnexa2._tcp.local.")
        .with_property("id", "a1b2c3")
        .with_property("model", "WBD-01")
        .with_property("version", "1.1.0")
}

// ── Admission ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_admit_creates_then_recognises_entry() {
    let connector = ScriptedConnector::new();
    let sup = supervisor(Arc::new(MemoryEntryStore::new()), &connector);

    let first = sup.admit(&advertisement("192.168.1.20")).await.unwrap();
    assert_eq!(first, Admission::Created(lamp()));

    let second = sup.admit(&advertisement("192.168.1.20")).await.unwrap();
    assert_eq!(second, Admission::AlreadyConfigured(lamp()));

    assert_eq!(sup.entries().unwrap(), vec![lamp()]);
    assert!(connector.attempts().is_empty(), "not running, nothing connects");
}

#[tokio::test]
async fn test_admit_updates_moved_host() {
    let connector = ScriptedConnector::new();
    let sup = supervisor(Arc::new(MemoryEntryStore::with_entries([lamp()])), &connector);

    let admission = sup.admit(&advertisement("192.168.1.99")).await.unwrap();

    let Admission::HostUpdated {
        entry,
        previous_host,
    } = admission
    else {
        panic!("expected a host update");
    };
    assert_eq!(previous_host, "192.168.1.20");
    assert_eq!(entry.host, "192.168.1.99");
    assert_eq!(sup.find_entry("a1b2c3").unwrap().host, "192.168.1.99");
}

#[tokio::test]
async fn test_admit_rejects_old_firmware() {
    let connector = ScriptedConnector::new();
    let sup = supervisor(Arc::new(MemoryEntryStore::new()), &connector);

    let ad = advertisement("192.168.1.20").with_property("version", "0.9.0");
    let err = sup.admit(&ad).await.unwrap_err();

    assert!(matches!(err, CoreError::Rejected(_)));
    assert!(sup.entries().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_admit_while_running_starts_session() {
    let connector = ScriptedConnector::new();
    let _device = connector.accept();
    let sup = supervisor(Arc::new(MemoryEntryStore::new()), &connector);
    assert_eq!(sup.start().await.unwrap(), 0);

    sup.admit(&advertisement("192.168.1.20")).await.unwrap();
    sup.wait_available("a1b2c3", Duration::from_secs(5))
        .await
        .unwrap();

    let entity = sup.entity("a1b2c3").await.unwrap();
    assert_eq!(entity.entity_id(), "light.lamp");
    assert!(entity.available());

    sup.shutdown().await;
    assert!(!entity.available());
}

// ── Setup and removal ───────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_setup_twice_is_rejected() {
    let connector = ScriptedConnector::new();
    let sup = supervisor(Arc::new(MemoryEntryStore::with_entries([lamp()])), &connector);

    sup.setup_entry(lamp()).await.unwrap();
    let err = sup.setup_entry(lamp()).await.unwrap_err();

    assert!(matches!(err, CoreError::AlreadyConfigured { .. }));
    sup.shutdown().await;
}

#[tokio::test]
async fn test_remove_missing_entry_returns_false() {
    let connector = ScriptedConnector::new();
    let sup = supervisor(Arc::new(MemoryEntryStore::new()), &connector);

    assert!(!sup.remove_entry("nope").await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_start_entry_by_name() {
    let connector = ScriptedConnector::new();
    let _device = connector.accept();
    let sup = supervisor(Arc::new(MemoryEntryStore::with_entries([lamp()])), &connector);

    let entity = sup.start_entry("lamp").await.unwrap();
    sup.wait_available(entity.device_id(), Duration::from_secs(5))
        .await
        .unwrap();

    assert!(matches!(
        sup.start_entry("garage").await,
        Err(CoreError::DeviceNotFound { .. })
    ));
    sup.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_device_reset_removes_entry_exactly_once() {
    let connector = ScriptedConnector::new();
    let device = connector.accept();
    let store = Arc::new(CountingStore::default());
    store.upsert(lamp()).unwrap();
    let sup = supervisor(Arc::clone(&store) as Arc<dyn EntryStore>, &connector);

    assert_eq!(sup.start().await.unwrap(), 1);
    sup.wait_available("a1b2c3", Duration::from_secs(5))
        .await
        .unwrap();
    let entity = sup.entity("a1b2c3").await.unwrap();

    device.send_text(r#"{"type":"device_reset"}"#);
    device.send_text(r#"{"type":"device_reset"}"#);

    while store.removed.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    // Let the second request drain.
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(store.removed.load(Ordering::SeqCst), 1);
    assert!(sup.entries().unwrap().is_empty());
    assert!(sup.entity("a1b2c3").await.is_none());
    assert!(!entity.available());

    sup.shutdown().await;
}
