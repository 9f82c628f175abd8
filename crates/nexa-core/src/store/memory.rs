use dashmap::DashMap;

use super::EntryStore;
use crate::error::CoreError;
use crate::model::DeviceEntry;

/// Process-local entry store.
#[derive(Debug, Default)]
pub struct MemoryEntryStore {
    entries: DashMap<String, DeviceEntry>,
}

impl MemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: impl IntoIterator<Item = DeviceEntry>) -> Self {
        let store = Self::new();
        for entry in entries {
            store.entries.insert(entry.device_id.clone(), entry);
        }
        store
    }
}

impl EntryStore for MemoryEntryStore {
    fn entries(&self) -> Result<Vec<DeviceEntry>, CoreError> {
        let mut entries: Vec<DeviceEntry> =
            self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        Ok(entries)
    }

    fn get(&self, device_id: &str) -> Result<Option<DeviceEntry>, CoreError> {
        Ok(self.entries.get(device_id).map(|e| e.value().clone()))
    }

    fn upsert(&self, entry: DeviceEntry) -> Result<(), CoreError> {
        self.entries.insert(entry.device_id.clone(), entry);
        Ok(())
    }

    fn remove(&self, device_id: &str) -> Result<Option<DeviceEntry>, CoreError> {
        Ok(self.entries.remove(device_id).map(|(_, entry)| entry))
    }
}
