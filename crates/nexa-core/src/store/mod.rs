// ── Entry store ──
//
// Persistence seam for configured devices. The core only needs to load,
// look up, save and forget entries; where they live is up to the
// implementation (memory here, a TOML file in nexa-config).

mod memory;

pub use memory::MemoryEntryStore;

use crate::error::CoreError;
use crate::model::DeviceEntry;

/// Storage for configured device entries, keyed by `device_id`.
pub trait EntryStore: Send + Sync + 'static {
    /// All stored entries, in a stable order.
    fn entries(&self) -> Result<Vec<DeviceEntry>, CoreError>;

    fn get(&self, device_id: &str) -> Result<Option<DeviceEntry>, CoreError>;

    /// Insert or replace the entry with the same `device_id`.
    fn upsert(&self, entry: DeviceEntry) -> Result<(), CoreError>;

    /// Forget an entry, returning it if it existed.
    fn remove(&self, device_id: &str) -> Result<Option<DeviceEntry>, CoreError>;
}
