// nexa-core: Device sessions, entity state and supervision for System Nexa 2 devices.

pub mod availability;
pub mod command;
pub mod config;
pub mod discovery;
pub mod entity;
pub mod error;
pub mod model;
pub mod session;
pub mod store;
pub mod supervisor;
pub mod version;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{ConnectionSlot, send_command};
pub use config::SessionSettings;
pub use discovery::{Advertisement, Rejection};
pub use entity::Entity;
pub use error::CoreError;
pub use session::{DeviceSession, SessionRequest, SessionState};
pub use store::{EntryStore, MemoryEntryStore};
pub use supervisor::{Admission, Supervisor};
pub use version::{MIN_FIRMWARE_VERSION, is_compatible, is_valid};

pub use model::{
    DeviceCategory, DeviceClass, DeviceEntry, DeviceModel, EntityState, EntityView, LightState,
    MANUFACTURER, Platform, StateModel, SwitchState, TurnOnOptions,
};
