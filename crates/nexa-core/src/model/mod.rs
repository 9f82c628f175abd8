// ── Domain model ──
//
// Device catalog, configured entries, and the per-platform entity state
// that the session mutates and the presentation layer reads.

pub mod device;
pub mod state;

// ── Re-exports ──────────────────────────────────────────────────────

pub use device::{
    DeviceCategory, DeviceClass, DeviceEntry, DeviceModel, MANUFACTURER, Platform, entity_id,
};
pub use state::{
    EntityState, EntityView, LightState, StateModel, SwitchState, TurnOnOptions,
    brightness_to_level, level_to_brightness,
};
