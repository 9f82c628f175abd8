// ── Entity state model ──
//
// Canonical on/off/brightness state per platform, plus the rules for
// turning user intents into wire values and device reports back into
// state. Pure data: no I/O, no notification.

use nexa_api::StateValue;
use serde::Serialize;

use super::device::Platform;

/// Options accepted by `turn_on`. Switches ignore `brightness`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnOnOptions {
    /// Target brightness, `0..=255`.
    pub brightness: Option<u8>,
}

impl TurnOnOptions {
    pub fn with_brightness(brightness: u8) -> Self {
        Self {
            brightness: Some(brightness),
        }
    }
}

/// Shared capability of every entity state: decode device reports and
/// encode intents.
pub trait StateModel {
    fn is_on(&self) -> bool;

    /// Brightness `0..=255`; `None` for platforms without dimming.
    fn brightness(&self) -> Option<u8>;

    /// Apply a raw `state` value reported by the device.
    fn decode_state_update(&mut self, raw: f64);

    fn encode_turn_on(&self, options: TurnOnOptions) -> StateValue;

    fn encode_turn_off(&self) -> StateValue {
        StateValue::Off
    }

    fn encode_toggle(&self) -> StateValue {
        StateValue::Toggle
    }
}

// ── Switch ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SwitchState {
    pub is_on: bool,
}

impl StateModel for SwitchState {
    fn is_on(&self) -> bool {
        self.is_on
    }

    fn brightness(&self) -> Option<u8> {
        None
    }

    fn decode_state_update(&mut self, raw: f64) {
        self.is_on = raw != 0.0;
    }

    fn encode_turn_on(&self, _options: TurnOnOptions) -> StateValue {
        StateValue::On
    }
}

// ── Light ───────────────────────────────────────────────────────────

/// Dimmable light. `brightness` keeps the last level while off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LightState {
    pub is_on: bool,
    pub brightness: u8,
}

impl Default for LightState {
    fn default() -> Self {
        Self {
            is_on: false,
            brightness: u8::MAX,
        }
    }
}

impl StateModel for LightState {
    fn is_on(&self) -> bool {
        self.is_on
    }

    fn brightness(&self) -> Option<u8> {
        Some(self.brightness)
    }

    fn decode_state_update(&mut self, raw: f64) {
        if raw == 0.0 {
            self.is_on = false;
        } else {
            self.is_on = true;
            self.brightness = level_to_brightness(raw);
        }
    }

    /// A bare "on" reuses the toggle value; the device has no plain
    /// "on at last level" command for dimmers.
    fn encode_turn_on(&self, options: TurnOnOptions) -> StateValue {
        match options.brightness {
            Some(brightness) => StateValue::Level(brightness_to_level(brightness)),
            None => StateValue::Toggle,
        }
    }
}

/// `0..=255` brightness to the device's `[0, 1]` level, two decimals.
pub fn brightness_to_level(brightness: u8) -> f64 {
    (f64::from(brightness) / 255.0 * 100.0).round() / 100.0
}

/// Device level to `0..=255` brightness: `clamp(round(level * 255))`,
/// with ties rounded to even (`0.3` is 76, `0.7` is 178).
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
pub fn level_to_brightness(level: f64) -> u8 {
    (level * 255.0).round_ties_even().clamp(0.0, 255.0) as u8
}

// ── EntityState ─────────────────────────────────────────────────────

/// Closed set of entity states, chosen once from the device platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "platform", rename_all = "lowercase")]
pub enum EntityState {
    Switch(SwitchState),
    Light(LightState),
}

impl EntityState {
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Switch => Self::Switch(SwitchState::default()),
            Platform::Light => Self::Light(LightState::default()),
        }
    }

    pub fn platform(&self) -> Platform {
        match self {
            Self::Switch(_) => Platform::Switch,
            Self::Light(_) => Platform::Light,
        }
    }

    fn model(&self) -> &dyn StateModel {
        match self {
            Self::Switch(state) => state,
            Self::Light(state) => state,
        }
    }

    fn model_mut(&mut self) -> &mut dyn StateModel {
        match self {
            Self::Switch(state) => state,
            Self::Light(state) => state,
        }
    }
}

impl StateModel for EntityState {
    fn is_on(&self) -> bool {
        self.model().is_on()
    }

    fn brightness(&self) -> Option<u8> {
        self.model().brightness()
    }

    fn decode_state_update(&mut self, raw: f64) {
        self.model_mut().decode_state_update(raw);
    }

    fn encode_turn_on(&self, options: TurnOnOptions) -> StateValue {
        self.model().encode_turn_on(options)
    }
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntityView {
    pub state: EntityState,
    pub available: bool,
}

impl EntityView {
    pub fn new(platform: Platform, available: bool) -> Self {
        Self {
            state: EntityState::for_platform(platform),
            available,
        }
    }

    pub fn is_on(&self) -> bool {
        self.state.is_on()
    }

    pub fn brightness(&self) -> Option<u8> {
        self.state.brightness()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_decodes_nonzero_as_on() {
        let mut state = SwitchState::default();
        for (raw, expected) in [(0.0, false), (1.0, true), (-1.0, true), (0.01, true)] {
            state.decode_state_update(raw);
            assert_eq!(state.is_on, expected, "raw {raw}");
        }
    }

    #[test]
    fn switch_encodes_discrete_values() {
        let state = SwitchState::default();
        assert_eq!(state.encode_turn_on(TurnOnOptions::with_brightness(10)), StateValue::On);
        assert_eq!(state.encode_turn_off(), StateValue::Off);
        assert_eq!(state.encode_toggle(), StateValue::Toggle);
    }

    #[test]
    fn light_level_maps_to_brightness() {
        for raw in [0.01, 0.25, 0.5, 0.75, 1.0] {
            let mut state = LightState::default();
            state.decode_state_update(raw);
            assert!(state.is_on);
            assert_eq!(state.brightness, level_to_brightness(raw));
        }

        let mut state = LightState::default();
        state.decode_state_update(0.5);
        assert_eq!(state.brightness, 128);

        // Exact halves round to even
        state.decode_state_update(0.3);
        assert_eq!(state.brightness, 76);
        state.decode_state_update(0.7);
        assert_eq!(state.brightness, 178);
    }

    #[test]
    fn light_off_keeps_last_brightness() {
        let mut state = LightState::default();
        state.decode_state_update(0.4);
        state.decode_state_update(0.0);
        assert!(!state.is_on);
        assert_eq!(state.brightness, 102);
    }

    #[test]
    fn light_level_is_clamped() {
        let mut state = LightState::default();
        state.decode_state_update(3.0);
        assert_eq!(state.brightness, 255);

        state.decode_state_update(-0.5);
        assert!(state.is_on);
        assert_eq!(state.brightness, 0);
    }

    #[test]
    fn light_turn_on_without_brightness_toggles() {
        let state = LightState::default();
        assert_eq!(state.encode_turn_on(TurnOnOptions::default()), StateValue::Toggle);
        assert_eq!(state.encode_turn_off(), StateValue::Off);
        assert_eq!(state.encode_toggle(), StateValue::Toggle);
    }

    #[test]
    fn light_turn_on_with_brightness_rounds_to_two_decimals() {
        let state = LightState::default();
        assert_eq!(
            state.encode_turn_on(TurnOnOptions::with_brightness(128)),
            StateValue::Level(0.5)
        );
        assert_eq!(
            state.encode_turn_on(TurnOnOptions::with_brightness(255)),
            StateValue::Level(1.0)
        );
        assert_eq!(
            state.encode_turn_on(TurnOnOptions::with_brightness(0)),
            StateValue::Level(0.0)
        );
    }

    #[test]
    fn brightness_round_trips_within_rounding() {
        for brightness in [1_u8, 64, 128, 200, 255] {
            let level = brightness_to_level(brightness);
            let back = level_to_brightness(level);
            assert!(
                back.abs_diff(brightness) <= 2,
                "{brightness} -> {level} -> {back}"
            );
        }
    }

    #[test]
    fn entity_state_follows_platform() {
        let light = EntityState::for_platform(Platform::Light);
        assert_eq!(light.platform(), Platform::Light);
        assert_eq!(light.brightness(), Some(255));
        assert!(!light.is_on());

        let switch = EntityState::for_platform(Platform::Switch);
        assert_eq!(switch.brightness(), None);
    }
}
