// ── Device domain types ──

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Manufacturer reported for every supported device.
pub const MANUFACTURER: &str = "NEXA";

/// Supported hardware models, by their advertised model string.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr,
)]
pub enum DeviceModel {
    #[strum(serialize = "WBR-01")]
    Wbr01,
    #[strum(serialize = "WPR-01")]
    Wpr01,
    #[strum(serialize = "WPO-01")]
    Wpo01,
    #[strum(serialize = "WBD-01")]
    Wbd01,
    #[strum(serialize = "WPD-01")]
    Wpd01,
}

impl DeviceModel {
    /// Look up an advertised model string. Unknown models return `None`.
    pub fn from_model(model: &str) -> Option<Self> {
        model.parse().ok()
    }

    pub fn category(self) -> DeviceCategory {
        match self {
            Self::Wbr01 => DeviceCategory::ToggleSwitch,
            Self::Wpr01 | Self::Wpo01 => DeviceCategory::PlugOutlet,
            Self::Wbd01 | Self::Wpd01 => DeviceCategory::DimmableLight,
        }
    }

    pub fn platform(self) -> Platform {
        self.category().platform()
    }
}

/// What kind of hardware a model is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceCategory {
    ToggleSwitch,
    PlugOutlet,
    DimmableLight,
}

impl DeviceCategory {
    /// Entity platform a device of this category is exposed as.
    pub fn platform(self) -> Platform {
        match self {
            Self::ToggleSwitch | Self::PlugOutlet => Platform::Switch,
            Self::DimmableLight => Platform::Light,
        }
    }

    pub fn device_class(self) -> Option<DeviceClass> {
        match self {
            Self::PlugOutlet => Some(DeviceClass::Outlet),
            Self::ToggleSwitch | Self::DimmableLight => None,
        }
    }
}

/// Entity platform: on/off switch or dimmable light.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Platform {
    Switch,
    Light,
}

/// Presentation hint for switch entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceClass {
    Outlet,
}

// ── DeviceEntry ─────────────────────────────────────────────────────

/// A configured device: everything needed to set up its session.
///
/// Created by discovery admission and persisted by the entry store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Stable identity (advertised `id`, falling back to the name).
    pub device_id: String,
    /// Display title, `"{name} ({model})"`.
    pub title: String,
    pub host: String,
    pub name: String,
    pub model: String,
    pub platform: Platform,
}

impl DeviceEntry {
    pub fn new(
        device_id: impl Into<String>,
        host: impl Into<String>,
        name: impl Into<String>,
        model: DeviceModel,
    ) -> Self {
        let name = name.into();
        Self {
            device_id: device_id.into(),
            title: format!("{name} ({model})"),
            host: host.into(),
            name,
            model: model.to_string(),
            platform: model.platform(),
        }
    }

    pub fn device_model(&self) -> Option<DeviceModel> {
        DeviceModel::from_model(&self.model)
    }

    pub fn device_class(&self) -> Option<DeviceClass> {
        self.device_model()
            .and_then(|model| model.category().device_class())
    }

    /// Entity identifier, e.g. `light.living_room_lamp`.
    pub fn entity_id(&self) -> String {
        entity_id(self.platform, &self.name)
    }

    /// Unique entity id, e.g. `a1b2c3_light`.
    pub fn unique_id(&self) -> String {
        format!("{}_{}", self.device_id, self.platform)
    }
}

/// `<platform>.<name>`, lowercased with spaces turned into underscores.
pub fn entity_id(platform: Platform, name: &str) -> String {
    format!("{platform}.{}", name.to_lowercase().replace(' ', "_"))
}
