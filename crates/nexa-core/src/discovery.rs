// ── Discovery admission ──
//
// Decides whether an advertised device becomes a configured entry. The
// advertisement itself comes from whatever browses the network (mDNS in
// production, the CLI by hand); this module only validates it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{DeviceEntry, DeviceModel};
use crate::version;

/// Advertised property keys.
pub const PROPERTY_ID: &str = "id";
pub const PROPERTY_MODEL: &str = "model";
pub const PROPERTY_VERSION: &str = "version";

/// A service advertisement for `_systemnexa2._tcp`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advertisement {
    pub host: String,
    /// Full service name, e.g. `Lamp._systemnexa2._tcp.local.`.
    pub name: String,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl Advertisement {
    pub fn new(host: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            name: name.into(),
            properties: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Device name: the service name up to the first `.`.
    pub fn device_name(&self) -> &str {
        self.name.split('.').next().unwrap_or_default()
    }

    fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// Why an advertisement was not admitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("{name} at {host} does not advertise a model")]
    MissingModel { name: String, host: String },

    #[error("{name} at {host} is an unsupported model: {model}")]
    UnsupportedModel {
        name: String,
        host: String,
        model: String,
    },

    #[error("{name} at {host} does not advertise a firmware version")]
    MissingVersion { name: String, host: String },

    #[error("{name} at {host} runs firmware {version}, older than {min_version}")]
    IncompatibleVersion {
        name: String,
        host: String,
        version: String,
        min_version: String,
    },
}

impl Rejection {
    /// Short machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingModel { .. } => "not_supported",
            Self::UnsupportedModel { .. } => "unsupported_model",
            Self::MissingVersion { .. } => "firmware_version_missing",
            Self::IncompatibleVersion { .. } => "firmware_version_incompatible",
        }
    }
}

/// Validate an advertisement and build the entry it would configure.
///
/// Checks run in order: model present, model supported, version present,
/// version compatible with `min_version`.
pub fn evaluate(ad: &Advertisement, min_version: &str) -> Result<DeviceEntry, Rejection> {
    let result = admit(ad, min_version);
    match &result {
        Ok(entry) => debug!(
            device = %entry.name,
            host = %entry.host,
            model = %entry.model,
            "advertisement accepted"
        ),
        Err(rejection) => warn!(reason = rejection.reason(), "{rejection}"),
    }
    result
}

fn admit(ad: &Advertisement, min_version: &str) -> Result<DeviceEntry, Rejection> {
    let name = ad.device_name().to_owned();
    let host = ad.host.clone();

    let Some(model) = ad.property(PROPERTY_MODEL) else {
        return Err(Rejection::MissingModel { name, host });
    };
    let Some(device_model) = DeviceModel::from_model(model) else {
        return Err(Rejection::UnsupportedModel {
            name,
            host,
            model: model.to_owned(),
        });
    };

    let Some(version) = ad.property(PROPERTY_VERSION) else {
        return Err(Rejection::MissingVersion { name, host });
    };
    if !version::is_compatible(version, min_version) {
        return Err(Rejection::IncompatibleVersion {
            name,
            host,
            version: version.to_owned(),
            min_version: min_version.to_owned(),
        });
    }

    let device_id = ad.property(PROPERTY_ID).unwrap_or(name.as_str()).to_owned();
    Ok(DeviceEntry::new(device_id, host, name, device_model))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::Platform;
    use crate::version::MIN_FIRMWARE_VERSION;

    fn lamp() -> Advertisement {
        Advertisement::new("192.168.1.20", "Lamp._systemnexa2._tcp.local.")
            .with_property("id", "a1b2c3")
            .with_property("model", "WBD-01")
            .with_property("version", "1.0.2")
    }

    #[test]
    fn supported_device_is_admitted() {
        let entry = evaluate(&lamp(), MIN_FIRMWARE_VERSION).unwrap();

        assert_eq!(entry.device_id, "a1b2c3");
        assert_eq!(entry.name, "Lamp");
        assert_eq!(entry.title, "Lamp (WBD-01)");
        assert_eq!(entry.host, "192.168.1.20");
        assert_eq!(entry.platform, Platform::Light);
    }

    #[test]
    fn missing_id_falls_back_to_name() {
        let mut ad = lamp();
        ad.properties.remove("id");

        let entry = evaluate(&ad, MIN_FIRMWARE_VERSION).unwrap();
        assert_eq!(entry.device_id, "Lamp");
    }

    #[test]
    fn missing_model_is_not_supported() {
        let mut ad = lamp();
        ad.properties.remove("model");

        let rejection = evaluate(&ad, MIN_FIRMWARE_VERSION).unwrap_err();
        assert_eq!(rejection.reason(), "not_supported");
    }

    #[test]
    fn unknown_model_is_rejected() {
        let ad = lamp().with_property("model", "WXX-99");

        let rejection = evaluate(&ad, MIN_FIRMWARE_VERSION).unwrap_err();
        assert_eq!(
            rejection,
            Rejection::UnsupportedModel {
                name: "Lamp".into(),
                host: "192.168.1.20".into(),
                model: "WXX-99".into(),
            }
        );
    }

    #[test]
    fn old_firmware_is_rejected() {
        let ad = lamp().with_property("version", "0.9.4");

        let rejection = evaluate(&ad, MIN_FIRMWARE_VERSION).unwrap_err();
        assert_eq!(rejection.reason(), "firmware_version_incompatible");
    }

    #[test]
    fn missing_version_is_rejected() {
        let mut ad = lamp();
        ad.properties.remove("version");

        let rejection = evaluate(&ad, MIN_FIRMWARE_VERSION).unwrap_err();
        assert!(matches!(rejection, Rejection::MissingVersion { .. }));
    }

    #[test]
    fn unparsable_version_is_incompatible() {
        let ad = lamp().with_property("version", "");

        let rejection = evaluate(&ad, MIN_FIRMWARE_VERSION).unwrap_err();
        assert!(matches!(rejection, Rejection::IncompatibleVersion { .. }));
    }

    #[test]
    fn plugs_become_switches() {
        let ad = lamp().with_property("model", "WPR-01");

        let entry = evaluate(&ad, MIN_FIRMWARE_VERSION).unwrap();
        assert_eq!(entry.platform, Platform::Switch);
        assert_eq!(entry.entity_id(), "switch.lamp");
    }
}
