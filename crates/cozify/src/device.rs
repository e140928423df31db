use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::DefaultHashBuilder;

use indexmap::map::IndexMap;
use indexmap::set::{IndexSet, IntoIter, Iter};

use serde::{Deserialize, Serialize};

/// All [`Capability`]s.
pub const ALL_CAPABILITIES: &[Capability] = &[
    Capability::ActivePower,
    Capability::Alert,
    Capability::Bass,
    Capability::BatteryU,
    Capability::Brightness,
    Capability::ColorHs,
    Capability::ColorLoop,
    Capability::ColorTemp,
    Capability::Contact,
    Capability::ControlLight,
    Capability::ControlPower,
    Capability::Device,
    Capability::DimmerControl,
    Capability::GenerateAlert,
    Capability::HueSwitch,
    Capability::Humidity,
    Capability::Identify,
    Capability::IkeaRc,
    Capability::Loudness,
    Capability::Lux,
    Capability::MeasurePower,
    Capability::Moisture,
    Capability::Motion,
    Capability::Mute,
    Capability::Next,
    Capability::OnOff,
    Capability::Pause,
    Capability::Play,
    Capability::Previous,
    Capability::PushNotification,
    Capability::RemoteControl,
    Capability::Seek,
    Capability::Smoke,
    Capability::Stop,
    Capability::Temperature,
    Capability::Transition,
    Capability::Treble,
    Capability::Twilight,
    Capability::Upgrade,
    Capability::UserPresence,
    Capability::Volume,
];

/// Capabilities a hub advertises for its devices.
///
/// A hub may advertise capabilities unknown to this list. Those are kept as
/// plain strings inside [`Device`] and never become a [`Capability`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    /// Reports instantaneous power draw.
    ActivePower,
    /// Can be put in alert mode.
    Alert,
    /// Has an adjustable bass level.
    Bass,
    /// Reports its battery voltage.
    BatteryU,
    /// Has an adjustable brightness.
    Brightness,
    /// Accepts hue and saturation colors.
    ColorHs,
    /// Can loop through colors.
    ColorLoop,
    /// Accepts a color temperature.
    ColorTemp,
    /// Reports an open or closed contact.
    Contact,
    /// Controls lights.
    ControlLight,
    /// Controls power outlets.
    ControlPower,
    /// Generic device.
    Device,
    /// Controls dimmers.
    DimmerControl,
    /// Can raise alerts.
    GenerateAlert,
    /// A Hue switch.
    HueSwitch,
    /// Reports humidity.
    Humidity,
    /// Can identify itself.
    Identify,
    /// An IKEA remote control.
    IkeaRc,
    /// Has a loudness setting.
    Loudness,
    /// Reports illuminance.
    Lux,
    /// Measures consumed energy.
    MeasurePower,
    /// Reports moisture.
    Moisture,
    /// Reports motion.
    Motion,
    /// Can be muted.
    Mute,
    /// Can skip to the next item.
    Next,
    /// Can be turned on and off.
    OnOff,
    /// Can pause playback.
    Pause,
    /// Can start playback.
    Play,
    /// Can skip to the previous item.
    Previous,
    /// Can receive push notifications.
    PushNotification,
    /// A remote control.
    RemoteControl,
    /// Can seek within playback.
    Seek,
    /// Reports smoke.
    Smoke,
    /// Can stop playback.
    Stop,
    /// Reports temperature.
    Temperature,
    /// Supports timed transitions.
    Transition,
    /// Has an adjustable treble level.
    Treble,
    /// Reports twilight.
    Twilight,
    /// Can be upgraded.
    Upgrade,
    /// Reports user presence.
    UserPresence,
    /// Has an adjustable volume.
    Volume,
}

impl core::fmt::Debug for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

impl Capability {
    /// Returns the [`Capability`] name as advertised by a hub.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ActivePower => "ACTIVE_POWER",
            Self::Alert => "ALERT",
            Self::Bass => "BASS",
            Self::BatteryU => "BATTERY_U",
            Self::Brightness => "BRIGHTNESS",
            Self::ColorHs => "COLOR_HS",
            Self::ColorLoop => "COLOR_LOOP",
            Self::ColorTemp => "COLOR_TEMP",
            Self::Contact => "CONTACT",
            Self::ControlLight => "CONTROL_LIGHT",
            Self::ControlPower => "CONTROL_POWER",
            Self::Device => "DEVICE",
            Self::DimmerControl => "DIMMER_CONTROL",
            Self::GenerateAlert => "GENERATE_ALERT",
            Self::HueSwitch => "HUE_SWITCH",
            Self::Humidity => "HUMIDITY",
            Self::Identify => "IDENTIFY",
            Self::IkeaRc => "IKEA_RC",
            Self::Loudness => "LOUDNESS",
            Self::Lux => "LUX",
            Self::MeasurePower => "MEASURE_POWER",
            Self::Moisture => "MOISTURE",
            Self::Motion => "MOTION",
            Self::Mute => "MUTE",
            Self::Next => "NEXT",
            Self::OnOff => "ON_OFF",
            Self::Pause => "PAUSE",
            Self::Play => "PLAY",
            Self::Previous => "PREVIOUS",
            Self::PushNotification => "PUSH_NOTIFICATION",
            Self::RemoteControl => "REMOTE_CONTROL",
            Self::Seek => "SEEK",
            Self::Smoke => "SMOKE",
            Self::Stop => "STOP",
            Self::Temperature => "TEMPERATURE",
            Self::Transition => "TRANSITION",
            Self::Treble => "TREBLE",
            Self::Twilight => "TWILIGHT",
            Self::Upgrade => "UPGRADE",
            Self::UserPresence => "USER_PRESENCE",
            Self::Volume => "VOLUME",
        }
    }

    /// Returns the [`Capability`] associated with the given name.
    ///
    /// The return value is [`None`] when the name is unknown.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        ALL_CAPABILITIES
            .iter()
            .find(|capability| capability.name() == name)
            .copied()
    }
}

/// A collection of [`Capability`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Capabilities(IndexSet<Capability, DefaultHashBuilder>);

impl Capabilities {
    /// Creates an empty [`Capabilities`] collection.
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self(IndexSet::default())
    }

    /// Constructs [`Capabilities`] from an array of [`Capability`]s.
    #[must_use]
    #[inline]
    pub fn init_from_capabilities<const N: usize>(input_elements: [Capability; N]) -> Self {
        let mut elements = Self::new();
        for element in input_elements {
            elements.add(element);
        }
        elements
    }

    /// Inserts a [`Capability`] and returns the collection.
    #[must_use]
    #[inline]
    pub fn insert(mut self, capability: Capability) -> Self {
        self.add(capability);
        self
    }

    /// Adds a [`Capability`].
    #[inline]
    pub fn add(&mut self, capability: Capability) {
        let _ = self.0.insert(capability);
    }

    /// Checks whether a [`Capability`] is contained.
    #[must_use]
    #[inline]
    pub fn contains(&self, capability: &Capability) -> bool {
        self.0.contains(capability)
    }

    /// Checks whether the collection is empty.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of [`Capability`]s.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns an iterator over the [`Capability`]s.
    #[inline]
    pub fn iter(&self) -> Iter<'_, Capability> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a Capabilities {
    type Item = &'a Capability;
    type IntoIter = Iter<'a, Capability>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for Capabilities {
    type Item = Capability;
    type IntoIter = IntoIter<Capability>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Capability names a hub advertises for a device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilityValues {
    /// Advertised names, known or not.
    #[serde(default)]
    pub values: Vec<String>,
}

/// A device as described by a hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Device identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Device type, for example `LIGHT` or `MULTI_SENSOR`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Advertised capabilities.
    #[serde(default)]
    pub capabilities: CapabilityValues,
    /// Current state, whose shape depends on the device type.
    #[serde(default)]
    pub state: serde_json::Value,
}

impl Device {
    /// Checks whether the device advertises the given [`Capability`].
    #[must_use]
    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities
            .values
            .iter()
            .any(|name| name == capability.name())
    }

    /// Returns the advertised [`Capabilities`] known to this crate.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        let mut capabilities = Capabilities::new();
        for capability in self
            .capabilities
            .values
            .iter()
            .filter_map(|name| Capability::from_name(name))
        {
            capabilities.add(capability);
        }
        capabilities
    }
}

/// All devices of a hub, keyed by device identifier in the order the hub
/// listed them.
pub type Devices = IndexMap<String, Device, DefaultHashBuilder>;

/// How a [`DeviceFilter`] combines its capabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterMode {
    /// A device matches when it has at least one of the capabilities.
    #[default]
    Any,
    /// A device matches when it has every capability.
    All,
}

/// Selects devices by their advertised [`Capabilities`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceFilter {
    capabilities: Capabilities,
    mode: FilterMode,
}

impl DeviceFilter {
    /// Creates a [`DeviceFilter`] matching devices which have at least one
    /// of the given [`Capabilities`].
    #[must_use]
    #[inline]
    pub fn any(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            mode: FilterMode::Any,
        }
    }

    /// Creates a [`DeviceFilter`] matching devices which have all the
    /// given [`Capabilities`].
    #[must_use]
    #[inline]
    pub fn all(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            mode: FilterMode::All,
        }
    }

    /// Creates a [`DeviceFilter`] for a single [`Capability`].
    #[must_use]
    #[inline]
    pub fn capability(capability: Capability) -> Self {
        Self::any(Capabilities::new().insert(capability))
    }

    /// Checks whether a [`Device`] passes the filter.
    ///
    /// An empty filter lets every device through.
    #[must_use]
    pub fn matches(&self, device: &Device) -> bool {
        if self.capabilities.is_empty() {
            return true;
        }
        match self.mode {
            FilterMode::Any => self.capabilities.iter().any(|c| device.has(*c)),
            FilterMode::All => self.capabilities.iter().all(|c| device.has(*c)),
        }
    }

    /// Retains only the [`Devices`] passing the filter.
    #[must_use]
    pub fn apply(&self, mut devices: Devices) -> Devices {
        devices.retain(|_, device| self.matches(device));
        devices
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::vec::Vec;

    use serde_json::json;

    use crate::{deserialize, serialize};

    use super::{ALL_CAPABILITIES, Capabilities, Capability, Device, DeviceFilter, Devices};

    // A raw document, so that the hub listing order reaches the map.
    fn devices() -> Devices {
        serde_json::from_str(
            r#"{
                "light-1": {
                    "id": "light-1",
                    "name": "Kitchen",
                    "type": "LIGHT",
                    "capabilities": {
                        "type": "SET",
                        "values": ["BRIGHTNESS", "COLOR_TEMP", "ON_OFF", "SOME_FUTURE_THING"]
                    },
                    "state": { "isOn": true, "brightness": 0.5 }
                },
                "sensor-1": {
                    "id": "sensor-1",
                    "name": "Porch",
                    "type": "MULTI_SENSOR",
                    "capabilities": { "type": "SET", "values": ["TEMPERATURE", "HUMIDITY"] },
                    "state": { "temperature": 21.5, "humidity": 40 }
                },
                "plug-1": {
                    "id": "plug-1",
                    "type": "POWER_SOCKET",
                    "capabilities": { "values": ["ON_OFF", "MEASURE_POWER"] }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_capability() {
        assert_eq!(Capability::from_name("NOT_A_CAPABILITY"), None);

        for capability in ALL_CAPABILITIES {
            assert_eq!(Capability::from_name(capability.name()), Some(*capability));
            assert_eq!(serialize(capability), json!(capability.name()));
            assert_eq!(deserialize::<Capability>(serialize(capability)), *capability);
        }
    }

    #[test]
    fn device_capabilities() {
        let devices = devices();
        let light = &devices["light-1"];

        assert!(light.has(Capability::OnOff));
        assert!(!light.has(Capability::Temperature));

        // Unknown names are skipped.
        assert_eq!(
            light.capabilities(),
            Capabilities::init_from_capabilities([
                Capability::Brightness,
                Capability::ColorTemp,
                Capability::OnOff,
            ])
        );

        // Missing optional fields.
        let plug: &Device = &devices["plug-1"];
        assert_eq!(plug.name, "");
        assert!(plug.state.is_null());
    }

    #[test]
    fn filter_any() {
        let filter = DeviceFilter::any(
            Capabilities::new()
                .insert(Capability::Temperature)
                .insert(Capability::MeasurePower),
        );

        let filtered = filter.apply(devices());
        assert_eq!(
            filtered.keys().map(String::as_str).collect::<Vec<_>>(),
            ["sensor-1", "plug-1"]
        );
    }

    #[test]
    fn hub_order() {
        assert_eq!(
            devices().keys().map(String::as_str).collect::<Vec<_>>(),
            ["light-1", "sensor-1", "plug-1"]
        );
    }

    #[test]
    fn filter_all() {
        let filter = DeviceFilter::all(
            Capabilities::new()
                .insert(Capability::OnOff)
                .insert(Capability::Brightness),
        );

        let filtered = filter.apply(devices());
        assert_eq!(
            filtered.keys().map(String::as_str).collect::<Vec<_>>(),
            ["light-1"]
        );
    }

    #[test]
    fn empty_filter() {
        assert_eq!(DeviceFilter::default().apply(devices()).len(), 3);
        assert_eq!(
            DeviceFilter::capability(Capability::Smoke)
                .apply(devices())
                .len(),
            0
        );
    }
}
