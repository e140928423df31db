use alloc::string::String;

use serde::{Deserialize, Serialize};

/// The descriptor a hub returns about itself.
///
/// A hub answers this request even without credentials, so it is used to
/// identify a hub before a token has been validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubInfo {
    /// Hub identifier, when the hub reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hub_id: Option<String>,
    /// Display name given at registration time.
    pub name: String,
    /// Firmware version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Operational state reported by the hub.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Whether the hub is connected to the cloud.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
}

impl HubInfo {
    /// Creates a [`HubInfo`] with only a display name.
    #[must_use]
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            hub_id: None,
            name: name.into(),
            version: None,
            state: None,
            connected: None,
        }
    }

    /// Sets the hub identifier.
    #[must_use]
    #[inline]
    pub fn hub_id(mut self, hub_id: impl Into<String>) -> Self {
        self.hub_id = Some(hub_id.into());
        self
    }

    /// Checks whether the hub identifies itself as `hub_id`.
    ///
    /// A hub which does not report any identifier is assumed to match.
    #[must_use]
    pub fn is(&self, hub_id: &str) -> bool {
        self.hub_id.as_deref().is_none_or(|id| id == hub_id)
    }
}
