use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

/// Kinds of device commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    /// Turns a device on.
    #[serde(rename = "CMD_DEVICE_ON")]
    DeviceOn,
    /// Turns a device off.
    #[serde(rename = "CMD_DEVICE_OFF")]
    DeviceOff,
    /// Replaces part of a device state.
    #[serde(rename = "CMD_DEVICE")]
    DeviceState,
}

impl core::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::DeviceOn => "CMD_DEVICE_ON",
            Self::DeviceOff => "CMD_DEVICE_OFF",
            Self::DeviceState => "CMD_DEVICE",
        })
    }
}

/// A single command for a device.
///
/// A hub receives commands as a list, so several devices can be driven by
/// the same request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCommand {
    /// Identifier of the target device.
    pub id: String,
    /// Command kind.
    #[serde(rename = "type")]
    pub kind: CommandKind,
    /// New state, only present for [`CommandKind::DeviceState`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<serde_json::Value>,
}

impl DeviceCommand {
    /// Creates a command turning the device on.
    #[must_use]
    #[inline]
    pub fn on(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: CommandKind::DeviceOn,
            state: None,
        }
    }

    /// Creates a command turning the device off.
    #[must_use]
    #[inline]
    pub fn off(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: CommandKind::DeviceOff,
            state: None,
        }
    }

    /// Creates a command replacing part of the device state.
    #[must_use]
    #[inline]
    pub fn state(id: impl Into<String>, state: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            kind: CommandKind::DeviceState,
            state: Some(state),
        }
    }
}

/// A list of [`DeviceCommand`]s sent in one request.
pub type Commands = Vec<DeviceCommand>;
