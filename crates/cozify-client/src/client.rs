use serde_json::{Map, Value};

use tracing::debug;

use cozify::command::DeviceCommand;
use cozify::device::{Capability, Device, DeviceFilter, Devices};
use cozify::hub::HubInfo;

use crate::config::Config;
use crate::error::{Error, ErrorKind, Result};
use crate::session::{AuthOptions, HubSelector, Session};

/// A thin facade over a [`Session`].
///
/// Every hub call takes a fresh routing snapshot from the credential store
/// and makes a single attempt. Nothing is repaired here: call
/// [`Client::ping`] first to renew tokens or switch routing.
#[derive(Debug)]
pub struct Client {
    session: Session,
}

impl Client {
    /// Creates a [`Client`] on the credential store at the configured
    /// location.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be opened or the HTTP client cannot be
    /// initialized.
    pub fn new(config: Config) -> Result<Self> {
        Session::new(config).map(Self::from_session)
    }

    /// Creates a [`Client`] on an existing [`Session`].
    #[must_use]
    pub const fn from_session(session: Session) -> Self {
        Self { session }
    }

    /// Returns the underlying [`Session`].
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the underlying [`Session`] mutably.
    pub const fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Authenticates with the cloud and the hubs.
    ///
    /// See [`Session::authenticate`].
    ///
    /// # Errors
    ///
    /// Fails as [`Session::authenticate`] does.
    pub fn authenticate(&mut self, options: &AuthOptions) -> Result<bool> {
        self.session.authenticate(options)
    }

    /// Checks a hub and repairs its credentials and routing if needed.
    ///
    /// See [`Session::ping`].
    ///
    /// # Errors
    ///
    /// Fails as [`Session::ping`] does.
    pub fn ping(&mut self, selector: &HubSelector, autorefresh: bool) -> Result<bool> {
        self.session.ping(selector, autorefresh)
    }

    /// Returns the descriptor of a hub.
    ///
    /// # Errors
    ///
    /// Fails when the hub cannot be selected or routed, or the call fails.
    pub fn hub_info(&self, selector: &HubSelector) -> Result<HubInfo> {
        let context = self.session.context(selector)?;
        self.session.hub_api(&context).hub()
    }

    /// Returns the timezone of a hub.
    ///
    /// # Errors
    ///
    /// Fails when the hub cannot be selected or routed, or the call fails.
    pub fn tz(&self, selector: &HubSelector) -> Result<String> {
        let context = self.session.context(selector)?;
        self.session.hub_api(&context).tz()
    }

    /// Returns the devices of a hub, optionally narrowed by a
    /// [`DeviceFilter`].
    ///
    /// # Errors
    ///
    /// Fails when the hub cannot be selected or routed, or the call fails.
    pub fn devices(&self, selector: &HubSelector, filter: Option<&DeviceFilter>) -> Result<Devices> {
        let context = self.session.context(selector)?;
        let devices = self.session.hub_api(&context).devices()?;
        debug!("Hub {} reported {} device(s)", context.hub_id, devices.len());

        Ok(match filter {
            Some(filter) => filter.apply(devices),
            None => devices,
        })
    }

    /// Sends device commands to a hub.
    ///
    /// # Errors
    ///
    /// Fails when the hub cannot be selected or routed, or the call fails.
    pub fn devices_command(
        &self,
        selector: &HubSelector,
        commands: &[DeviceCommand],
    ) -> Result<Value> {
        let context = self.session.context(selector)?;
        self.session.hub_api(&context).devices_command(commands)
    }

    /// Checks whether a hub knows a device.
    ///
    /// # Errors
    ///
    /// Fails when the hub cannot be selected or routed, or the call fails.
    pub fn device_exists(&self, selector: &HubSelector, device_id: &str) -> Result<bool> {
        Ok(self.devices(selector, None)?.contains_key(device_id))
    }

    /// Checks whether a hub knows a device passing a [`DeviceFilter`].
    ///
    /// # Errors
    ///
    /// Fails when the hub cannot be selected or routed, or the call fails.
    pub fn device_eligible(
        &self,
        selector: &HubSelector,
        device_id: &str,
        filter: &DeviceFilter,
    ) -> Result<bool> {
        Ok(self.devices(selector, Some(filter))?.contains_key(device_id))
    }

    /// Returns whether the hub currently reaches a device.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::Device`] when the device is unknown or does
    /// not report its reachability, and otherwise as [`Client::devices`].
    pub fn device_reachable(&self, selector: &HubSelector, device_id: &str) -> Result<bool> {
        let devices = self.devices(selector, None)?;
        let device = find(&devices, device_id)?;
        device
            .state
            .get("reachable")
            .and_then(Value::as_bool)
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::Device,
                    format!("Device {device_id} does not report its reachability."),
                )
            })
    }

    /// Turns a device on.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::Device`] when the device is unknown or
    /// cannot be switched, and otherwise when the hub cannot be selected or
    /// routed, or a call fails.
    pub fn device_on(&self, selector: &HubSelector, device_id: &str) -> Result<Value> {
        self.require_switchable(selector, device_id)?;
        self.devices_command(selector, &[DeviceCommand::on(device_id)])
    }

    /// Turns a device off.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::Device`] when the device is unknown or
    /// cannot be switched, and otherwise when the hub cannot be selected or
    /// routed, or a call fails.
    pub fn device_off(&self, selector: &HubSelector, device_id: &str) -> Result<Value> {
        self.require_switchable(selector, device_id)?;
        self.devices_command(selector, &[DeviceCommand::off(device_id)])
    }

    /// Flips the power of a device which can be switched.
    ///
    /// Only the power flag is set: every other state field is sent as
    /// `null`, which the hub leaves untouched.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::Device`] when the device is unknown, cannot
    /// be switched or does not report its power, and otherwise when the hub
    /// cannot be selected or routed, or a call fails.
    pub fn device_toggle(&self, selector: &HubSelector, device_id: &str) -> Result<Value> {
        let switchable = DeviceFilter::capability(Capability::OnOff);
        let devices = self.devices(selector, Some(&switchable))?;
        let device = find(&devices, device_id)?;

        let is_on = device
            .state
            .get("isOn")
            .and_then(Value::as_bool)
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::Device,
                    format!("Device {device_id} does not report its power."),
                )
            })?;

        let mut state = blank_state(&device.state);
        if let Value::Object(fields) = &mut state {
            let _ = fields.insert("isOn".into(), Value::Bool(!is_on));
        }
        debug!("Toggling device {device_id} {}", if is_on { "off" } else { "on" });
        self.device_state(selector, device_id, state)
    }

    /// Sets the state of a device.
    ///
    /// # Errors
    ///
    /// Fails when the hub cannot be selected or routed, or the call fails.
    pub fn device_state(&self, selector: &HubSelector, device_id: &str, state: Value) -> Result<Value> {
        self.devices_command(selector, &[DeviceCommand::state(device_id, state)])
    }

    /// Pushes back a whole device state, for example one saved earlier.
    ///
    /// Fields the hub reports but never accepts are dropped first.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::Device`] when the device is unknown, and
    /// otherwise when the hub cannot be selected or routed, or a call
    /// fails.
    pub fn device_state_replace(
        &self,
        selector: &HubSelector,
        device_id: &str,
        mut state: Value,
    ) -> Result<Value> {
        if !self.device_exists(selector, device_id)? {
            return Err(unknown_device(device_id));
        }
        if let Value::Object(fields) = &mut state {
            for key in READ_ONLY_STATE {
                let _ = fields.remove(*key);
            }
        }
        self.device_state(selector, device_id, state)
    }

    fn require_switchable(&self, selector: &HubSelector, device_id: &str) -> Result<()> {
        let switchable = DeviceFilter::capability(Capability::OnOff);
        if self.device_eligible(selector, device_id, &switchable)? {
            Ok(())
        } else {
            Err(Error::new(
                ErrorKind::Device,
                format!("Device {device_id} is not known or cannot be switched on and off."),
            ))
        }
    }
}

// Reported by a hub, rejected when sent back.
const READ_ONLY_STATE: &[&str] = &["lastSeen", "reachable", "maxTemperature", "minTemperature"];

fn unknown_device(device_id: &str) -> Error {
    Error::new(ErrorKind::Device, format!("Device {device_id} is not known."))
}

fn find<'a>(devices: &'a Devices, device_id: &str) -> Result<&'a Device> {
    devices
        .get(device_id)
        .ok_or_else(|| unknown_device(device_id))
}

// Nulls every field except `type`, recursing into nested objects.
fn blank_state(state: &Value) -> Value {
    match state {
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::Object(_) => blank_state(value),
                        _ if key == "type" => value.clone(),
                        _ => Value::Null,
                    };
                    (key.clone(), value)
                })
                .collect::<Map<String, Value>>(),
        ),
        _ => Value::Null,
    }
}
