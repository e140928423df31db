use serde_json::Value;

use cozify::api::hub;
use cozify::command::DeviceCommand;
use cozify::device::Devices;
use cozify::hub::HubInfo;

use crate::error::Result;
use crate::router::{HubCall, HubContext, Router};
use crate::transport::Transport;

/// One-to-one calls to a hub, routed according to a [`HubContext`].
#[derive(Debug, Clone, Copy)]
pub struct HubApi<'a> {
    router: &'a Router,
    transport: &'a Transport,
    context: &'a HubContext,
}

impl<'a> HubApi<'a> {
    /// Creates a [`HubApi`].
    #[must_use]
    pub const fn new(router: &'a Router, transport: &'a Transport, context: &'a HubContext) -> Self {
        Self {
            router,
            transport,
            context,
        }
    }

    /// Returns the hub descriptor.
    ///
    /// A hub answers this call without credentials when reached directly.
    ///
    /// # Errors
    ///
    /// Fails when the call cannot be routed or is not successful.
    pub fn hub(&self) -> Result<HubInfo> {
        self.get(&HubCall::root(hub::INFO))?.json()
    }

    /// Returns the hub timezone, for example `Europe/Helsinki`.
    ///
    /// Being the cheapest authorized call, it doubles as hub token probe.
    ///
    /// # Errors
    ///
    /// Fails when the call cannot be routed or is not successful.
    pub fn tz(&self) -> Result<String> {
        self.get(&HubCall::api(hub::TIMEZONE))?.json()
    }

    /// Returns the full live device map.
    ///
    /// # Errors
    ///
    /// Fails when the call cannot be routed or is not successful.
    pub fn devices(&self) -> Result<Devices> {
        self.get(&HubCall::api(hub::DEVICES))?.json()
    }

    /// Sends device commands and returns whatever the hub replied.
    ///
    /// # Errors
    ///
    /// Fails when the call cannot be routed or is not successful.
    pub fn devices_command(&self, commands: &[DeviceCommand]) -> Result<Value> {
        tracing::debug!("Sending {} device command(s)", commands.len());
        let request = self
            .router
            .hub(&HubCall::api(hub::DEVICES_COMMAND), self.context)?;
        let response = self.transport.put(request, commands)?;
        if response.text().trim().is_empty() {
            return Ok(Value::Null);
        }
        response.json()
    }

    fn get(&self, call: &HubCall) -> Result<crate::response::Response> {
        let request = self.router.hub(call, self.context)?;
        self.transport.get(request)
    }
}
