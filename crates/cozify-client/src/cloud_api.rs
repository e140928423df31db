use indexmap::IndexMap;

use serde::Serialize;

use cozify::api::cloud;

use crate::error::Result;
use crate::response::Response;
use crate::router::Router;
use crate::transport::Transport;

/// One-to-one calls to the Cozify cloud.
///
/// No call here touches the credential store nor catches an error: the
/// session decides what a failure means.
#[derive(Debug, Clone, Copy)]
pub struct CloudApi<'a> {
    router: &'a Router,
    transport: &'a Transport,
}

impl<'a> CloudApi<'a> {
    /// Creates a [`CloudApi`].
    #[must_use]
    pub const fn new(router: &'a Router, transport: &'a Transport) -> Self {
        Self { router, transport }
    }

    /// Asks the cloud to email a one-time passcode to the account.
    ///
    /// # Errors
    ///
    /// Fails with an API error when the cloud refuses the address.
    pub fn request_login(&self, email: &str) -> Result<()> {
        let request = self
            .router
            .cloud(cloud::REQUEST_LOGIN, None, &[("email", email)])?;
        let _ = self.transport.post(request)?;
        Ok(())
    }

    /// Exchanges an email address and a one-time passcode for a cloud
    /// token.
    ///
    /// # Errors
    ///
    /// Fails with an API error when the passcode is wrong or expired.
    pub fn email_login(&self, email: &str, otp: &str) -> Result<String> {
        let request = self.router.cloud(
            cloud::EMAIL_LOGIN,
            None,
            &[("email", email), ("password", otp)],
        )?;
        self.transport.post(request)?.token()
    }

    /// Returns the local addresses of the hubs behind the caller's public
    /// address.
    ///
    /// # Errors
    ///
    /// Fails with an API error when no hub shares the caller's public
    /// address, which is the common case outside of the hub network.
    pub fn lan_ip(&self) -> Result<Vec<String>> {
        let request = self.router.cloud(cloud::LAN_IP, None, &[])?;
        self.transport.get(request)?.json()
    }

    /// Returns the hub tokens the cloud authorized for the account, keyed
    /// by hub identifier.
    ///
    /// # Errors
    ///
    /// Fails with an API error carrying `401` when the cloud token is no
    /// longer valid.
    pub fn hub_keys(&self, cloud_token: &str) -> Result<IndexMap<String, String>> {
        let request = self.router.cloud(cloud::HUB_KEYS, Some(cloud_token), &[])?;
        self.transport.get(request)?.json()
    }

    /// Renews a still valid cloud token. The new token is not stored.
    ///
    /// # Errors
    ///
    /// Fails with an API error carrying `401` when the cloud token is
    /// already dead.
    pub fn refresh_session(&self, cloud_token: &str) -> Result<String> {
        let request = self
            .router
            .cloud(cloud::REFRESH_SESSION, Some(cloud_token), &[])?;
        self.transport.get(request)?.token()
    }

    /// Sends a hub call through the cloud relay and returns the raw
    /// response.
    ///
    /// `api_call` is the full hub path, for example `/cc/1.14/hub/tz`. The
    /// call is a `PUT` when a payload is given, a `GET` otherwise.
    ///
    /// # Errors
    ///
    /// Fails with an API error on any non-successful answer, relayed hub
    /// answers included.
    pub fn remote<T: Serialize + ?Sized>(
        &self,
        cloud_token: &str,
        hub_token: &str,
        api_call: &str,
        payload: Option<&T>,
    ) -> Result<Response> {
        let request = self.router.relay(api_call, cloud_token, hub_token)?;
        match payload {
            Some(payload) => self.transport.put(request, payload),
            None => self.transport.get(request),
        }
    }
}
