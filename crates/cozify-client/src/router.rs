use reqwest::Url;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

use cozify::api::RELAY_PATH;

use crate::config::Config;
use crate::error::{Error, ErrorKind, Result};

const HUB_KEY: HeaderName = HeaderName::from_static("x-hub-key");

/// How a hub call reaches its hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    /// Directly to the hub address on the local network.
    Local,
    /// Through the cloud relay, which forwards the call to the hub.
    Relayed,
}

/// Everything needed to route a call to a hub.
///
/// A context is a snapshot of the credential store taken right before a
/// call, so it never outlives a token renewal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubContext {
    /// Hub identifier.
    pub hub_id: String,
    /// Whether calls are relayed through the cloud.
    pub remote: bool,
    /// Local hub address.
    pub host: Option<String>,
    /// Hub token.
    pub hub_token: Option<String>,
    /// Cloud token, only needed by relayed calls.
    pub cloud_token: Option<String>,
}

impl HubContext {
    /// Creates an empty [`HubContext`] for a hub.
    #[must_use]
    pub fn new(hub_id: impl Into<String>) -> Self {
        Self {
            hub_id: hub_id.into(),
            ..Self::default()
        }
    }

    /// Sets the remote flag.
    #[must_use]
    pub const fn remote(mut self, remote: bool) -> Self {
        self.remote = remote;
        self
    }

    /// Sets the local hub address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the hub token.
    #[must_use]
    pub fn hub_token(mut self, hub_token: impl Into<String>) -> Self {
        self.hub_token = Some(hub_token.into());
        self
    }

    /// Sets the cloud token.
    #[must_use]
    pub fn cloud_token(mut self, cloud_token: impl Into<String>) -> Self {
        self.cloud_token = Some(cloud_token.into());
        self
    }

    /// Returns the [`Routing`] of the calls made with this context.
    #[must_use]
    pub const fn routing(&self) -> Routing {
        if self.remote {
            Routing::Relayed
        } else {
            Routing::Local
        }
    }
}

/// Where a hub call path is rooted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallBase {
    /// At the hub root, outside of the versioned API.
    Root,
    /// Under the versioned API path.
    Api,
}

/// A call to a hub, independent of how it is routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubCall {
    path: String,
    base: CallBase,
    authorized: bool,
}

impl HubCall {
    /// Creates a call under the versioned API, authorized with the hub
    /// token.
    #[must_use]
    pub fn api(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            base: CallBase::Api,
            authorized: true,
        }
    }

    /// Creates a call at the hub root, which a hub answers without
    /// credentials when reached directly.
    #[must_use]
    pub fn root(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            base: CallBase::Root,
            authorized: false,
        }
    }

    /// Returns the call path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the call base.
    #[must_use]
    pub const fn base(&self) -> CallBase {
        self.base
    }
}

/// A fully routed request, ready to be sent.
#[derive(Debug, Clone)]
pub struct RoutedRequest {
    pub(crate) url: Url,
    pub(crate) headers: HeaderMap,
}

impl RoutedRequest {
    /// Returns the request address.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the request headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub(crate) fn json(mut self) -> Self {
        let _ = self
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::new(ErrorKind::Routing, format!("Invalid token: {e}")))
}

fn parse_url(url: &str, query: &[(&str, &str)]) -> Result<Url> {
    let parsed = if query.is_empty() {
        Url::parse(url)
    } else {
        Url::parse_with_params(url, query)
    };
    parsed.map_err(|e| Error::new(ErrorKind::Config, format!("Invalid address {url}: {e}")))
}

/// Builds the address and headers of cloud and hub calls.
///
/// The router is a pure function of the [`Config`] and of the context it
/// is given. It never reads the credential store nor touches the network.
#[derive(Debug, Clone)]
pub struct Router {
    cloud_base: String,
    hub_scheme: String,
    hub_port: u16,
    hub_api_path: String,
}

impl Router {
    /// Creates a [`Router`] from a [`Config`].
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            cloud_base: config.cloud_base.clone(),
            hub_scheme: config.hub_scheme.clone(),
            hub_port: config.hub_port,
            hub_api_path: config.hub_api_path.clone(),
        }
    }

    /// Routes a cloud call, optionally authorized with a cloud token.
    ///
    /// # Errors
    ///
    /// Fails when the token or the resulting address are not valid.
    pub fn cloud(
        &self,
        path: &str,
        cloud_token: Option<&str>,
        query: &[(&str, &str)],
    ) -> Result<RoutedRequest> {
        let url = parse_url(&format!("{}{path}", self.cloud_base), query)?;

        let mut headers = HeaderMap::new();
        if let Some(cloud_token) = cloud_token {
            let _ = headers.insert(AUTHORIZATION, header_value(cloud_token)?);
        }

        Ok(RoutedRequest { url, headers })
    }

    /// Routes a hub call according to the context remote flag.
    ///
    /// # Errors
    ///
    /// Fails when the context lacks what the routing needs: a host for a
    /// local call, both tokens for a relayed one, a hub token for an
    /// authorized call.
    pub fn hub(&self, call: &HubCall, context: &HubContext) -> Result<RoutedRequest> {
        let path = match call.base {
            CallBase::Root => call.path.clone(),
            CallBase::Api => format!("{}{}", self.hub_api_path, call.path),
        };

        match context.routing() {
            Routing::Local => self.local(&path, call.authorized, context),
            Routing::Relayed => self.relayed(&path, context),
        }
    }

    fn local(&self, path: &str, authorized: bool, context: &HubContext) -> Result<RoutedRequest> {
        let host = context
            .host
            .as_deref()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::Routing,
                    format!(
                        "Local call to hub {} but no host is known. Either set remote or host.",
                        context.hub_id
                    ),
                )
            })?;

        let url = parse_url(
            &format!("{}://{host}:{}{path}", self.hub_scheme, self.hub_port),
            &[],
        )?;

        let mut headers = HeaderMap::new();
        if authorized {
            let hub_token = Self::hub_token(context)?;
            let _ = headers.insert(AUTHORIZATION, header_value(hub_token)?);
        }

        Ok(RoutedRequest { url, headers })
    }

    fn relayed(&self, path: &str, context: &HubContext) -> Result<RoutedRequest> {
        let cloud_token = context
            .cloud_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::Routing,
                    format!(
                        "Remote call to hub {} but no cloud token is known.",
                        context.hub_id
                    ),
                )
            })?;
        let hub_token = Self::hub_token(context)?;

        self.relay(path, cloud_token, hub_token)
    }

    /// Routes a full hub path, versioned prefix included, through the cloud
    /// relay.
    ///
    /// The relay needs both credentials at once: the cloud token
    /// authorizes the caller, the hub key selects and authorizes the hub.
    ///
    /// # Errors
    ///
    /// Fails when a token or the resulting address are not valid.
    pub fn relay(&self, path: &str, cloud_token: &str, hub_token: &str) -> Result<RoutedRequest> {
        let url = parse_url(&format!("{}{RELAY_PATH}{path}", self.cloud_base), &[])?;

        let mut headers = HeaderMap::new();
        let _ = headers.insert(AUTHORIZATION, header_value(cloud_token)?);
        let _ = headers.insert(HUB_KEY, header_value(hub_token)?);

        Ok(RoutedRequest { url, headers })
    }

    fn hub_token(context: &HubContext) -> Result<&str> {
        context
            .hub_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::Routing,
                    format!("Call to hub {} but no hub token is known.", context.hub_id),
                )
            })
    }
}
