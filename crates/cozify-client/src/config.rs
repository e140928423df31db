use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::TimeDelta;

use cozify::api::{CLOUD_BASE, HUB_API_PATH, HUB_PORT, HUB_SCHEME};

use crate::error::{Error, ErrorKind, Result};

// Hub calls are local-network-class, relayed calls share the same budget.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

// Cloud tokens are currently valid for 28 days. Missing the refresh window
// means a new interactive login, so refresh far earlier than needed.
const DEFAULT_TOKEN_EXPIRY: TimeDelta = TimeDelta::days(1);

const STATE_DIRECTORY: &str = "cozify";
const STATE_FILE: &str = "state.toml";

/// Client configuration.
///
/// Every field defaults to the production Cozify endpoints; the builder
/// methods exist to reach test servers or hubs with a newer API version.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub(crate) cloud_base: String,
    pub(crate) hub_scheme: String,
    pub(crate) hub_port: u16,
    pub(crate) hub_api_path: String,
    pub(crate) timeout: Duration,
    pub(crate) token_expiry: TimeDelta,
    pub(crate) state_path: Option<PathBuf>,
    pub(crate) system_proxy: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Creates a [`Config`] with the production endpoints.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cloud_base: CLOUD_BASE.into(),
            hub_scheme: HUB_SCHEME.into(),
            hub_port: HUB_PORT,
            hub_api_path: HUB_API_PATH.into(),
            timeout: DEFAULT_TIMEOUT,
            token_expiry: DEFAULT_TOKEN_EXPIRY,
            state_path: None,
            system_proxy: true,
        }
    }

    /// Sets the cloud API base address, version included.
    #[must_use]
    pub fn cloud_base(mut self, cloud_base: impl Into<String>) -> Self {
        self.cloud_base = cloud_base.into().trim_end_matches('/').into();
        self
    }

    /// Sets the scheme used to reach a hub directly.
    #[must_use]
    pub fn hub_scheme(mut self, hub_scheme: impl Into<String>) -> Self {
        self.hub_scheme = hub_scheme.into();
        self
    }

    /// Sets the port used to reach a hub directly.
    #[must_use]
    pub const fn hub_port(mut self, hub_port: u16) -> Self {
        self.hub_port = hub_port;
        self
    }

    /// Sets the versioned hub API path, for example `/cc/1.14`.
    #[must_use]
    pub fn hub_api_path(mut self, hub_api_path: impl Into<String>) -> Self {
        self.hub_api_path = hub_api_path.into().trim_end_matches('/').into();
        self
    }

    /// Sets the timeout of every network call.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how long a cloud token is trusted before being refreshed.
    #[must_use]
    pub const fn token_expiry(mut self, token_expiry: TimeDelta) -> Self {
        self.token_expiry = token_expiry;
        self
    }

    /// Sets the credential store location.
    #[must_use]
    pub fn state_path(mut self, state_path: impl AsRef<Path>) -> Self {
        self.state_path = Some(state_path.as_ref().to_path_buf());
        self
    }

    /// Sets whether proxies found in the environment are honored.
    ///
    /// Proxies stored in the credential store are always honored.
    #[must_use]
    pub const fn system_proxy(mut self, system_proxy: bool) -> Self {
        self.system_proxy = system_proxy;
        self
    }

    /// Returns the default refresh expiry of a cloud token.
    #[must_use]
    pub const fn expiry(&self) -> TimeDelta {
        self.token_expiry
    }

    /// Returns the credential store location.
    ///
    /// When not explicitly set, the location is resolved inside the
    /// platform configuration directory.
    ///
    /// # Errors
    ///
    /// Fails when no location was set and the platform has no
    /// configuration directory.
    pub fn resolved_state_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.state_path {
            return Ok(path.clone());
        }
        default_state_path().ok_or_else(|| {
            Error::new(
                ErrorKind::Config,
                "Could not determine the configuration directory",
            )
        })
    }
}

/// Returns the default credential store location, following the platform
/// conventions (`$XDG_CONFIG_HOME/cozify/state.toml` on Linux).
#[must_use]
pub fn default_state_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(STATE_DIRECTORY).join(STATE_FILE))
}
