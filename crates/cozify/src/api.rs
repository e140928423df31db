/// Base address of the cloud API, including its version.
pub const CLOUD_BASE: &str = "https://cloud2.cozify.fi/ui/0.2";

/// Scheme used to reach a hub on the local network.
pub const HUB_SCHEME: &str = "http";

/// Port a hub listens on.
pub const HUB_PORT: u16 = 8893;

/// Versioned path prefix of the hub API.
///
/// A hub firmware update may raise the version, in which case the hub
/// starts answering the old prefix with `410 Gone`.
pub const HUB_API_PATH: &str = "/cc/1.14";

/// Header carrying the hub token when a call is relayed through the cloud.
pub const HUB_KEY_HEADER: &str = "X-Hub-Key";

/// Cloud path under which hub calls are relayed.
pub const RELAY_PATH: &str = "/hub/remote";

/// Cloud endpoints.
pub mod cloud {
    /// Requests a one-time passcode to be emailed to an account.
    pub const REQUEST_LOGIN: &str = "/user/requestlogin";
    /// Exchanges an email and a one-time passcode for a cloud token.
    pub const EMAIL_LOGIN: &str = "/user/emaillogin";
    /// Returns the map of hub identifiers to hub tokens of an account.
    pub const HUB_KEYS: &str = "/user/hubkeys";
    /// Renews a still valid cloud token.
    pub const REFRESH_SESSION: &str = "/user/refreshsession";
    /// Returns the local addresses of the hubs sharing the caller's public
    /// address.
    pub const LAN_IP: &str = "/hub/lan_ip";
}

/// Hub endpoints.
pub mod hub {
    /// Hub descriptor. Served outside of the versioned prefix and answered
    /// without credentials.
    pub const INFO: &str = "/hub";
    /// Hub timezone.
    pub const TIMEZONE: &str = "/hub/tz";
    /// Device map.
    pub const DEVICES: &str = "/devices";
    /// Device commands.
    pub const DEVICES_COMMAND: &str = "/devices/command";
}
