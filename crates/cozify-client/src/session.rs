use chrono::{Local, NaiveDateTime, TimeDelta};

use tracing::{debug, error, info, warn};

use crate::cloud_api::CloudApi;
use crate::config::Config;
use crate::error::{Error, ErrorKind, Result};
use crate::hub_api::HubApi;
use crate::prompt::{Prompt, Terminal};
use crate::router::{HubContext, Router};
use crate::store::{CLOUD, HUBS, Hub, Store, cloud_keys, hub_keys, hub_section};
use crate::transport::{Proxies, Transport};

const REFRESH_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Authentication progress of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No cloud token has been validated yet.
    NoCloudSession,
    /// A one-time passcode login is in progress.
    CloudAuthenticating,
    /// The cloud token is valid.
    CloudAuthenticated,
    /// Hub tokens are being fetched from the cloud.
    HubEnumerating,
    /// Both cloud and hub tokens are valid.
    Ready,
    /// The last authentication failed.
    Failed,
}

/// Result of a credential validity probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The credentials were accepted.
    Valid,
    /// The credentials were rejected with `401` or `403`.
    Expired,
    /// No answer was received.
    Unreachable,
}

/// Selects a hub.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HubSelector {
    /// The default hub.
    #[default]
    Default,
    /// A hub by identifier.
    Id(String),
    /// A hub by display name.
    Name(String),
}

impl HubSelector {
    /// Selects a hub by identifier.
    #[must_use]
    pub fn id(hub_id: impl Into<String>) -> Self {
        Self::Id(hub_id.into())
    }

    /// Selects a hub by display name.
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }
}

/// Options of [`Session::authenticate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthOptions {
    /// Reuse the stored cloud token when it still passes a probe.
    pub trust_cloud: bool,
    /// Reuse the stored hub tokens when the default hub still passes a
    /// probe.
    pub trust_hub: bool,
    /// Relay the calls of the enumerated hubs through the cloud.
    pub remote: bool,
    /// Let newly seen hubs follow their observed reachability.
    pub autoremote: bool,
    /// Renew the cloud token when its refresh expiry is over.
    pub autorefresh: bool,
    /// Refresh expiry, the configured one when missing.
    pub expiry: Option<TimeDelta>,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            trust_cloud: true,
            trust_hub: true,
            remote: false,
            autoremote: true,
            autorefresh: true,
            expiry: None,
        }
    }
}

impl AuthOptions {
    /// Sets whether the stored cloud token is trusted.
    #[must_use]
    pub const fn trust_cloud(mut self, trust_cloud: bool) -> Self {
        self.trust_cloud = trust_cloud;
        self
    }

    /// Sets whether the stored hub tokens are trusted.
    #[must_use]
    pub const fn trust_hub(mut self, trust_hub: bool) -> Self {
        self.trust_hub = trust_hub;
        self
    }

    /// Sets whether enumerated hubs are relayed through the cloud.
    #[must_use]
    pub const fn remote(mut self, remote: bool) -> Self {
        self.remote = remote;
        self
    }

    /// Sets whether newly seen hubs follow their observed reachability.
    #[must_use]
    pub const fn autoremote(mut self, autoremote: bool) -> Self {
        self.autoremote = autoremote;
        self
    }

    /// Sets whether the cloud token is renewed when needed.
    #[must_use]
    pub const fn autorefresh(mut self, autorefresh: bool) -> Self {
        self.autorefresh = autorefresh;
        self
    }

    /// Sets the refresh expiry.
    #[must_use]
    pub const fn expiry(mut self, expiry: TimeDelta) -> Self {
        self.expiry = Some(expiry);
        self
    }
}

/// Checks whether a cloud token refreshed at `last_refresh` must be
/// refreshed at `now`.
///
/// A missing or unreadable timestamp always requires a refresh.
#[must_use]
pub fn needs_refresh_at(
    last_refresh: Option<&str>,
    force: bool,
    expiry: TimeDelta,
    now: NaiveDateTime,
) -> bool {
    if force {
        return true;
    }

    let Some(last_refresh) = last_refresh else {
        info!("Last cloud token refresh unknown, will force refresh.");
        return true;
    };

    let Ok(last_refresh) = NaiveDateTime::parse_from_str(last_refresh, REFRESH_FORMAT) else {
        error!("Last cloud token refresh timestamp invalid, will force refresh.");
        return true;
    };

    last_refresh
        .checked_add_signed(expiry)
        .is_some_and(|deadline| deadline < now)
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn auth_outcome(result: Result<()>) -> Result<AuthOutcome> {
    match result {
        Ok(()) => Ok(AuthOutcome::Valid),
        Err(e) if e.is_auth_failure() => Ok(AuthOutcome::Expired),
        Err(e) if e.is_connection() => Ok(AuthOutcome::Unreachable),
        Err(e) => Err(e),
    }
}

/// The authentication state machine.
///
/// A [`Session`] guarantees that, whenever a hub is called, a presumably
/// valid cloud token, hub token and routing are available. It acquires
/// them with a one-time passcode login when needed and repairs them when
/// they expire or a hub stops answering on the local network.
///
/// A [`Session`] is the only owner of the credential store. Two sessions
/// on the same store, in the same process or not, may race.
pub struct Session {
    config: Config,
    store: Store,
    router: Router,
    transport: Transport,
    prompt: Box<dyn Prompt>,
    state: AuthState,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("store", &self.store.path())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a [`Session`] on the store at the configured location.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be opened or the HTTP client cannot be
    /// initialized.
    pub fn new(config: Config) -> Result<Self> {
        let store = Store::open(config.resolved_state_path()?)?;
        Self::with_store(config, store)
    }

    /// Creates a [`Session`] on an already opened [`Store`].
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be initialized.
    pub fn with_store(config: Config, store: Store) -> Result<Self> {
        let transport = Transport::new(&config, &Proxies::from_store(&store))?;
        Ok(Self {
            router: Router::from_config(&config),
            transport,
            config,
            store,
            prompt: Box::new(Terminal),
            state: AuthState::NoCloudSession,
        })
    }

    /// Replaces the [`Prompt`] asked for the email address and the
    /// one-time passcode.
    #[must_use]
    pub fn prompt(mut self, prompt: impl Prompt + 'static) -> Self {
        self.prompt = Box::new(prompt);
        self
    }

    /// Returns the current [`AuthState`].
    #[must_use]
    pub const fn state(&self) -> AuthState {
        self.state
    }

    /// Returns the [`Config`].
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the credential [`Store`].
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// Returns the one-to-one cloud calls.
    #[must_use]
    pub const fn cloud_api(&self) -> CloudApi<'_> {
        CloudApi::new(&self.router, &self.transport)
    }

    /// Returns the one-to-one hub calls for a [`HubContext`].
    #[must_use]
    pub const fn hub_api<'a>(&'a self, context: &'a HubContext) -> HubApi<'a> {
        HubApi::new(&self.router, &self.transport, context)
    }

    /// Authenticates with the cloud and with every hub of the account.
    ///
    /// Interaction only happens when strictly needed, usually on the first
    /// run. When the stored tokens are trusted and still valid, the call
    /// only probes them.
    ///
    /// Returns `false` when no hub is registered to the account or when a
    /// hub turns out not to be linked to it, in which case the cloud
    /// session is reset.
    ///
    /// # Errors
    ///
    /// Fails with an authentication error when no email address or
    /// passcode can be obtained, and with an API error when the cloud
    /// refuses them. In both cases the cloud session is reset before
    /// returning. Any other unexpected failure is propagated unchanged.
    pub fn authenticate(&mut self, options: &AuthOptions) -> Result<bool> {
        let result = self.run_authentication(options);
        self.state = match result {
            Ok(true) => AuthState::Ready,
            Ok(false) | Err(_) => AuthState::Failed,
        };
        result
    }

    /// Wipes the cloud session.
    ///
    /// Hubs are left untouched.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be written.
    pub fn reset(&mut self) -> Result<()> {
        self.store.clear_section(CLOUD)?;
        self.state = AuthState::NoCloudSession;
        Ok(())
    }

    /// Checks whether the cloud token must be refreshed now.
    #[must_use]
    pub fn need_refresh(&self, force: bool, expiry: Option<TimeDelta>) -> bool {
        needs_refresh_at(
            self.store.get(CLOUD, cloud_keys::LAST_REFRESH),
            force,
            expiry.unwrap_or(self.config.token_expiry),
            now(),
        )
    }

    /// Renews the cloud token if `force` is set or its refresh expiry is
    /// over.
    ///
    /// Returns `true` also when no renewal was needed, and `false` when
    /// the token was already dead, in which case a full authentication is
    /// needed.
    ///
    /// # Errors
    ///
    /// Fails when no cloud token is stored or the renewal fails for any
    /// other reason than a dead token.
    pub fn refresh(&mut self, force: bool, expiry: Option<TimeDelta>) -> Result<bool> {
        if !self.need_refresh(force, expiry) {
            debug!(
                "No token refresh, not expired yet. Limit is: {}",
                expiry.unwrap_or(self.config.token_expiry)
            );
            return Ok(true);
        }

        let cloud_token = self.require_cloud_token()?;
        match self.cloud_api().refresh_session(&cloud_token) {
            Ok(cloud_token) => {
                self.store.set(CLOUD, cloud_keys::TOKEN, cloud_token)?;
                self.touch_refresh()?;
                info!("Cloud token has been successfully refreshed.");
                Ok(true)
            }
            Err(e) if e.status_code() == Some(401) => {
                warn!("Cloud token is already dead, it cannot be refreshed.");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Probes the stored cloud token.
    ///
    /// # Errors
    ///
    /// Fails when the cloud answers with anything else than a success or
    /// an authorization failure.
    pub fn probe_cloud(&self) -> Result<AuthOutcome> {
        auth_outcome(self.check_cloud())
    }

    /// Checks the stored cloud token and, when valid, refreshes it if its
    /// refresh expiry is over.
    ///
    /// # Errors
    ///
    /// Fails when the cloud cannot be reached or answers with anything else
    /// than a success or an authorization failure.
    pub fn cloud_ping(&mut self, expiry: Option<TimeDelta>) -> Result<bool> {
        if self.cloud_token().is_none() {
            return Ok(false);
        }

        match self.check_cloud() {
            Ok(()) => {
                let _ = self.refresh(false, expiry)?;
                Ok(true)
            }
            Err(e) if e.is_auth_failure() => {
                debug!("Cloud token rejected: {e}");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Probes the stored hub token of a hub with its current routing.
    ///
    /// # Errors
    ///
    /// Fails when the hub cannot be selected or routed, or when it answers
    /// with anything else than a success or an authorization failure.
    pub fn probe_hub(&self, selector: &HubSelector) -> Result<AuthOutcome> {
        let context = self.context(selector)?;
        auth_outcome(self.check_hub(&context))
    }

    /// Checks that a hub answers with the stored credentials and repairs
    /// what can be repaired.
    ///
    /// When the hub answers and `autorefresh` is set, the cloud token is
    /// also refreshed if its refresh expiry is over.
    ///
    /// - An expired hub token is renewed with a full authentication when
    ///   `autorefresh` is set.
    /// - A hub which does not answer on the local network has its address
    ///   refreshed, then is switched to the cloud relay when its autoremote
    ///   flag allows it. A relay which does not answer either restores the
    ///   local routing.
    ///
    /// # Errors
    ///
    /// Fails with a state error when the hub cannot be selected or is not
    /// known, in which case nothing is written. Also fails when the hub
    /// answers with an unexpected error, or when neither the hub nor the
    /// cloud can be reached.
    pub fn ping(&mut self, selector: &HubSelector, autorefresh: bool) -> Result<bool> {
        let hub = self.hub(selector)?;
        let hub_id = hub.hub_id;
        let mut context = self.context(&HubSelector::Id(hub_id.clone()))?;

        if !context.remote && hub.autoremote && context.host.is_none() {
            self.set_hub_remote(&hub_id, true)?;
            context.remote = true;
            debug!("Ping determined hub {hub_id} is remote and flipped state to remote.");
        }

        match auth_outcome(self.check_hub(&context))? {
            AuthOutcome::Valid => {
                if autorefresh && self.cloud_token().is_some() {
                    // The hub answered, a failed renewal is not its fault.
                    if let Err(e) = self.refresh(false, None) {
                        warn!("Opportunistic cloud token refresh failed: {e}");
                    }
                }
                Ok(true)
            }
            AuthOutcome::Expired => {
                if autorefresh {
                    warn!("Hub token has expired, ping attempting to renew it.");
                    if self.authenticate(&AuthOptions::default().trust_hub(false))? {
                        return Ok(true);
                    }
                }
                error!("Hub {hub_id} rejected its token.");
                Ok(false)
            }
            AuthOutcome::Unreachable => self.rescue(&hub_id, context, hub.autoremote),
        }
    }

    /// Refreshes the local address of a hub from the cloud.
    ///
    /// Returns `true` when the address changed. Being outside of the hub
    /// network is not an error, the address is simply left as is.
    ///
    /// # Errors
    ///
    /// Fails when the cloud cannot be reached or the store written.
    pub fn update_hub_host(&mut self, hub_id: &str) -> Result<bool> {
        let Some(host) = self.local_hubs()?.into_iter().next() else {
            return Ok(false);
        };
        if self.hub_host(hub_id).as_deref() == Some(host.as_str()) {
            return Ok(false);
        }
        info!("Hub {hub_id} address changed to {host}.");
        self.store.set(&hub_section(hub_id), hub_keys::HOST, host)?;
        Ok(true)
    }

    /// Builds the [`HubContext`] of a hub from the store.
    ///
    /// # Errors
    ///
    /// Fails when the hub cannot be selected.
    pub fn context(&self, selector: &HubSelector) -> Result<HubContext> {
        let hub_id = self.resolve(selector)?;
        let hub = self.store.hub(&hub_id);
        Ok(HubContext {
            remote: hub.as_ref().is_some_and(|hub| hub.remote),
            host: hub.as_ref().and_then(|hub| hub.host.clone()),
            hub_token: hub.and_then(|hub| hub.hub_token),
            cloud_token: self.cloud_token(),
            hub_id,
        })
    }

    /// Resolves a [`HubSelector`] to a hub identifier.
    ///
    /// An identifier is returned as is, even for an unknown hub.
    ///
    /// # Errors
    ///
    /// Fails when no default hub is set or no hub has the given name.
    pub fn resolve(&self, selector: &HubSelector) -> Result<String> {
        match selector {
            HubSelector::Id(hub_id) => Ok(hub_id.clone()),
            HubSelector::Default => self.default_hub().map(str::to_owned).ok_or_else(|| {
                Error::new(
                    ErrorKind::State,
                    "No default hub is set, authenticate first.",
                )
            }),
            HubSelector::Name(name) => self
                .store
                .hubs()
                .into_iter()
                .find(|hub| hub.name.as_deref() == Some(name.as_str()))
                .map(|hub| hub.hub_id)
                .ok_or_else(|| {
                    Error::new(ErrorKind::State, format!("No hub named {name} is known."))
                }),
        }
    }

    /// Returns a known hub.
    ///
    /// # Errors
    ///
    /// Fails when the hub cannot be selected or is unknown.
    pub fn hub(&self, selector: &HubSelector) -> Result<Hub> {
        let hub_id = self.resolve(selector)?;
        self.store
            .hub(&hub_id)
            .ok_or_else(|| Error::new(ErrorKind::State, format!("Hub {hub_id} is not known.")))
    }

    /// Returns the default hub identifier.
    #[must_use]
    pub fn default_hub(&self) -> Option<&str> {
        self.store.default_hub()
    }

    /// Checks whether a hub is known.
    #[must_use]
    pub fn hub_exists(&self, hub_id: &str) -> bool {
        self.store.hub_exists(hub_id)
    }

    /// Returns the display name of a hub.
    #[must_use]
    pub fn hub_name(&self, hub_id: &str) -> Option<String> {
        self.store.hub(hub_id).and_then(|hub| hub.name)
    }

    /// Returns the last known local address of a hub.
    #[must_use]
    pub fn hub_host(&self, hub_id: &str) -> Option<String> {
        self.store.hub(hub_id).and_then(|hub| hub.host)
    }

    /// Returns the token of a hub.
    #[must_use]
    pub fn hub_token(&self, hub_id: &str) -> Option<String> {
        self.store.hub(hub_id).and_then(|hub| hub.hub_token)
    }

    /// Returns whether calls to a hub are relayed, `false` for an unknown
    /// hub.
    #[must_use]
    pub fn hub_remote(&self, hub_id: &str) -> bool {
        self.store
            .get_bool(&hub_section(hub_id), hub_keys::REMOTE, false)
    }

    /// Sets whether calls to a hub are relayed.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be written.
    pub fn set_hub_remote(&mut self, hub_id: &str, remote: bool) -> Result<()> {
        self.store
            .set_bool(&hub_section(hub_id), hub_keys::REMOTE, remote)
    }

    /// Returns whether a hub follows its observed reachability, `true` for
    /// an unknown hub.
    #[must_use]
    pub fn hub_autoremote(&self, hub_id: &str) -> bool {
        self.store
            .get_bool(&hub_section(hub_id), hub_keys::AUTOREMOTE, true)
    }

    /// Sets whether a hub follows its observed reachability.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be written.
    pub fn set_hub_autoremote(&mut self, hub_id: &str, autoremote: bool) -> Result<()> {
        self.store
            .set_bool(&hub_section(hub_id), hub_keys::AUTOREMOTE, autoremote)
    }

    /// Returns the account email address.
    #[must_use]
    pub fn email(&self) -> Option<String> {
        self.store.cloud().email
    }

    /// Returns the cloud token.
    #[must_use]
    pub fn cloud_token(&self) -> Option<String> {
        self.store.cloud().cloud_token
    }

    fn touch_refresh(&mut self) -> Result<()> {
        let timestamp = now().format(REFRESH_FORMAT).to_string();
        self.store.set(CLOUD, cloud_keys::LAST_REFRESH, timestamp)
    }

    fn require_cloud_token(&self) -> Result<String> {
        self.cloud_token()
            .ok_or_else(|| Error::new(ErrorKind::State, "No cloud token is stored."))
    }

    fn check_cloud(&self) -> Result<()> {
        let cloud_token = self.require_cloud_token()?;
        let _ = self.cloud_api().hub_keys(&cloud_token)?;
        Ok(())
    }

    fn check_hub(&self, context: &HubContext) -> Result<()> {
        let timezone = self.hub_api(context).tz()?;
        debug!("Ping performed with tz call, response: {timezone}");
        Ok(())
    }

    // Outside of the hub network the cloud refuses to answer, which only
    // means no hub is local.
    fn local_hubs(&self) -> Result<Vec<String>> {
        match self.cloud_api().lan_ip() {
            Ok(hosts) => Ok(hosts),
            Err(e) if e.is_api() => {
                debug!("No local hub found: {e}");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    fn rescue(
        &mut self,
        hub_id: &str,
        context: HubContext,
        autoremote: bool,
    ) -> Result<bool> {
        let failure = Error::new(
            ErrorKind::Connection,
            format!("Hub {hub_id} cannot be reached."),
        );
        warn!("Hub {hub_id} connection failed, attempting to rescue it.");
        if context.remote {
            return Err(failure);
        }

        warn!("Verifying we have an up to date address for hub {hub_id}.");
        if self.update_hub_host(hub_id)? {
            let refreshed = self.context(&HubSelector::id(hub_id))?;
            match self.check_hub(&refreshed) {
                Ok(()) => {
                    warn!("Hub {hub_id} address had changed, back in business!");
                    return Ok(true);
                }
                Err(e) => error!("Refreshing hub {hub_id} address was not enough to rescue it: {e}"),
            }
        }

        if !autoremote {
            return Err(failure);
        }

        warn!("Perhaps hub {hub_id} can be reached remotely.");
        if !self.cloud_ping(None)? {
            // The cloud cannot relay anything without a valid token.
            return Err(failure);
        }

        self.set_hub_remote(hub_id, true)?;
        let relayed = self.context(&HubSelector::id(hub_id))?;
        match self.check_hub(&relayed) {
            Ok(()) => {
                info!("Hub {hub_id} connection succeeded remotely, leaving hub configured as remote.");
                Ok(true)
            }
            Err(e) => {
                error!("Cannot connect to hub {hub_id} via the cloud either, nothing left to try: {e}");
                self.set_hub_remote(hub_id, false)?;
                Ok(false)
            }
        }
    }

    fn run_authentication(&mut self, options: &AuthOptions) -> Result<bool> {
        let email = match self.email() {
            Some(email) => email,
            None => {
                let email = self.prompt.email()?;
                self.store.set(CLOUD, cloud_keys::EMAIL, email.as_str())?;
                email
            }
        };

        let cloud_token = if self.need_cloud_token(options)? {
            self.login(&email)?
        } else {
            if options.autorefresh {
                debug!("Cloud token trusted, attempting token refresh.");
                let _ = self.refresh(false, options.expiry)?;
            }
            self.require_cloud_token()?
        };
        self.state = AuthState::CloudAuthenticated;

        if self.need_hub_token(options.trust_hub)? {
            self.state = AuthState::HubEnumerating;
            return self.enumerate_hubs(&email, &cloud_token, options);
        }

        Ok(true)
    }

    fn need_cloud_token(&mut self, options: &AuthOptions) -> Result<bool> {
        if !options.trust_cloud || self.cloud_token().is_none() {
            return Ok(true);
        }
        Ok(!self.cloud_ping(options.expiry)?)
    }

    fn need_hub_token(&mut self, trust: bool) -> Result<bool> {
        if !trust {
            debug!("Hub token not trusted so it needs to be renewed.");
            return Ok(true);
        }

        let Some(hub_id) = self.default_hub().map(str::to_owned) else {
            debug!("No default hub known.");
            return Ok(true);
        };
        if self.hub_token(&hub_id).is_none() {
            debug!("No hub token known for the default hub.");
            return Ok(true);
        }

        let ping = self.ping(&HubSelector::Id(hub_id), false)?;
        debug!("Testing ping for hub token validity: {ping}");
        Ok(!ping)
    }

    fn login(&mut self, email: &str) -> Result<String> {
        self.state = AuthState::CloudAuthenticating;

        if let Err(e) = self.cloud_api().request_login(email) {
            if e.is_api() {
                // A bogus email fails every later attempt.
                self.reset()?;
            }
            return Err(e);
        }

        // The passcode is single-use and never stored.
        let otp = self.prompt.otp()?;

        let cloud_token = match self.cloud_api().email_login(email, &otp) {
            Ok(cloud_token) => cloud_token,
            Err(e) => {
                if e.is_api() {
                    error!("OTP authentication has failed.");
                    self.reset()?;
                }
                return Err(e);
            }
        };

        self.store
            .set(CLOUD, cloud_keys::TOKEN, cloud_token.as_str())?;
        self.touch_refresh()?;
        info!("Cloud authentication succeeded.");

        Ok(cloud_token)
    }

    fn enumerate_hubs(
        &mut self,
        email: &str,
        cloud_token: &str,
        options: &AuthOptions,
    ) -> Result<bool> {
        // The cloud cannot tell which local address belongs to which hub.
        let local_host = self.local_hubs()?.into_iter().next();

        let authorized = self.cloud_api().hub_keys(cloud_token)?;
        if authorized.is_empty() {
            error!("You have not registered any hubs to Cozify.");
            return Ok(false);
        }

        for (hub_id, hub_token) in authorized {
            debug!("Enumerating hub {hub_id}");
            let relayed = HubContext::new(hub_id.as_str())
                .remote(true)
                .hub_token(hub_token.as_str())
                .cloud_token(cloud_token);

            let local = match &local_host {
                Some(host) => {
                    let context = HubContext::new(hub_id.as_str()).host(host.as_str());
                    match self.hub_api(&context).hub() {
                        Ok(info) if info.is(&hub_id) => Some((info, host.clone())),
                        Ok(_) => {
                            debug!("The local hub is not {hub_id}, reaching it remotely.");
                            None
                        }
                        Err(e) if e.is_connection() => {
                            debug!("The local hub at {host} does not answer: {e}");
                            None
                        }
                        Err(e) => return Err(e),
                    }
                }
                None => None,
            };

            let (info, host, observed_remote) = match local {
                Some((info, host)) => (info, host, false),
                None => {
                    info!("No local hub detected for {hub_id}, changing to remote mode.");
                    let info = self.hub_api(&relayed).hub()?;
                    if !info.is(&hub_id) {
                        error!(
                            "The hub \"{}\" is not linked to the given account: \"{email}\"",
                            info.name
                        );
                        self.reset()?;
                        return Ok(false);
                    }
                    (info, String::new(), true)
                }
            };

            let known = self.store.hub(&hub_id);
            let remote = match &known {
                Some(hub) if !hub.autoremote => hub.remote || options.remote,
                Some(hub) => {
                    if hub.remote != observed_remote {
                        info!(
                            "[autoremote] Flipping hub {hub_id} remote status to {}.",
                            if observed_remote { "remote" } else { "local" }
                        );
                    }
                    observed_remote
                }
                None => observed_remote || options.remote,
            };

            let section = hub_section(&hub_id);
            self.store.set(&section, hub_keys::HOST, host)?;
            self.store.set(&section, hub_keys::NAME, info.name)?;
            self.store.set(&section, hub_keys::TOKEN, hub_token)?;
            if known.is_none() {
                self.store
                    .set_bool(&section, hub_keys::AUTOREMOTE, options.autoremote)?;
            }
            self.store.set_bool(&section, hub_keys::REMOTE, remote)?;

            if self.default_hub().is_none() {
                info!("Hub {hub_id} is now the default hub.");
                self.store.set(HUBS, hub_keys::DEFAULT, hub_id.as_str())?;
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Local, NaiveDateTime, TimeDelta};

    use httpmock::prelude::*;

    use serde_json::json;

    use crate::error::ErrorKind;
    use crate::store::{CLOUD, HUBS, cloud_keys, hub_keys, hub_section};
    use crate::tests::{Fixture, Scripted};

    use super::{
        AuthOptions, AuthOutcome, AuthState, HubSelector, REFRESH_FORMAT, needs_refresh_at,
    };

    fn timestamp(at: NaiveDateTime) -> String {
        at.format(REFRESH_FORMAT).to_string()
    }

    #[test]
    fn refresh_expiry() {
        let now = Local::now().naive_local();
        let hour = TimeDelta::hours(1);

        let two_hours_ago = timestamp(now - TimeDelta::hours(2));
        let ten_minutes_ago = timestamp(now - TimeDelta::minutes(10));

        assert!(needs_refresh_at(Some(two_hours_ago.as_str()), false, hour, now));
        assert!(!needs_refresh_at(Some(ten_minutes_ago.as_str()), false, hour, now));

        // Forcing ignores the expiry and the timestamp.
        assert!(needs_refresh_at(Some(ten_minutes_ago.as_str()), true, hour, now));
        assert!(needs_refresh_at(
            Some(ten_minutes_ago.as_str()),
            true,
            TimeDelta::MAX,
            now
        ));
        assert!(needs_refresh_at(None, true, hour, now));

        // Missing or corrupt timestamps always refresh.
        assert!(needs_refresh_at(None, false, hour, now));
        assert!(needs_refresh_at(Some("yesterday"), false, hour, now));

        // The expiry law holds for any expiry.
        for minutes in [0, 1, 59, 61, 24 * 60] {
            let expiry = TimeDelta::minutes(minutes);
            let last = timestamp(now - TimeDelta::minutes(60));
            let truncated = NaiveDateTime::parse_from_str(&last, REFRESH_FORMAT).unwrap();
            assert_eq!(
                needs_refresh_at(Some(last.as_str()), false, expiry, now),
                now - truncated > expiry
            );
        }
        assert!(!needs_refresh_at(
            Some(two_hours_ago.as_str()),
            false,
            TimeDelta::MAX,
            now
        ));
    }

    #[test]
    fn first_authentication() {
        let fixture = Fixture::new();
        let mut session = fixture
            .session()
            .prompt(Scripted::new("example@example.com", "123456"));
        assert_eq!(session.state(), AuthState::NoCloudSession);

        let request_login = fixture.mock_request_login(200);
        let email_login = fixture.mock_email_login(200, "eyJ.cloud");
        let lan_ip = fixture.mock_lan_ip();
        let hub_keys = fixture.mock_hub_keys("eyJ.cloud", json!({ "hub-A": "tok-A" }));
        let hub = fixture.mock_local_hub("hub-A", "Home");
        let tz = fixture.mock_local_tz("tok-A", 200);
        let refresh = fixture.server.mock(|when, then| {
            when.path("/ui/0.2/user/refreshsession");
            then.status(200).body("eyJ.renewed");
        });

        assert!(session.authenticate(&AuthOptions::default()).unwrap());
        assert_eq!(session.state(), AuthState::Ready);

        let store = session.store();
        assert_eq!(store.get(CLOUD, cloud_keys::EMAIL), Some("example@example.com"));
        assert_eq!(store.get(CLOUD, cloud_keys::TOKEN), Some("eyJ.cloud"));
        assert!(store.exists(CLOUD, cloud_keys::LAST_REFRESH));
        assert_eq!(store.get("Hubs.hub-A", hub_keys::TOKEN), Some("tok-A"));
        assert_eq!(store.get(HUBS, hub_keys::DEFAULT), Some("hub-A"));

        let hub_a = session.hub(&HubSelector::Default).unwrap();
        assert_eq!(hub_a.name.as_deref(), Some("Home"));
        assert_eq!(hub_a.host, Some(fixture.server.host()));
        assert!(!hub_a.remote);
        assert!(hub_a.autoremote);

        // Nothing changed: the second round only probes.
        assert!(session.authenticate(&AuthOptions::default()).unwrap());
        assert_eq!(session.state(), AuthState::Ready);

        request_login.assert_calls(1);
        email_login.assert_calls(1);
        lan_ip.assert_calls(1);
        hub.assert_calls(1);
        hub_keys.assert_calls(2);
        tz.assert_calls(1);
        refresh.assert_calls(0);

        // Everything was flushed.
        let reopened = crate::store::Store::open(fixture.state_path()).unwrap();
        assert_eq!(&reopened, session.store());
    }

    #[test]
    fn bad_email_resets() {
        let fixture = Fixture::new();
        fixture.seed(|store| {
            store.set(CLOUD, cloud_keys::EMAIL, "bad@example").unwrap();
            store.set(CLOUD, cloud_keys::TOKEN, "eyJ.stale").unwrap();
        });
        let mut session = fixture.session().prompt(Scripted::new("unused", "123456"));

        let _stale = fixture.server.mock(|when, then| {
            when.path("/ui/0.2/user/hubkeys");
            then.status(401);
        });
        let request_login = fixture.mock_request_login(400);

        let error = session.authenticate(&AuthOptions::default()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Api);
        assert_eq!(error.status_code(), Some(400));
        assert_eq!(session.state(), AuthState::Failed);

        request_login.assert();
        let store = session.store();
        assert!(store.has_section(CLOUD));
        assert_eq!(store.cloud(), crate::store::CloudSession::default());
    }

    #[test]
    fn expired_otp_resets() {
        let fixture = Fixture::new();
        let mut session = fixture
            .session()
            .prompt(Scripted::new("example@example.com", "000000"));

        let _request_login = fixture.mock_request_login(200);
        let email_login = fixture.mock_email_login(401, "OTP expired");

        let error = session.authenticate(&AuthOptions::default()).unwrap_err();
        assert_eq!(error.status_code(), Some(401));
        assert_eq!(session.state(), AuthState::Failed);

        email_login.assert();
        assert_eq!(session.cloud_token(), None);
        assert_eq!(session.email(), None);
    }

    #[test]
    fn no_interactive_input() {
        let fixture = Fixture::new();
        let mut session = fixture.session().prompt(Scripted::closed());

        let error = session.authenticate(&AuthOptions::default()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Authentication);
        assert_eq!(session.state(), AuthState::Failed);

        // The passcode is missing after a successful login request.
        let fixture = Fixture::new();
        let mut session = fixture
            .session()
            .prompt(Scripted::closed().with_email("example@example.com"));
        let request_login = fixture.mock_request_login(200);
        let email_login = fixture.mock_email_login(200, "eyJ.cloud");

        let error = session.authenticate(&AuthOptions::default()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Authentication);
        request_login.assert();
        email_login.assert_calls(0);
        // Nothing to reset, the address was accepted.
        assert_eq!(session.email().as_deref(), Some("example@example.com"));
        assert_eq!(session.cloud_token(), None);
    }

    #[test]
    fn no_registered_hub() {
        let fixture = Fixture::new();
        fixture.seed_cloud();
        let mut session = fixture.session();

        let _lan_ip = fixture.mock_lan_ip();
        let _hub_keys = fixture.mock_hub_keys("eyJ.cloud", json!({}));

        assert!(!session.authenticate(&AuthOptions::default()).unwrap());
        assert_eq!(session.state(), AuthState::Failed);
        assert_eq!(session.default_hub(), None);
        // The cloud session itself is fine.
        assert_eq!(session.cloud_token().as_deref(), Some("eyJ.cloud"));
    }

    #[test]
    fn remote_enumeration() {
        let fixture = Fixture::new();
        fixture.seed_cloud();
        let mut session = fixture.session();

        let _outside = fixture.server.mock(|when, then| {
            when.path("/ui/0.2/hub/lan_ip");
            then.status(403);
        });
        let _hub_keys = fixture.mock_hub_keys("eyJ.cloud", json!({ "hub-A": "tok-A" }));
        let relayed_hub = fixture.server.mock(|when, then| {
            when.method(GET)
                .path("/ui/0.2/hub/remote/hub")
                .header("authorization", "eyJ.cloud")
                .header("x-hub-key", "tok-A");
            then.status(200)
                .json_body(json!({ "hubId": "hub-A", "name": "Cabin" }));
        });

        assert!(session.authenticate(&AuthOptions::default()).unwrap());
        relayed_hub.assert();

        let hub_a = session.hub(&HubSelector::name("Cabin")).unwrap();
        assert_eq!(hub_a.hub_id, "hub-A");
        assert!(hub_a.remote);
        assert_eq!(hub_a.host, None);
        assert_eq!(session.default_hub(), Some("hub-A"));
    }

    #[test]
    fn autoremote_flips_back_to_local() {
        let fixture = Fixture::new();
        fixture.seed_cloud();
        fixture.seed_hub("hub-A", "tok-A", true);
        let mut session = fixture.session();
        assert!(session.hub_autoremote("hub-A"));

        let _lan_ip = fixture.mock_lan_ip();
        let _hub_keys = fixture.mock_hub_keys("eyJ.cloud", json!({ "hub-A": "tok-A" }));
        let local_hub = fixture.mock_local_hub("hub-A", "Home");

        let options = AuthOptions::default().trust_hub(false);
        assert!(session.authenticate(&options).unwrap());
        local_hub.assert();

        let hub_a = session.hub(&HubSelector::Default).unwrap();
        assert!(!hub_a.remote);
        assert_eq!(hub_a.host, Some(fixture.server.host()));
    }

    #[test]
    fn pinned_remote_flag_kept() {
        let fixture = Fixture::new();
        fixture.seed_cloud();
        fixture.seed_hub("hub-A", "tok-A", true);
        let mut session = fixture.session();
        session.set_hub_autoremote("hub-A", false).unwrap();

        let _lan_ip = fixture.mock_lan_ip();
        let _hub_keys = fixture.mock_hub_keys("eyJ.cloud", json!({ "hub-A": "tok-B" }));
        let _local_hub = fixture.mock_local_hub("hub-A", "Home");

        let options = AuthOptions::default().trust_hub(false);
        assert!(session.authenticate(&options).unwrap());

        let hub_a = session.hub(&HubSelector::Default).unwrap();
        assert!(hub_a.remote);
        assert!(!hub_a.autoremote);
        assert_eq!(hub_a.hub_token.as_deref(), Some("tok-B"));
        assert_eq!(hub_a.host, Some(fixture.server.host()));
    }

    #[test]
    fn foreign_local_hub_goes_remote() {
        let fixture = Fixture::new();
        fixture.seed_cloud();
        let mut session = fixture.session();

        let _lan_ip = fixture.mock_lan_ip();
        let _hub_keys = fixture.mock_hub_keys("eyJ.cloud", json!({ "hub-A": "tok-A" }));
        let local_hub = fixture.mock_local_hub("hub-Z", "Neighbour");
        let relayed_hub = fixture.server.mock(|when, then| {
            when.method(GET)
                .path("/ui/0.2/hub/remote/hub")
                .header("authorization", "eyJ.cloud")
                .header("x-hub-key", "tok-A");
            then.status(200)
                .json_body(json!({ "hubId": "hub-A", "name": "Cabin" }));
        });

        assert!(session.authenticate(&AuthOptions::default()).unwrap());
        local_hub.assert();
        relayed_hub.assert();

        let hub_a = session.hub(&HubSelector::Default).unwrap();
        assert_eq!(hub_a.hub_id, "hub-A");
        assert_eq!(hub_a.name.as_deref(), Some("Cabin"));
        assert!(hub_a.remote);
        assert_eq!(hub_a.host, None);
        assert_eq!(session.cloud_token().as_deref(), Some("eyJ.cloud"));
    }

    #[test]
    fn untrusted_cloud_logs_in_again() {
        let fixture = Fixture::new();
        fixture.seed_cloud();
        fixture.seed_hub("hub-A", "tok-A", false);
        let mut session = fixture
            .session()
            .prompt(Scripted::new("unused", "654321"));

        let stored_token_check = fixture.mock_hub_keys("eyJ.cloud", json!({ "hub-A": "tok-A" }));
        let request_login = fixture.mock_request_login(200);
        let email_login = fixture.mock_email_login(200, "eyJ.fresh");
        let tz = fixture.mock_local_tz("tok-A", 200);

        let options = AuthOptions::default().trust_cloud(false);
        assert!(session.authenticate(&options).unwrap());
        assert_eq!(session.state(), AuthState::Ready);

        // The stored token was valid but never consulted.
        stored_token_check.assert_calls(0);
        request_login.assert();
        email_login.assert();
        tz.assert();
        assert_eq!(session.cloud_token().as_deref(), Some("eyJ.fresh"));
        assert_eq!(session.email().as_deref(), Some("example@example.com"));
    }

    #[test]
    fn hub_not_linked() {
        let fixture = Fixture::new();
        fixture.seed_cloud();
        let mut session = fixture.session();

        let _outside = fixture.server.mock(|when, then| {
            when.path("/ui/0.2/hub/lan_ip");
            then.status(403);
        });
        let _hub_keys = fixture.mock_hub_keys("eyJ.cloud", json!({ "hub-A": "tok-A" }));
        let _other = fixture.server.mock(|when, then| {
            when.path("/ui/0.2/hub/remote/hub");
            then.status(200)
                .json_body(json!({ "hubId": "hub-Z", "name": "Neighbour" }));
        });

        assert!(!session.authenticate(&AuthOptions::default()).unwrap());
        assert_eq!(session.state(), AuthState::Failed);
        assert_eq!(session.cloud_token(), None);
        assert!(!session.hub_exists("hub-A"));
        assert_eq!(session.default_hub(), None);
    }

    #[test]
    fn dead_refresh() {
        let fixture = Fixture::new();
        fixture.seed(|store| {
            store.set(CLOUD, cloud_keys::TOKEN, "eyJ.dead").unwrap();
        });
        let mut session = fixture.session();

        let refresh = fixture.server.mock(|when, then| {
            when.path("/ui/0.2/user/refreshsession")
                .header("authorization", "eyJ.dead");
            then.status(401);
        });

        // No timestamp means a refresh is due.
        assert!(session.need_refresh(false, None));
        assert!(!session.refresh(false, None).unwrap());
        refresh.assert();
        assert_eq!(session.cloud_token().as_deref(), Some("eyJ.dead"));
    }

    #[test]
    fn successful_refresh() {
        let fixture = Fixture::new();
        fixture.seed_cloud();
        let mut session = fixture.session();

        let refresh = fixture.server.mock(|when, then| {
            when.path("/ui/0.2/user/refreshsession")
                .header("authorization", "eyJ.cloud");
            then.status(200).body("eyJ.renewed");
        });

        // Recently refreshed, nothing to do.
        assert!(!session.need_refresh(false, None));
        assert!(session.refresh(false, None).unwrap());
        refresh.assert_calls(0);

        assert!(session.refresh(true, None).unwrap());
        refresh.assert_calls(1);
        assert_eq!(session.cloud_token().as_deref(), Some("eyJ.renewed"));
        assert!(!session.need_refresh(false, Some(TimeDelta::hours(1))));
    }

    #[test]
    fn cloud_probes() {
        let fixture = Fixture::new();
        let mut session = fixture.session();

        // Nothing to probe.
        assert_eq!(session.probe_cloud().unwrap_err().kind(), ErrorKind::State);
        assert!(!session.cloud_ping(None).unwrap());

        fixture.seed_cloud();
        let mut session = fixture.session();
        let _expired = fixture.server.mock(|when, then| {
            when.path("/ui/0.2/user/hubkeys");
            then.status(401);
        });
        assert_eq!(session.probe_cloud().unwrap(), AuthOutcome::Expired);
        assert!(!session.cloud_ping(None).unwrap());

        let unreachable = Fixture::with_dead_cloud();
        unreachable.seed_cloud();
        let mut session = unreachable.session();
        assert_eq!(session.probe_cloud().unwrap(), AuthOutcome::Unreachable);
        assert!(session.cloud_ping(None).unwrap_err().is_connection());
    }

    #[test]
    fn ping_renews_hub_token() {
        let fixture = Fixture::new();
        fixture.seed_cloud();
        fixture.seed_hub("hub-A", "revoked", false);
        let mut session = fixture.session();

        let revoked = fixture.mock_local_tz("revoked", 401);
        let renewed = fixture.mock_local_tz("tok-B", 200);
        let _lan_ip = fixture.mock_lan_ip();
        let _hub_keys = fixture.mock_hub_keys("eyJ.cloud", json!({ "hub-A": "tok-B" }));
        let _hub = fixture.mock_local_hub("hub-A", "Home");

        assert_eq!(
            session.probe_hub(&HubSelector::Default).unwrap(),
            AuthOutcome::Expired
        );
        assert!(!session.ping(&HubSelector::Default, false).unwrap());
        let context = session.context(&HubSelector::Default).unwrap();
        let error = session.hub_api(&context).tz().unwrap_err();
        assert_eq!(error.status_code(), Some(401));

        assert!(session.ping(&HubSelector::Default, true).unwrap());
        assert_eq!(session.hub_token("hub-A").as_deref(), Some("tok-B"));
        assert_eq!(session.state(), AuthState::Ready);

        let context = session.context(&HubSelector::Default).unwrap();
        assert_eq!(session.hub_api(&context).tz().unwrap(), "Europe/Helsinki");
        revoked.assert_calls(4);
        renewed.assert_calls(1);
    }

    #[test]
    fn ping_flips_to_relay() {
        let fixture = Fixture::with_dead_hub();
        fixture.seed_cloud();
        fixture.seed_hub("hub-A", "tok-A", false);
        let mut session = fixture.session();

        let _lan_ip = fixture.mock_lan_ip();
        let _hub_keys = fixture.mock_hub_keys("eyJ.cloud", json!({ "hub-A": "tok-A" }));
        let relayed_tz = fixture.mock_relayed_tz(200);

        assert_eq!(
            session.probe_hub(&HubSelector::Default).unwrap(),
            AuthOutcome::Unreachable
        );
        assert!(session.ping(&HubSelector::Default, true).unwrap());
        relayed_tz.assert();
        assert!(session.hub_remote("hub-A"));
    }

    #[test]
    fn ping_rolls_back_relay() {
        let fixture = Fixture::with_dead_hub();
        fixture.seed_cloud();
        fixture.seed_hub("hub-A", "tok-A", false);
        let mut session = fixture.session();

        let _lan_ip = fixture.mock_lan_ip();
        let _hub_keys = fixture.mock_hub_keys("eyJ.cloud", json!({ "hub-A": "tok-A" }));
        let relayed_tz = fixture.mock_relayed_tz(502);

        assert!(!session.ping(&HubSelector::Default, true).unwrap());
        relayed_tz.assert();
        assert!(!session.hub_remote("hub-A"));
        assert_eq!(
            session.hub_host("hub-A"),
            Some(fixture.server.host())
        );
    }

    #[test]
    fn ping_without_autoremote() {
        let fixture = Fixture::with_dead_hub();
        fixture.seed_cloud();
        fixture.seed_hub("hub-A", "tok-A", false);
        let mut session = fixture.session();
        session.set_hub_autoremote("hub-A", false).unwrap();

        let _lan_ip = fixture.mock_lan_ip();
        let relayed_tz = fixture.mock_relayed_tz(200);

        let error = session.ping(&HubSelector::Default, true).unwrap_err();
        assert!(error.is_connection());
        relayed_tz.assert_calls(0);
        assert!(!session.hub_remote("hub-A"));
    }

    #[test]
    fn ping_follows_new_address() {
        let fixture = Fixture::new();
        fixture.seed_cloud();
        fixture.seed_hub("hub-A", "tok-A", false);
        fixture.seed(|store| {
            store.set(&hub_section("hub-A"), hub_keys::HOST, "hub.invalid").unwrap();
        });
        let mut session = fixture.session();

        let _lan_ip = fixture.mock_lan_ip();
        let tz = fixture.mock_local_tz("tok-A", 200);

        assert!(session.ping(&HubSelector::Default, true).unwrap());
        tz.assert();
        assert_eq!(session.hub_host("hub-A"), Some(fixture.server.host()));
        assert!(!session.hub_remote("hub-A"));
    }

    #[test]
    fn ping_without_host_goes_remote() {
        let fixture = Fixture::new();
        fixture.seed_cloud();
        fixture.seed_hub("hub-A", "tok-A", false);
        fixture.seed(|store| {
            store.set(&hub_section("hub-A"), hub_keys::HOST, "").unwrap();
        });
        let mut session = fixture.session();

        let relayed_tz = fixture.mock_relayed_tz(200);

        assert!(session.ping(&HubSelector::id("hub-A"), false).unwrap());
        relayed_tz.assert();
        assert!(session.hub_remote("hub-A"));
    }

    #[test]
    fn ping_refreshes_cloud_token() {
        let fixture = Fixture::new();
        fixture.seed_cloud();
        fixture.seed_hub("hub-A", "tok-A", false);
        fixture.seed(|store| {
            store
                .set(CLOUD, cloud_keys::LAST_REFRESH, "2020-01-01T00:00:00")
                .unwrap();
        });
        let mut session = fixture.session();

        let _tz = fixture.mock_local_tz("tok-A", 200);
        let refresh = fixture.server.mock(|when, then| {
            when.path("/ui/0.2/user/refreshsession")
                .header("authorization", "eyJ.cloud");
            then.status(200).body("eyJ.renewed");
        });

        assert!(session.ping(&HubSelector::Default, false).unwrap());
        refresh.assert_calls(0);

        assert!(session.ping(&HubSelector::Default, true).unwrap());
        refresh.assert_calls(1);
        assert_eq!(session.cloud_token().as_deref(), Some("eyJ.renewed"));
        assert!(!session.need_refresh(false, None));
    }

    #[test]
    fn ping_unknown_hub() {
        let fixture = Fixture::new();
        fixture.seed_cloud();
        fixture.seed_hub("hub-A", "tok-A", false);
        let mut session = fixture.session();

        let error = session.ping(&HubSelector::id("hub-Z"), true).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::State);
        assert!(!session.hub_exists("hub-Z"));

        let reopened = crate::store::Store::open(fixture.state_path()).unwrap();
        assert!(!reopened.hub_exists("hub-Z"));
    }

    #[test]
    fn hub_selection() {
        let fixture = Fixture::new();
        fixture.seed_cloud();
        fixture.seed_hub("hub-A", "tok-A", false);
        let mut session = fixture.session();

        assert_eq!(session.resolve(&HubSelector::Default).unwrap(), "hub-A");
        assert_eq!(session.resolve(&HubSelector::name("Home")).unwrap(), "hub-A");
        assert_eq!(session.resolve(&HubSelector::id("hub-Z")).unwrap(), "hub-Z");
        assert_eq!(
            session.resolve(&HubSelector::name("Cabin")).unwrap_err().kind(),
            ErrorKind::State
        );
        assert_eq!(
            session.hub(&HubSelector::id("hub-Z")).unwrap_err().kind(),
            ErrorKind::State
        );

        assert!(session.hub_exists("hub-A"));
        assert_eq!(session.hub_name("hub-A").as_deref(), Some("Home"));
        assert!(!session.hub_remote("hub-Z"));
        assert!(session.hub_autoremote("hub-Z"));

        session.set_hub_remote("hub-A", true).unwrap();
        let context = session.context(&HubSelector::Default).unwrap();
        assert!(context.remote);
        assert_eq!(context.hub_token.as_deref(), Some("tok-A"));
        assert_eq!(context.cloud_token.as_deref(), Some("eyJ.cloud"));

        session.reset().unwrap();
        assert_eq!(session.state(), AuthState::NoCloudSession);
        // Hubs outlive a cloud reset.
        assert_eq!(session.default_hub(), Some("hub-A"));

        let empty = Fixture::new();
        assert_eq!(
            empty.session().resolve(&HubSelector::Default).unwrap_err().kind(),
            ErrorKind::State
        );
    }
}
