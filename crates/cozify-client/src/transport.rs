use reqwest::Method;
use reqwest::blocking::Client;

use serde::Serialize;

use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::response::Response;
use crate::router::RoutedRequest;
use crate::store::{PROXIES, Store};

const USER_AGENT: &str = concat!("cozify-client/", env!("CARGO_PKG_VERSION"));

/// Proxies every call goes through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Proxies {
    /// Proxy for plain HTTP calls, hub calls on the local network included.
    pub http: Option<String>,
    /// Proxy for HTTPS calls.
    pub https: Option<String>,
}

impl Proxies {
    /// Reads the proxies stored in the `Proxies` section of a [`Store`].
    #[must_use]
    pub fn from_store(store: &Store) -> Self {
        let proxy = |key| {
            store
                .get(PROXIES, key)
                .filter(|proxy| !proxy.is_empty())
                .map(str::to_owned)
        };
        Self {
            http: proxy("http"),
            https: proxy("https"),
        }
    }
}

/// Sends routed requests and classifies their outcome.
///
/// A call succeeds only with a `2xx` answer. Any other answer becomes an
/// API error carrying its status code, while a call which never got an
/// answer becomes a connection error.
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
}

impl Transport {
    /// Creates a [`Transport`].
    ///
    /// # Errors
    ///
    /// Fails when a proxy address is not valid or the underlying HTTP
    /// client cannot be initialized.
    pub fn new(config: &Config, proxies: &Proxies) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout);

        if !config.system_proxy {
            builder = builder.no_proxy();
        }
        if let Some(http) = &proxies.http {
            builder = builder.proxy(reqwest::Proxy::http(http)?);
        }
        if let Some(https) = &proxies.https {
            builder = builder.proxy(reqwest::Proxy::https(https)?);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Sends a `GET` request.
    ///
    /// # Errors
    ///
    /// Fails when no answer is received or the answer is not successful.
    pub fn get(&self, request: RoutedRequest) -> Result<Response> {
        self.send(Method::GET, request, None)
    }

    /// Sends a `POST` request without body.
    ///
    /// # Errors
    ///
    /// Fails when no answer is received or the answer is not successful.
    pub fn post(&self, request: RoutedRequest) -> Result<Response> {
        self.send(Method::POST, request, None)
    }

    /// Sends a `PUT` request with a JSON body.
    ///
    /// # Errors
    ///
    /// Fails when the body cannot be serialized, no answer is received or
    /// the answer is not successful.
    pub fn put<T: Serialize + ?Sized>(&self, request: RoutedRequest, body: &T) -> Result<Response> {
        let body = serde_json::to_string(body)?;
        self.send(Method::PUT, request.json(), Some(body))
    }

    fn send(&self, method: Method, request: RoutedRequest, body: Option<String>) -> Result<Response> {
        let RoutedRequest { url, headers } = request;
        // Only the address is logged, headers carry tokens.
        debug!("{method} {url}");

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send()?;

        let status = response.status();
        let url = response.url().clone();
        let body = response.text()?;

        if status.is_success() {
            return Ok(Response::new(status, url, body));
        }

        let reason = status.canonical_reason().unwrap_or("Unknown");
        let info = if status.as_u16() == 410 {
            format!("API version outdated. Update the client. {reason} - {url} - {body}")
        } else {
            format!("{reason} - {url} - {body}")
        };
        debug!("{status} received from {url}");

        Err(Error::api(status.as_u16(), info))
    }
}
