use reqwest::{StatusCode, Url};

use serde::de::DeserializeOwned;

use crate::error::{Error, ErrorKind, Result};

/// A successful answer of the cloud or of a hub.
///
/// The body is read eagerly, so a [`Response`] no longer holds any
/// connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    url: Url,
    body: String,
}

impl Response {
    pub(crate) const fn new(status: StatusCode, url: Url, body: String) -> Self {
        Self { status, url, body }
    }

    /// Returns the status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the address which answered.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the raw body.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.body
    }

    /// Parses the body as a JSON document.
    ///
    /// # Errors
    ///
    /// Fails when the body is not a valid JSON representation of `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            Error::new(
                ErrorKind::JsonResponse,
                format!("Json error caused by {e} - {}", self.url),
            )
        })
    }

    /// Returns the body as a token, ignoring surrounding whitespace and
    /// quotes.
    ///
    /// # Errors
    ///
    /// Fails when the body is empty.
    pub fn token(&self) -> Result<String> {
        let token = self.body.trim().trim_matches('"');
        if token.is_empty() {
            return Err(Error::new(
                ErrorKind::JsonResponse,
                format!("Empty token received from {}", self.url),
            ));
        }
        Ok(token.to_owned())
    }
}
