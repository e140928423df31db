use std::borrow::Cow;

/// All possible error kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// An unrecoverable authentication failure which requires a human,
    /// such as a missing one-time passcode.
    Authentication,
    /// The API answered with a non-successful status code.
    Api,
    /// The API answered `410 Gone`: the client speaks an outdated API
    /// version and must be updated.
    ApiVersion,
    /// The request never got an answer: timeout, refused connection or
    /// name resolution failure.
    Connection,
    /// A call could not be routed because its routing preconditions are
    /// not met.
    Routing,
    /// A required piece of persisted state is missing.
    State,
    /// A device is unknown to its hub or cannot perform an action.
    Device,
    /// The credential store could not be read or written.
    Store,
    /// A response body could not be decoded.
    JsonResponse,
    /// The client configuration is invalid.
    Config,
}

impl ErrorKind {
    pub(crate) const fn description(self) -> &'static str {
        match self {
            Self::Authentication => "Authentication error",
            Self::Api => "API error",
            Self::ApiVersion => "API version outdated",
            Self::Connection => "Connection error",
            Self::Routing => "Routing error",
            Self::State => "State error",
            Self::Device => "Device error",
            Self::Store => "Store error",
            Self::JsonResponse => "Json response error",
            Self::Config => "Configuration error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// A library error.
#[derive(Clone, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    status: Option<u16>,
    info: Cow<'static, str>,
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error(f)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error(f)
    }
}

impl std::error::Error for Error {}

impl Error {
    pub(crate) fn new(kind: ErrorKind, info: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            status: None,
            info: info.into(),
        }
    }

    pub(crate) fn api(status: u16, info: impl Into<Cow<'static, str>>) -> Self {
        let kind = if status == 410 {
            ErrorKind::ApiVersion
        } else {
            ErrorKind::Api
        };
        Self {
            kind,
            status: Some(status),
            info: info.into(),
        }
    }

    /// Returns the [`ErrorKind`].
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the HTTP status code of an API error.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        self.status
    }

    /// Returns the error description.
    #[must_use]
    pub fn info(&self) -> &str {
        &self.info
    }

    /// Checks whether the credentials used for the call were rejected.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self.status, Some(401 | 403))
    }

    /// Checks whether the API answered with a non-successful status code.
    #[must_use]
    pub const fn is_api(&self) -> bool {
        matches!(self.kind, ErrorKind::Api | ErrorKind::ApiVersion)
    }

    /// Checks whether the call failed at the transport level.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self.kind, ErrorKind::Connection)
    }

    fn error(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{}, {status}: {}", self.kind, self.info),
            None => write!(f, "{}: {}", self.kind, self.info),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorKind::Store, e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::new(ErrorKind::Store, format!("Malformed state file: {e}"))
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Self::new(ErrorKind::Store, format!("Unserializable state: {e}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::new(ErrorKind::JsonResponse, format!("Json error caused by {e}"))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            Self::api(status.as_u16(), e.to_string())
        } else if e.is_builder() {
            Self::new(ErrorKind::Config, e.to_string())
        } else if e.is_decode() {
            Self::new(ErrorKind::JsonResponse, e.to_string())
        } else {
            Self::new(ErrorKind::Connection, e.to_string())
        }
    }
}

/// A specialized [`Result`] type for [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
