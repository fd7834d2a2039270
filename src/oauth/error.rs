//! Authentication failures

use std::fmt;

use oauth2::{ErrorResponseType, RequestTokenError, StandardErrorResponse};

use crate::host::Cancelled;

/// OAuth 2.0 error code sent when the end user declines
pub const ACCESS_DENIED: &str = "access_denied";

/// Machine-readable error reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolError {
    pub error: String,
    pub description: Option<String>,
    pub uri: Option<String>,
}

impl ProtocolError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            description: None,
            uri: None,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn is_access_denied(&self) -> bool {
        self.error == ACCESS_DENIED
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.error)?;
        if let Some(description) = &self.description {
            write!(f, " ({})", description)?;
        }
        if let Some(uri) = &self.uri {
            write!(f, " see {}", uri)?;
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("the authentication process was cancelled")]
    Cancelled,
    #[error("provider returned an error: {0}")]
    Protocol(ProtocolError),
    #[error("no registration for provider {0}")]
    UnknownProvider(String),
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] oauth2::url::ParseError),
    #[error("provider discovery failed: {0}")]
    Discovery(String),
    #[error("state parameter does not match the login request")]
    StateMismatch,
    #[error("redirect did not carry an authorization code")]
    MissingCode,
    #[error("token request failed: {0}")]
    TokenRequest(String),
    #[error("provider did not return an ID token")]
    NotOidc,
    #[error("ID token verification failed: {0}")]
    IdToken(String),
    #[error("user profile request failed: {0}")]
    UserInfo(String),
    #[error("timed out waiting for the authorization response")]
    TimedOut,
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<Cancelled> for AuthError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

impl AuthError {
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::Protocol(e) if e.is_access_denied())
    }
}

/// Map a token endpoint failure, keeping the provider's error code when it sent one
pub fn from_token_error<RE, T>(error: RequestTokenError<RE, StandardErrorResponse<T>>) -> AuthError
where
    RE: std::error::Error + 'static,
    T: ErrorResponseType + fmt::Display + 'static,
{
    match error {
        RequestTokenError::ServerResponse(response) => AuthError::Protocol(
            ProtocolError::new(response.error().to_string())
                .with_description(response.error_description().cloned()),
        ),
        RequestTokenError::Parse(err, body) => AuthError::TokenRequest(format!(
            "Failed to parse server response: {} [response={:?}]",
            err,
            String::from_utf8_lossy(&body)
        )),
        e => AuthError::TokenRequest(e.to_string()),
    }
}
