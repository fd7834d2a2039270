//! Interactive Login Types

use std::fmt;
use std::time::Duration;

use oauth2::AccessToken;
use serde::Deserialize;

/// Well-known claim names
pub mod claims {
    pub const SUBJECT: &str = "sub";
    pub const NAME: &str = "name";
    pub const PREFERRED_USERNAME: &str = "preferred_username";
    pub const EMAIL: &str = "email";
}

/// Authenticated identity returned by a successful login
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
    provider: String,
    claims: Vec<(String, String)>,
}

impl Principal {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            claims: Vec::new(),
        }
    }

    /// Add a claim; claims keep insertion order
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_claim(name, value);
        self
    }

    pub fn add_claim(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.claims.push((name.into(), value.into()));
    }

    /// Add a claim only when no value for it exists yet
    pub fn add_claim_if_absent(&mut self, name: &str, value: Option<&str>) {
        if let Some(value) = value {
            if self.find_first(name).is_none() {
                self.add_claim(name, value);
            }
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// First value of the named claim
    pub fn find_first(&self, name: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|(claim, _)| claim == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn name(&self) -> Option<&str> {
        self.find_first(claims::NAME)
    }

    pub fn claim_names(&self) -> impl Iterator<Item = &str> {
        self.claims.iter().map(|(name, _)| name.as_str())
    }
}

/// Outcome of a completed interactive login
///
/// Tokens are handed to the caller as-is; nothing here stores or refreshes them.
#[derive(Debug, Clone)]
pub struct AuthenticationResult {
    pub principal: Principal,
    pub access_token: AccessToken,
    pub expires_in: Option<Duration>,
}

/// Providers offered by the console menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Local,
    GitHub,
}

impl Provider {
    /// Map a menu entry to a provider
    pub fn from_menu_input(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Self::Local),
            "2" => Some(Self::GitHub),
            _ => None,
        }
    }

    /// Registration name used to look the provider up in the configuration
    pub fn name(&self) -> &'static str {
        match self {
            Self::Local => "Local",
            Self::GitHub => "GitHub",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Query parameters delivered to the loopback redirect URI
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub error_uri: Option<String>,
}

/// Profile returned by `GET https://api.github.com/user`
#[derive(Debug, Clone, Deserialize)]
pub struct GithubUser {
    pub id: u64,
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
}
